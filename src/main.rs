use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use num_bigint::BigInt;
use shamir_recover::input::ShareFile;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "shamir-recover")]
#[command(about = "Recover a Shamir-shared secret from a JSON share record", long_about = None)]
struct Cli {
    /// Path to the share record
    #[arg(default_value = "data.json")]
    file: PathBuf,

    /// Prime modulus to use instead of the one declared in the record
    #[arg(long)]
    prime: Option<BigInt>,

    /// Indicate log levels by adding additional `-v` arguments. Eg. `-vvv` will give you
    /// trace level output
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Silence all logging. This argument cannot be used alongside `-v`
    #[arg(short, long, action = ArgAction::SetTrue, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::OFF;
        }
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    fn execute(self) -> Result<()> {
        let file = ShareFile::from_path(&self.file)
            .with_context(|| format!("loading {}", self.file.display()))?;

        let shares = match self.prime {
            Some(prime) => file.decode_with_prime(prime),
            None => file.decode(),
        }
        .with_context(|| format!("decoding {}", self.file.display()))?;

        info!(
            shares = shares.shares.len(),
            threshold = shares.threshold,
            "reconstructing secret"
        );

        let secret = shares
            .reconstruct()
            .context("secret reconstruction failed")?;

        println!("Recovered Secret: {secret}");
        Ok(())
    }
}

fn setup_tracing(level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.log_level());

    if let Err(err) = cli.execute() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
