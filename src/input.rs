//! Loading shares from a JSON share record.
//!
//! ```json
//! {
//!   "keys": { "n": 3, "k": 3, "prime": "2089" },
//!   "1": { "base": "10", "value": "1494" },
//!   "2": { "base": "2", "value": "11110010110" },
//!   "3": { "base": "16", "value": "1e9" }
//! }
//! ```
//!
//! Every top-level entry other than `keys` is a share: its name is the
//! decimal x-coordinate and `value` holds y written in radix `base`.
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use num_bigint::BigInt;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{debug, warn};

use crate::field::PrimeField;
use crate::{reconstruct, Share, SssError};

/// Prime used when the record does not declare one
pub const DEFAULT_PRIME: u32 = 2089;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("failed to read share file")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed share record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("prime {0:?} is not a decimal integer of at least 2")]
    InvalidPrime(String),

    #[error("share id {0:?} is not a base-10 integer")]
    InvalidShareId(String),

    #[error("share {id}: base {base:?} is not a radix between 2 and 36")]
    InvalidBase { id: String, base: String },

    #[error("share {id}: {value:?} is not a valid base-{radix} number")]
    InvalidValue {
        id: String,
        value: String,
        radix: u32,
    },
}

#[derive(Clone, Debug, Deserialize)]
struct Keys {
    /// Declared share count, informational only
    n: Option<usize>,
    k: usize,
    #[serde(default, deserialize_with = "optional_text_or_number")]
    prime: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct EncodedShare {
    #[serde(deserialize_with = "text_or_number")]
    base: String,
    value: String,
}

/// Numeric fields may be written as `"2089"` or `2089`.
#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(u64),
}

impl From<TextOrNumber> for String {
    fn from(raw: TextOrNumber) -> Self {
        match raw {
            TextOrNumber::Text(text) => text,
            TextOrNumber::Number(number) => number.to_string(),
        }
    }
}

fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    TextOrNumber::deserialize(deserializer).map(String::from)
}

fn optional_text_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<TextOrNumber>::deserialize(deserializer).map(|raw| raw.map(String::from))
}

/// Parses an optional sign followed by one or more digits of `radix`.
///
/// Stricter than `BigInt::parse_bytes`, which also takes `_` separators.
fn parse_integer(text: &str, radix: u32) -> Option<BigInt> {
    let digits = text.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(text);
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    BigInt::parse_bytes(text.as_bytes(), radix)
}

/// A share record as written on disk, nothing decoded yet.
#[derive(Clone, Debug, Deserialize)]
pub struct ShareFile {
    keys: Keys,
    #[serde(flatten)]
    shares: BTreeMap<String, EncodedShare>,
}

/// Decoded input for one reconstruction: y-values already reduced mod `prime`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareSet {
    pub prime: BigInt,
    pub threshold: usize,
    pub shares: Vec<Share>,
}

impl ShareSet {
    pub fn reconstruct(&self) -> Result<BigInt, SssError> {
        reconstruct(&self.shares, self.threshold, &self.prime)
    }
}

impl ShareFile {
    pub fn from_json_str(json: &str) -> Result<Self, InputError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, InputError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Decodes against the declared prime, or [`DEFAULT_PRIME`] when absent.
    pub fn decode(&self) -> Result<ShareSet, InputError> {
        let prime = match &self.keys.prime {
            Some(text) => parse_integer(text, 10)
                .ok_or_else(|| InputError::InvalidPrime(text.clone()))?,
            None => BigInt::from(DEFAULT_PRIME),
        };
        self.decode_with_prime(prime)
    }

    /// Decodes against `prime`, ignoring whatever the record declares.
    pub fn decode_with_prime(&self, prime: BigInt) -> Result<ShareSet, InputError> {
        let field = PrimeField::new(prime.clone())
            .map_err(|_| InputError::InvalidPrime(prime.to_string()))?;

        if let Some(n) = self.keys.n {
            if n != self.shares.len() {
                warn!(
                    declared = n,
                    found = self.shares.len(),
                    "share count does not match keys.n"
                );
            }
        }

        let shares = self
            .shares
            .iter()
            .map(|(id, encoded)| decode_share(&field, id, encoded))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            shares = shares.len(),
            threshold = self.keys.k,
            prime = %field.modulus(),
            "decoded share record"
        );

        Ok(ShareSet {
            prime: field.modulus().clone(),
            threshold: self.keys.k,
            shares,
        })
    }
}

fn decode_share(field: &PrimeField, id: &str, encoded: &EncodedShare) -> Result<Share, InputError> {
    let x = parse_integer(id, 10)
        .ok_or_else(|| InputError::InvalidShareId(id.to_string()))?;

    let radix = encoded
        .base
        .parse::<u32>()
        .ok()
        .filter(|radix| (2..=36).contains(radix))
        .ok_or_else(|| InputError::InvalidBase {
            id: id.to_string(),
            base: encoded.base.clone(),
        })?;

    let y = parse_integer(&encoded.value, radix).ok_or_else(|| {
        InputError::InvalidValue {
            id: id.to_string(),
            value: encoded.value.clone(),
            radix,
        }
    })?;

    Ok(Share {
        x,
        y: field.reduce(&y),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"{
        "keys": { "n": 4, "k": 3 },
        "1": { "base": "10", "value": "1494" },
        "2": { "base": "2", "value": "11110010110" },
        "3": { "base": "16", "value": "1E9" },
        "4": { "base": "12", "value": "915" }
    }"#;

    #[test]
    fn test_decode_with_default_prime() {
        let set = ShareFile::from_json_str(RECORD).unwrap().decode().unwrap();

        assert_eq!(set.prime, BigInt::from(DEFAULT_PRIME));
        assert_eq!(set.threshold, 3);
        assert_eq!(set.shares.len(), 4);
        assert!(set.shares.contains(&Share::new(2, 1942)));
        assert!(set.shares.contains(&Share::new(3, 489)));
        // 915 in base 12 is 1313
        assert!(set.shares.contains(&Share::new(4, 1313)));
        assert_eq!(set.reconstruct().unwrap(), BigInt::from(1234));
    }

    #[test]
    fn test_values_reduced_mod_declared_prime() {
        let json = r#"{
            "keys": { "k": 1, "prime": "17" },
            "7": { "base": "10", "value": "40" }
        }"#;
        let set = ShareFile::from_json_str(json).unwrap().decode().unwrap();

        assert_eq!(set.prime, BigInt::from(17));
        assert_eq!(set.shares, vec![Share::new(7, 6)]);
    }

    #[test]
    fn test_prime_override() {
        let json = r#"{
            "keys": { "k": 1, "prime": "17" },
            "7": { "base": "10", "value": "40" }
        }"#;
        let set = ShareFile::from_json_str(json)
            .unwrap()
            .decode_with_prime(BigInt::from(23))
            .unwrap();

        assert_eq!(set.prime, BigInt::from(23));
        assert_eq!(set.shares, vec![Share::new(7, 17)]);
    }

    #[test]
    fn test_large_value() {
        let json = r#"{
            "keys": { "k": 1, "prime": "115792089237316195423570985008687907853269984665640564039457584007913129639747" },
            "1": { "base": "16", "value": "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff" }
        }"#;
        let set = ShareFile::from_json_str(json).unwrap().decode().unwrap();

        // 2^256 - 1 ≡ 188 mod 2^256 - 189
        assert_eq!(set.shares[0].y, BigInt::from(188));
    }

    #[test]
    fn test_n_mismatch_is_not_an_error() {
        let json = r#"{
            "keys": { "n": 10, "k": 1 },
            "1": { "base": "10", "value": "5" }
        }"#;
        let set = ShareFile::from_json_str(json).unwrap().decode().unwrap();

        assert_eq!(set.shares.len(), 1);
    }

    #[test]
    fn test_invalid_prime() {
        for prime in ["abc", "1", "-5"] {
            let json = format!(r#"{{ "keys": {{ "k": 1, "prime": "{prime}" }} }}"#);
            let file = ShareFile::from_json_str(&json).unwrap();
            assert!(matches!(file.decode(), Err(InputError::InvalidPrime(_))));
        }
    }

    #[test]
    fn test_invalid_share_id() {
        let json = r#"{
            "keys": { "k": 1 },
            "one": { "base": "10", "value": "5" }
        }"#;
        let file = ShareFile::from_json_str(json).unwrap();

        assert!(matches!(
            file.decode(),
            Err(InputError::InvalidShareId(id)) if id == "one"
        ));
    }

    #[test]
    fn test_invalid_base() {
        for base in ["1", "37", "ten", ""] {
            let json = format!(
                r#"{{ "keys": {{ "k": 1 }}, "1": {{ "base": "{base}", "value": "5" }} }}"#
            );
            let file = ShareFile::from_json_str(&json).unwrap();
            assert!(matches!(file.decode(), Err(InputError::InvalidBase { .. })));
        }
    }

    #[test]
    fn test_invalid_value() {
        let json = r#"{
            "keys": { "k": 1 },
            "1": { "base": "2", "value": "1012" }
        }"#;
        let file = ShareFile::from_json_str(json).unwrap();

        assert!(matches!(
            file.decode(),
            Err(InputError::InvalidValue { radix: 2, .. })
        ));
    }

    #[test]
    fn test_digit_separators_rejected() {
        let json = r#"{
            "keys": { "k": 1 },
            "1_0": { "base": "10", "value": "15" }
        }"#;
        let file = ShareFile::from_json_str(json).unwrap();
        assert!(matches!(
            file.decode(),
            Err(InputError::InvalidShareId(id)) if id == "1_0"
        ));

        let json = r#"{
            "keys": { "k": 1 },
            "10": { "base": "10", "value": "1_5" }
        }"#;
        let file = ShareFile::from_json_str(json).unwrap();
        assert!(matches!(
            file.decode(),
            Err(InputError::InvalidValue { value, .. }) if value == "1_5"
        ));

        let json = r#"{ "keys": { "k": 1, "prime": "20_89" } }"#;
        let file = ShareFile::from_json_str(json).unwrap();
        assert!(matches!(file.decode(), Err(InputError::InvalidPrime(_))));
    }

    #[test]
    fn test_malformed_digits_rejected() {
        for value in [" 15", "15 ", "", "-", "+-1", "0x1f"] {
            let json = format!(
                r#"{{ "keys": {{ "k": 1 }}, "1": {{ "base": "16", "value": "{value}" }} }}"#
            );
            let file = ShareFile::from_json_str(&json).unwrap();
            assert!(
                matches!(file.decode(), Err(InputError::InvalidValue { .. })),
                "accepted {value:?}"
            );
        }
    }

    #[test]
    fn test_signed_values() {
        let json = r#"{
            "keys": { "k": 2, "prime": "17" },
            "-3": { "base": "10", "value": "-1" },
            "+4": { "base": "16", "value": "+a" }
        }"#;
        let set = ShareFile::from_json_str(json).unwrap().decode().unwrap();

        assert!(set.shares.contains(&Share::new(-3, 16)));
        assert!(set.shares.contains(&Share::new(4, 10)));
    }

    #[test]
    fn test_numeric_prime_and_base() {
        let json = r#"{
            "keys": { "k": 1, "prime": 17 },
            "7": { "base": 10, "value": "40" }
        }"#;
        let set = ShareFile::from_json_str(json).unwrap().decode().unwrap();

        assert_eq!(set.prime, BigInt::from(17));
        assert_eq!(set.shares, vec![Share::new(7, 6)]);
    }

    #[test]
    fn test_missing_threshold() {
        let json = r#"{ "keys": { "n": 1 }, "1": { "base": "10", "value": "5" } }"#;

        assert!(matches!(
            ShareFile::from_json_str(json),
            Err(InputError::Json(_))
        ));
    }

    #[test]
    fn test_missing_value_field() {
        let json = r#"{ "keys": { "k": 1 }, "1": { "base": "10" } }"#;

        assert!(matches!(
            ShareFile::from_json_str(json),
            Err(InputError::Json(_))
        ));
    }

    #[test]
    fn test_too_few_shares_surfaces_from_reconstruct() {
        let json = r#"{
            "keys": { "k": 5 },
            "1": { "base": "10", "value": "1494" },
            "2": { "base": "10", "value": "1942" },
            "3": { "base": "10", "value": "489" }
        }"#;
        let set = ShareFile::from_json_str(json).unwrap().decode().unwrap();

        assert!(matches!(
            set.reconstruct(),
            Err(SssError::InsufficientShares {
                threshold: 5,
                share_count: 3
            })
        ));
    }
}
