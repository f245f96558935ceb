//! Content-addressed fingerprints
//!
//! A [`Fingerprint`] is the lowercase hex SHA-256 digest of a blob's
//! [canonical JSON](crate::Json::canonical_bytes) serialization. It is the
//! sole identity blobs are addressed by (spec.md §3, invariant 1).

use crate::json::Json;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Lowercase hex SHA-256 digest over a blob's canonical JSON bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Computes the fingerprint of a JSON value's canonical encoding.
    pub fn of(value: &Json) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(value.canonical_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Fingerprint(bytes)
    }

    /// Returns the raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Renders the fingerprint as lowercase hex.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Error returned when parsing a malformed fingerprint string.
#[derive(Debug, thiserror::Error)]
#[error("invalid fingerprint {0:?}: expected 64 lowercase hex characters")]
pub struct ParseFingerprintError(String);

impl FromStr for Fingerprint {
    type Err = ParseFingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseFingerprintError(s.to_string()));
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in bytes.iter_mut().enumerate() {
            *chunk = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| ParseFingerprintError(s.to_string()))?;
        }
        Ok(Fingerprint(bytes))
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = ParseFingerprintError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(f: Fingerprint) -> Self {
        f.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_for_equal_values() {
        let a = Json::object([("x".to_string(), Json::from(1i64))]);
        let b = Json::object([("x".to_string(), Json::from(1i64))]);
        assert_eq!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn fingerprint_differs_for_different_values() {
        let a = Json::from(1i64);
        let b = Json::from(2i64);
        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn display_and_parse_round_trip() {
        let fp = Fingerprint::of(&Json::from("hello"));
        let text = fp.to_string();
        assert_eq!(text.len(), 64);
        let parsed: Fingerprint = text.parse().unwrap();
        assert_eq!(fp, parsed);
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!("not-hex".parse::<Fingerprint>().is_err());
        assert!("ab".parse::<Fingerprint>().is_err());
    }
}
