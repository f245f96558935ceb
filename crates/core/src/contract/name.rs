//! Reference cell name
//!
//! A `Name` is the non-empty, separator-free half of a reference cell's
//! `(name, namespace)` identity (spec.md §3).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::SEPARATOR;

/// Validated, non-empty reference-cell name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

/// Error raised when a candidate name fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    /// The name was empty.
    #[error("reference name cannot be empty")]
    Empty,
    /// The name contained the reserved separator substring.
    #[error("reference name {0:?} contains the reserved separator")]
    ContainsSeparator(String),
}

impl Name {
    /// Validates and wraps a candidate name.
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        if name.contains(SEPARATOR) {
            return Err(NameError::ContainsSeparator(name));
        }
        Ok(Name(name))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Name {
    type Error = NameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Name::new(s)
    }
}

impl From<Name> for String {
    fn from(n: Name) -> Self {
        n.0
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_name() {
        assert_eq!(Name::new(""), Err(NameError::Empty));
    }

    #[test]
    fn rejects_separator() {
        let bad = format!("a{}b", SEPARATOR);
        assert!(matches!(Name::new(bad), Err(NameError::ContainsSeparator(_))));
    }

    #[test]
    fn accepts_ordinary_name() {
        let name = Name::new("cfg").unwrap();
        assert_eq!(name.as_str(), "cfg");
        assert_eq!(name.to_string(), "cfg");
    }
}
