//! Reference cell namespace
//!
//! A `Namespace` is the optional, separator-free half of a reference
//! cell's `(name, namespace)` identity (spec.md §3). It may be absent
//! (`None` at the call site); when present it must be non-empty, so
//! that "no namespace" has exactly one representation across every
//! adapter — an empty-string namespace would otherwise alias `None` on
//! backends that fold both to the same storage key (see DESIGN.md).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::SEPARATOR;

/// Validated, optional reference-cell namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

/// Error raised when a candidate namespace fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamespaceError {
    /// The namespace was empty; use `None` to mean "no namespace".
    #[error("namespace cannot be empty; use None for \"no namespace\"")]
    Empty,
    /// The namespace contained the reserved separator substring.
    #[error("namespace {0:?} contains the reserved separator")]
    ContainsSeparator(String),
}

impl Namespace {
    /// Validates and wraps a candidate namespace. An empty string is
    /// rejected — "no namespace" is modeled at the call site as
    /// `Option<Namespace>` being `None`, not by this type accepting a
    /// sentinel empty value as "absent" (see DESIGN.md).
    pub fn new(namespace: impl Into<String>) -> Result<Self, NamespaceError> {
        let namespace = namespace.into();
        if namespace.is_empty() {
            return Err(NamespaceError::Empty);
        }
        if namespace.contains(SEPARATOR) {
            return Err(NamespaceError::ContainsSeparator(namespace));
        }
        Ok(Namespace(namespace))
    }

    /// Returns the namespace as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Namespace {
    type Error = NamespaceError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Namespace::new(s)
    }
}

impl From<Namespace> for String {
    fn from(n: Namespace) -> Self {
        n.0
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
