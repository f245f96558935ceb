//! Error taxonomy for glyphdb
//!
//! `Error` is the unified error type returned by every public glyphdb
//! API. It follows spec.md §7's six-kind taxonomy rather than one
//! variant per failure site, so callers can dispatch on `is_*()`
//! predicates instead of matching backend-specific error types.
//!
//! ```ignore
//! match session.get_ref("cfg", Some("app")).await {
//!     Err(e) if e.is_not_found() => { /* fall back to a default */ }
//!     Err(e) if e.is_occ_conflict() => { /* pull and retry */ }
//!     Err(e) => return Err(e.into()),
//!     Ok(r) => { /* ... */ }
//! }
//! ```

use crate::fingerprint::Fingerprint;
use thiserror::Error;

/// Result type alias for glyphdb operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for glyphdb.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying I/O, network, or backend-driver failure. The
    /// operation that raised it has no partial effect at the blob
    /// level: puts are idempotent by fingerprint, updates are atomic
    /// at the RefStore (spec.md §7.1).
    #[error("backend failure: {0}")]
    BackendFailure(String),

    /// Observed data violates an invariant: fingerprint mismatch on
    /// round-trip, a manifest fragment is missing, or a tagged position
    /// carries an unrecognised sentinel (spec.md §7.2).
    #[error("corruption at {fingerprint}: {detail}")]
    Corruption {
        /// The fingerprint of the offending blob, if known.
        fingerprint: String,
        /// What invariant was violated.
        detail: String,
    },

    /// A `RefStore::update` observed a fingerprint other than the
    /// caller's `expected` value. Not an error at the RefStore layer
    /// (which just returns `false`); surfaced as an error by
    /// `Ref::set`/`Ref::update` so the caller can `pull()` and retry
    /// (spec.md §7.3).
    #[error("optimistic concurrency conflict on ({name:?}, {namespace:?}): expected {expected}, found {found}")]
    OccConflict {
        /// The reference cell's name.
        name: String,
        /// The reference cell's namespace, if any.
        namespace: Option<String>,
        /// The fingerprint the caller expected to be current.
        expected: String,
        /// The fingerprint actually found.
        found: String,
    },

    /// `Ref::bind` targeted a (name, namespace) with no current cell.
    /// `RefStore::get` returning absent is not itself an error — this
    /// variant is only raised by the higher-level `Ref`/`Session` APIs
    /// that need a value to exist (spec.md §7.4).
    #[error("no reference cell for ({0:?}, {1:?})")]
    NotFound(String, Option<String>),

    /// `Codec::encode` was given a value with no decodable
    /// representation: not a primitive, not a plain mapping/sequence,
    /// and not one of the recognised rich types (spec.md §7.5).
    #[error("cannot encode value at {path}: {detail}")]
    CodecRejection {
        /// A breadcrumb path to the offending value.
        path: String,
        /// What about the value was unsupported.
        detail: String,
    },

    /// A name/namespace contains the reserved separator, or some other
    /// precondition on input shape was violated (spec.md §7.6).
    #[error("precondition violated: {0}")]
    Precondition(String),
}

impl Error {
    /// Constructs a [`Error::Corruption`] for a known fingerprint.
    pub fn corruption(fingerprint: Fingerprint, detail: impl Into<String>) -> Self {
        Error::Corruption {
            fingerprint: fingerprint.to_string(),
            detail: detail.into(),
        }
    }

    /// Constructs a [`Error::Corruption`] when no single fingerprint is
    /// to blame (e.g. an unrecognised root-descriptor tag).
    pub fn corruption_untagged(detail: impl Into<String>) -> Self {
        Error::Corruption {
            fingerprint: "<unknown>".to_string(),
            detail: detail.into(),
        }
    }

    /// True if this is a [`Error::BackendFailure`].
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Error::BackendFailure(_))
    }

    /// True if this is a [`Error::Corruption`].
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption { .. })
    }

    /// True if this is an [`Error::OccConflict`] — the caller should
    /// `pull()` and may retry.
    pub fn is_occ_conflict(&self) -> bool {
        matches!(self, Error::OccConflict { .. })
    }

    /// True if this is a [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(..))
    }

    /// True if this is a [`Error::CodecRejection`].
    pub fn is_codec_rejection(&self) -> bool {
        matches!(self, Error::CodecRejection { .. })
    }

    /// True if retrying the same operation unchanged might succeed:
    /// currently only OCC conflicts, since backend failures and
    /// corruption require caller intervention and preconditions
    /// require a different input.
    pub fn is_retryable(&self) -> bool {
        self.is_occ_conflict()
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::BackendFailure(e.to_string())
    }
}

impl From<crate::contract::NameError> for Error {
    fn from(e: crate::contract::NameError) -> Self {
        Error::Precondition(e.to_string())
    }
}

impl From<crate::contract::NamespaceError> for Error {
    fn from(e: crate::contract::NamespaceError) -> Self {
        Error::Precondition(e.to_string())
    }
}
