//! Foundational types for glyphdb
//!
//! This crate defines the types every other glyphdb crate builds on:
//! - [`Json`]: the closed JSON value set, with a canonical byte encoding.
//! - [`Fingerprint`]: the SHA-256 content address derived from that encoding.
//! - [`error::Error`]: the unified error taxonomy surfaced by every public API.
//! - [`contract`]: validated newtypes (`Name`, `Namespace`) for reference cells.
//! - [`sentinel`]: the fixed string prefixes used to tag rich values and
//!   cross-fragment references inside normalized JSON.

#![warn(missing_docs)]

pub mod contract;
pub mod error;
pub mod fingerprint;
pub mod json;
pub mod sentinel;

pub use error::{Error, Result};
pub use fingerprint::Fingerprint;
pub use json::{Json, Number};
