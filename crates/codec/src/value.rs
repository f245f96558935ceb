//! The rich value domain the codec encodes and decodes
//!
//! This is the tagged union from spec.md §9's design note, made
//! concrete: every variant here corresponds either to a JSON primitive
//! or to one row of the sentinel table in spec.md §3. Because the enum
//! is closed and owned (no shared/aliased subtrees), the cycle
//! handling spec.md §4.3 describes for a dynamically typed source is
//! structurally impossible to need here — see DESIGN.md.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A rich in-memory value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A 64-bit signed integer.
    I64(i64),
    /// A 64-bit float.
    F64(f64),
    /// A UTF-8 string.
    String(String),
    /// A binary scalar (spec.md §1's "binary scalar"; see
    /// [`glyph_core::sentinel::BYTES`]).
    Bytes(Vec<u8>),

    /// A plain ordered sequence. Passes through to a native JSON array
    /// with no sentinel tag.
    Seq(Vec<Value>),
    /// A plain string-keyed mapping. Passes through to a native JSON
    /// object with no sentinel tag. Key order is not preserved across
    /// a round trip through canonical JSON — use [`Value::OrderedMap`]
    /// when order matters (see DESIGN.md's Open Question resolution).
    Map(BTreeMap<String, Value>),

    /// A mapping with arbitrary (non-string) keys. `map-builtin`.
    MapBuiltin(Vec<(Value, Value)>),
    /// An unordered structural mapping. `map-immutable`.
    ImmutableMap(Vec<(Value, Value)>),
    /// A mapping with preserved insertion order. `map-ordered`.
    OrderedMap(Vec<(Value, Value)>),

    /// An immutable sequence, tagged (as distinct from the untagged
    /// passthrough [`Value::Seq`]). `list`.
    List(Vec<Value>),
    /// An unordered set with arbitrary members. `set-builtin`.
    Set(Vec<Value>),
    /// An unordered immutable set. `set-immutable`.
    ImmutableSet(Vec<Value>),
    /// An ordered set, iteration order preserved. `set-ordered`.
    OrderedSet(Vec<Value>),
    /// A stack, top element first. `stack`.
    Stack(Vec<Value>),

    /// An instant in time.
    Date(DateTime<Utc>),
    /// A regular expression, source pattern and flags.
    Regex {
        /// The pattern source.
        source: String,
        /// Regex flags (e.g. `"i"`, `"gm"`), opaque to glyphdb.
        flags: String,
    },
}

impl Value {
    /// Shorthand for a plain string-keyed map from owned entries.
    pub fn map<I: IntoIterator<Item = (String, Value)>>(entries: I) -> Value {
        Value::Map(entries.into_iter().collect())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
