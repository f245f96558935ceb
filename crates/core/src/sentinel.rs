//! Fixed sentinel strings used to tag rich values and cross-fragment
//! references (spec.md §3).
//!
//! These are plain string constants, not an enum, because they are
//! compared against the first element of untyped JSON sequences coming
//! out of arbitrary backends — the codec and normalizer both need the
//! raw string, not a typed wrapper around it.

/// Prefix for a normalized-JSON primitive string that stands in for a
/// nested fragment: `<VAL_REF><fingerprint>`.
pub const VAL_REF: &str = "@glyph/ref:";

/// Tag for the root descriptor's two-element sequence.
pub const NORM_SENTINEL: &str = "@glyph/norm";

/// Tag for an encoded `Date` scalar.
pub const DATE: &str = "@glyph/date";
/// Tag for an encoded `Regex` scalar.
pub const REGEXP: &str = "@glyph/regexp";
/// Tag for an encoded arbitrary-key mapping (`Value::Map`).
pub const MAP_BUILTIN: &str = "@glyph/map-builtin";
/// Tag for an encoded unordered set (`Value::Set`).
pub const SET_BUILTIN: &str = "@glyph/set-builtin";
/// Tag for an encoded unordered structural mapping (`Value::ImmutableMap`).
pub const MAP_IMMUTABLE: &str = "@glyph/map-immutable";
/// Tag for an encoded order-preserving mapping (`Value::OrderedMap`).
pub const MAP_ORDERED: &str = "@glyph/map-ordered";
/// Tag for an encoded immutable sequence (`Value::Seq` / list).
pub const LIST: &str = "@glyph/list";
/// Tag for an encoded unordered immutable set (`Value::Set`, list-backed).
pub const SET_IMMUTABLE: &str = "@glyph/set-immutable";
/// Tag for an encoded order-preserving set (`Value::OrderedSet`).
pub const SET_ORDERED: &str = "@glyph/set-ordered";
/// Tag for an encoded stack (`Value::Stack`), top element first.
pub const STACK: &str = "@glyph/stack";
/// Tag for an encoded binary scalar (`Value::Bytes`), base64 payload.
///
/// spec.md §1 lists "binary scalar" among the supported rich value
/// kinds but its §3 sentinel table omits one; this fills that gap in
/// the same style as the other scalar sentinels (see DESIGN.md).
pub const BYTES: &str = "@glyph/bytes";

/// All sentinel tags that introduce a rich-type payload, for exhaustive
/// "is this a recognised sentinel" checks in the codec.
pub const TYPE_SENTINELS: &[&str] = &[
    DATE,
    REGEXP,
    MAP_BUILTIN,
    SET_BUILTIN,
    MAP_IMMUTABLE,
    MAP_ORDERED,
    LIST,
    SET_IMMUTABLE,
    SET_ORDERED,
    STACK,
    BYTES,
];
