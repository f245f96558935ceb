//! Codec: rich in-memory values ↔ plain JSON
//!
//! This crate implements spec.md §4.3. [`Value`] is the tagged union
//! design note from spec.md §9 made concrete: primitives plus
//! date/regex/binary scalars, arbitrary/immutable/ordered mappings,
//! builtin/immutable/ordered sets, sequences, and stacks. [`encode`]
//! turns a `Value` into a [`glyph_core::Json`]; [`decode`] reverses it.

mod value;

pub use value::Value;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use glyph_core::error::{Error, Result};
use glyph_core::json::{Json, Number};
use glyph_core::sentinel;
use std::collections::BTreeMap;

/// Encodes a rich [`Value`] into plain [`Json`].
///
/// Rich types become two-element `[sentinel, payload]` sequences per
/// the table in spec.md §3. Plain mappings and sequences pass through
/// with their children encoded recursively.
///
/// This is infallible: [`Value`] is a closed type whose every variant
/// has a decodable JSON representation, so the "opaque foreign value"
/// failure spec.md §4.3 describes for a dynamically typed source
/// cannot arise here (see DESIGN.md's note on cycle handling, which
/// applies for the same reason — a plain owned Rust enum cannot form a
/// reference cycle).
pub fn encode(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::I64(i) => Json::Number(Number::from(*i)),
        Value::F64(f) => Json::Number(Number::from(*f)),
        Value::String(s) => Json::String(s.clone()),
        Value::Bytes(bytes) => tagged(sentinel::BYTES, Json::String(BASE64.encode(bytes))),
        Value::Seq(items) => Json::Array(items.iter().map(encode).collect()),
        Value::Map(map) => {
            Json::Object(map.iter().map(|(k, v)| (k.clone(), encode(v))).collect())
        }
        Value::MapBuiltin(pairs) => tagged(sentinel::MAP_BUILTIN, encode_pairs(pairs)),
        Value::ImmutableMap(pairs) => tagged(sentinel::MAP_IMMUTABLE, encode_pairs(pairs)),
        Value::OrderedMap(pairs) => tagged(sentinel::MAP_ORDERED, encode_pairs(pairs)),
        Value::List(items) => tagged(sentinel::LIST, encode_seq(items)),
        Value::Set(items) => tagged(sentinel::SET_BUILTIN, encode_seq(items)),
        Value::ImmutableSet(items) => tagged(sentinel::SET_IMMUTABLE, encode_seq(items)),
        Value::OrderedSet(items) => tagged(sentinel::SET_ORDERED, encode_seq(items)),
        Value::Stack(items) => tagged(sentinel::STACK, encode_seq(items)),
        Value::Date(ts) => tagged(sentinel::DATE, Json::String(ts.to_rfc3339())),
        Value::Regex { source, flags } => tagged(
            sentinel::REGEXP,
            Json::object([
                ("source".to_string(), Json::String(source.clone())),
                ("flags".to_string(), Json::String(flags.clone())),
            ]),
        ),
    }
}

fn tagged(sentinel: &str, payload: Json) -> Json {
    Json::Array(vec![Json::String(sentinel.to_string()), payload])
}

fn encode_seq(items: &[Value]) -> Json {
    Json::Array(items.iter().map(encode).collect())
}

fn encode_pairs(pairs: &[(Value, Value)]) -> Json {
    Json::Array(
        pairs
            .iter()
            .map(|(k, v)| Json::Array(vec![encode(k), encode(v)]))
            .collect(),
    )
}

fn decode_base64(s: &str) -> Result<Vec<u8>> {
    BASE64.decode(s).map_err(|e| Error::CodecRejection {
        path: "bytes".to_string(),
        detail: format!("invalid base64: {e}"),
    })
}

/// Decodes plain [`Json`] back into a rich [`Value`].
///
/// A sequence whose first element is a recognised sentinel string is
/// reconstructed as the corresponding rich type from its payload;
/// other sequences decode as [`Value::Seq`], and non-tagged mappings
/// decode as [`Value::Map`]. Fails with [`Error::CodecRejection`] if a
/// sentinel is recognised but its payload is malformed (spec.md §4.3).
pub fn decode(json: &Json) -> Result<Value> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => Ok(match n {
            Number::Int(i) => Value::I64(*i),
            Number::UInt(u) => match i64::try_from(*u) {
                Ok(i) => Value::I64(i),
                Err(_) => Value::F64(*u as f64),
            },
            Number::Float(f) => Value::F64(*f),
        }),
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Object(map) => {
            let mut decoded = BTreeMap::new();
            for (k, v) in map {
                decoded.insert(k.clone(), decode(v)?);
            }
            Ok(Value::Map(decoded))
        }
        Json::Array(items) => decode_array(items),
    }
}

fn decode_array(items: &[Json]) -> Result<Value> {
    if let Some(Json::String(tag)) = items.first() {
        if sentinel::TYPE_SENTINELS.contains(&tag.as_str()) {
            let payload = items.get(1).ok_or_else(|| Error::CodecRejection {
                path: tag.clone(),
                detail: "tagged pair missing payload element".to_string(),
            })?;
            return decode_tagged(tag, payload);
        }
    }
    Ok(Value::Seq(
        items.iter().map(decode).collect::<Result<_>>()?,
    ))
}

fn decode_tagged(tag: &str, payload: &Json) -> Result<Value> {
    match tag {
        t if t == sentinel::BYTES => {
            let s = payload.as_str().ok_or_else(|| malformed(t, "expected a string"))?;
            Ok(Value::Bytes(decode_base64(s)?))
        }
        t if t == sentinel::DATE => {
            let s = payload.as_str().ok_or_else(|| malformed(t, "expected a string"))?;
            let ts = chrono::DateTime::parse_from_rfc3339(s)
                .map_err(|e| malformed(t, &e.to_string()))?;
            Ok(Value::Date(ts.with_timezone(&chrono::Utc)))
        }
        t if t == sentinel::REGEXP => {
            let obj = payload
                .as_object()
                .ok_or_else(|| malformed(t, "expected an object payload"))?;
            let source = obj
                .get("source")
                .and_then(Json::as_str)
                .ok_or_else(|| malformed(t, "missing `source`"))?
                .to_string();
            let flags = obj
                .get("flags")
                .and_then(Json::as_str)
                .ok_or_else(|| malformed(t, "missing `flags`"))?
                .to_string();
            regex::Regex::new(&source).map_err(|e| malformed(t, &e.to_string()))?;
            Ok(Value::Regex { source, flags })
        }
        t if t == sentinel::MAP_BUILTIN => Ok(Value::MapBuiltin(decode_pairs(t, payload)?)),
        t if t == sentinel::MAP_IMMUTABLE => Ok(Value::ImmutableMap(decode_pairs(t, payload)?)),
        t if t == sentinel::MAP_ORDERED => Ok(Value::OrderedMap(decode_pairs(t, payload)?)),
        t if t == sentinel::LIST => Ok(Value::List(decode_seq(t, payload)?)),
        t if t == sentinel::SET_BUILTIN => Ok(Value::Set(decode_seq(t, payload)?)),
        t if t == sentinel::SET_IMMUTABLE => Ok(Value::ImmutableSet(decode_seq(t, payload)?)),
        t if t == sentinel::SET_ORDERED => Ok(Value::OrderedSet(decode_seq(t, payload)?)),
        t if t == sentinel::STACK => Ok(Value::Stack(decode_seq(t, payload)?)),
        other => Err(malformed(other, "unrecognised sentinel")),
    }
}

fn malformed(tag: &str, detail: &str) -> Error {
    Error::CodecRejection {
        path: tag.to_string(),
        detail: detail.to_string(),
    }
}

fn decode_seq(tag: &str, payload: &Json) -> Result<Vec<Value>> {
    let items = payload
        .as_array()
        .ok_or_else(|| malformed(tag, "expected an array payload"))?;
    items.iter().map(decode).collect()
}

fn decode_pairs(tag: &str, payload: &Json) -> Result<Vec<(Value, Value)>> {
    let items = payload
        .as_array()
        .ok_or_else(|| malformed(tag, "expected an array of pairs"))?;
    items
        .iter()
        .map(|pair| {
            let pair = pair
                .as_array()
                .ok_or_else(|| malformed(tag, "expected a [key, value] pair"))?;
            if pair.len() != 2 {
                return Err(malformed(tag, "pair must have exactly two elements"));
            }
            Ok((decode(&pair[0])?, decode(&pair[1])?))
        })
        .collect()
}
