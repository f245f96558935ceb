//! The closed JSON value set and its canonical byte encoding
//!
//! [`Json`] models exactly the variant set spec.md §3 allows: null,
//! boolean, number, string, ordered sequence, and mapping from string to
//! `Json`. Object keys are held in a `BTreeMap`, so iteration is always
//! lexicographic — the canonical encoding never has to sort at
//! serialization time, it is simply incapable of representing an
//! unsorted object.

use serde::de::{self, Deserializer, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A JSON number, represented the way serde_json itself would choose to
/// print it, so that the canonical encoding is stable across backends
/// without needing a bespoke float formatter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// A non-negative integer that fits in a `u64`.
    UInt(u64),
    /// A negative integer that fits in an `i64`.
    Int(i64),
    /// A floating point value.
    Float(f64),
}

impl Number {
    /// Returns the value as an `i64` if it is exactly representable.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Number::Int(i) => Some(i),
            Number::UInt(u) => i64::try_from(u).ok(),
            Number::Float(_) => None,
        }
    }

    /// Returns the value as an `f64`, lossily for very large integers.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(i) => i as f64,
            Number::UInt(u) => u as f64,
            Number::Float(f) => f,
        }
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        if v >= 0 {
            Number::UInt(v as u64)
        } else {
            Number::Int(v)
        }
    }
}

impl From<u64> for Number {
    fn from(v: u64) -> Self {
        Number::UInt(v)
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::Float(v)
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Number::UInt(u) => serializer.serialize_u64(u),
            Number::Int(i) => serializer.serialize_i64(i),
            Number::Float(f) => serializer.serialize_f64(f),
        }
    }
}

impl From<serde_json::Number> for Number {
    fn from(n: serde_json::Number) -> Self {
        if let Some(u) = n.as_u64() {
            Number::UInt(u)
        } else if let Some(i) = n.as_i64() {
            Number::Int(i)
        } else {
            Number::Float(n.as_f64().unwrap_or(0.0))
        }
    }
}

impl From<Number> for serde_json::Number {
    fn from(n: Number) -> Self {
        match n {
            Number::UInt(u) => serde_json::Number::from(u),
            Number::Int(i) => serde_json::Number::from(i),
            Number::Float(f) => {
                serde_json::Number::from_f64(f).unwrap_or_else(|| serde_json::Number::from(0))
            }
        }
    }
}

/// The closed JSON value set.
///
/// Equivalent in shape to `serde_json::Value`, but object keys are a
/// `BTreeMap` rather than an insertion-order map, so that the canonical
/// encoding's "sorted lexicographically" invariant is structural rather
/// than a convention callers must remember to uphold.
#[derive(Debug, Clone, PartialEq)]
pub enum Json {
    /// The JSON `null` literal.
    Null,
    /// A JSON boolean.
    Bool(bool),
    /// A JSON number.
    Number(Number),
    /// A JSON string.
    String(String),
    /// An ordered JSON array.
    Array(Vec<Json>),
    /// A JSON object, keys held in sorted order.
    Object(BTreeMap<String, Json>),
}

impl Json {
    /// Shorthand for building an object from owned `(key, value)` pairs.
    pub fn object<I: IntoIterator<Item = (String, Json)>>(entries: I) -> Json {
        Json::Object(entries.into_iter().collect())
    }

    /// Shorthand for building an array.
    pub fn array<I: IntoIterator<Item = Json>>(entries: I) -> Json {
        Json::Array(entries.into_iter().collect())
    }

    /// Returns the string slice if this is a `Json::String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Json::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the array slice if this is a `Json::Array`.
    pub fn as_array(&self) -> Option<&[Json]> {
        match self {
            Json::Array(a) => Some(a.as_slice()),
            _ => None,
        }
    }

    /// Returns the object map if this is a `Json::Object`.
    pub fn as_object(&self) -> Option<&BTreeMap<String, Json>> {
        match self {
            Json::Object(m) => Some(m),
            _ => None,
        }
    }

    /// Canonical serialization: UTF-8, sorted object keys, no
    /// insignificant whitespace. This is the byte string a
    /// [`crate::Fingerprint`] is computed over (invariant 1 of spec.md §3).
    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("Json serialization is infallible")
    }

    /// Canonical serialization as a UTF-8 string.
    pub fn canonical_string(&self) -> String {
        String::from_utf8(self.canonical_bytes()).expect("canonical JSON is valid UTF-8")
    }
}

impl Serialize for Json {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Json::Null => serializer.serialize_unit(),
            Json::Bool(b) => serializer.serialize_bool(*b),
            Json::Number(n) => n.serialize(serializer),
            Json::String(s) => serializer.serialize_str(s),
            Json::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Json::Object(map) => {
                let mut m = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    m.serialize_entry(k, v)?;
                }
                m.end()
            }
        }
    }
}

struct JsonVisitor;

impl<'de> Visitor<'de> for JsonVisitor {
    type Value = Json;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Json, E> {
        Ok(Json::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Json, E> {
        Ok(Json::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Json, E> {
        Ok(Json::Number(Number::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Json, E> {
        Ok(Json::Number(Number::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Json, E> {
        Ok(Json::Number(Number::from(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Json, E> {
        Ok(Json::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Json, E> {
        Ok(Json::String(v))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Json, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Json::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Json, A::Error>
    where
        A: de::MapAccess<'de>,
    {
        let mut entries = BTreeMap::new();
        while let Some((k, v)) = map.next_entry()? {
            entries.insert(k, v);
        }
        Ok(Json::Object(entries))
    }
}

impl<'de> Deserialize<'de> for Json {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Json, D::Error> {
        deserializer.deserialize_any(JsonVisitor)
    }
}

impl From<serde_json::Value> for Json {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Json::Null,
            serde_json::Value::Bool(b) => Json::Bool(b),
            serde_json::Value::Number(n) => Json::Number(Number::from(n)),
            serde_json::Value::String(s) => Json::String(s),
            serde_json::Value::Array(a) => Json::Array(a.into_iter().map(Json::from).collect()),
            serde_json::Value::Object(o) => {
                Json::Object(o.into_iter().map(|(k, v)| (k, Json::from(v))).collect())
            }
        }
    }
}

impl From<Json> for serde_json::Value {
    fn from(v: Json) -> Self {
        match v {
            Json::Null => serde_json::Value::Null,
            Json::Bool(b) => serde_json::Value::Bool(b),
            Json::Number(n) => serde_json::Value::Number(n.into()),
            Json::String(s) => serde_json::Value::String(s),
            Json::Array(a) => serde_json::Value::Array(a.into_iter().map(Into::into).collect()),
            Json::Object(o) => {
                serde_json::Value::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for Json {
    fn from(s: &str) -> Self {
        Json::String(s.to_owned())
    }
}

impl From<String> for Json {
    fn from(s: String) -> Self {
        Json::String(s)
    }
}

impl From<bool> for Json {
    fn from(b: bool) -> Self {
        Json::Bool(b)
    }
}

impl From<i64> for Json {
    fn from(n: i64) -> Self {
        Json::Number(Number::from(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_keys_serialize_sorted() {
        let json = Json::object([
            ("b".to_string(), Json::from(2i64)),
            ("a".to_string(), Json::from(1i64)),
        ]);
        assert_eq!(json.canonical_string(), r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn canonical_bytes_has_no_insignificant_whitespace() {
        let json = Json::array([Json::from(1i64), Json::from("x")]);
        assert_eq!(json.canonical_string(), r#"[1,"x"]"#);
    }

    #[test]
    fn canonical_bytes_are_stable_across_calls() {
        let json = Json::object([("k".to_string(), Json::from(true))]);
        assert_eq!(json.canonical_bytes(), json.canonical_bytes());
    }

    #[test]
    fn round_trips_through_serde_json_value() {
        let value = serde_json::json!({"a": [1, 2.5, "s", null, true]});
        let json: Json = value.clone().into();
        let back: serde_json::Value = json.into();
        assert_eq!(value, back);
    }

    #[test]
    fn negative_and_float_numbers_round_trip() {
        let json = Json::array([
            Json::Number(Number::from(-7i64)),
            Json::Number(Number::from(3.5f64)),
        ]);
        let bytes = json.canonical_bytes();
        let reparsed: Json =
            serde_json::from_slice::<serde_json::Value>(&bytes).unwrap().into();
        assert_eq!(reparsed, json);
    }
}
