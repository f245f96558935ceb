//! Normalizer: shred JSON into a content-addressed DAG of flat
//! fragments, and reassemble it
//!
//! Implements spec.md §4.4. [`normalize`] performs a depth-first
//! post-order walk of a [`Json`] value, emitting one flat fragment per
//! node (primitive or aggregate) with every aggregate child replaced by
//! a `<VAL_REF><fingerprint>` string. [`denormalize`] reverses this.
//! [`encode_manifest`]/[`decode_manifest`] build and consume the root
//! descriptor spec.md §3 defines.

use async_trait::async_trait;
use glyph_core::error::{Error, Result};
use glyph_core::fingerprint::Fingerprint;
use glyph_core::json::Json;
use glyph_core::sentinel::{NORM_SENTINEL, VAL_REF};
use std::collections::{HashMap, HashSet};

/// A root descriptor: the tagged blob that points at the outermost
/// fragment of one value's DAG and lists every fragment in dependency
/// order (spec.md §3).
#[derive(Debug, Clone, PartialEq)]
pub struct RootDescriptor {
    /// Fingerprint of the outermost normalized fragment.
    pub object_sha256: Fingerprint,
    /// Every fragment's fingerprint, leaves first, root last.
    pub manifest: Vec<Fingerprint>,
}

/// Depth-first post-order shred of `json` into flat fragments.
///
/// Returns fragments in topological order: every fingerprint a
/// fragment references appears at an earlier index (invariant 2 of
/// spec.md §3). Structural sharing collapses to a single fragment —
/// two equal subtrees fingerprint identically and are only emitted
/// once (end-to-end scenario 3 in spec.md §8).
pub fn normalize(json: &Json) -> Vec<(Fingerprint, Json)> {
    let mut fragments = Vec::new();
    let mut seen = HashSet::new();
    normalize_node(json, &mut fragments, &mut seen);
    fragments
}

fn normalize_node(
    json: &Json,
    fragments: &mut Vec<(Fingerprint, Json)>,
    seen: &mut HashSet<Fingerprint>,
) -> Fingerprint {
    let fragment = match json {
        Json::Array(items) => Json::Array(
            items
                .iter()
                .map(|child| val_ref(normalize_node(child, fragments, seen)))
                .collect(),
        ),
        Json::Object(map) => Json::Object(
            map.iter()
                .map(|(k, child)| (k.clone(), val_ref(normalize_node(child, fragments, seen))))
                .collect(),
        ),
        primitive => primitive.clone(),
    };

    let fp = Fingerprint::of(&fragment);
    if seen.insert(fp) {
        fragments.push((fp, fragment));
    }
    fp
}

fn val_ref(fp: Fingerprint) -> Json {
    Json::String(format!("{VAL_REF}{fp}"))
}

/// Reassembles the value whose last fragment (by manifest order) is
/// the root, following `<VAL_REF>` strings back into `fragments`.
///
/// Fails with [`Error::Corruption`] if a reference points outside the
/// supplied fragment set.
pub fn denormalize(fragments: &[(Fingerprint, Json)]) -> Result<Json> {
    let (root_fp, _) = fragments
        .last()
        .ok_or_else(|| Error::Precondition("cannot denormalize an empty fragment list".into()))?;
    let by_fingerprint: HashMap<Fingerprint, &Json> =
        fragments.iter().map(|(fp, frag)| (*fp, frag)).collect();
    denormalize_node(*root_fp, &by_fingerprint)
}

fn denormalize_node(fp: Fingerprint, by_fingerprint: &HashMap<Fingerprint, &Json>) -> Result<Json> {
    let fragment = by_fingerprint
        .get(&fp)
        .ok_or_else(|| Error::corruption(fp, "fragment missing from manifest"))?;
    denormalize_value(fragment, by_fingerprint)
}

fn denormalize_value(value: &Json, by_fingerprint: &HashMap<Fingerprint, &Json>) -> Result<Json> {
    match value {
        Json::String(s) => match s.strip_prefix(VAL_REF) {
            Some(rest) => {
                let fp: Fingerprint = rest
                    .parse()
                    .map_err(|_| Error::corruption_untagged(format!("malformed value reference {s:?}")))?;
                denormalize_node(fp, by_fingerprint)
            }
            None => Ok(Json::String(s.clone())),
        },
        Json::Array(items) => Ok(Json::Array(
            items
                .iter()
                .map(|item| denormalize_value(item, by_fingerprint))
                .collect::<Result<_>>()?,
        )),
        Json::Object(map) => Ok(Json::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), denormalize_value(v, by_fingerprint)?)))
                .collect::<Result<_>>()?,
        )),
        other => Ok(other.clone()),
    }
}

/// True if `json` is a valid [`NormalizedJson`](spec.md §3) fragment:
/// a primitive, or a sequence/mapping whose immediate children are all
/// primitives (a child may itself be a `<VAL_REF>` string, which is
/// still a primitive at this level — the nesting it stands for is
/// resolved only by [`denormalize`]).
pub fn is_normalized(json: &Json) -> bool {
    fn is_primitive(j: &Json) -> bool {
        !matches!(j, Json::Array(_) | Json::Object(_))
    }
    match json {
        Json::Array(items) => items.iter().all(is_primitive),
        Json::Object(map) => map.values().all(is_primitive),
        _ => true,
    }
}

/// Builds the root descriptor for a manifest of fragment fingerprints
/// (spec.md §3, §4.4). The manifest must be non-empty; its last entry
/// is the root fragment's own fingerprint.
pub fn encode_manifest(fragment_fingerprints: &[Fingerprint]) -> Json {
    let root = *fragment_fingerprints
        .last()
        .expect("a manifest always has at least one fragment (the root itself)");
    Json::Array(vec![
        Json::String(NORM_SENTINEL.to_string()),
        Json::object([
            ("objectSha256".to_string(), Json::String(root.to_string())),
            (
                "manifest".to_string(),
                Json::Array(
                    fragment_fingerprints
                        .iter()
                        .map(|fp| Json::String(fp.to_string()))
                        .collect(),
                ),
            ),
        ]),
    ])
}

/// Parses a root descriptor into its manifest of fragment fingerprints,
/// without fetching anything. Validates the descriptor's tag and shape.
pub fn parse_root_descriptor(descriptor: &Json) -> Result<RootDescriptor> {
    let items = descriptor
        .as_array()
        .filter(|a| a.len() == 2)
        .ok_or_else(|| Error::corruption_untagged("root descriptor must be a two-element array"))?;

    match &items[0] {
        Json::String(tag) if tag == NORM_SENTINEL => {}
        _ => {
            return Err(Error::corruption_untagged(
                "root descriptor missing the norm sentinel tag",
            ))
        }
    }

    let obj = items[1]
        .as_object()
        .ok_or_else(|| Error::corruption_untagged("root descriptor payload must be an object"))?;

    let object_sha256 = obj
        .get("objectSha256")
        .and_then(Json::as_str)
        .ok_or_else(|| Error::corruption_untagged("root descriptor missing objectSha256"))?
        .parse()
        .map_err(|_| Error::corruption_untagged("objectSha256 is not a valid fingerprint"))?;

    let manifest = obj
        .get("manifest")
        .and_then(Json::as_array)
        .ok_or_else(|| Error::corruption_untagged("root descriptor missing manifest"))?
        .iter()
        .map(|j| {
            j.as_str()
                .ok_or_else(|| Error::corruption_untagged("manifest entry is not a string"))?
                .parse()
                .map_err(|_| Error::corruption_untagged("manifest entry is not a valid fingerprint"))
        })
        .collect::<Result<Vec<_>>>()?;

    if manifest.is_empty() {
        return Err(Error::Precondition("manifest must be non-empty".into()));
    }

    Ok(RootDescriptor {
        object_sha256,
        manifest,
    })
}

/// Minimal capability [`decode_manifest`] needs from a blob store: a
/// batched fetch by fingerprint. Defined here (rather than depending on
/// `glyph-storage`) so the normalizer has no dependency on the storage
/// layer; `glyph-storage`'s `BlobStore` implementations satisfy this
/// trait directly.
#[async_trait]
pub trait FragmentSource: Send + Sync {
    /// Fetches each fingerprint's blob, `None` where absent.
    async fn fetch_many(&self, fingerprints: &[Fingerprint]) -> Result<Vec<Option<Json>>>;
}

/// Validates `root_descriptor`, fetches every fragment in its manifest
/// via `source`, and returns them in manifest order — ready to hand to
/// [`denormalize`]. Fails loudly if any fragment is absent or is not
/// itself a valid [`NormalizedJson`] fragment (spec.md §4.4).
pub async fn decode_manifest<S: FragmentSource + ?Sized>(
    root_descriptor: &Json,
    source: &S,
) -> Result<Vec<(Fingerprint, Json)>> {
    let descriptor = parse_root_descriptor(root_descriptor)?;
    let fetched = source.fetch_many(&descriptor.manifest).await?;

    let mut fragments = Vec::with_capacity(descriptor.manifest.len());
    for (fp, maybe_json) in descriptor.manifest.iter().zip(fetched) {
        let json = maybe_json.ok_or_else(|| Error::corruption(*fp, "fragment missing from blob store"))?;
        if !is_normalized(&json) {
            return Err(Error::corruption(*fp, "fragment is not flat NormalizedJson"));
        }
        fragments.push((*fp, json));
    }
    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn j_arr(items: Vec<Json>) -> Json {
        Json::Array(items)
    }

    #[test]
    fn simple_round_trip_emits_expected_fragment_count() {
        // [[2, 22], [1, 11], ["a", "aa"]]
        let value = j_arr(vec![
            j_arr(vec![Json::from(2i64), Json::from(22i64)]),
            j_arr(vec![Json::from(1i64), Json::from(11i64)]),
            j_arr(vec![Json::from("a"), Json::from("aa")]),
        ]);
        let fragments = normalize(&value);
        assert_eq!(fragments.len(), 10);

        let manifest: Vec<Fingerprint> = fragments.iter().map(|(fp, _)| *fp).collect();
        let descriptor = encode_manifest(&manifest);
        let parsed = parse_root_descriptor(&descriptor).unwrap();
        assert_eq!(parsed.manifest.len(), 10);

        let rebuilt = denormalize(&fragments).unwrap();
        assert_eq!(rebuilt, value);
    }

    #[test]
    fn structural_sharing_emits_one_fragment_for_the_shared_leaf() {
        let value = Json::object([
            ("x".to_string(), Json::from("shared")),
            ("y".to_string(), Json::from("shared")),
        ]);
        let fragments = normalize(&value);
        // "shared" + the outer object = 2 fragments, not 3.
        assert_eq!(fragments.len(), 2);
        let rebuilt = denormalize(&fragments).unwrap();
        assert_eq!(rebuilt, value);
    }

    #[test]
    fn manifest_is_topologically_sorted() {
        let value = j_arr(vec![j_arr(vec![Json::from(1i64)]), Json::from(2i64)]);
        let fragments = normalize(&value);
        let index_of: HashMap<Fingerprint, usize> = fragments
            .iter()
            .enumerate()
            .map(|(i, (fp, _))| (*fp, i))
            .collect();

        for (i, (_, fragment)) in fragments.iter().enumerate() {
            for referenced in referenced_fingerprints(fragment) {
                assert!(index_of[&referenced] < i, "reference must precede referrer");
            }
        }
    }

    fn referenced_fingerprints(fragment: &Json) -> Vec<Fingerprint> {
        let mut out = Vec::new();
        match fragment {
            Json::Array(items) => {
                for item in items {
                    if let Json::String(s) = item {
                        if let Some(rest) = s.strip_prefix(VAL_REF) {
                            out.push(rest.parse().unwrap());
                        }
                    }
                }
            }
            Json::Object(map) => {
                for v in map.values() {
                    if let Json::String(s) = v {
                        if let Some(rest) = s.strip_prefix(VAL_REF) {
                            out.push(rest.parse().unwrap());
                        }
                    }
                }
            }
            _ => {}
        }
        out
    }

    #[test]
    fn single_primitive_yields_exactly_one_fragment() {
        let fragments = normalize(&Json::from(5i64));
        assert_eq!(fragments.len(), 1);
        assert_eq!(denormalize(&fragments).unwrap(), Json::from(5i64));
    }

    #[test]
    fn every_fragment_is_flat() {
        let value = j_arr(vec![j_arr(vec![Json::from(1i64)]), Json::from("x")]);
        for (_, fragment) in normalize(&value) {
            assert!(is_normalized(&fragment));
        }
    }

    #[test]
    fn denormalize_rejects_missing_reference() {
        let dangling = Json::Array(vec![Json::String(format!(
            "{VAL_REF}{}",
            Fingerprint::of(&Json::Null)
        ))]);
        let fp = Fingerprint::of(&dangling);
        let err = denormalize(&[(fp, dangling)]).unwrap_err();
        assert!(err.is_corruption());
    }
}
