//! # Unpacker
//!
//! Reconstructs the disclosed claims tree from a redacted payload and the
//! disclosures a holder chose to present, and records where each
//! disclosure landed as a dotted path.
//!
//! A digest with no matching disclosure (withheld claim or decoy) is not an
//! error: the entry is dropped and, for arrays, later items shift down.
//!
//! ## Security Invariant
//!
//! Every digest may appear at most once across the whole payload, an array
//! item disclosure may only be referenced from a `{"...": digest}` wrapper,
//! an object property disclosure only from an `_sd` array, and a disclosed
//! key may not overwrite a claim already present at that level. Any
//! violation is fatal.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::{Map, Value};

use crate::disclosure::Disclosure;
use crate::error::{SdJwtError, SdJwtResult};
use crate::hash_mapping::create_hash_mapping;
use crate::traits::{Hasher, HasherAndAlg, DEFAULT_HASH_ALG};
use crate::{join_path, ARRAY_DIGEST_KEY, SD_ALG, SD_DIGESTS};

/// Output of [`unpack`].
#[derive(Debug, Clone, PartialEq)]
pub struct Unpacked {
    /// The reconstructed claims, with `_sd`, `_sd_alg`, and array digest
    /// wrappers removed.
    pub claims: Value,
    /// Dotted path of each disclosed claim mapped to its digest.
    pub disclosure_keymap: BTreeMap<String, String>,
    /// Digests of supplied disclosures that no payload entry referenced,
    /// sorted.
    pub unreferenced: Vec<String>,
}

/// The `_sd_alg` named in a payload, or `sha-256` when absent.
pub fn sd_alg(claims: &Value) -> SdJwtResult<&str> {
    sd_alg_entry(claims.get(SD_ALG))
}

pub(crate) fn sd_alg_entry(entry: Option<&Value>) -> SdJwtResult<&str> {
    match entry {
        None => Ok(DEFAULT_HASH_ALG),
        Some(Value::String(alg)) => Ok(alg),
        Some(_) => Err(SdJwtError::Malformed(format!(
            "`{SD_ALG}` must be a string"
        ))),
    }
}

/// Reconstruct `claims` using `disclosures`, hashing with the payload's
/// `_sd_alg`.
pub fn unpack(
    claims: &Value,
    disclosures: &[Disclosure],
    hasher: &dyn Hasher,
) -> SdJwtResult<Unpacked> {
    let alg = sd_alg(claims)?;
    let hash = HasherAndAlg::new(hasher, alg);
    let map = create_hash_mapping(disclosures, &hash)?;
    unpack_with_map(claims, map)
}

/// Reconstruct `claims` from a prebuilt digest → disclosure map.
pub fn unpack_with_map(
    claims: &Value,
    map: HashMap<String, &Disclosure>,
) -> SdJwtResult<Unpacked> {
    let mut unpacker = Unpacker {
        map,
        keymap: BTreeMap::new(),
        seen: HashSet::new(),
    };

    let mut claims = unpacker.unpack_value(claims, "")?;
    if let Value::Object(obj) = &mut claims {
        obj.remove(SD_ALG);
    }

    let mut unreferenced: Vec<String> = unpacker
        .map
        .keys()
        .filter(|digest| !unpacker.seen.contains(*digest))
        .cloned()
        .collect();
    unreferenced.sort();

    tracing::debug!(
        disclosed = unpacker.keymap.len(),
        unreferenced = unreferenced.len(),
        "unpacked claims"
    );
    Ok(Unpacked {
        claims,
        disclosure_keymap: unpacker.keymap,
        unreferenced,
    })
}

struct Unpacker<'a> {
    map: HashMap<String, &'a Disclosure>,
    keymap: BTreeMap<String, String>,
    seen: HashSet<String>,
}

impl<'a> Unpacker<'a> {
    fn unpack_value(&mut self, value: &Value, prefix: &str) -> SdJwtResult<Value> {
        match value {
            Value::Object(obj) => self.unpack_object(obj, prefix),
            Value::Array(items) => self.unpack_array(items, prefix),
            scalar => Ok(scalar.clone()),
        }
    }

    fn unpack_object(&mut self, obj: &Map<String, Value>, prefix: &str) -> SdJwtResult<Value> {
        let mut out = Map::new();
        for (key, value) in obj {
            if key == SD_DIGESTS {
                continue;
            }
            let path = join_path(prefix, key);
            out.insert(key.clone(), self.unpack_value(value, &path)?);
        }

        let Some(sd) = obj.get(SD_DIGESTS) else {
            return Ok(Value::Object(out));
        };
        let digests = sd.as_array().ok_or_else(|| {
            SdJwtError::Malformed(format!("`{SD_DIGESTS}` must be an array of digests"))
        })?;
        for entry in digests {
            let digest = entry.as_str().ok_or_else(|| {
                SdJwtError::Malformed(format!("`{SD_DIGESTS}` entries must be strings"))
            })?;
            self.mark_seen(digest)?;
            let Some(disclosure) = self.map.get(digest).copied() else {
                continue;
            };
            let Some(key) = disclosure.key() else {
                return Err(SdJwtError::Verification(format!(
                    "array item disclosure {digest} referenced from `{SD_DIGESTS}`"
                )));
            };
            if key == SD_DIGESTS || key == ARRAY_DIGEST_KEY || out.contains_key(key) {
                return Err(SdJwtError::Verification(format!(
                    "disclosed claim `{key}` collides with an existing claim"
                )));
            }
            let path = join_path(prefix, key);
            let value = self.unpack_value(disclosure.value(), &path)?;
            out.insert(key.to_string(), value);
            self.keymap.insert(path, digest.to_string());
        }
        Ok(Value::Object(out))
    }

    fn unpack_array(&mut self, items: &[Value], prefix: &str) -> SdJwtResult<Value> {
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let path = join_path(prefix, &index.to_string());
            let Some(digest) = array_digest(item)? else {
                out.push(self.unpack_value(item, &path)?);
                continue;
            };
            self.mark_seen(digest)?;
            let Some(disclosure) = self.map.get(digest).copied() else {
                continue;
            };
            if !disclosure.is_array_item() {
                return Err(SdJwtError::Verification(format!(
                    "object property disclosure {digest} referenced from an array element"
                )));
            }
            out.push(self.unpack_value(disclosure.value(), &path)?);
            self.keymap.insert(path, digest.to_string());
        }
        Ok(Value::Array(out))
    }

    fn mark_seen(&mut self, digest: &str) -> SdJwtResult<()> {
        if self.seen.insert(digest.to_string()) {
            Ok(())
        } else {
            Err(SdJwtError::Verification(format!(
                "digest {digest} appears more than once"
            )))
        }
    }
}

/// The digest inside a `{"...": digest}` array wrapper, if `item` is one.
fn array_digest(item: &Value) -> SdJwtResult<Option<&str>> {
    let Some(obj) = item.as_object() else {
        return Ok(None);
    };
    let Some(digest) = obj.get(ARRAY_DIGEST_KEY) else {
        return Ok(None);
    };
    match digest {
        Value::String(d) if obj.len() == 1 => Ok(Some(d)),
        Value::String(_) => Err(SdJwtError::Malformed(format!(
            "array digest wrapper must contain only `{ARRAY_DIGEST_KEY}`"
        ))),
        _ => Err(SdJwtError::Malformed(format!(
            "`{ARRAY_DIGEST_KEY}` must be a string digest"
        ))),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::frame::DisclosureFrame;
    use crate::pack::pack;
    use crate::testing::{CountingSalts, Sha256Hasher};
    use proptest::prelude::*;

    fn json_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| serde_json::json!(n)),
            "[a-zA-Z0-9_ ]{0,20}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,8}", inner, 0..6)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn claims_object() -> impl Strategy<Value = Value> {
        prop::collection::btree_map("[a-z]{1,8}", json_value(), 0..8)
            .prop_map(|m| Value::Object(m.into_iter().collect()))
    }

    /// Redact every property and array item, recursively.
    fn redact_everything(value: &Value) -> DisclosureFrame {
        match value {
            Value::Object(obj) => obj.iter().fold(
                DisclosureFrame::new().sd(obj.keys().cloned()).decoys(1),
                |frame, (k, v)| frame.child(k.clone(), redact_everything(v)),
            ),
            Value::Array(items) => items.iter().enumerate().fold(
                DisclosureFrame::new().sd_indices(0..items.len()),
                |frame, (i, v)| frame.child(i.to_string(), redact_everything(v)),
            ),
            _ => DisclosureFrame::new(),
        }
    }

    proptest! {
        /// Packing then unpacking with every disclosure restores the claims.
        #[test]
        fn pack_unpack_roundtrip(claims in claims_object()) {
            let hasher = Sha256Hasher;
            let salts = CountingSalts::default();
            let frame = redact_everything(&claims);
            let packed =
                pack(&claims, Some(&frame), HasherAndAlg::new(&hasher, "sha-256"), &salts).unwrap();
            let unpacked = unpack(&packed.claims, &packed.disclosures, &hasher).unwrap();
            prop_assert_eq!(unpacked.claims, claims);
            prop_assert_eq!(unpacked.disclosure_keymap.len(), packed.disclosures.len());
            prop_assert!(unpacked.unreferenced.is_empty());
        }

        /// Withholding every disclosure never fails and leaks no claim.
        #[test]
        fn withholding_all_disclosures_is_safe(claims in claims_object()) {
            let hasher = Sha256Hasher;
            let salts = CountingSalts::default();
            let frame = redact_everything(&claims);
            let packed =
                pack(&claims, Some(&frame), HasherAndAlg::new(&hasher, "sha-256"), &salts).unwrap();
            let unpacked = unpack(&packed.claims, &[], &hasher).unwrap();
            prop_assert_eq!(unpacked.claims, serde_json::json!({}));
        }
    }
}
