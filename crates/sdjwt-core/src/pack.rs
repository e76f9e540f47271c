//! # Packer
//!
//! Splits a claims tree into a redacted payload plus a flat list of
//! [`Disclosure`]s according to a [`DisclosureFrame`].
//!
//! The walk is post-order: child frames are packed first, so a claim can be
//! redacted even when its own value already carries nested redactions.
//!
//! - Redacted object properties leave the object; their digests, together
//!   with any decoys, form the level's `_sd` array, sorted so that position
//!   reveals nothing about which claim was hidden.
//! - Redacted array items stay in place as `{"...": digest}`; decoys are
//!   appended as extra wrappers.
//!
//! Disclosure order is deterministic: children's disclosures in frame order,
//! then the level's own in claim order. The order of names inside a frame's
//! `_sd` list does not affect the output.
//!
//! Claims are checked for reserved names at every depth before packing,
//! whether or not a frame reaches them: `_sd` anywhere, `_sd_alg` below the
//! top level, and array items that are objects carrying a `...` key are
//! malformed input.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::disclosure::Disclosure;
use crate::error::{SdJwtError, SdJwtResult};
use crate::frame::DisclosureFrame;
use crate::traits::{HasherAndAlg, SaltGenerator};
use crate::{join_path, ARRAY_DIGEST_KEY, SD_ALG, SD_DIGESTS};

/// Number of random bytes behind every salt unless configured otherwise.
pub const DEFAULT_SALT_LENGTH: usize = 16;

/// Output of [`pack`].
#[derive(Debug, Clone)]
pub struct Packed {
    /// The redacted claims.
    pub claims: Value,
    /// One disclosure per redacted claim, in frame traversal order.
    pub disclosures: Vec<Disclosure>,
}

/// Packs claims with an injected hasher and salt source.
pub struct Packer<'a> {
    hash: HasherAndAlg<'a>,
    salts: &'a dyn SaltGenerator,
    salt_length: usize,
}

impl<'a> Packer<'a> {
    /// Create a packer using [`DEFAULT_SALT_LENGTH`].
    pub fn new(hash: HasherAndAlg<'a>, salts: &'a dyn SaltGenerator) -> Self {
        Self {
            hash,
            salts,
            salt_length: DEFAULT_SALT_LENGTH,
        }
    }

    /// Override the number of random bytes per salt.
    pub fn salt_length(mut self, length: usize) -> Self {
        self.salt_length = length;
        self
    }

    /// Pack `claims` under `frame`. Without a frame the claims pass through
    /// untouched and no disclosures are produced.
    pub fn pack(&self, claims: &Value, frame: Option<&DisclosureFrame>) -> SdJwtResult<Packed> {
        check_reserved(claims, "")?;
        let Some(frame) = frame else {
            return Ok(Packed {
                claims: claims.clone(),
                disclosures: Vec::new(),
            });
        };
        let mut disclosures = Vec::new();
        let claims = self.pack_value(claims, frame, &mut disclosures)?;
        tracing::debug!(
            disclosures = disclosures.len(),
            alg = self.hash.alg,
            "packed claims"
        );
        Ok(Packed {
            claims,
            disclosures,
        })
    }

    fn pack_value(
        &self,
        claims: &Value,
        frame: &DisclosureFrame,
        out: &mut Vec<Disclosure>,
    ) -> SdJwtResult<Value> {
        match claims {
            Value::Object(map) => self.pack_object(map, frame, out),
            Value::Array(items) => self.pack_array(items, frame, out),
            scalar => {
                tracing::debug!("disclosure frame applied to a scalar claim; ignored");
                Ok(scalar.clone())
            }
        }
    }

    fn pack_object(
        &self,
        map: &Map<String, Value>,
        frame: &DisclosureFrame,
        out: &mut Vec<Disclosure>,
    ) -> SdJwtResult<Value> {
        let mut packed_children: HashMap<&str, Value> = HashMap::new();
        for (key, child_frame) in frame.children() {
            match map.get(key) {
                Some(child) => {
                    let packed = self.pack_value(child, child_frame, out)?;
                    packed_children.insert(key, packed);
                }
                None => tracing::debug!(key, "disclosure frame names a missing claim; ignored"),
            }
        }

        let mut packed = Map::new();
        let mut digests = Vec::new();
        for (key, value) in map {
            let value = packed_children
                .remove(key.as_str())
                .unwrap_or_else(|| value.clone());
            if frame.redacts(key) {
                let disclosure = Disclosure::object_property(self.salt()?, key.clone(), value);
                digests.push(disclosure.digest(&self.hash)?);
                out.push(disclosure);
            } else {
                packed.insert(key.clone(), value);
            }
        }
        for key in frame.redacted() {
            if !map.contains_key(key) {
                tracing::debug!(key = %key, "`_sd` names a missing claim; ignored");
            }
        }

        for _ in 0..frame.decoy_count() {
            digests.push(self.decoy()?);
        }
        if !digests.is_empty() {
            digests.sort();
            packed.insert(
                SD_DIGESTS.to_string(),
                Value::Array(digests.into_iter().map(Value::String).collect()),
            );
        }
        Ok(Value::Object(packed))
    }

    fn pack_array(
        &self,
        items: &[Value],
        frame: &DisclosureFrame,
        out: &mut Vec<Disclosure>,
    ) -> SdJwtResult<Value> {
        let mut packed_children: HashMap<usize, Value> = HashMap::new();
        for (key, child_frame) in frame.children() {
            match key.parse::<usize>().ok().filter(|i| *i < items.len()) {
                Some(index) => {
                    let packed = self.pack_value(&items[index], child_frame, out)?;
                    packed_children.insert(index, packed);
                }
                None => {
                    tracing::debug!(key, "disclosure frame names a missing array index; ignored")
                }
            }
        }

        let redacted: HashSet<usize> = frame
            .redacted()
            .iter()
            .filter_map(|key| key.parse::<usize>().ok())
            .collect();

        let mut packed = Vec::with_capacity(items.len() + frame.decoy_count());
        for (index, item) in items.iter().enumerate() {
            let value = packed_children
                .remove(&index)
                .unwrap_or_else(|| item.clone());
            if redacted.contains(&index) {
                let disclosure = Disclosure::array_item(self.salt()?, value);
                packed.push(array_digest(disclosure.digest(&self.hash)?));
                out.push(disclosure);
            } else {
                packed.push(value);
            }
        }

        for _ in 0..frame.decoy_count() {
            packed.push(array_digest(self.decoy()?));
        }
        Ok(Value::Array(packed))
    }

    fn salt(&self) -> SdJwtResult<String> {
        self.salts.generate(self.salt_length)
    }

    /// A digest over a fresh salt with no backing disclosure.
    fn decoy(&self) -> SdJwtResult<String> {
        let salt = self.salt()?;
        self.hash.digest_b64(salt.as_bytes())
    }
}

/// Reject claim names the unpacker would read as SD-JWT structure.
fn check_reserved(value: &Value, path: &str) -> SdJwtResult<()> {
    let at = |key: &str| join_path(path, key);
    match value {
        Value::Object(map) => {
            if map.contains_key(SD_DIGESTS) {
                return Err(SdJwtError::Malformed(format!(
                    "claims must not contain the reserved `{SD_DIGESTS}` key (at `{}`)",
                    at(SD_DIGESTS)
                )));
            }
            if !path.is_empty() && map.contains_key(SD_ALG) {
                return Err(SdJwtError::Malformed(format!(
                    "`{SD_ALG}` is only allowed at the top level (at `{}`)",
                    at(SD_ALG)
                )));
            }
            for (key, child) in map {
                check_reserved(child, &at(key))?;
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let item_path = at(&index.to_string());
                if item.get(ARRAY_DIGEST_KEY).is_some() {
                    return Err(SdJwtError::Malformed(format!(
                        "array item `{item_path}` must not contain the reserved `{ARRAY_DIGEST_KEY}` key"
                    )));
                }
                check_reserved(item, &item_path)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn array_digest(digest: String) -> Value {
    let mut wrapper = Map::new();
    wrapper.insert(ARRAY_DIGEST_KEY.to_string(), Value::String(digest));
    Value::Object(wrapper)
}

/// Pack `claims` under `frame` with the default salt length.
pub fn pack(
    claims: &Value,
    frame: Option<&DisclosureFrame>,
    hash: HasherAndAlg<'_>,
    salts: &dyn SaltGenerator,
) -> SdJwtResult<Packed> {
    Packer::new(hash, salts).pack(claims, frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingSalts, Sha256Hasher};
    use serde_json::json;

    fn run(claims: Value, frame: Value) -> Packed {
        let hasher = Sha256Hasher;
        let salts = CountingSalts::default();
        let frame = DisclosureFrame::from_value(&frame).unwrap();
        pack(&claims, Some(&frame), HasherAndAlg::new(&hasher, "sha-256"), &salts).unwrap()
    }

    #[test]
    fn no_frame_is_a_no_op() {
        let hasher = Sha256Hasher;
        let salts = CountingSalts::default();
        let claims = json!({"a": 1, "b": [1, 2]});
        let packed = pack(&claims, None, HasherAndAlg::new(&hasher, "sha-256"), &salts).unwrap();
        assert_eq!(packed.claims, claims);
        assert!(packed.disclosures.is_empty());
    }

    #[test]
    fn nested_object_scenario() {
        let packed = run(
            json!({"a": "x", "b": {"c": "y"}}),
            json!({"_sd": ["a"], "b": {"_sd": ["c"]}}),
        );
        assert_eq!(packed.disclosures.len(), 2);
        assert_eq!(packed.claims["_sd"].as_array().unwrap().len(), 1);
        assert_eq!(packed.claims["b"]["_sd"].as_array().unwrap().len(), 1);
        assert!(packed.claims.get("a").is_none());
        assert!(packed.claims["b"].get("c").is_none());
        // The child level is packed before the parent's own redactions.
        assert_eq!(packed.disclosures[0].key(), Some("c"));
        assert_eq!(packed.disclosures[1].key(), Some("a"));
    }

    #[test]
    fn array_items_are_replaced_in_place() {
        let packed = run(json!({"arr": ["p", "q", "r"]}), json!({"arr": {"_sd": [0, 2]}}));
        let arr = packed.claims["arr"].as_array().unwrap();
        assert_eq!(arr.len(), 3);
        assert!(arr[0].get("...").is_some());
        assert_eq!(arr[1], json!("q"));
        assert!(arr[2].get("...").is_some());
        assert_eq!(packed.disclosures.len(), 2);
        assert!(packed.disclosures.iter().all(Disclosure::is_array_item));
        assert_eq!(packed.disclosures[0].value(), &json!("p"));
        assert_eq!(packed.disclosures[1].value(), &json!("r"));
    }

    #[test]
    fn object_digests_are_sorted() {
        let packed = run(
            json!({"z": 1, "y": 2, "x": 3, "w": 4}),
            json!({"_sd": ["z", "y", "x", "w"], "_sd_decoy": 3}),
        );
        let sd: Vec<&str> = packed.claims["_sd"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(sd.len(), 7);
        let mut sorted = sd.clone();
        sorted.sort();
        assert_eq!(sd, sorted);
        assert_eq!(packed.disclosures.len(), 4);
    }

    #[test]
    fn decoys_in_nested_arrays_produce_no_disclosures() {
        let packed = run(
            json!({"outer": {"list": [1, 2]}}),
            json!({"outer": {"list": {"_sd_decoy": 2}}}),
        );
        let list = packed.claims["outer"]["list"].as_array().unwrap();
        assert_eq!(list.len(), 4);
        assert_eq!(&list[..2], &[json!(1), json!(2)]);
        assert!(list[2].get("...").is_some());
        assert!(packed.disclosures.is_empty());
    }

    #[test]
    fn redacted_claim_carries_packed_child() {
        let packed = run(
            json!({"address": {"street": "Main", "city": "X"}}),
            json!({"_sd": ["address"], "address": {"_sd": ["street"]}}),
        );
        assert_eq!(packed.disclosures.len(), 2);
        let address = &packed.disclosures[1];
        assert_eq!(address.key(), Some("address"));
        assert_eq!(address.value()["city"], json!("X"));
        assert!(address.value().get("street").is_none());
        assert_eq!(address.value()["_sd"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn missing_frame_targets_are_ignored() {
        let packed = run(json!({"a": 1}), json!({"_sd": ["nope"], "ghost": {"_sd": ["x"]}}));
        assert_eq!(packed.claims, json!({"a": 1}));
        assert!(packed.disclosures.is_empty());
    }

    #[test]
    fn reserved_sd_claim_is_rejected() {
        let hasher = Sha256Hasher;
        let salts = CountingSalts::default();
        let frame = DisclosureFrame::new().sd(["a"]);
        let err = pack(
            &json!({"a": 1, "_sd": []}),
            Some(&frame),
            HasherAndAlg::new(&hasher, "sha-256"),
            &salts,
        )
        .unwrap_err();
        assert_eq!(err.code(), "malformed_input");
    }

    fn pack_err(claims: Value, frame: Option<DisclosureFrame>) -> SdJwtError {
        let hasher = Sha256Hasher;
        let salts = CountingSalts::default();
        pack(&claims, frame.as_ref(), HasherAndAlg::new(&hasher, "sha-256"), &salts).unwrap_err()
    }

    #[test]
    fn reserved_sd_is_rejected_below_unframed_claims() {
        let frame = DisclosureFrame::new().sd(["a"]);
        let err = pack_err(
            json!({"a": 1, "x": {"_sd": ["not-a-digest"], "y": 2}}),
            Some(frame.clone()),
        );
        assert_eq!(err.code(), "malformed_input");
        assert!(err.to_string().contains("x._sd"));

        let err = pack_err(json!({"a": 1, "deep": [{"inner": {"_sd": []}}]}), Some(frame));
        assert!(err.to_string().contains("deep.0.inner._sd"));

        // Without a frame the payload would still be read back through `_sd`.
        let err = pack_err(json!({"x": {"_sd": ["d"]}}), None);
        assert_eq!(err.code(), "malformed_input");
    }

    #[test]
    fn nested_sd_alg_is_rejected() {
        let err = pack_err(
            json!({"a": 1, "meta": {"_sd_alg": "sha-256"}}),
            Some(DisclosureFrame::new().sd(["a"])),
        );
        assert_eq!(err.code(), "malformed_input");
        assert!(err.to_string().contains("meta._sd_alg"));

        let top = run(json!({"_sd_alg": "sha-256", "a": 1}), json!({"_sd": ["a"]}));
        assert_eq!(top.claims["_sd_alg"], json!("sha-256"));
    }

    #[test]
    fn array_digest_lookalikes_are_rejected() {
        let frame = DisclosureFrame::new().sd(["a"]);
        let err = pack_err(json!({"a": 1, "arr": [{"...": "hello"}, 2]}), Some(frame.clone()));
        assert_eq!(err.code(), "malformed_input");
        assert!(err.to_string().contains("arr.0"));

        let err = pack_err(
            json!({"a": 1, "arr": [1, {"...": "x", "extra": true}]}),
            Some(frame.clone()),
        );
        assert!(err.to_string().contains("arr.1"));

        // A `...` key on a plain object property is ordinary data.
        let packed = run(json!({"a": 1, "o": {"...": "ok"}}), json!({"_sd": ["a"]}));
        assert_eq!(packed.claims["o"], json!({"...": "ok"}));
    }

    #[test]
    fn salts_come_from_the_injected_generator() {
        let packed = run(json!({"a": 1, "b": 2}), json!({"_sd": ["a", "b"]}));
        assert_eq!(packed.disclosures[0].salt(), "salt-0");
        assert_eq!(packed.disclosures[1].salt(), "salt-1");
    }
}
