//! Digest → disclosure lookup table.
//!
//! Rebuilt on every unpack/present call; never cached on a credential.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::disclosure::Disclosure;
use crate::error::{SdJwtError, SdJwtResult};
use crate::traits::HasherAndAlg;

/// Map each disclosure's digest under `hash.alg` to the disclosure.
///
/// A digest supplied more than once is a verification failure.
pub fn create_hash_mapping<'a>(
    disclosures: &'a [Disclosure],
    hash: &HasherAndAlg<'_>,
) -> SdJwtResult<HashMap<String, &'a Disclosure>> {
    let mut map = HashMap::with_capacity(disclosures.len());
    for disclosure in disclosures {
        match map.entry(disclosure.digest(hash)?) {
            Entry::Vacant(slot) => {
                slot.insert(disclosure);
            }
            Entry::Occupied(slot) => {
                tracing::warn!(digest = %slot.key(), "disclosure supplied more than once");
                return Err(SdJwtError::Verification(format!(
                    "disclosure {} is supplied more than once",
                    slot.key()
                )));
            }
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Sha256Hasher;
    use serde_json::json;

    #[test]
    fn maps_every_digest() {
        let hasher = Sha256Hasher;
        let hash = HasherAndAlg::new(&hasher, "sha-256");
        let disclosures = vec![
            Disclosure::object_property("s0", "a", json!("x")),
            Disclosure::array_item("s1", json!(2)),
        ];
        let map = create_hash_mapping(&disclosures, &hash).unwrap();
        assert_eq!(map.len(), 2);
        for d in &disclosures {
            let found = map[&d.digest(&hash).unwrap()];
            assert!(std::ptr::eq(found, d));
        }
    }

    #[test]
    fn repeated_disclosure_is_rejected() {
        let hasher = Sha256Hasher;
        let hash = HasherAndAlg::new(&hasher, "sha-256");
        let a = Disclosure::object_property("s0", "a", json!("x"));
        let disclosures = vec![a.clone(), Disclosure::array_item("s1", json!(2)), a];
        let err = create_hash_mapping(&disclosures, &hash).unwrap_err();
        assert_eq!(err.code(), "verification_failed");
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn unknown_algorithm_propagates() {
        let hasher = Sha256Hasher;
        let hash = HasherAndAlg::new(&hasher, "md5");
        let disclosures = vec![Disclosure::array_item("s", json!(null))];
        assert!(create_hash_mapping(&disclosures, &hash).is_err());
    }

    #[test]
    fn empty_list_yields_empty_map() {
        let hasher = Sha256Hasher;
        let map = create_hash_mapping(&[], &HasherAndAlg::new(&hasher, "sha-256")).unwrap();
        assert!(map.is_empty());
    }
}
