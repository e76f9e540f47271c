//! # Disclosures
//!
//! A [`Disclosure`] is one salted, independently hashable claim fragment:
//!
//! - object property: `[salt, key, value]`
//! - array item: `[salt, value]`
//!
//! ## Security Invariant
//!
//! The digest is always computed over the *encoded* form
//! (`base64url(JSON(array))`), never over the parsed value. A disclosure
//! decoded from the wire keeps the exact string it was received as, so its
//! digest matches the issuer's even when re-serializing the parsed JSON
//! would produce different bytes.
//!
//! Encoding and digest are computed lazily and memoized in `OnceLock`s for
//! the lifetime of the value.

use std::sync::OnceLock;

use serde_json::Value;

use crate::encoding::{b64url_decode_json, b64url_encode_json, json_type_name};
use crate::error::{SdJwtError, SdJwtResult};
use crate::traits::HasherAndAlg;

#[derive(Debug, Clone)]
struct MemoDigest {
    alg: String,
    digest: String,
}

/// A salted claim fragment that can be revealed independently.
#[derive(Debug, Clone)]
pub struct Disclosure {
    salt: String,
    key: Option<String>,
    value: Value,
    encoded: OnceLock<String>,
    digest: OnceLock<MemoDigest>,
}

impl Disclosure {
    /// Create a disclosure for an object property.
    pub fn object_property(salt: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Self::new(salt.into(), Some(key.into()), value)
    }

    /// Create a disclosure for an array item.
    pub fn array_item(salt: impl Into<String>, value: Value) -> Self {
        Self::new(salt.into(), None, value)
    }

    fn new(salt: String, key: Option<String>, value: Value) -> Self {
        Self {
            salt,
            key,
            value,
            encoded: OnceLock::new(),
            digest: OnceLock::new(),
        }
    }

    /// Build a disclosure from its array form.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` unless the array is `[salt, value]` or
    /// `[salt, key, value]` with string salt and key.
    pub fn from_array(items: Vec<Value>) -> SdJwtResult<Self> {
        let len = items.len();
        let mut iter = items.into_iter();
        match (len, iter.next(), iter.next(), iter.next()) {
            (2, Some(Value::String(salt)), Some(value), None) => Ok(Self::array_item(salt, value)),
            (3, Some(Value::String(salt)), Some(Value::String(key)), Some(value)) => {
                Ok(Self::object_property(salt, key, value))
            }
            (2 | 3, _, _, _) => Err(SdJwtError::Malformed(
                "disclosure salt and key must be strings".to_string(),
            )),
            _ => Err(SdJwtError::Malformed(format!(
                "disclosure must have 2 or 3 elements, got {len}"
            ))),
        }
    }

    /// Decode a disclosure from its base64url wire form.
    ///
    /// The received string is retained verbatim and used for every later
    /// [`encode()`](Self::encode) and [`digest()`](Self::digest) call.
    pub fn from_encoded(encoded: &str) -> SdJwtResult<Self> {
        let items = match b64url_decode_json(encoded)? {
            Value::Array(items) => items,
            other => {
                return Err(SdJwtError::Malformed(format!(
                    "disclosure must be a JSON array, got {}",
                    json_type_name(&other)
                )))
            }
        };
        let disclosure = Self::from_array(items)?;
        // Freshly constructed, so the slot is empty.
        let _ = disclosure.encoded.set(encoded.to_string());
        Ok(disclosure)
    }

    /// The salt.
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// The claim name, for object-property disclosures.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// The disclosed claim value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Whether this disclosure reveals an array item.
    pub fn is_array_item(&self) -> bool {
        self.key.is_none()
    }

    /// The array form: `[salt, key, value]` or `[salt, value]`.
    pub fn to_array(&self) -> Vec<Value> {
        let mut items = Vec::with_capacity(3);
        items.push(Value::String(self.salt.clone()));
        if let Some(key) = &self.key {
            items.push(Value::String(key.clone()));
        }
        items.push(self.value.clone());
        items
    }

    /// The base64url wire encoding (memoized).
    pub fn encode(&self) -> &str {
        self.encoded
            .get_or_init(|| b64url_encode_json(&Value::Array(self.to_array())))
    }

    /// The base64url digest of the encoding under `hash.alg`.
    ///
    /// The first computed digest is memoized; asking for a different
    /// algorithm recomputes without replacing the memo.
    pub fn digest(&self, hash: &HasherAndAlg<'_>) -> SdJwtResult<String> {
        if let Some(memo) = self.digest.get() {
            if memo.alg == hash.alg {
                return Ok(memo.digest.clone());
            }
        }
        let digest = hash.digest_b64(self.encode().as_bytes())?;
        let _ = self.digest.set(MemoDigest {
            alg: hash.alg.to_string(),
            digest: digest.clone(),
        });
        Ok(digest)
    }
}

impl PartialEq for Disclosure {
    fn eq(&self, other: &Self) -> bool {
        self.salt == other.salt && self.key == other.key && self.value == other.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Sha256Hasher;
    use serde_json::json;

    #[test]
    fn object_property_array_form() {
        let d = Disclosure::object_property("s1", "given_name", json!("John"));
        assert_eq!(d.to_array(), vec![json!("s1"), json!("given_name"), json!("John")]);
        assert!(!d.is_array_item());
    }

    #[test]
    fn array_item_array_form() {
        let d = Disclosure::array_item("s2", json!("DE"));
        assert_eq!(d.to_array(), vec![json!("s2"), json!("DE")]);
        assert!(d.is_array_item());
        assert_eq!(d.key(), None);
    }

    #[test]
    fn known_digest_vector() {
        // Disclosure example from the SD-JWT draft:
        // ["_26bc4LT-ac6q2KI6cBW5es", "family_name", "Möbius"]
        let encoded = "WyJfMjZiYzRMVC1hYzZxMktJNmNCVzVlcyIsICJmYW1pbHlfbmFtZSIsICJNw7ZiaXVzIl0";
        let d = Disclosure::from_encoded(encoded).unwrap();
        assert_eq!(d.key(), Some("family_name"));
        assert_eq!(d.value(), &json!("Möbius"));
        assert_eq!(d.encode(), encoded);
        let hasher = Sha256Hasher;
        let digest = d.digest(&HasherAndAlg::new(&hasher, "sha-256")).unwrap();
        assert_eq!(digest, "X9yH0Ajrdm1Oij4tWso9UzzKJvPoDxwmuEcO3XAdRC0");
    }

    #[test]
    fn decoded_disclosure_hashes_received_bytes() {
        // Whitespace after the commas would be lost by a re-serialization.
        let encoded = crate::encoding::b64url_encode(r#"["abc", "name", {"b": 1,  "a": 2}]"#);
        let d = Disclosure::from_encoded(&encoded).unwrap();
        assert_eq!(d.encode(), encoded);
        assert_ne!(
            b64url_encode_json(&Value::Array(d.to_array())),
            encoded,
            "re-serialization must differ for this vector"
        );
    }

    #[test]
    fn digest_is_memoized_per_algorithm() {
        let hasher = Sha256Hasher;
        let d = Disclosure::object_property("salt", "k", json!(1));
        let h = HasherAndAlg::new(&hasher, "sha-256");
        let first = d.digest(&h).unwrap();
        assert_eq!(d.digest(&h).unwrap(), first);
        assert!(d.digest(&HasherAndAlg::new(&hasher, "sha-512")).is_err());
        assert_eq!(d.digest(&h).unwrap(), first);
    }

    #[test]
    fn from_array_rejects_bad_shapes() {
        assert!(Disclosure::from_array(vec![json!("only-salt")]).is_err());
        assert!(Disclosure::from_array(vec![json!(1), json!("v")]).is_err());
        assert!(Disclosure::from_array(vec![json!("s"), json!(5), json!("v")]).is_err());
        assert!(
            Disclosure::from_array(vec![json!("s"), json!("k"), json!("v"), json!(0)]).is_err()
        );
    }

    #[test]
    fn from_encoded_rejects_non_array() {
        let encoded = b64url_encode_json(&json!({"salt": "x"}));
        let err = Disclosure::from_encoded(&encoded).unwrap_err();
        assert_eq!(err.code(), "malformed_input");
        assert!(Disclosure::from_encoded("%%%").is_err());
    }

    #[test]
    fn equality_ignores_memo_state() {
        let a = Disclosure::array_item("s", json!(true));
        let b = Disclosure::array_item("s", json!(true));
        let _ = a.encode();
        assert_eq!(a, b);
    }
}
