//! # Key Binding
//!
//! A key-binding JWT (KB-JWT) proves that the holder controls the key the
//! issuer bound into the credential and ties the proof to one exact
//! presentation through `sd_hash`:
//!
//! ```text
//! sd_hash = base64url(hash_{_sd_alg}("<JWT>~<D1>~...~<Dn>~"))
//! ```
//!
//! ## Security Invariant
//!
//! `sd_hash` covers the issuer JWT and every presented disclosure exactly
//! as serialized, so adding, dropping, or reordering a disclosure after
//! binding invalidates the proof. The recomputed hash is compared in
//! constant time.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use subtle::ConstantTimeEq;

use crate::compact::SdJwt;
use crate::error::{SdJwtError, SdJwtResult};
use crate::jwt::Jwt;
use crate::traits::{Hasher, HasherAndAlg, KeyBindingVerifier, Signer};

/// `typ` header value of a key-binding JWT.
pub const KB_JWT_TYP: &str = "kb+jwt";

const SD_HASH: &str = "sd_hash";
const LEGACY_SD_HASH: &str = "_sd_hash";

/// Caller-supplied claims of a key-binding JWT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBindingClaims {
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Intended verifier. A key-binding JWT names exactly one audience, so
    /// the JSON array form of `aud` is rejected as malformed.
    pub aud: String,
    /// Verifier-provided freshness value.
    pub nonce: String,
    /// Any further claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl KeyBindingClaims {
    /// Claims with no extras.
    pub fn new(iat: i64, aud: impl Into<String>, nonce: impl Into<String>) -> Self {
        Self {
            iat,
            aud: aud.into(),
            nonce: nonce.into(),
            extra: Map::new(),
        }
    }
}

/// Optional verifier-side expectations for a key-binding JWT.
#[derive(Debug, Clone, Copy, Default)]
pub struct KbExpectations<'a> {
    /// The nonce the verifier issued.
    pub nonce: Option<&'a str>,
    /// The verifier's own audience identifier.
    pub aud: Option<&'a str>,
}

/// Hash of the presentation without its KB segment, under the issuer
/// payload's `_sd_alg`.
pub fn compute_sd_hash(sd_jwt: &SdJwt, hasher: &dyn Hasher) -> SdJwtResult<String> {
    let hash = HasherAndAlg::new(hasher, sd_jwt.sd_alg()?);
    hash.digest_b64(sd_jwt.encode_without_kb()?.as_bytes())
}

impl SdJwt {
    /// Attach a fresh key-binding JWT, replacing any existing one.
    pub fn with_key_binding(
        mut self,
        claims: &KeyBindingClaims,
        signer: &dyn Signer,
        sign_alg: &str,
        hasher: &dyn Hasher,
    ) -> SdJwtResult<Self> {
        if sign_alg.is_empty() || sign_alg.eq_ignore_ascii_case("none") {
            return Err(SdJwtError::UnsupportedAlgorithm(format!(
                "key binding cannot use alg `{sign_alg}`"
            )));
        }
        self.kb_jwt = None;

        let mut header = Map::new();
        header.insert("typ".to_string(), Value::from(KB_JWT_TYP));
        header.insert("alg".to_string(), Value::from(sign_alg));

        let Value::Object(mut payload) = serde_json::to_value(claims)? else {
            return Err(SdJwtError::Malformed(
                "key binding claims must serialize to an object".to_string(),
            ));
        };
        payload.remove(LEGACY_SD_HASH);
        payload.insert(
            SD_HASH.to_string(),
            Value::String(compute_sd_hash(&self, hasher)?),
        );

        self.kb_jwt = Some(Jwt::new(header, payload).sign(signer)?);
        Ok(self)
    }

    /// Verify the attached key-binding JWT.
    ///
    /// `issuer_claims` are handed to the verifier so it can resolve the
    /// holder key (typically from `cnf`). Returns the KB claims without the
    /// hash claim.
    pub fn verify_key_binding(
        &self,
        verifier: &dyn KeyBindingVerifier,
        issuer_claims: &Value,
        hasher: &dyn Hasher,
        expect: KbExpectations<'_>,
    ) -> SdJwtResult<KeyBindingClaims> {
        let kb = self
            .kb_jwt
            .as_ref()
            .ok_or_else(|| SdJwtError::Verification("key binding JWT is missing".to_string()))?;

        match kb.alg() {
            None => {
                return Err(SdJwtError::Malformed(
                    "key binding JWT header lacks `alg`".to_string(),
                ))
            }
            Some(alg) if alg.eq_ignore_ascii_case("none") => {
                return Err(SdJwtError::UnsupportedAlgorithm(
                    "key binding JWT must not use alg `none`".to_string(),
                ))
            }
            Some(_) => {}
        }
        if kb.typ() != Some(KB_JWT_TYP) {
            return Err(SdJwtError::Verification(format!(
                "key binding JWT typ must be `{KB_JWT_TYP}`, got {:?}",
                kb.typ()
            )));
        }

        let payload = kb.payload();
        for claim in ["iat", "aud", "nonce"] {
            if !payload.contains_key(claim) {
                return Err(SdJwtError::Malformed(format!(
                    "key binding JWT is missing `{claim}`"
                )));
            }
        }
        if !payload.get("aud").is_some_and(Value::is_string) {
            return Err(SdJwtError::Malformed(
                "key binding JWT `aud` must be a single string".to_string(),
            ));
        }
        let claimed = match (payload.get(SD_HASH), payload.get(LEGACY_SD_HASH)) {
            (Some(_), Some(_)) => {
                return Err(SdJwtError::Malformed(format!(
                    "key binding JWT carries both `{SD_HASH}` and `{LEGACY_SD_HASH}`"
                )))
            }
            (Some(hash), None) | (None, Some(hash)) => hash.as_str().ok_or_else(|| {
                SdJwtError::Malformed("key binding hash claim must be a string".to_string())
            })?,
            (None, None) => {
                return Err(SdJwtError::Malformed(format!(
                    "key binding JWT is missing `{SD_HASH}`"
                )))
            }
        };

        let signature = kb.signature().unwrap_or_default();
        if !verifier.verify(&kb.signing_input(), signature, issuer_claims)? {
            tracing::warn!("key binding JWT signature rejected");
            return Err(SdJwtError::InvalidSignature(
                "key binding JWT signature verification failed".to_string(),
            ));
        }

        let expected = compute_sd_hash(self, hasher)?;
        if !bool::from(expected.as_bytes().ct_eq(claimed.as_bytes())) {
            tracing::warn!("key binding sd_hash does not match presentation");
            return Err(SdJwtError::SdHashMismatch);
        }

        let mut claims: KeyBindingClaims = serde_json::from_value(kb.payload_value())
            .map_err(|e| SdJwtError::Malformed(format!("key binding claims: {e}")))?;
        claims.extra.remove(SD_HASH);
        claims.extra.remove(LEGACY_SD_HASH);

        if let Some(nonce) = expect.nonce {
            if claims.nonce != nonce {
                return Err(SdJwtError::Verification(
                    "key binding nonce does not match".to_string(),
                ));
            }
        }
        if let Some(aud) = expect.aud {
            if claims.aud != aud {
                return Err(SdJwtError::Verification(
                    "key binding audience does not match".to_string(),
                ));
            }
        }
        Ok(claims)
    }
}
