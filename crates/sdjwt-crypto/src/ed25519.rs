//! # Ed25519 Signing and Verification
//!
//! `EdDSA` over Ed25519 for issuer JWTs, status-list JWTs, and key-binding
//! JWTs. Signatures travel as base64url without padding; public keys travel
//! as OKP JWKs (`{"kty": "OKP", "crv": "Ed25519", "x": ...}`).
//!
//! ## Security Invariant
//!
//! - `Ed25519Signer` does not implement `Serialize` and its `Debug` output
//!   hides the key.
//! - A signature that is not exactly 64 bytes of valid base64url never
//!   verifies.

use ed25519_dalek::{Signer as _, Verifier as _};
use sdjwt_core::encoding::{b64url_decode, b64url_encode};
use sdjwt_core::{KeyBindingVerifier, SdJwtError, SdJwtResult, Signer, Verifier};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JOSE algorithm name for Ed25519 signatures.
pub const EDDSA_ALG: &str = "EdDSA";

/// An Ed25519 public key in OKP JWK form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkpJwk {
    /// Key type, always `OKP`.
    pub kty: String,
    /// Curve, always `Ed25519`.
    pub crv: String,
    /// base64url public key bytes.
    pub x: String,
}

/// An Ed25519 public key (32 bytes).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey([u8; 32]);

impl Ed25519PublicKey {
    /// Create a public key from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render as an OKP JWK.
    pub fn to_jwk(&self) -> OkpJwk {
        OkpJwk {
            kty: "OKP".to_string(),
            crv: "Ed25519".to_string(),
            x: b64url_encode(self.0),
        }
    }

    /// Parse an OKP JWK.
    pub fn from_jwk(jwk: &OkpJwk) -> SdJwtResult<Self> {
        if jwk.kty != "OKP" || jwk.crv != "Ed25519" {
            return Err(SdJwtError::UnsupportedAlgorithm(format!(
                "expected OKP/Ed25519 JWK, got {}/{}",
                jwk.kty, jwk.crv
            )));
        }
        let bytes = b64url_decode(&jwk.x)?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            SdJwtError::Malformed(format!("Ed25519 public key must be 32 bytes, got {}", b.len()))
        })?;
        Ok(Self(bytes))
    }

    /// Parse a JWK given as JSON.
    pub fn from_jwk_value(jwk: &Value) -> SdJwtResult<Self> {
        let jwk: OkpJwk = serde_json::from_value(jwk.clone())
            .map_err(|e| SdJwtError::Malformed(format!("invalid JWK: {e}")))?;
        Self::from_jwk(&jwk)
    }

    fn to_verifying_key(&self) -> SdJwtResult<ed25519_dalek::VerifyingKey> {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| SdJwtError::Malformed(format!("invalid Ed25519 public key: {e}")))
    }
}

impl std::fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519PublicKey({})", b64url_encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// Signs JWS signing inputs with an Ed25519 private key.
pub struct Ed25519Signer {
    signing_key: ed25519_dalek::SigningKey,
}

impl Ed25519Signer {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Create a signer from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// The JOSE `alg` this signer produces.
    pub fn alg(&self) -> &'static str {
        EDDSA_ALG
    }

    /// The matching public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// The matching public key as an OKP JWK, e.g. for a `cnf` claim.
    pub fn public_jwk(&self) -> Value {
        // A struct of three strings always serializes.
        serde_json::to_value(self.public_key().to_jwk()).unwrap_or(Value::Null)
    }

    /// A verifier for signatures made by this key.
    pub fn verifier(&self) -> Ed25519Verifier {
        Ed25519Verifier {
            key: self.signing_key.verifying_key(),
        }
    }
}

impl Signer for Ed25519Signer {
    fn sign(&self, data: &str) -> SdJwtResult<String> {
        let signature = self.signing_key.sign(data.as_bytes());
        Ok(b64url_encode(signature.to_bytes()))
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signer(<private>)")
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verifies Ed25519 signatures against one fixed public key.
#[derive(Debug, Clone)]
pub struct Ed25519Verifier {
    key: ed25519_dalek::VerifyingKey,
}

impl Ed25519Verifier {
    /// A verifier for `public_key`.
    pub fn new(public_key: &Ed25519PublicKey) -> SdJwtResult<Self> {
        Ok(Self {
            key: public_key.to_verifying_key()?,
        })
    }

    /// A verifier for an OKP JWK.
    pub fn from_jwk(jwk: &OkpJwk) -> SdJwtResult<Self> {
        Self::new(&Ed25519PublicKey::from_jwk(jwk)?)
    }
}

fn verify_with(key: &ed25519_dalek::VerifyingKey, data: &str, signature: &str) -> bool {
    let Ok(bytes) = b64url_decode(signature) else {
        tracing::debug!("signature is not valid base64url");
        return false;
    };
    let Ok(bytes) = <[u8; 64]>::try_from(bytes.as_slice()) else {
        tracing::debug!(len = bytes.len(), "Ed25519 signature must be 64 bytes");
        return false;
    };
    let signature = ed25519_dalek::Signature::from_bytes(&bytes);
    key.verify(data.as_bytes(), &signature).is_ok()
}

impl Verifier for Ed25519Verifier {
    fn verify(&self, data: &str, signature: &str) -> SdJwtResult<bool> {
        Ok(verify_with(&self.key, data, signature))
    }
}

impl KeyBindingVerifier for Ed25519Verifier {
    fn verify(&self, data: &str, signature: &str, _issuer_claims: &Value) -> SdJwtResult<bool> {
        Ok(verify_with(&self.key, data, signature))
    }
}

/// Verifies key-binding JWTs against the holder key in the credential's
/// `cnf.jwk` claim.
#[derive(Debug, Clone, Copy, Default)]
pub struct CnfKeyBindingVerifier;

impl KeyBindingVerifier for CnfKeyBindingVerifier {
    fn verify(&self, data: &str, signature: &str, issuer_claims: &Value) -> SdJwtResult<bool> {
        let jwk = issuer_claims
            .get("cnf")
            .and_then(|cnf| cnf.get("jwk"))
            .ok_or_else(|| {
                SdJwtError::Verification("credential has no `cnf.jwk` holder key".to_string())
            })?;
        let key = Ed25519PublicKey::from_jwk_value(jwk)?.to_verifying_key()?;
        Ok(verify_with(&key, data, signature))
    }
}
