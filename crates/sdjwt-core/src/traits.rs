//! # Pluggable Capabilities
//!
//! The engine never hashes, signs, verifies, or draws randomness on its own.
//! These traits are the seams through which callers inject those functions.
//! All of them are `Send + Sync` so a configured capability can be shared
//! across threads and moved onto a blocking pool by async callers.

use serde_json::Value;

use crate::encoding::b64url_encode;
use crate::error::SdJwtResult;

/// Default hash algorithm name (IANA "Named Information Hash Algorithm").
pub const DEFAULT_HASH_ALG: &str = "sha-256";

/// Computes a digest of `data` with the named algorithm.
pub trait Hasher: Send + Sync {
    /// Hash `data` with algorithm `alg` (e.g. `"sha-256"`).
    ///
    /// Returns [`SdJwtError::UnsupportedAlgorithm`](crate::SdJwtError::UnsupportedAlgorithm)
    /// for names the implementation does not know.
    fn hash(&self, data: &[u8], alg: &str) -> SdJwtResult<Vec<u8>>;
}

/// Produces a base64url signature over a JWS signing input.
pub trait Signer: Send + Sync {
    /// Sign the ASCII signing input `header.payload`.
    fn sign(&self, data: &str) -> SdJwtResult<String>;
}

/// Checks a base64url signature over a JWS signing input.
pub trait Verifier: Send + Sync {
    /// Returns `Ok(true)` when `signature` is valid for `data`.
    fn verify(&self, data: &str, signature: &str) -> SdJwtResult<bool>;
}

/// Checks a key-binding JWT signature.
///
/// Receives the verified issuer claims so implementations can resolve the
/// holder key from the `cnf` claim.
pub trait KeyBindingVerifier: Send + Sync {
    /// Returns `Ok(true)` when `signature` is valid for `data`.
    fn verify(&self, data: &str, signature: &str, issuer_claims: &Value) -> SdJwtResult<bool>;
}

/// Produces salts for disclosures and decoys.
pub trait SaltGenerator: Send + Sync {
    /// Return a fresh salt built from `length` random bytes.
    fn generate(&self, length: usize) -> SdJwtResult<String>;
}

/// A hasher paired with the algorithm name it should use.
#[derive(Clone, Copy)]
pub struct HasherAndAlg<'a> {
    /// The hashing capability.
    pub hasher: &'a dyn Hasher,
    /// The algorithm name passed to every call.
    pub alg: &'a str,
}

impl<'a> HasherAndAlg<'a> {
    /// Pair a hasher with an algorithm name.
    pub fn new(hasher: &'a dyn Hasher, alg: &'a str) -> Self {
        Self { hasher, alg }
    }

    /// Hash `data` and return the base64url-encoded digest.
    pub fn digest_b64(&self, data: &[u8]) -> SdJwtResult<String> {
        Ok(b64url_encode(self.hasher.hash(data, self.alg)?))
    }
}

impl std::fmt::Debug for HasherAndAlg<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HasherAndAlg").field("alg", &self.alg).finish()
    }
}
