//! Deterministic capabilities for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{SdJwtError, SdJwtResult};
use crate::traits::{Hasher, KeyBindingVerifier, SaltGenerator, Signer, Verifier};

pub(crate) struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn hash(&self, data: &[u8], alg: &str) -> SdJwtResult<Vec<u8>> {
        match alg {
            "sha-256" => Ok(Sha256::digest(data).to_vec()),
            other => Err(SdJwtError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Salts `salt-0`, `salt-1`, ... in call order.
#[derive(Default)]
pub(crate) struct CountingSalts(AtomicUsize);

impl SaltGenerator for CountingSalts {
    fn generate(&self, _length: usize) -> SdJwtResult<String> {
        Ok(format!("salt-{}", self.0.fetch_add(1, Ordering::SeqCst)))
    }
}

/// "Signs" by hashing the input; verifies by recomputing.
pub(crate) struct DigestSigner;

impl Signer for DigestSigner {
    fn sign(&self, data: &str) -> SdJwtResult<String> {
        Ok(crate::encoding::b64url_encode(Sha256::digest(data.as_bytes())))
    }
}

impl Verifier for DigestSigner {
    fn verify(&self, data: &str, signature: &str) -> SdJwtResult<bool> {
        Ok(Signer::sign(self, data)? == signature)
    }
}

impl KeyBindingVerifier for DigestSigner {
    fn verify(&self, data: &str, signature: &str, _issuer_claims: &Value) -> SdJwtResult<bool> {
        Verifier::verify(self, data, signature)
    }
}

/// Rejects every signature.
pub(crate) struct RejectAll;

impl KeyBindingVerifier for RejectAll {
    fn verify(&self, _data: &str, _signature: &str, _issuer_claims: &Value) -> SdJwtResult<bool> {
        Ok(false)
    }
}
