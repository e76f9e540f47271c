//! # SHA-2 Hasher
//!
//! [`Hasher`] over the SHA-2 family, addressed by the IANA "Named
//! Information Hash Algorithm" names used in `_sd_alg`.

use sdjwt_core::{Hasher, SdJwtError, SdJwtResult};
use sha2::{Digest, Sha256, Sha384, Sha512};

/// SHA-256 / SHA-384 / SHA-512.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha2Hasher;

impl Hasher for Sha2Hasher {
    fn hash(&self, data: &[u8], alg: &str) -> SdJwtResult<Vec<u8>> {
        match alg.to_ascii_lowercase().as_str() {
            "sha-256" => Ok(Sha256::digest(data).to_vec()),
            "sha-384" => Ok(Sha384::digest(data).to_vec()),
            "sha-512" => Ok(Sha512::digest(data).to_vec()),
            _ => Err(SdJwtError::UnsupportedAlgorithm(alg.to_string())),
        }
    }
}
