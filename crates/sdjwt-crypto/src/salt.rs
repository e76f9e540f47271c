//! OS-random salt generation.

use rand::rngs::OsRng;
use rand::RngCore;
use sdjwt_core::encoding::b64url_encode;
use sdjwt_core::{SaltGenerator, SdJwtError, SdJwtResult};

/// Salts of `length` bytes from the OS RNG, base64url-encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSaltGenerator;

impl SaltGenerator for OsSaltGenerator {
    fn generate(&self, length: usize) -> SdJwtResult<String> {
        let mut bytes = vec![0u8; length];
        OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
            SdJwtError::Configuration(format!("OS random source unavailable: {e}"))
        })?;
        Ok(b64url_encode(bytes))
    }
}
