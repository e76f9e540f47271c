//! # Status List Codec
//!
//! A status list is an array of small unsigned integers, each `bits` wide
//! (`bits` ∈ {1, 2, 4, 8}), packed into bytes, zlib-compressed, and
//! base64url-encoded for the `lst` claim.
//!
//! ## Bit Layout
//!
//! Status `i` occupies the `bits`-wide slot starting at bit `(i * bits) % 8`
//! of byte `(i * bits) / 8`, counting from the least significant bit. Inside
//! its slot a value keeps its natural bit order. With `bits = 1` the
//! statuses `[1,0,0,1,1,1,0,1]` pack to `0xB9`. The final byte is padded
//! with zero bits, so a decoded list can be longer than the encoded one by
//! fewer than `8 / bits` trailing zero entries.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use sdjwt_core::encoding::{b64url_decode, b64url_encode};
use sdjwt_core::{SdJwtError, SdJwtResult};

/// Bit widths a status list may use.
pub const ALLOWED_BITS: [u8; 4] = [1, 2, 4, 8];

/// A decoded status list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusList {
    bits: u8,
    statuses: Vec<u8>,
}

impl StatusList {
    /// Build a list from explicit statuses.
    ///
    /// # Errors
    ///
    /// Returns `StatusList` if `bits` is not 1, 2, 4, or 8, or if any
    /// status does not fit in `bits` bits.
    pub fn new(statuses: Vec<u8>, bits: u8) -> SdJwtResult<Self> {
        check_bits(bits)?;
        if let Some((index, value)) = statuses
            .iter()
            .enumerate()
            .find(|(_, v)| !fits(**v, bits))
        {
            return Err(SdJwtError::StatusList(format!(
                "status {value} at index {index} does not fit in {bits} bits"
            )));
        }
        Ok(Self { bits, statuses })
    }

    /// A list of `len` entries, all `0` (valid).
    pub fn with_len(len: usize, bits: u8) -> SdJwtResult<Self> {
        Self::new(vec![0; len], bits)
    }

    /// Bits per status.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    /// Whether the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// All statuses.
    pub fn statuses(&self) -> &[u8] {
        &self.statuses
    }

    /// The status at `index`.
    pub fn get(&self, index: usize) -> SdJwtResult<u8> {
        self.statuses.get(index).copied().ok_or_else(|| {
            SdJwtError::StatusList(format!(
                "index {index} out of bounds for status list of length {}",
                self.statuses.len()
            ))
        })
    }

    /// Set the status at `index`.
    pub fn set(&mut self, index: usize, value: u8) -> SdJwtResult<()> {
        if !fits(value, self.bits) {
            return Err(SdJwtError::StatusList(format!(
                "status {value} does not fit in {} bits",
                self.bits
            )));
        }
        let len = self.statuses.len();
        let slot = self.statuses.get_mut(index).ok_or_else(|| {
            SdJwtError::StatusList(format!(
                "index {index} out of bounds for status list of length {len}"
            ))
        })?;
        *slot = value;
        Ok(())
    }

    /// Pack the statuses into bytes without compression.
    pub fn to_bytes(&self) -> Vec<u8> {
        let bits = usize::from(self.bits);
        let mut bytes = vec![0u8; (self.statuses.len() * bits).div_ceil(8)];
        for (i, status) in self.statuses.iter().enumerate() {
            let offset = i * bits;
            bytes[offset / 8] |= status << (offset % 8);
        }
        bytes
    }

    /// Unpack bytes into `bytes.len() * 8 / bits` statuses.
    pub fn from_bytes(bytes: &[u8], bits: u8) -> SdJwtResult<Self> {
        check_bits(bits)?;
        let width = usize::from(bits);
        let mask = mask(bits);
        let statuses = (0..bytes.len() * 8 / width)
            .map(|i| {
                let offset = i * width;
                (bytes[offset / 8] >> (offset % 8)) & mask
            })
            .collect();
        Ok(Self { bits, statuses })
    }

    /// Pack, zlib-compress at the best level, and base64url-encode: the
    /// `lst` claim value.
    pub fn encode(&self) -> SdJwtResult<String> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder
            .write_all(&self.to_bytes())
            .map_err(|e| SdJwtError::StatusList(format!("compression failed: {e}")))?;
        let compressed = encoder
            .finish()
            .map_err(|e| SdJwtError::StatusList(format!("compression failed: {e}")))?;
        Ok(b64url_encode(compressed))
    }

    /// Inverse of [`encode`](Self::encode).
    pub fn decode(lst: &str, bits: u8) -> SdJwtResult<Self> {
        check_bits(bits)?;
        let compressed = b64url_decode(lst)?;
        let mut bytes = Vec::new();
        ZlibDecoder::new(compressed.as_slice())
            .read_to_end(&mut bytes)
            .map_err(|e| SdJwtError::StatusList(format!("decompression failed: {e}")))?;
        Self::from_bytes(&bytes, bits)
    }
}

fn check_bits(bits: u8) -> SdJwtResult<()> {
    if ALLOWED_BITS.contains(&bits) {
        Ok(())
    } else {
        Err(SdJwtError::StatusList(format!(
            "bits must be one of 1, 2, 4, 8; got {bits}"
        )))
    }
}

fn mask(bits: u8) -> u8 {
    if bits >= 8 {
        u8::MAX
    } else {
        (1u8 << bits) - 1
    }
}

fn fits(value: u8, bits: u8) -> bool {
    value & !mask(bits) == 0
}
