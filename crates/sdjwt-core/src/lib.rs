//! # sdjwt-core — Selective Disclosure Engine
//!
//! The format-level machinery behind SD-JWT credentials:
//!
//! - **Disclosures** and the digest → disclosure lookup.
//! - **Packing** a claims tree under a [`DisclosureFrame`] into a redacted
//!   payload, with decoy digests.
//! - **Unpacking** a redacted payload back into claims plus the map of
//!   presentable paths.
//! - **Presentation**: filtering disclosures to a holder's selection.
//! - The **compact** `jwt~d1~...~dn~kb` wire format and the plain JWT
//!   envelope underneath it.
//! - **Key binding**: KB-JWT creation and `sd_hash` verification.
//!
//! ## Crate Policy
//!
//! - No hashing, signing, or randomness is built in. Every capability is
//!   injected through the traits in [`traits`]; `sdjwt-crypto` provides
//!   default implementations.
//! - Claims are `serde_json::Value` with `preserve_order`, so claim order
//!   survives a round trip.
//! - All operations are synchronous and free of shared mutable state.

pub mod compact;
pub mod disclosure;
pub mod encoding;
pub mod error;
pub mod frame;
pub mod hash_mapping;
pub mod jwt;
pub mod key_binding;
pub mod pack;
pub mod present;
pub mod traits;
pub mod unpack;

#[cfg(test)]
mod testing;

pub use compact::SdJwt;
pub use disclosure::Disclosure;
pub use error::{ErrorCategory, SdJwtError, SdJwtResult};
pub use frame::{DisclosureFrame, PresentationFrame, PresentationNode};
pub use hash_mapping::create_hash_mapping;
pub use jwt::Jwt;
pub use key_binding::{compute_sd_hash, KbExpectations, KeyBindingClaims, KB_JWT_TYP};
pub use pack::{pack, Packed, Packer, DEFAULT_SALT_LENGTH};
pub use present::select_disclosures;
pub use traits::{
    Hasher, HasherAndAlg, KeyBindingVerifier, SaltGenerator, Signer, Verifier, DEFAULT_HASH_ALG,
};
pub use unpack::{sd_alg, unpack, Unpacked};

/// Payload key holding the digests of redacted object properties.
pub const SD_DIGESTS: &str = "_sd";

/// Payload key naming the digest algorithm.
pub const SD_ALG: &str = "_sd_alg";

/// Frame key requesting decoy digests.
pub const SD_DECOY: &str = "_sd_decoy";

/// Key of the `{"...": digest}` wrapper replacing a redacted array item.
pub const ARRAY_DIGEST_KEY: &str = "...";

/// Separator between the segments of a compact SD-JWT.
pub const SEPARATOR: char = '~';

/// Join a dotted claim path.
pub(crate) fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
