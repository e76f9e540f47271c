//! # sdjwt-crypto — Default Capabilities
//!
//! Ready-made implementations of the `sdjwt-core` capability traits:
//!
//! - **SHA-2** hashing under the IANA names `sha-256`, `sha-384`, `sha-512`.
//! - **Salts** drawn from the operating system RNG.
//! - **Ed25519** (`EdDSA`) signing and verification, including a
//!   key-binding verifier that resolves the holder key from the
//!   credential's `cnf.jwk` claim.
//!
//! ## Crate Policy
//!
//! - Depends only on `sdjwt-core` internally.
//! - Private keys are never serialized or logged.

pub mod ed25519;
pub mod salt;
pub mod sha;

pub use ed25519::{
    CnfKeyBindingVerifier, Ed25519PublicKey, Ed25519Signer, Ed25519Verifier, OkpJwk, EDDSA_ALG,
};
pub use salt::OsSaltGenerator;
pub use sha::Sha2Hasher;
