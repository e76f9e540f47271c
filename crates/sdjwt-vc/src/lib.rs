//! # sdjwt-vc — Issuer, Holder, and Verifier API
//!
//! The application-facing layer over `sdjwt-core`:
//!
//! - **Instance** (`instance.rs`): [`SdJwtInstance`] with `issue`,
//!   `present`, `verify`, and the inspection helpers, plus async variants
//!   for tokio callers.
//!
//! - **Config** (`config.rs`): per-operation capability bundles and the
//!   serde-loadable [`EngineSettings`].
//!
//! - **Profile** (`profile.rs`): [`ProfilePolicy`] hooks. [`BaseProfile`]
//!   is plain SD-JWT; [`VcProfile`] adds the SD-JWT VC rules and the
//!   status-list check.
//!
//! ## Crate Policy
//!
//! - Depends on `sdjwt-core` and `sdjwt-status` internally; concrete
//!   cryptography is injected, usually from `sdjwt-crypto`.
//! - A capability an operation may need is verified to be configured
//!   before any signature work starts.

pub mod config;
pub mod instance;
pub mod profile;

pub use config::{
    EngineSettings, IssueConfig, KeyBindingConfig, PresentConfig, StatusCheckConfig, VerifyConfig,
};
pub use instance::{SdJwtInstance, VerifiedSdJwt};
pub use profile::{
    BaseProfile, ProfilePolicy, VcProfile, VerifyContext, LEGACY_VC_TYP, PROTECTED_CLAIMS, VC_TYP,
};
