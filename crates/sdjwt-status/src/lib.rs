//! # sdjwt-status — Token Status Lists
//!
//! Revocation and suspension for SD-JWT credentials:
//!
//! - [`StatusList`]: the bit-packed, zlib-compressed status array.
//! - [`token`]: the signed status-list JWT and the credential's
//!   `status.status_list` reference.
//! - [`StatusListFetcher`] / [`StatusValidator`]: the seams through which a
//!   verifier retrieves a list and decides whether a status is acceptable.

pub mod status_list;
pub mod token;

use sdjwt_core::{SdJwtError, SdJwtResult};

pub use status_list::{StatusList, ALLOWED_BITS};
pub use token::{
    create_status_list_jwt, StatusListClaim, StatusListPayload, StatusListReference,
    StatusListToken, StatusListTokenClaims, STATUS_LIST_JWT_TYP,
};

/// Registered status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusType {
    /// `0`: the credential is valid.
    Valid,
    /// `1`: revoked.
    Invalid,
    /// `2`: temporarily suspended.
    Suspended,
    /// `3`: meaning defined by the application.
    ApplicationSpecific,
    /// Any other value.
    Other(u8),
}

impl StatusType {
    /// Classify a raw status value.
    pub fn from_value(value: u8) -> Self {
        match value {
            0 => Self::Valid,
            1 => Self::Invalid,
            2 => Self::Suspended,
            3 => Self::ApplicationSpecific,
            other => Self::Other(other),
        }
    }

    /// The raw status value.
    pub fn value(&self) -> u8 {
        match self {
            Self::Valid => 0,
            Self::Invalid => 1,
            Self::Suspended => 2,
            Self::ApplicationSpecific => 3,
            Self::Other(v) => *v,
        }
    }
}

impl std::fmt::Display for StatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => f.write_str("VALID"),
            Self::Invalid => f.write_str("INVALID"),
            Self::Suspended => f.write_str("SUSPENDED"),
            Self::ApplicationSpecific => f.write_str("APPLICATION_SPECIFIC"),
            Self::Other(v) => write!(f, "0x{v:02X}"),
        }
    }
}

/// Retrieves a compact status-list JWT by URI.
pub trait StatusListFetcher: Send + Sync {
    /// Fetch the status-list JWT published at `uri`.
    fn fetch(&self, uri: &str) -> SdJwtResult<String>;
}

/// Decides whether a credential's status is acceptable.
pub trait StatusValidator: Send + Sync {
    /// Return `Err(StatusRejected)` to fail verification.
    fn validate(&self, status: u8) -> SdJwtResult<()>;
}

/// Accepts only [`StatusType::Valid`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidOnly;

impl StatusValidator for ValidOnly {
    fn validate(&self, status: u8) -> SdJwtResult<()> {
        match StatusType::from_value(status) {
            StatusType::Valid => Ok(()),
            other => Err(SdJwtError::StatusRejected(format!(
                "credential status is {other}"
            ))),
        }
    }
}
