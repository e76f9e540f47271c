//! # Error Types
//!
//! Every fatal condition in the workspace surfaces as a single
//! [`SdJwtError`]. Callers branch on [`SdJwtError::category()`] or the stable
//! [`SdJwtError::code()`] string rather than on message text.
//!
//! ## Categories
//!
//! - **Malformed**: wrong part counts, bad base64url, bad JSON, unknown
//!   algorithms, invalid status-list input.
//! - **Policy**: a presentation path that cannot be disclosed, or a
//!   disclosure frame that touches a protected claim.
//! - **Crypto**: invalid signatures, `sd_hash` mismatch, digest integrity
//!   violations, a status check that rejects the credential.
//! - **Configuration**: a conditionally required capability is missing.
//!
//! A digest without a matching disclosure during unpacking is not an error
//! and never reaches this type.

use serde_json::Value;
use thiserror::Error;

/// Convenience alias used across the workspace.
pub type SdJwtResult<T> = Result<T, SdJwtError>;

/// Coarse classification of an [`SdJwtError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Input could not be parsed or is structurally invalid.
    Malformed,
    /// Input is well formed but violates a disclosure or profile policy.
    Policy,
    /// A signature, digest, or binding check failed.
    Crypto,
    /// A required capability was not configured.
    Configuration,
}

impl ErrorCategory {
    /// Returns the category identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::Policy => "policy",
            Self::Crypto => "crypto",
            Self::Configuration => "configuration",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error type for every SD-JWT operation.
#[derive(Error, Debug)]
pub enum SdJwtError {
    /// Structurally invalid input (part counts, shapes, field types).
    #[error("malformed input: {0}")]
    Malformed(String),

    /// Invalid base64url data.
    #[error("invalid base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Invalid JSON data.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The named hash or signature algorithm is not supported.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A disclosure or presentation policy was violated.
    #[error("policy violation: {reason}")]
    PolicyViolation {
        /// Human-readable reason.
        reason: String,
        /// Optional structured detail (e.g. the offending paths).
        detail: Option<Value>,
    },

    /// A signature did not verify.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// The key-binding `sd_hash` does not match the presented token.
    #[error("sd_hash mismatch: key binding JWT is not bound to this presentation")]
    SdHashMismatch,

    /// Digest integrity or claim validation failed.
    #[error("verification failed: {0}")]
    Verification(String),

    /// The status list marks the credential as not valid.
    #[error("credential status rejected: {0}")]
    StatusRejected(String),

    /// Status list encoding, decoding, or indexing failed.
    #[error("status list error: {0}")]
    StatusList(String),

    /// A conditionally required capability was not configured.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SdJwtError {
    /// Build a policy violation without structured detail.
    pub fn policy(reason: impl Into<String>) -> Self {
        Self::PolicyViolation {
            reason: reason.into(),
            detail: None,
        }
    }

    /// Build a policy violation carrying structured detail.
    pub fn policy_with_detail(reason: impl Into<String>, detail: Value) -> Self {
        Self::PolicyViolation {
            reason: reason.into(),
            detail: Some(detail),
        }
    }

    /// The coarse category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Malformed(_)
            | Self::Base64(_)
            | Self::Json(_)
            | Self::UnsupportedAlgorithm(_)
            | Self::StatusList(_) => ErrorCategory::Malformed,
            Self::PolicyViolation { .. } => ErrorCategory::Policy,
            Self::InvalidSignature(_)
            | Self::SdHashMismatch
            | Self::Verification(_)
            | Self::StatusRejected(_) => ErrorCategory::Crypto,
            Self::Configuration(_) => ErrorCategory::Configuration,
        }
    }

    /// Stable machine-checkable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed_input",
            Self::Base64(_) => "invalid_base64url",
            Self::Json(_) => "invalid_json",
            Self::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            Self::PolicyViolation { .. } => "policy_violation",
            Self::InvalidSignature(_) => "invalid_signature",
            Self::SdHashMismatch => "sd_hash_mismatch",
            Self::Verification(_) => "verification_failed",
            Self::StatusRejected(_) => "status_rejected",
            Self::StatusList(_) => "status_list_invalid",
            Self::Configuration(_) => "missing_configuration",
        }
    }

    /// Structured detail, when the error carries any.
    pub fn detail(&self) -> Option<&Value> {
        match self {
            Self::PolicyViolation { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }
}
