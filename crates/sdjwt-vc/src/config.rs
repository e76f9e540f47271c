//! # Configuration
//!
//! [`EngineSettings`] holds the plain, serde-loadable knobs. The per-operation
//! configs ([`IssueConfig`], [`PresentConfig`], [`VerifyConfig`]) hold the
//! injected capabilities, so an operation can only be called with the
//! capabilities it always needs. Capabilities that are only conditionally
//! required (key-binding verifier, status-list fetcher) are optional here
//! and checked by the instance before any cryptographic work.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use sdjwt_core::{
    Hasher, KeyBindingClaims, KeyBindingVerifier, SaltGenerator, Signer, Verifier,
    DEFAULT_HASH_ALG, DEFAULT_SALT_LENGTH,
};
use sdjwt_status::{StatusListFetcher, StatusValidator, ValidOnly};

/// Engine knobs with serde defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Digest algorithm written to `_sd_alg`.
    #[serde(default = "default_hash_alg")]
    pub hash_alg: String,
    /// Random bytes per salt.
    #[serde(default = "default_salt_length")]
    pub salt_length: usize,
    /// Leave `typ` out of the issuer header.
    #[serde(default)]
    pub omit_typ: bool,
    /// Tolerance for `iat`/`nbf`/`exp` checks, in seconds.
    #[serde(default)]
    pub clock_skew_secs: i64,
}

fn default_hash_alg() -> String {
    DEFAULT_HASH_ALG.to_string()
}

fn default_salt_length() -> usize {
    DEFAULT_SALT_LENGTH
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            hash_alg: default_hash_alg(),
            salt_length: default_salt_length(),
            omit_typ: false,
            clock_skew_secs: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Issue
// ---------------------------------------------------------------------------

/// Capabilities for issuing.
#[derive(Clone)]
pub struct IssueConfig {
    /// Issuer signer.
    pub signer: Arc<dyn Signer>,
    /// JOSE `alg` the signer produces.
    pub sign_alg: String,
    /// Digest capability.
    pub hasher: Arc<dyn Hasher>,
    /// Salt source.
    pub salt_generator: Arc<dyn SaltGenerator>,
    /// Engine knobs.
    pub settings: EngineSettings,
}

impl IssueConfig {
    /// A config with default settings.
    pub fn new(
        signer: Arc<dyn Signer>,
        sign_alg: impl Into<String>,
        hasher: Arc<dyn Hasher>,
        salt_generator: Arc<dyn SaltGenerator>,
    ) -> Self {
        Self {
            signer,
            sign_alg: sign_alg.into(),
            hasher,
            salt_generator,
            settings: EngineSettings::default(),
        }
    }

    /// Replace the engine settings.
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }
}

impl std::fmt::Debug for IssueConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueConfig")
            .field("sign_alg", &self.sign_alg)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Present
// ---------------------------------------------------------------------------

/// How a holder signs a fresh key-binding JWT.
#[derive(Clone)]
pub struct KeyBindingConfig {
    /// Holder signer.
    pub signer: Arc<dyn Signer>,
    /// JOSE `alg` the signer produces.
    pub sign_alg: String,
    /// `iat`, `aud`, `nonce` and extras.
    pub claims: KeyBindingClaims,
}

impl std::fmt::Debug for KeyBindingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyBindingConfig")
            .field("sign_alg", &self.sign_alg)
            .field("claims", &self.claims)
            .finish_non_exhaustive()
    }
}

/// Capabilities for presenting.
#[derive(Clone)]
pub struct PresentConfig {
    /// Digest capability.
    pub hasher: Arc<dyn Hasher>,
    /// Attach a fresh KB-JWT when set.
    pub key_binding: Option<KeyBindingConfig>,
}

impl PresentConfig {
    /// Present without key binding.
    pub fn new(hasher: Arc<dyn Hasher>) -> Self {
        Self {
            hasher,
            key_binding: None,
        }
    }

    /// Bind the presentation to the holder key.
    pub fn with_key_binding(mut self, key_binding: KeyBindingConfig) -> Self {
        self.key_binding = Some(key_binding);
        self
    }
}

impl std::fmt::Debug for PresentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentConfig")
            .field("key_binding", &self.key_binding)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Verify
// ---------------------------------------------------------------------------

/// Capabilities for status-list checks.
#[derive(Clone)]
pub struct StatusCheckConfig {
    /// Retrieves status-list JWTs. Required when a credential carries a
    /// status reference.
    pub fetcher: Option<Arc<dyn StatusListFetcher>>,
    /// Verifies status-list JWT signatures. Falls back to the issuer
    /// verifier.
    pub verifier: Option<Arc<dyn Verifier>>,
    /// Judges the fetched status.
    pub validator: Arc<dyn StatusValidator>,
}

impl Default for StatusCheckConfig {
    fn default() -> Self {
        Self {
            fetcher: None,
            verifier: None,
            validator: Arc::new(ValidOnly),
        }
    }
}

/// Capabilities and expectations for verifying.
#[derive(Clone)]
pub struct VerifyConfig {
    /// Digest capability.
    pub hasher: Arc<dyn Hasher>,
    /// Issuer signature verifier.
    pub verifier: Arc<dyn Verifier>,
    /// Key-binding verifier.
    pub kb_verifier: Option<Arc<dyn KeyBindingVerifier>>,
    /// Fail unless a valid KB-JWT is attached.
    pub require_key_binding: bool,
    /// Dotted paths that must be present in the disclosed claims.
    pub required_claim_keys: Vec<String>,
    /// Nonce the KB-JWT must carry.
    pub expected_nonce: Option<String>,
    /// Audience the KB-JWT must carry.
    pub expected_aud: Option<String>,
    /// Fixed "now" in seconds; the system clock when unset.
    pub now: Option<i64>,
    /// Tolerance for time claims, in seconds.
    pub clock_skew_secs: i64,
    /// Status-list capabilities.
    pub status: StatusCheckConfig,
}

impl VerifyConfig {
    /// A config with no key binding, no required claims, and no status
    /// fetcher.
    pub fn new(hasher: Arc<dyn Hasher>, verifier: Arc<dyn Verifier>) -> Self {
        Self {
            hasher,
            verifier,
            kb_verifier: None,
            require_key_binding: false,
            required_claim_keys: Vec::new(),
            expected_nonce: None,
            expected_aud: None,
            now: None,
            clock_skew_secs: 0,
            status: StatusCheckConfig::default(),
        }
    }

    /// Take the clock skew from engine settings.
    pub fn with_settings(mut self, settings: &EngineSettings) -> Self {
        self.clock_skew_secs = settings.clock_skew_secs;
        self
    }

    /// Verify key binding with `kb_verifier`, failing when it is absent
    /// if `required`.
    pub fn with_key_binding(
        mut self,
        kb_verifier: Arc<dyn KeyBindingVerifier>,
        required: bool,
    ) -> Self {
        self.kb_verifier = Some(kb_verifier);
        self.require_key_binding = required;
        self
    }

    /// Require key binding without configuring a verifier.
    pub fn require_key_binding(mut self) -> Self {
        self.require_key_binding = true;
        self
    }

    /// Expect this nonce and audience in the KB-JWT.
    pub fn expect(mut self, nonce: impl Into<String>, aud: impl Into<String>) -> Self {
        self.expected_nonce = Some(nonce.into());
        self.expected_aud = Some(aud.into());
        self
    }

    /// Require the given claim paths.
    pub fn required_claims<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_claim_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Pin "now" (seconds since the epoch).
    pub fn at(mut self, now: i64) -> Self {
        self.now = Some(now);
        self
    }

    /// Fetch status lists with `fetcher`.
    pub fn with_status_fetcher(mut self, fetcher: Arc<dyn StatusListFetcher>) -> Self {
        self.status.fetcher = Some(fetcher);
        self
    }

    /// Verify status-list JWTs with a dedicated verifier.
    pub fn with_status_verifier(mut self, verifier: Arc<dyn Verifier>) -> Self {
        self.status.verifier = Some(verifier);
        self
    }

    /// Replace the status validator.
    pub fn with_status_validator(mut self, validator: Arc<dyn StatusValidator>) -> Self {
        self.status.validator = validator;
        self
    }

    /// The effective current time.
    pub fn now(&self) -> i64 {
        self.now.unwrap_or_else(|| chrono::Utc::now().timestamp())
    }
}

impl std::fmt::Debug for VerifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifyConfig")
            .field("kb_verifier", &self.kb_verifier.is_some())
            .field("require_key_binding", &self.require_key_binding)
            .field("required_claim_keys", &self.required_claim_keys)
            .field("expected_nonce", &self.expected_nonce)
            .field("expected_aud", &self.expected_aud)
            .field("now", &self.now)
            .field("clock_skew_secs", &self.clock_skew_secs)
            .field("status_fetcher", &self.status.fetcher.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_defaults_from_empty_json() {
        let settings: EngineSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, EngineSettings::default());
        assert_eq!(settings.hash_alg, "sha-256");
        assert_eq!(settings.salt_length, 16);
        assert!(!settings.omit_typ);
        assert_eq!(settings.clock_skew_secs, 0);
    }

    #[test]
    fn settings_partial_override() {
        let settings: EngineSettings =
            serde_json::from_str(r#"{"hash_alg": "sha-512", "clock_skew_secs": 30}"#).unwrap();
        assert_eq!(settings.hash_alg, "sha-512");
        assert_eq!(settings.salt_length, 16);
        assert_eq!(settings.clock_skew_secs, 30);
    }
}
