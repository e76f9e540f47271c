//! # SD-JWT Instance
//!
//! The issuer / holder / verifier API. One [`SdJwtInstance`] wraps a
//! [`ProfilePolicy`]; every operation takes the config for that operation.
//!
//! ## Verification Order
//!
//! 1. Decode the compact form; the profile confirms every conditionally
//!    required capability is configured.
//! 2. Issuer signature, header `typ`, then `iat`/`nbf`/`exp`.
//! 3. Unpack; any disclosure the payload never references is rejected.
//! 4. Required claim paths.
//! 5. Key binding, when required or attached.
//! 6. The profile's post-verify hook (status list for SD-JWT VC).
//!
//! The async variants run the same synchronous engine on tokio's blocking
//! pool.

use std::sync::Arc;

use serde_json::{Map, Value};

use sdjwt_core::{
    DisclosureFrame, Hasher, HasherAndAlg, Jwt, KbExpectations, KeyBindingClaims, Packer,
    PresentationFrame, SdJwt, SdJwtError, SdJwtResult, SD_ALG,
};

use crate::config::{IssueConfig, PresentConfig, VerifyConfig};
use crate::profile::{BaseProfile, ProfilePolicy, VcProfile, VerifyContext};

/// A credential that passed verification.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedSdJwt {
    /// Issuer JWT header.
    pub header: Map<String, Value>,
    /// Disclosed claims.
    pub claims: Value,
    /// Key-binding claims, when a KB-JWT was verified.
    pub kb: Option<KeyBindingClaims>,
}

/// Issuer, holder, and verifier operations under one profile.
#[derive(Debug, Clone)]
pub struct SdJwtInstance {
    profile: Arc<dyn ProfilePolicy>,
}

impl Default for SdJwtInstance {
    fn default() -> Self {
        Self::base()
    }
}

impl SdJwtInstance {
    /// An instance using `profile`.
    pub fn new(profile: impl ProfilePolicy + 'static) -> Self {
        Self {
            profile: Arc::new(profile),
        }
    }

    /// Plain SD-JWT.
    pub fn base() -> Self {
        Self::new(BaseProfile)
    }

    /// SD-JWT VC.
    pub fn vc() -> Self {
        Self::new(VcProfile)
    }

    /// The active profile.
    pub fn profile(&self) -> &dyn ProfilePolicy {
        self.profile.as_ref()
    }

    // -----------------------------------------------------------------------
    // Issuer
    // -----------------------------------------------------------------------

    /// Pack `payload` under `frame`, sign it, and return the compact form.
    ///
    /// `extra_header` entries are merged over the profile `typ`; `alg` always
    /// comes from the config.
    pub fn issue(
        &self,
        config: &IssueConfig,
        payload: &Value,
        frame: Option<&DisclosureFrame>,
        extra_header: Option<&Map<String, Value>>,
    ) -> SdJwtResult<String> {
        let claims = payload.as_object().ok_or_else(|| {
            SdJwtError::Malformed("credential payload must be a JSON object".to_string())
        })?;
        self.profile.check_disclosure_frame(frame)?;
        self.profile.check_issue_payload(claims)?;

        let settings = &config.settings;
        let hash = HasherAndAlg::new(config.hasher.as_ref(), &settings.hash_alg);
        let packed = Packer::new(hash, config.salt_generator.as_ref())
            .salt_length(settings.salt_length)
            .pack(payload, frame)?;

        let Value::Object(mut packed_claims) = packed.claims else {
            return Err(SdJwtError::Malformed(
                "packed payload must be a JSON object".to_string(),
            ));
        };
        if frame.is_some() {
            packed_claims.insert(SD_ALG.to_string(), Value::from(settings.hash_alg.as_str()));
        }

        let mut header = Map::new();
        if !settings.omit_typ {
            header.insert("typ".to_string(), Value::from(self.profile.default_typ()));
        }
        if let Some(extra) = extra_header {
            header.extend(extra.clone());
        }
        header.insert("alg".to_string(), Value::from(config.sign_alg.as_str()));

        let jwt = Jwt::new(header, packed_claims).sign(config.signer.as_ref())?;
        tracing::debug!(
            profile = self.profile.name(),
            disclosures = packed.disclosures.len(),
            "issued credential"
        );
        SdJwt::new(jwt, packed.disclosures, None).encode()
    }

    // -----------------------------------------------------------------------
    // Holder
    // -----------------------------------------------------------------------

    /// Present the claims selected by `frame`; no frame reveals nothing.
    pub fn present(
        &self,
        config: &PresentConfig,
        compact: &str,
        frame: Option<&PresentationFrame>,
    ) -> SdJwtResult<String> {
        let paths = frame.map(PresentationFrame::paths).unwrap_or_default();
        self.present_paths(config, compact, &paths)
    }

    /// Present the claims at the given dotted paths.
    ///
    /// With a key-binding config a fresh KB-JWT replaces any attached one;
    /// otherwise an attached KB-JWT is carried over unchanged.
    pub fn present_paths<S: AsRef<str>>(
        &self,
        config: &PresentConfig,
        compact: &str,
        paths: &[S],
    ) -> SdJwtResult<String> {
        let sd_jwt = SdJwt::decode(compact)?;
        let mut presented = sd_jwt.present(paths, config.hasher.as_ref())?;
        presented = match &config.key_binding {
            Some(kb) => presented.with_key_binding(
                &kb.claims,
                kb.signer.as_ref(),
                &kb.sign_alg,
                config.hasher.as_ref(),
            )?,
            None => SdJwt {
                kb_jwt: sd_jwt.kb_jwt,
                ..presented
            },
        };
        tracing::debug!(
            disclosures = presented.disclosures.len(),
            bound = presented.is_bound(),
            "presented credential"
        );
        presented.encode()
    }

    // -----------------------------------------------------------------------
    // Verifier
    // -----------------------------------------------------------------------

    /// Check the issuer signature, header, time claims, and disclosures.
    /// Key binding and profile hooks are not run.
    pub fn validate(&self, config: &VerifyConfig, compact: &str) -> SdJwtResult<VerifiedSdJwt> {
        let sd_jwt = SdJwt::decode(compact)?;
        self.validate_decoded(config, &sd_jwt, config.now())
    }

    fn validate_decoded(
        &self,
        config: &VerifyConfig,
        sd_jwt: &SdJwt,
        now: i64,
    ) -> SdJwtResult<VerifiedSdJwt> {
        let jwt = &sd_jwt.jwt;
        jwt.verify(config.verifier.as_ref())?;
        if !self.profile.accepts_typ(jwt.typ()) {
            tracing::warn!(
                profile = self.profile.name(),
                typ = ?jwt.typ(),
                "unexpected credential typ"
            );
            return Err(SdJwtError::Verification(format!(
                "typ {:?} is not accepted by the {} profile",
                jwt.typ(),
                self.profile.name()
            )));
        }
        jwt.validate_time(now, config.clock_skew_secs)?;

        let unpacked = sd_jwt.unpack(config.hasher.as_ref())?;
        if !unpacked.unreferenced.is_empty() {
            tracing::warn!(
                count = unpacked.unreferenced.len(),
                "presentation carries unreferenced disclosures"
            );
            return Err(SdJwtError::Verification(format!(
                "{} disclosure(s) are not referenced by the payload",
                unpacked.unreferenced.len()
            )));
        }

        Ok(VerifiedSdJwt {
            header: jwt.header().clone(),
            claims: unpacked.claims,
            kb: None,
        })
    }

    /// Full verification: [`validate`](Self::validate), required claims,
    /// key binding, and the profile's post-verify checks.
    pub fn verify(&self, config: &VerifyConfig, compact: &str) -> SdJwtResult<VerifiedSdJwt> {
        if config.require_key_binding && config.kb_verifier.is_none() {
            return Err(SdJwtError::Configuration(
                "key binding is required but no key binding verifier is configured".to_string(),
            ));
        }
        let sd_jwt = SdJwt::decode(compact)?;
        self.profile.check_verify_config(sd_jwt.jwt.payload(), config)?;

        let now = config.now();
        let mut verified = self.validate_decoded(config, &sd_jwt, now)?;

        let missing: Vec<&str> = config
            .required_claim_keys
            .iter()
            .map(String::as_str)
            .filter(|path| lookup_path(&verified.claims, path).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(SdJwtError::Verification(format!(
                "missing required claims: {}",
                missing.join(", ")
            )));
        }

        match (&sd_jwt.kb_jwt, &config.kb_verifier) {
            (None, _) if config.require_key_binding => {
                return Err(SdJwtError::Verification(
                    "key binding is required but the presentation is unbound".to_string(),
                ));
            }
            (None, _) => {}
            (Some(_), None) => {
                tracing::debug!("key binding JWT attached but no verifier configured; ignored");
            }
            (Some(kb), Some(kb_verifier)) => {
                let expect = KbExpectations {
                    nonce: config.expected_nonce.as_deref(),
                    aud: config.expected_aud.as_deref(),
                };
                let kb_claims = sd_jwt.verify_key_binding(
                    kb_verifier.as_ref(),
                    &verified.claims,
                    config.hasher.as_ref(),
                    expect,
                )?;
                kb.validate_time(now, config.clock_skew_secs)?;
                verified.kb = Some(kb_claims);
            }
        }

        self.profile
            .after_verify(&verified, &VerifyContext { config, now })?;
        tracing::debug!(
            profile = self.profile.name(),
            bound = verified.kb.is_some(),
            "verified credential"
        );
        Ok(verified)
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// Parse the compact form.
    pub fn decode(&self, compact: &str) -> SdJwtResult<SdJwt> {
        SdJwt::decode(compact)
    }

    /// Serialize to the compact form.
    pub fn encode(&self, sd_jwt: &SdJwt) -> SdJwtResult<String> {
        sd_jwt.encode()
    }

    /// Every dotted path of the disclosed claims.
    pub fn keys(&self, hasher: &dyn Hasher, compact: &str) -> SdJwtResult<Vec<String>> {
        SdJwt::decode(compact)?.keys(hasher)
    }

    /// The paths a holder can choose to present.
    pub fn presentable_keys(
        &self,
        hasher: &dyn Hasher,
        compact: &str,
    ) -> SdJwtResult<Vec<String>> {
        SdJwt::decode(compact)?.presentable_keys(hasher)
    }

    /// The disclosed claims, without any signature check.
    pub fn get_claims(&self, hasher: &dyn Hasher, compact: &str) -> SdJwtResult<Value> {
        SdJwt::decode(compact)?.claims(hasher)
    }

    // -----------------------------------------------------------------------
    // Async
    // -----------------------------------------------------------------------

    /// [`issue`](Self::issue) on the blocking pool.
    pub async fn issue_async(
        &self,
        config: IssueConfig,
        payload: Value,
        frame: Option<DisclosureFrame>,
        extra_header: Option<Map<String, Value>>,
    ) -> SdJwtResult<String> {
        let this = self.clone();
        run_blocking(move || this.issue(&config, &payload, frame.as_ref(), extra_header.as_ref()))
            .await
    }

    /// [`present`](Self::present) on the blocking pool.
    pub async fn present_async(
        &self,
        config: PresentConfig,
        compact: String,
        frame: Option<PresentationFrame>,
    ) -> SdJwtResult<String> {
        let this = self.clone();
        run_blocking(move || this.present(&config, &compact, frame.as_ref())).await
    }

    /// [`verify`](Self::verify) on the blocking pool.
    pub async fn verify_async(
        &self,
        config: VerifyConfig,
        compact: String,
    ) -> SdJwtResult<VerifiedSdJwt> {
        let this = self.clone();
        run_blocking(move || this.verify(&config, &compact)).await
    }

    /// [`validate`](Self::validate) on the blocking pool.
    pub async fn validate_async(
        &self,
        config: VerifyConfig,
        compact: String,
    ) -> SdJwtResult<VerifiedSdJwt> {
        let this = self.clone();
        run_blocking(move || this.validate(&config, &compact)).await
    }

    /// [`keys`](Self::keys) on the blocking pool.
    pub async fn keys_async(
        &self,
        hasher: Arc<dyn Hasher>,
        compact: String,
    ) -> SdJwtResult<Vec<String>> {
        let this = self.clone();
        run_blocking(move || this.keys(hasher.as_ref(), &compact)).await
    }

    /// [`presentable_keys`](Self::presentable_keys) on the blocking pool.
    pub async fn presentable_keys_async(
        &self,
        hasher: Arc<dyn Hasher>,
        compact: String,
    ) -> SdJwtResult<Vec<String>> {
        let this = self.clone();
        run_blocking(move || this.presentable_keys(hasher.as_ref(), &compact)).await
    }

    /// [`get_claims`](Self::get_claims) on the blocking pool.
    pub async fn get_claims_async(
        &self,
        hasher: Arc<dyn Hasher>,
        compact: String,
    ) -> SdJwtResult<Value> {
        let this = self.clone();
        run_blocking(move || this.get_claims(hasher.as_ref(), &compact)).await
    }
}

async fn run_blocking<T, F>(f: F) -> SdJwtResult<T>
where
    F: FnOnce() -> SdJwtResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SdJwtError::Configuration(format!("engine task failed: {e}")))?
}

/// Resolve a dotted path, with decimal segments indexing arrays.
fn lookup_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(value, |node, segment| match node {
        Value::Object(obj) => obj.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
