//! # Profiles
//!
//! A [`ProfilePolicy`] layers credential-format rules over the generic
//! engine: the header `typ`, which claims may be selectively disclosed,
//! what an issued payload must contain, and checks that run after a
//! successful verification.
//!
//! - [`BaseProfile`]: plain SD-JWT, `typ = "sd-jwt"`, no extra rules.
//! - [`VcProfile`]: SD-JWT VC. Protected claims stay in the clear, `vct` is
//!   mandatory, and a `status.status_list` reference is checked against the
//!   published status list.

use serde_json::{json, Map, Value};

use sdjwt_core::{DisclosureFrame, SdJwtError, SdJwtResult};
use sdjwt_status::{StatusListReference, StatusListToken};

use crate::config::VerifyConfig;
use crate::instance::VerifiedSdJwt;

/// Context handed to [`ProfilePolicy::after_verify`].
#[derive(Debug, Clone, Copy)]
pub struct VerifyContext<'a> {
    /// The verifier's configuration.
    pub config: &'a VerifyConfig,
    /// The time the verification ran at.
    pub now: i64,
}

/// Format rules injected into an [`SdJwtInstance`](crate::SdJwtInstance).
pub trait ProfilePolicy: Send + Sync + std::fmt::Debug {
    /// Short profile name for logs.
    fn name(&self) -> &'static str;

    /// `typ` written to the issuer header.
    fn default_typ(&self) -> &'static str;

    /// Whether an issuer header `typ` is acceptable on verification.
    fn accepts_typ(&self, _typ: Option<&str>) -> bool {
        true
    }

    /// Reject disclosure frames the profile forbids.
    fn check_disclosure_frame(&self, _frame: Option<&DisclosureFrame>) -> SdJwtResult<()> {
        Ok(())
    }

    /// Reject issue payloads the profile forbids.
    fn check_issue_payload(&self, _payload: &Map<String, Value>) -> SdJwtResult<()> {
        Ok(())
    }

    /// Check, before any signature work, that `config` has every capability
    /// this credential will need.
    fn check_verify_config(
        &self,
        _payload: &Map<String, Value>,
        _config: &VerifyConfig,
    ) -> SdJwtResult<()> {
        Ok(())
    }

    /// Extra checks on a verified credential.
    fn after_verify(&self, _verified: &VerifiedSdJwt, _ctx: &VerifyContext<'_>) -> SdJwtResult<()> {
        Ok(())
    }
}

/// Plain SD-JWT.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseProfile;

impl ProfilePolicy for BaseProfile {
    fn name(&self) -> &'static str {
        "sd-jwt"
    }

    fn default_typ(&self) -> &'static str {
        "sd-jwt"
    }
}

/// `typ` of an SD-JWT VC.
pub const VC_TYP: &str = "dc+sd-jwt";

/// Earlier `typ` of an SD-JWT VC, still accepted on verification.
pub const LEGACY_VC_TYP: &str = "vc+sd-jwt";

/// Top-level claims an SD-JWT VC issuer must not make selectively
/// disclosable.
pub const PROTECTED_CLAIMS: [&str; 6] = ["iss", "nbf", "exp", "cnf", "vct", "status"];

/// SD-JWT VC.
#[derive(Debug, Clone, Copy, Default)]
pub struct VcProfile;

impl ProfilePolicy for VcProfile {
    fn name(&self) -> &'static str {
        "sd-jwt-vc"
    }

    fn default_typ(&self) -> &'static str {
        VC_TYP
    }

    fn accepts_typ(&self, typ: Option<&str>) -> bool {
        matches!(typ, Some(VC_TYP) | Some(LEGACY_VC_TYP))
    }

    fn check_disclosure_frame(&self, frame: Option<&DisclosureFrame>) -> SdJwtResult<()> {
        let Some(frame) = frame else {
            return Ok(());
        };
        let protected: Vec<&str> = frame
            .redacted()
            .iter()
            .map(String::as_str)
            .filter(|key| PROTECTED_CLAIMS.contains(key))
            .collect();
        if protected.is_empty() {
            Ok(())
        } else {
            Err(SdJwtError::policy_with_detail(
                format!("Cannot disclose protected field: {}", protected.join(", ")),
                json!({ "fields": protected }),
            ))
        }
    }

    fn check_issue_payload(&self, payload: &Map<String, Value>) -> SdJwtResult<()> {
        match payload.get("vct") {
            Some(Value::String(_)) => Ok(()),
            _ => Err(SdJwtError::Malformed(
                "SD-JWT VC payload requires a string `vct` claim".to_string(),
            )),
        }
    }

    fn check_verify_config(
        &self,
        payload: &Map<String, Value>,
        config: &VerifyConfig,
    ) -> SdJwtResult<()> {
        let has_status = payload
            .get("status")
            .and_then(|s| s.get("status_list"))
            .is_some();
        if has_status && config.status.fetcher.is_none() {
            return Err(SdJwtError::Configuration(
                "credential carries a status list reference but no status list fetcher is configured"
                    .to_string(),
            ));
        }
        Ok(())
    }

    fn after_verify(&self, verified: &VerifiedSdJwt, ctx: &VerifyContext<'_>) -> SdJwtResult<()> {
        if !matches!(verified.claims.get("vct"), Some(Value::String(_))) {
            return Err(SdJwtError::Verification(
                "SD-JWT VC is missing the `vct` claim".to_string(),
            ));
        }
        match StatusListReference::from_claims(&verified.claims)? {
            Some(reference) => check_status(&reference, ctx),
            None => Ok(()),
        }
    }
}

fn check_status(reference: &StatusListReference, ctx: &VerifyContext<'_>) -> SdJwtResult<()> {
    let status = &ctx.config.status;
    let fetcher = status.fetcher.as_ref().ok_or_else(|| {
        SdJwtError::Configuration("no status list fetcher is configured".to_string())
    })?;

    let token = StatusListToken::decode(&fetcher.fetch(&reference.uri)?)?;
    let verifier = status.verifier.as_ref().unwrap_or(&ctx.config.verifier);
    token.jwt.verify(&**verifier)?;

    if token.payload.sub != reference.uri {
        return Err(SdJwtError::Verification(format!(
            "status list sub `{}` does not match reference uri `{}`",
            token.payload.sub, reference.uri
        )));
    }
    if token.is_expired(ctx.now) {
        return Err(SdJwtError::Verification(format!(
            "status list at `{}` has expired",
            reference.uri
        )));
    }

    let value = token.status(reference.idx)?;
    tracing::debug!(
        uri = %reference.uri,
        idx = reference.idx,
        status = value,
        "checked credential status"
    );
    status.validator.validate(value).map_err(|e| {
        tracing::warn!(
            uri = %reference.uri,
            idx = reference.idx,
            error = %e,
            "credential status rejected"
        );
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vc_rejects_protected_top_level_redaction() {
        for field in PROTECTED_CLAIMS {
            let frame = DisclosureFrame::new().sd(["given_name", field]);
            let err = VcProfile.check_disclosure_frame(Some(&frame)).unwrap_err();
            assert_eq!(err.code(), "policy_violation");
            assert!(err.to_string().contains("Cannot disclose protected field"));
            assert_eq!(err.detail(), Some(&json!({"fields": [field]})));
        }
    }

    #[test]
    fn vc_allows_protected_names_below_top_level() {
        let frame = DisclosureFrame::new().child("address", DisclosureFrame::new().sd(["iss"]));
        VcProfile.check_disclosure_frame(Some(&frame)).unwrap();
        VcProfile.check_disclosure_frame(None).unwrap();
    }

    #[test]
    fn vc_requires_vct_on_issue() {
        let mut payload = Map::new();
        assert!(VcProfile.check_issue_payload(&payload).is_err());
        payload.insert("vct".to_string(), json!(42));
        assert!(VcProfile.check_issue_payload(&payload).is_err());
        payload.insert("vct".to_string(), json!("https://credentials.example/id"));
        VcProfile.check_issue_payload(&payload).unwrap();
    }

    #[test]
    fn typ_acceptance() {
        assert!(VcProfile.accepts_typ(Some("dc+sd-jwt")));
        assert!(VcProfile.accepts_typ(Some("vc+sd-jwt")));
        assert!(!VcProfile.accepts_typ(Some("sd-jwt")));
        assert!(!VcProfile.accepts_typ(None));
        assert!(BaseProfile.accepts_typ(None));
        assert_eq!(BaseProfile.default_typ(), "sd-jwt");
        assert_eq!(VcProfile.default_typ(), "dc+sd-jwt");
    }

    #[test]
    fn base_profile_allows_everything() {
        let frame = DisclosureFrame::new().sd(["iss", "vct"]);
        BaseProfile.check_disclosure_frame(Some(&frame)).unwrap();
        BaseProfile.check_issue_payload(&Map::new()).unwrap();
    }
}
