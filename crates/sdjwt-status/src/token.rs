//! # Status-List Token
//!
//! The signed JWT that publishes a [`StatusList`], and the reference a
//! credential carries to point into it.
//!
//! Status-list JWT:
//!
//! ```json
//! header:  { "typ": "statuslist+jwt", "alg": "..." }
//! payload: { "iss": "...", "sub": "<list uri>", "iat": 1700000000,
//!            "ttl": 43200, "exp": 1700086400,
//!            "status_list": { "bits": 1, "lst": "eNrbuRgAAhcBXQ" } }
//! ```
//!
//! Credential side: `{"status": {"status_list": {"idx": 0, "uri": "..."}}}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use sdjwt_core::{Jwt, SdJwtError, SdJwtResult, Signer};

use crate::status_list::StatusList;

/// `typ` header value of a status-list JWT.
pub const STATUS_LIST_JWT_TYP: &str = "statuslist+jwt";

/// The `status_list` claim of a status-list JWT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusListClaim {
    /// Bits per status.
    pub bits: u8,
    /// Compressed, base64url-encoded list.
    pub lst: String,
}

/// Payload of a status-list JWT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusListPayload {
    /// Issuer of the list.
    pub iss: String,
    /// The list's own URI; must equal the credential's reference `uri`.
    pub sub: String,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Suggested cache lifetime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
    /// The encoded list.
    pub status_list: StatusListClaim,
    /// Further claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A credential's pointer into a status list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusListReference {
    /// Index of the credential's entry.
    pub idx: usize,
    /// URI of the status-list JWT.
    pub uri: String,
}

impl StatusListReference {
    /// The `status` claim value pointing at this entry.
    pub fn to_status_claim(&self) -> Value {
        serde_json::json!({ "status_list": { "idx": self.idx, "uri": self.uri } })
    }

    /// Read `status.status_list` from credential claims.
    ///
    /// Returns `Ok(None)` when the credential carries no status list
    /// reference and `Malformed` when one is present but ill-shaped.
    pub fn from_claims(claims: &Value) -> SdJwtResult<Option<Self>> {
        let Some(reference) = claims.get("status").and_then(|s| s.get("status_list")) else {
            return Ok(None);
        };
        serde_json::from_value(reference.clone())
            .map(Some)
            .map_err(|e| SdJwtError::Malformed(format!("invalid status_list reference: {e}")))
    }
}

/// Claims for a new status-list JWT, minus the list itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusListTokenClaims {
    /// Issuer.
    pub iss: String,
    /// The list URI.
    pub sub: String,
    /// Issued-at.
    pub iat: i64,
    /// Optional expiry.
    pub exp: Option<i64>,
    /// Optional cache lifetime.
    pub ttl: Option<u64>,
}

/// Encode `list` and sign it into a compact status-list JWT.
pub fn create_status_list_jwt(
    list: &StatusList,
    claims: &StatusListTokenClaims,
    signer: &dyn Signer,
    sign_alg: &str,
) -> SdJwtResult<String> {
    let payload = StatusListPayload {
        iss: claims.iss.clone(),
        sub: claims.sub.clone(),
        iat: claims.iat,
        exp: claims.exp,
        ttl: claims.ttl,
        status_list: StatusListClaim {
            bits: list.bits(),
            lst: list.encode()?,
        },
        extra: Map::new(),
    };
    let Value::Object(payload) = serde_json::to_value(&payload)? else {
        return Err(SdJwtError::Malformed(
            "status list payload must serialize to an object".to_string(),
        ));
    };
    let mut header = Map::new();
    header.insert("typ".to_string(), Value::from(STATUS_LIST_JWT_TYP));
    header.insert("alg".to_string(), Value::from(sign_alg));

    tracing::debug!(sub = %claims.sub, entries = list.len(), "signing status list");
    Jwt::new(header, payload).sign(signer)?.encode()
}

/// A parsed, not yet verified, status-list JWT.
#[derive(Debug, Clone)]
pub struct StatusListToken {
    /// The JWT, for signature verification.
    pub jwt: Jwt,
    /// The typed payload.
    pub payload: StatusListPayload,
    /// The decoded list.
    pub list: StatusList,
}

impl StatusListToken {
    /// Parse a compact status-list JWT.
    ///
    /// Checks `typ` and the required claims and decodes the list. The
    /// signature is not checked here.
    pub fn decode(token: &str) -> SdJwtResult<Self> {
        let jwt = Jwt::decode(token)?;
        if jwt.typ() != Some(STATUS_LIST_JWT_TYP) {
            return Err(SdJwtError::StatusList(format!(
                "status list JWT typ must be `{STATUS_LIST_JWT_TYP}`, got {:?}",
                jwt.typ()
            )));
        }
        let payload: StatusListPayload = serde_json::from_value(jwt.payload_value())
            .map_err(|e| SdJwtError::StatusList(format!("invalid status list payload: {e}")))?;
        let list = StatusList::decode(&payload.status_list.lst, payload.status_list.bits)?;
        Ok(Self { jwt, payload, list })
    }

    /// Whether `exp` has passed at `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        self.payload.exp.is_some_and(|exp| exp < now)
    }

    /// The status at `idx`.
    pub fn status(&self, idx: usize) -> SdJwtResult<u8> {
        self.list.get(idx)
    }
}
