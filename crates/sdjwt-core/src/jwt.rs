//! # JWT Envelope
//!
//! A compact JWS (`header.payload.signature`) with JSON object header and
//! payload.
//!
//! ## Security Invariant
//!
//! A decoded [`Jwt`] keeps the header and payload segments exactly as
//! received. Its signing input and re-encoding reuse those bytes, so a
//! signature is always checked against what the issuer actually signed.

use serde_json::{Map, Value};

use crate::encoding::{b64url_decode_object, b64url_encode_json};
use crate::error::{SdJwtError, SdJwtResult};
use crate::traits::{Signer, Verifier};

/// A JWT in compact serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct Jwt {
    header: Map<String, Value>,
    payload: Map<String, Value>,
    encoded_header: String,
    encoded_payload: String,
    signature: Option<String>,
}

impl Jwt {
    /// An unsigned JWT from a header and payload.
    pub fn new(header: Map<String, Value>, payload: Map<String, Value>) -> Self {
        let encoded_header = b64url_encode_json(&Value::Object(header.clone()));
        let encoded_payload = b64url_encode_json(&Value::Object(payload.clone()));
        Self {
            header,
            payload,
            encoded_header,
            encoded_payload,
            signature: None,
        }
    }

    /// Parse `header.payload.signature`.
    pub fn decode(token: &str) -> SdJwtResult<Self> {
        let parts: Vec<&str> = token.split('.').collect();
        let [header_b64, payload_b64, signature] = parts.as_slice() else {
            return Err(SdJwtError::Malformed(format!(
                "JWT must have 3 parts, got {}",
                parts.len()
            )));
        };
        Ok(Self {
            header: b64url_decode_object(header_b64, "JWT header")?,
            payload: b64url_decode_object(payload_b64, "JWT payload")?,
            encoded_header: (*header_b64).to_string(),
            encoded_payload: (*payload_b64).to_string(),
            signature: Some((*signature).to_string()),
        })
    }

    /// The JOSE header.
    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    /// The claims.
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// The claims as a JSON value.
    pub fn payload_value(&self) -> Value {
        Value::Object(self.payload.clone())
    }

    /// The base64url signature, if signed.
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// A string header parameter.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.header.get(name).and_then(Value::as_str)
    }

    /// The `alg` header parameter.
    pub fn alg(&self) -> Option<&str> {
        self.header_str("alg")
    }

    /// The `typ` header parameter.
    pub fn typ(&self) -> Option<&str> {
        self.header_str("typ")
    }

    /// `base64url(header) || '.' || base64url(payload)`.
    pub fn signing_input(&self) -> String {
        format!("{}.{}", self.encoded_header, self.encoded_payload)
    }

    /// Sign the JWT, replacing any previous signature.
    pub fn sign(mut self, signer: &dyn Signer) -> SdJwtResult<Self> {
        self.signature = Some(signer.sign(&self.signing_input())?);
        Ok(self)
    }

    /// The compact serialization. Fails on an unsigned JWT.
    pub fn encode(&self) -> SdJwtResult<String> {
        let signature = self
            .signature
            .as_deref()
            .ok_or_else(|| SdJwtError::Malformed("JWT is not signed".to_string()))?;
        Ok(format!("{}.{}", self.signing_input(), signature))
    }

    /// Check the signature with `verifier`.
    pub fn verify(&self, verifier: &dyn Verifier) -> SdJwtResult<()> {
        let signature = self
            .signature
            .as_deref()
            .ok_or_else(|| SdJwtError::InvalidSignature("JWT is not signed".to_string()))?;
        if verifier.verify(&self.signing_input(), signature)? {
            Ok(())
        } else {
            tracing::warn!(alg = ?self.alg(), "JWT signature rejected");
            Err(SdJwtError::InvalidSignature(
                "signature verification failed".to_string(),
            ))
        }
    }

    /// An optional integer claim. Present but non-integer is malformed.
    pub fn numeric_claim(&self, name: &str) -> SdJwtResult<Option<i64>> {
        match self.payload.get(name) {
            None => Ok(None),
            Some(value) => value.as_i64().map(Some).ok_or_else(|| {
                SdJwtError::Malformed(format!("`{name}` must be an integer timestamp"))
            }),
        }
    }

    /// Check `iat`, `nbf` and `exp` against `now` (seconds since the epoch)
    /// with `skew` seconds of tolerance.
    pub fn validate_time(&self, now: i64, skew: i64) -> SdJwtResult<()> {
        if let Some(iat) = self.numeric_claim("iat")? {
            if iat > now + skew {
                return Err(SdJwtError::Verification(format!(
                    "issued in the future (iat {iat}, now {now})"
                )));
            }
        }
        if let Some(nbf) = self.numeric_claim("nbf")? {
            if nbf > now + skew {
                return Err(SdJwtError::Verification(format!(
                    "not yet valid (nbf {nbf}, now {now})"
                )));
            }
        }
        if let Some(exp) = self.numeric_claim("exp")? {
            if exp < now - skew {
                return Err(SdJwtError::Verification(format!(
                    "expired (exp {exp}, now {now})"
                )));
            }
        }
        Ok(())
    }
}
