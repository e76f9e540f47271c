//! # Compact Serialization
//!
//! `<JWT>~<D1>~...~<Dn>~[<KB-JWT>]`
//!
//! Once a `~` appears the final segment is always present: empty when there
//! is no key-binding JWT. A string with no `~` at all is a plain JWT with no
//! disclosures.

use serde_json::Value;

use crate::disclosure::Disclosure;
use crate::error::{SdJwtError, SdJwtResult};
use crate::jwt::Jwt;
use crate::present::select_disclosures;
use crate::traits::Hasher;
use crate::unpack::{sd_alg_entry, unpack, Unpacked};
use crate::{join_path, SD_ALG, SEPARATOR};

/// A decoded SD-JWT: issuer JWT, disclosures, optional key-binding JWT.
#[derive(Debug, Clone, PartialEq)]
pub struct SdJwt {
    /// The issuer-signed JWT.
    pub jwt: Jwt,
    /// Disclosures in wire order.
    pub disclosures: Vec<Disclosure>,
    /// The key-binding JWT, if any.
    pub kb_jwt: Option<Jwt>,
}

impl SdJwt {
    /// Assemble from parts.
    pub fn new(jwt: Jwt, disclosures: Vec<Disclosure>, kb_jwt: Option<Jwt>) -> Self {
        Self {
            jwt,
            disclosures,
            kb_jwt,
        }
    }

    /// Parse the compact form.
    pub fn decode(compact: &str) -> SdJwtResult<Self> {
        let Some((jwt, rest)) = compact.split_once(SEPARATOR) else {
            return Ok(Self::new(Jwt::decode(compact)?, Vec::new(), None));
        };
        let jwt = Jwt::decode(jwt)?;

        let mut segments: Vec<&str> = rest.split(SEPARATOR).collect();
        // `split` always yields at least one segment.
        let kb = segments.pop().unwrap_or_default();
        let kb_jwt = if kb.is_empty() {
            None
        } else {
            Some(Jwt::decode(kb)?)
        };

        let disclosures = segments
            .into_iter()
            .map(|segment| {
                if segment.is_empty() {
                    Err(SdJwtError::Malformed("empty disclosure segment".to_string()))
                } else {
                    Disclosure::from_encoded(segment)
                }
            })
            .collect::<SdJwtResult<Vec<_>>>()?;

        Ok(Self::new(jwt, disclosures, kb_jwt))
    }

    /// The compact form: always ends with the KB segment, empty if unbound.
    pub fn encode(&self) -> SdJwtResult<String> {
        let mut out = self.encode_without_kb()?;
        if let Some(kb) = &self.kb_jwt {
            out.push_str(&kb.encode()?);
        }
        Ok(out)
    }

    /// `<JWT>~<D1>~...~<Dn>~`: the input to `sd_hash`.
    pub fn encode_without_kb(&self) -> SdJwtResult<String> {
        let mut out = self.jwt.encode()?;
        out.push(SEPARATOR);
        for disclosure in &self.disclosures {
            out.push_str(disclosure.encode());
            out.push(SEPARATOR);
        }
        Ok(out)
    }

    /// Whether a key-binding JWT is attached.
    pub fn is_bound(&self) -> bool {
        self.kb_jwt.is_some()
    }

    /// The issuer payload's `_sd_alg`, defaulting to `sha-256`.
    pub fn sd_alg(&self) -> SdJwtResult<&str> {
        sd_alg_entry(self.jwt.payload().get(SD_ALG))
    }

    /// Unpack the payload with the attached disclosures.
    pub fn unpack(&self, hasher: &dyn Hasher) -> SdJwtResult<Unpacked> {
        unpack(&self.jwt.payload_value(), &self.disclosures, hasher)
    }

    /// The disclosed claims.
    pub fn claims(&self, hasher: &dyn Hasher) -> SdJwtResult<Value> {
        Ok(self.unpack(hasher)?.claims)
    }

    /// Every dotted path in the disclosed claims, array indices included,
    /// in traversal order.
    pub fn keys(&self, hasher: &dyn Hasher) -> SdJwtResult<Vec<String>> {
        let claims = self.claims(hasher)?;
        let mut out = Vec::new();
        list_keys(&claims, "", &mut out);
        Ok(out)
    }

    /// The sorted paths a holder can choose to present.
    pub fn presentable_keys(&self, hasher: &dyn Hasher) -> SdJwtResult<Vec<String>> {
        Ok(self.unpack(hasher)?.disclosure_keymap.into_keys().collect())
    }

    /// A copy keeping only the disclosures needed for `paths`, with the
    /// key-binding JWT dropped.
    pub fn present<S: AsRef<str>>(&self, paths: &[S], hasher: &dyn Hasher) -> SdJwtResult<Self> {
        let disclosures = select_disclosures(self, paths, hasher)?;
        Ok(Self::new(self.jwt.clone(), disclosures, None))
    }
}

fn list_keys(value: &Value, prefix: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(obj) => {
            for (key, child) in obj {
                let path = join_path(prefix, key);
                out.push(path.clone());
                list_keys(child, &path, out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                let path = join_path(prefix, &index.to_string());
                out.push(path.clone());
                list_keys(child, &path, out);
            }
        }
        _ => {}
    }
}
