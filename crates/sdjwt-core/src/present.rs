//! # Presenter
//!
//! Reduces a credential's disclosures to exactly those a holder asked for.
//!
//! A requested path is accepted when it names a disclosable claim, or when
//! it is a strict ancestor of another requested path (the parent entries a
//! nested [`PresentationFrame`](crate::PresentationFrame) emits). Everything
//! else is a policy violation listing the offending paths.
//!
//! For each accepted path the disclosure at that path and the disclosures
//! of all its disclosable ancestors are selected, so a revealed claim never
//! hangs below a container the verifier cannot see. The result keeps the
//! credential's original disclosure order.

use std::collections::HashSet;

use serde_json::json;

use crate::compact::SdJwt;
use crate::disclosure::Disclosure;
use crate::error::{SdJwtError, SdJwtResult};
use crate::traits::{Hasher, HasherAndAlg};

/// Select the disclosures needed to reveal `paths`.
pub fn select_disclosures<S: AsRef<str>>(
    sd_jwt: &SdJwt,
    paths: &[S],
    hasher: &dyn Hasher,
) -> SdJwtResult<Vec<Disclosure>> {
    if paths.is_empty() {
        return Ok(Vec::new());
    }
    let keymap = sd_jwt.unpack(hasher)?.disclosure_keymap;
    let requested: Vec<&str> = paths.iter().map(AsRef::as_ref).collect();

    let invalid: Vec<&str> = requested
        .iter()
        .copied()
        .filter(|path| {
            !keymap.contains_key(*path)
                && !requested.iter().any(|other| is_strict_ancestor(path, other))
        })
        .collect();
    if !invalid.is_empty() {
        tracing::warn!(paths = ?invalid, "presentation requests undisclosable paths");
        return Err(SdJwtError::policy_with_detail(
            format!("invalid presentation paths: {}", invalid.join(", ")),
            json!({ "paths": invalid }),
        ));
    }

    let mut selected: HashSet<&str> = HashSet::new();
    for path in &requested {
        for prefix in self_and_ancestors(path) {
            if let Some(digest) = keymap.get(prefix) {
                selected.insert(digest.as_str());
            }
        }
    }

    let hash = HasherAndAlg::new(hasher, sd_jwt.sd_alg()?);
    let mut out = Vec::with_capacity(selected.len());
    for disclosure in &sd_jwt.disclosures {
        if selected.contains(disclosure.digest(&hash)?.as_str()) {
            out.push(disclosure.clone());
        }
    }
    tracing::debug!(
        requested = requested.len(),
        selected = out.len(),
        "selected disclosures"
    );
    Ok(out)
}

fn is_strict_ancestor(ancestor: &str, path: &str) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'.'
}

/// `a.b.c` yields `a`, `a.b`, `a.b.c`.
fn self_and_ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('.')
        .map(move |(i, _)| &path[..i])
        .chain(std::iter::once(path))
}
