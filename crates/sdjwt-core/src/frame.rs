//! # Disclosure and Presentation Frames
//!
//! Both frames mirror the shape of the claims tree.
//!
//! A [`DisclosureFrame`] is the issuer's policy. At each level `_sd` names the
//! child keys (objects) or indices (arrays) to redact and `_sd_decoy` asks for
//! extra decoy digests; every other key holds the frame for that child:
//!
//! ```json
//! { "_sd": ["given_name"], "_sd_decoy": 2, "address": { "_sd": ["street"] } }
//! ```
//!
//! A [`PresentationFrame`] is the holder's policy with boolean leaves. It
//! normalizes to the same flat dotted-path address space the unpacker
//! reports as presentable keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::encoding::json_type_name;
use crate::error::{SdJwtError, SdJwtResult};
use crate::{SD_DECOY, SD_DIGESTS};

/// Issuer-side selective disclosure policy for one level of a claims tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct DisclosureFrame {
    sd: Vec<String>,
    decoys: usize,
    children: Vec<(String, DisclosureFrame)>,
}

impl DisclosureFrame {
    /// An empty frame: nothing redacted, no decoys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Redact the named object properties at this level.
    pub fn sd<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for key in keys {
            let key = key.into();
            if !self.sd.contains(&key) {
                self.sd.push(key);
            }
        }
        self
    }

    /// Redact the given array positions at this level.
    pub fn sd_indices<I: IntoIterator<Item = usize>>(self, indices: I) -> Self {
        self.sd(indices.into_iter().map(|i| i.to_string()))
    }

    /// Add `count` decoy digests at this level.
    pub fn decoys(mut self, count: usize) -> Self {
        self.decoys = count;
        self
    }

    /// Attach the frame for a child key or index.
    pub fn child(mut self, key: impl Into<String>, frame: DisclosureFrame) -> Self {
        let key = key.into();
        match self.children.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = frame,
            None => self.children.push((key, frame)),
        }
        self
    }

    /// Keys or indices redacted at this level, in frame order.
    pub fn redacted(&self) -> &[String] {
        &self.sd
    }

    /// Whether `key` is redacted at this level.
    pub fn redacts(&self, key: &str) -> bool {
        self.sd.iter().any(|k| k == key)
    }

    /// Number of decoys requested at this level.
    pub fn decoy_count(&self) -> usize {
        self.decoys
    }

    /// Child frames in frame order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &DisclosureFrame)> {
        self.children.iter().map(|(k, f)| (k.as_str(), f))
    }

    /// The frame for one child, if any.
    pub fn get_child(&self, key: &str) -> Option<&DisclosureFrame> {
        self.children.iter().find(|(k, _)| k == key).map(|(_, f)| f)
    }

    /// Parse the JSON frame shape.
    pub fn from_value(value: &Value) -> SdJwtResult<Self> {
        let obj = value.as_object().ok_or_else(|| {
            SdJwtError::Malformed(format!(
                "disclosure frame must be an object, got {}",
                json_type_name(value)
            ))
        })?;
        let mut frame = Self::new();
        for (key, entry) in obj {
            match key.as_str() {
                SD_DIGESTS => {
                    let items = entry.as_array().ok_or_else(|| {
                        SdJwtError::Malformed("disclosure frame `_sd` must be an array".to_string())
                    })?;
                    for item in items {
                        let name = match item {
                            Value::String(s) => s.clone(),
                            Value::Number(n) if n.is_u64() => n.to_string(),
                            other => {
                                return Err(SdJwtError::Malformed(format!(
                                    "disclosure frame `_sd` entries must be strings or indices, got {}",
                                    json_type_name(other)
                                )))
                            }
                        };
                        frame = frame.sd([name]);
                    }
                }
                SD_DECOY => {
                    let count = entry
                        .as_u64()
                        .and_then(|n| usize::try_from(n).ok())
                        .ok_or_else(|| {
                            SdJwtError::Malformed(
                                "disclosure frame `_sd_decoy` must be a non-negative integer"
                                    .to_string(),
                            )
                        })?;
                    frame = frame.decoys(count);
                }
                _ => {
                    frame = frame.child(key.clone(), Self::from_value(entry)?);
                }
            }
        }
        Ok(frame)
    }

    /// Render the JSON frame shape.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        if !self.sd.is_empty() {
            obj.insert(
                SD_DIGESTS.to_string(),
                Value::Array(self.sd.iter().cloned().map(Value::String).collect()),
            );
        }
        if self.decoys > 0 {
            obj.insert(SD_DECOY.to_string(), Value::from(self.decoys));
        }
        for (key, child) in &self.children {
            obj.insert(key.clone(), child.to_value());
        }
        Value::Object(obj)
    }
}

impl TryFrom<Value> for DisclosureFrame {
    type Error = SdJwtError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

impl TryFrom<&Value> for DisclosureFrame {
    type Error = SdJwtError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<DisclosureFrame> for Value {
    fn from(frame: DisclosureFrame) -> Self {
        frame.to_value()
    }
}

/// One entry of a [`PresentationFrame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationNode {
    /// `true` reveals the claim at this path; `false` keeps it hidden.
    Reveal(bool),
    /// Descend into the claim and decide per child.
    Nested(PresentationFrame),
}

/// Holder-side selection of claims to reveal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct PresentationFrame {
    entries: Vec<(String, PresentationNode)>,
}

impl PresentationFrame {
    /// An empty frame: reveal nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reveal the claim at `key`.
    pub fn reveal(self, key: impl Into<String>) -> Self {
        self.entry(key.into(), PresentationNode::Reveal(true))
    }

    /// Keep the claim at `key` hidden.
    pub fn hide(self, key: impl Into<String>) -> Self {
        self.entry(key.into(), PresentationNode::Reveal(false))
    }

    /// Descend into `key` with a nested frame.
    pub fn nested(self, key: impl Into<String>, frame: PresentationFrame) -> Self {
        self.entry(key.into(), PresentationNode::Nested(frame))
    }

    fn entry(mut self, key: String, node: PresentationNode) -> Self {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = node,
            None => self.entries.push((key, node)),
        }
        self
    }

    /// Whether the frame selects nothing at all.
    pub fn is_empty(&self) -> bool {
        self.paths().is_empty()
    }

    /// Flatten to dotted paths.
    ///
    /// `true` emits its path; a nested frame emits the parent path and then
    /// its children's paths; `false` emits nothing.
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_paths("", &mut out);
        out
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        for (key, node) in &self.entries {
            let path = crate::join_path(prefix, key);
            match node {
                PresentationNode::Reveal(true) => out.push(path),
                PresentationNode::Reveal(false) => {}
                PresentationNode::Nested(inner) => {
                    out.push(path.clone());
                    inner.collect_paths(&path, out);
                }
            }
        }
    }

    /// Parse the JSON frame shape (`{"a": true, "b": {"c": true}}`).
    pub fn from_value(value: &Value) -> SdJwtResult<Self> {
        let obj = value.as_object().ok_or_else(|| {
            SdJwtError::Malformed(format!(
                "presentation frame must be an object, got {}",
                json_type_name(value)
            ))
        })?;
        let mut frame = Self::new();
        for (key, entry) in obj {
            let node = match entry {
                Value::Bool(b) => PresentationNode::Reveal(*b),
                Value::Object(_) => PresentationNode::Nested(Self::from_value(entry)?),
                other => {
                    return Err(SdJwtError::Malformed(format!(
                        "presentation frame entry `{key}` must be a boolean or object, got {}",
                        json_type_name(other)
                    )))
                }
            };
            frame = frame.entry(key.clone(), node);
        }
        Ok(frame)
    }

    /// Render the JSON frame shape.
    pub fn to_value(&self) -> Value {
        let obj = self
            .entries
            .iter()
            .map(|(key, node)| {
                let value = match node {
                    PresentationNode::Reveal(b) => Value::Bool(*b),
                    PresentationNode::Nested(inner) => inner.to_value(),
                };
                (key.clone(), value)
            })
            .collect();
        Value::Object(obj)
    }
}

impl TryFrom<Value> for PresentationFrame {
    type Error = SdJwtError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

impl From<PresentationFrame> for Value {
    fn from(frame: PresentationFrame) -> Self {
        frame.to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn disclosure_frame_from_json() {
        let frame = DisclosureFrame::from_value(&json!({
            "_sd": ["a", 0, "b"],
            "_sd_decoy": 3,
            "b": {"_sd": ["c"]}
        }))
        .unwrap();
        assert_eq!(frame.redacted(), ["a", "0", "b"]);
        assert_eq!(frame.decoy_count(), 3);
        assert!(frame.get_child("b").unwrap().redacts("c"));
        assert!(frame.get_child("a").is_none());
    }

    #[test]
    fn disclosure_frame_builder_matches_json() {
        let built = DisclosureFrame::new()
            .sd(["a"])
            .child("arr", DisclosureFrame::new().sd_indices([0, 2]).decoys(1));
        let parsed: DisclosureFrame =
            serde_json::from_value(json!({"_sd": ["a"], "arr": {"_sd": [0, 2], "_sd_decoy": 1}}))
                .unwrap();
        assert_eq!(built, parsed);
        assert_eq!(
            serde_json::to_value(&built).unwrap(),
            json!({"_sd": ["a"], "arr": {"_sd": ["0", "2"], "_sd_decoy": 1}})
        );
    }

    #[test]
    fn disclosure_frame_rejects_bad_shapes() {
        assert!(DisclosureFrame::from_value(&json!({"_sd": "a"})).is_err());
        assert!(DisclosureFrame::from_value(&json!({"_sd": [true]})).is_err());
        assert!(DisclosureFrame::from_value(&json!({"_sd": [-1]})).is_err());
        assert!(DisclosureFrame::from_value(&json!({"_sd_decoy": -2})).is_err());
        assert!(DisclosureFrame::from_value(&json!({"_sd_decoy": 1.5})).is_err());
        assert!(DisclosureFrame::from_value(&json!({"child": 1})).is_err());
        assert!(DisclosureFrame::from_value(&json!([])).is_err());
    }

    #[test]
    fn duplicate_sd_entries_collapse() {
        let frame = DisclosureFrame::new().sd(["a", "a"]).sd(["a"]);
        assert_eq!(frame.redacted(), ["a"]);
    }

    #[test]
    fn presentation_paths_follow_tree_walk() {
        let frame = PresentationFrame::from_value(&json!({
            "a": true,
            "b": {"c": true, "d": false},
            "e": false,
            "arr": {"0": true}
        }))
        .unwrap();
        assert_eq!(frame.paths(), vec!["a", "b", "b.c", "arr", "arr.0"]);
    }

    #[test]
    fn presentation_frame_rejects_non_boolean_leaves() {
        assert!(PresentationFrame::from_value(&json!({"a": 1})).is_err());
        assert!(PresentationFrame::from_value(&json!("a")).is_err());
    }

    #[test]
    fn empty_presentation_frame_selects_nothing() {
        assert!(PresentationFrame::new().is_empty());
        assert!(PresentationFrame::new().hide("a").is_empty());
        assert!(!PresentationFrame::new().reveal("a").is_empty());
    }

    #[test]
    fn presentation_frame_serde_roundtrip() {
        let frame = PresentationFrame::new()
            .reveal("a")
            .nested("b", PresentationFrame::new().reveal("c"));
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value, json!({"a": true, "b": {"c": true}}));
        let back: PresentationFrame = serde_json::from_value(value).unwrap();
        assert_eq!(back, frame);
    }
}
