//! Cache-key accumulation.
//!
//! Every mutator that changes what a query returns appends its arguments to
//! the key, so two builders fed the same calls in the same order share a key.
//! The dash-joined text is ambiguous when a part itself contains a dash
//! (`"1-2"` vs `"1", "2"`); [`CacheKey::fingerprint`] hashes the parts grouped
//! by the call that pushed them and does not collide on such inputs.

use serde_json::Value;

/// Render a key part: strings verbatim, everything else as compact JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Order-sensitive identity of a builder's semantic content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheKey {
    text: String,
    parts: Vec<Value>,
    /// End offset into `parts` of each `push`
    ends: Vec<usize>,
}

impl CacheKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append parts, dash-joined onto the existing text.
    pub fn push<I>(&mut self, parts: I)
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        for part in parts {
            let part = part.into();
            if !self.text.is_empty() {
                self.text.push('-');
            }
            self.text.push_str(&stringify(&part));
            self.parts.push(part);
        }
        if self.ends.last().copied().unwrap_or(0) < self.parts.len() {
            self.ends.push(self.parts.len());
        }
    }

    /// Reset to empty.
    pub fn clear(&mut self) {
        self.text.clear();
        self.parts.clear();
        self.ends.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn parts(&self) -> &[Value] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// blake3 hex digest over the canonical JSON of the parts, one array per `push`.
    pub fn fingerprint(&self) -> String {
        let mut start = 0;
        let mut groups = Vec::with_capacity(self.ends.len());
        for &end in &self.ends {
            groups.push(Value::Array(self.parts[start..end].to_vec()));
            start = end;
        }
        let canonical = Value::Array(groups).to_string();
        blake3::hash(canonical.as_bytes()).to_hex().to_string()
    }
}
