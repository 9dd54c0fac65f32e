use std::fmt;

use serde::Serialize;

use crate::error::CoreError;

/// Identity of a cached read: an operation name followed by its parameters.
///
/// Invalidation matches by prefix, so `["inviteCodes"]` covers
/// `["inviteCodes", "latest"]` and every parameterised list page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new(root: impl Into<String>) -> Self {
        Self(vec![root.into()])
    }

    /// Append one segment.
    pub fn with(mut self, segment: impl Into<String>) -> Self {
        self.0.push(segment.into());
        self
    }

    /// Append a parameter struct as its compact JSON form. Field order is
    /// the struct's declaration order, so equal params give equal keys.
    pub fn with_params(self, params: &impl Serialize) -> Result<Self, CoreError> {
        let segment = serde_json::to_string(params)
            .map_err(|e| CoreError::Internal(format!("unkeyable query params: {e}")))?;
        Ok(self.with(segment))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether `prefix` is a leading run of this key's segments.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}
