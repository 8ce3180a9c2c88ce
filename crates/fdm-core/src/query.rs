//! Convenience builder for HTTP query parameters.
//!
//! Turns a projected [`Params`] set into URL query pairs, skipping absent and
//! empty values the way the appliance expects.

use crate::params::Params;
use serde_json::Value;

/// Builder for assembling query parameter pairs.
#[derive(Debug, Default, Clone)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Create a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Collect every non-empty entry of a parameter mapping.
    #[must_use]
    pub fn from_params(params: &Params) -> Self {
        let mut query = Self::new();
        for (key, value) in params.iter() {
            query.push_value(key, value);
        }
        query
    }

    /// Append a JSON value, skipping `null` and empty strings.
    ///
    /// Strings are sent verbatim, other scalars in their JSON form.
    pub fn push_value(&mut self, key: &str, value: &Value) {
        let rendered = match value {
            Value::Null => return,
            Value::String(s) if s.is_empty() => return,
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.pairs.push((key.to_string(), rendered));
    }

    /// Return the collected key/value pairs.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.pairs
    }

    /// Returns true if no parameters have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
