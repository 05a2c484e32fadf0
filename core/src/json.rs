//! Opaque JSON value preserved verbatim across the pipeline.
//!
//! Several CMS envelope fields (`alternates`, `sort_by_date`, `meta_data`, `release_id`,
//! `path`, `likes`) carry heterogeneous payloads the pipeline never inspects. Modeling
//! them as `serde_json::Value` would work, but this sum type makes the "never
//! interpreted, always round-tripped" contract explicit in the type signature instead
//! of relying on callers not to match on variants they shouldn't care about.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A JSON value the pipeline carries but never interprets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Json {
    /// JSON `null`, or an absent field.
    #[default]
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON number, kept as `f64` (CMS payloads never need integer precision here).
    Number(f64),
    /// JSON string.
    String(String),
    /// JSON array of further opaque values.
    Array(Vec<Json>),
    /// JSON object, keyed in insertion-independent (sorted) order.
    Object(BTreeMap<String, Json>),
}

impl Json {
    /// Whether this value is [`Json::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Json::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let value = Json::Object(BTreeMap::from([
            ("a".to_string(), Json::Number(1.0)),
            ("b".to_string(), Json::Array(vec![Json::Bool(true), Json::Null])),
        ]));
        let encoded = serde_json::to_string(&value).unwrap();
        let decoded: Json = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value, decoded);
    }

    #[test]
    fn default_is_null() {
        assert_eq!(Json::default(), Json::Null);
    }
}
