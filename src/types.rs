//! Core types shared by schema loading and document validation.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;
use url::Url;

/// Schema identity keys, in lookup order (`$id` from draft-06 onward, `id` for draft-04).
pub const ID_KEYS: &[&str] = &["$id", "id"];

/// Key under which a schema declares its meta-schema.
pub const META_SCHEMA_KEY: &str = "$schema";

/// Nested object that may hold the schema reference of a document.
pub const PARENT_SCHEMA_KEY: &str = "fair_tracks";

/// Keys a document may use to declare its schema, first present wins.
pub const DOCUMENT_SCHEMA_KEYS: &[&str] = &["@schema", "_schema", "$schema"];

pub const PRIMARY_KEY_KEY: &str = "primary_key";
pub const FOREIGN_KEYS_KEY: &str = "foreign_keys";
pub const FK_SCHEMA_ID_KEY: &str = "schema_id";
pub const FK_MEMBERS_KEY: &str = "members";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Absolute URI identifying a schema.
///
/// Identities are normalised through [`Url`] and an empty trailing fragment
/// is dropped, so `https://example.org/s.json#` and `https://example.org/s.json`
/// name the same schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(String);

impl SchemaId {
    /// Parse an absolute URI. Relative references and malformed URIs yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        Url::parse(raw.trim()).ok().map(Self::from_url)
    }

    /// Resolve `reference` against this identity, as relative `$ref`s are.
    pub fn join(&self, reference: &str) -> Option<Self> {
        let base = Url::parse(&self.0).ok()?;
        base.join(reference.trim()).ok().map(Self::from_url)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_url(mut url: Url) -> Self {
        if url.fragment() == Some("") {
            url.set_fragment(None);
        }
        Self(url.into())
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for SchemaId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Raw identity declared by a schema document (`$id` preferred over `id`).
pub fn declared_identity(schema: &Value) -> Option<&str> {
    ID_KEYS
        .iter()
        .find_map(|key| schema.get(*key))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_id_drops_empty_fragment() {
        let a = SchemaId::parse("https://example.org/schemas/track.json#").unwrap();
        let b = SchemaId::parse("https://example.org/schemas/track.json").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "https://example.org/schemas/track.json");
    }

    #[test]
    fn schema_id_keeps_real_fragment() {
        let id = SchemaId::parse("https://example.org/schemas/track.json#/definitions/x").unwrap();
        assert!(id.as_str().ends_with("#/definitions/x"));
    }

    #[test]
    fn schema_id_rejects_relative() {
        assert!(SchemaId::parse("track.json").is_none());
        assert!(SchemaId::parse("").is_none());
    }

    #[test]
    fn schema_id_join_relative() {
        let base = SchemaId::parse("https://example.org/schemas/track.json").unwrap();
        let joined = base.join("experiment.json").unwrap();
        assert_eq!(joined.as_str(), "https://example.org/schemas/experiment.json");

        let absolute = base.join("https://other.org/sample.json").unwrap();
        assert_eq!(absolute.as_str(), "https://other.org/sample.json");
    }

    #[test]
    fn declared_identity_prefers_dollar_id() {
        let schema = json!({ "$id": "https://a/new.json", "id": "https://a/old.json" });
        assert_eq!(declared_identity(&schema), Some("https://a/new.json"));

        let schema = json!({ "id": "https://a/old.json" });
        assert_eq!(declared_identity(&schema), Some("https://a/old.json"));

        assert_eq!(declared_identity(&json!({ "$id": 3 })), None);
        assert_eq!(declared_identity(&json!({})), None);
    }
}
