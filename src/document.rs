//! Documents under validation.

use std::path::Path;

use serde_json::Value;

use crate::error::DocumentError;
use crate::loader::load_json;
use crate::types::{SchemaId, DOCUMENT_SCHEMA_KEYS, PARENT_SCHEMA_KEY};

/// A parsed JSON document with its source and declared schema.
#[derive(Debug, Clone)]
pub struct Document {
    source: String,
    value: Value,
    schema_id: Option<SchemaId>,
}

impl Document {
    pub fn new(value: Value, source: impl Into<String>) -> Self {
        let schema_id = declared_schema(&value);
        Self {
            source: source.into(),
            value,
            schema_id,
        }
    }

    /// Read and parse a document file. Its source is the path as given.
    pub fn from_file(path: &Path) -> Result<Self, DocumentError> {
        let value = load_json(path)?;
        Ok(Self::new(value, path.display().to_string()))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Schema declared by the document, if any and if it is a valid absolute URI.
    pub fn schema_id(&self) -> Option<&SchemaId> {
        self.schema_id.as_ref()
    }
}

/// Find the schema a document declares.
///
/// Looks into the `fair_tracks` object when present, else the top level, and
/// uses the first of `@schema`, `_schema`, `$schema` present there.
pub fn declared_schema(value: &Value) -> Option<SchemaId> {
    let root = match value.get(PARENT_SCHEMA_KEY) {
        Some(parent @ Value::Object(_)) => parent,
        _ => value,
    };
    let declared = DOCUMENT_SCHEMA_KEYS.iter().find_map(|key| root.get(*key))?;
    declared.as_str().and_then(SchemaId::parse)
}
