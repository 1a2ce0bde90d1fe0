//! Supported meta-schemas.
//!
//! A schema is only loaded when its `$schema` names one of the drafts below.
//! The table compiles one meta-validator per draft up front and is passed
//! explicitly to schema compilation.

use std::collections::HashMap;

use jsonschema::{Draft, Validator};
use serde_json::{json, Value};

use crate::error::Violation;

/// Meta-schema identities the validator acknowledges, with their draft.
pub const SUPPORTED_META_SCHEMAS: &[(&str, Draft)] = &[
    ("http://json-schema.org/draft-04/schema", Draft::Draft4),
    ("http://json-schema.org/draft-06/schema", Draft::Draft6),
    ("http://json-schema.org/draft-07/schema", Draft::Draft7),
    ("https://json-schema.org/draft/2019-09/schema", Draft::Draft201909),
    ("https://json-schema.org/draft/2020-12/schema", Draft::Draft202012),
];

fn normalize(meta: &str) -> &str {
    meta.trim().trim_end_matches('#')
}

/// Table of compiled meta-validators, keyed by normalized meta-schema URI.
pub struct MetaSchemas {
    validators: HashMap<&'static str, (Draft, Validator)>,
}

impl std::fmt::Debug for MetaSchemas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut uris: Vec<&&str> = self.validators.keys().collect();
        uris.sort();
        f.debug_struct("MetaSchemas").field("uris", &uris).finish()
    }
}

impl MetaSchemas {
    /// Compile the meta-validators of every supported draft.
    ///
    /// The engine ships the draft meta-schemas, so no network access happens.
    /// A draft whose meta-schema cannot be compiled is left out of the table.
    pub fn new() -> Self {
        let mut validators = HashMap::new();
        for (uri, draft) in SUPPORTED_META_SCHEMAS {
            let wrapper = json!({ "$ref": format!("{}#", uri) });
            match jsonschema::options().with_draft(*draft).build(&wrapper) {
                Ok(validator) => {
                    validators.insert(*uri, (*draft, validator));
                }
                Err(e) => {
                    tracing::warn!(meta = %uri, error = %e, "cannot compile meta-schema");
                }
            }
        }
        Self { validators }
    }

    /// Draft for a `$schema` value, if supported.
    pub fn draft_for(&self, meta: &str) -> Option<Draft> {
        self.validators.get(normalize(meta)).map(|(draft, _)| *draft)
    }

    /// Validate `schema` against the meta-schema named by `meta`.
    ///
    /// Returns `None` when `meta` is not supported, otherwise every violation found.
    pub fn check(&self, meta: &str, schema: &Value) -> Option<Vec<Violation>> {
        let (_, validator) = self.validators.get(normalize(meta))?;
        Some(
            validator
                .iter_errors(schema)
                .map(|e| Violation {
                    path: e.instance_path.to_string(),
                    message: e.to_string(),
                })
                .collect(),
        )
    }
}

impl Default for MetaSchemas {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_drafts_with_and_without_fragment() {
        let meta = MetaSchemas::new();
        assert_eq!(
            meta.draft_for("http://json-schema.org/draft-07/schema#"),
            Some(Draft::Draft7)
        );
        assert_eq!(
            meta.draft_for("http://json-schema.org/draft-04/schema"),
            Some(Draft::Draft4)
        );
        assert!(meta.draft_for("http://json-schema.org/draft-06/schema#").is_some());
        assert!(meta.draft_for("http://example.org/my-meta-schema#").is_none());
    }

    #[test]
    fn valid_schema_has_no_violations() {
        let meta = MetaSchemas::new();
        let schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "$id": "https://example.org/schemas/track.json",
            "type": "object",
            "properties": { "id": { "type": "string" } }
        });
        let violations = meta
            .check("http://json-schema.org/draft-07/schema#", &schema)
            .unwrap();
        assert!(violations.is_empty());
    }

    #[test]
    fn invalid_schema_reports_violations() {
        let meta = MetaSchemas::new();
        let schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "not-a-type",
            "minLength": -1
        });
        let violations = meta
            .check("http://json-schema.org/draft-07/schema#", &schema)
            .unwrap();
        assert!(violations.len() >= 2);
    }

    #[test]
    fn unsupported_meta_is_none() {
        let meta = MetaSchemas::new();
        assert!(meta.check("http://example.org/meta#", &json!({})).is_none());
    }
}
