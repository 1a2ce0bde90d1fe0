//! Error types for schema loading, schema-set consistency and document validation.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::SchemaId;

/// Errors reading a JSON file from disk.
#[derive(Debug, Error)]
pub enum JsonFileError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<JsonFileError> for LoadError {
    fn from(err: JsonFileError) -> Self {
        match err {
            JsonFileError::Io { path, source } => LoadError::Io { path, source },
            JsonFileError::InvalidJson { path, source } => LoadError::InvalidJson { path, source },
        }
    }
}

impl From<JsonFileError> for DocumentError {
    fn from(err: JsonFileError) -> Self {
        match err {
            JsonFileError::Io { path, source } => DocumentError::Io { path, source },
            JsonFileError::InvalidJson { path, source } => {
                DocumentError::InvalidJson { path, source }
            }
        }
    }
}

/// Errors while linking or compiling a schema. The schema is excluded from the registry.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} does not have the mandatory '$schema' attribute")]
    NoSchemaMetaReference { path: PathBuf },

    #[error("{path} declares meta-schema {meta}, which is not supported")]
    UnsupportedSchema { path: PathBuf, meta: String },

    #[error("{path} is not a valid JSON Schema ({} violation(s))", violations.len())]
    StructuralViolation {
        path: PathBuf,
        violations: Vec<Violation>,
    },

    #[error("{path} does not have the mandatory '$id' or 'id' attribute")]
    NoIdentity { path: PathBuf },

    #[error("{path} declares identity '{raw}', which is not an absolute URI")]
    InvalidIdentity { path: PathBuf, raw: String },

    #[error("schema in {path} and schema in {previous} have the same id {id}")]
    RepeatedIdentity {
        id: SchemaId,
        path: PathBuf,
        previous: PathBuf,
    },

    #[error("cannot compile validator for {path}: {message}")]
    ValidatorBuild { path: PathBuf, message: String },
}

impl LoadError {
    /// Stable reason code used in reports.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Io { .. } => "fatal",
            Self::InvalidJson { .. } => "invalid_json",
            Self::NoSchemaMetaReference { .. } => "no_schema",
            Self::UnsupportedSchema { .. } => "schema_unknown",
            Self::StructuralViolation { .. } => "schema_error",
            Self::NoIdentity { .. } => "no_id",
            Self::InvalidIdentity { .. } => "invalid_id",
            Self::RepeatedIdentity { .. } => "dup_id",
            Self::ValidatorBuild { .. } => "schema_error",
        }
    }

    /// Ignored schemas are counted apart from failed ones.
    pub fn is_ignorable(&self) -> bool {
        matches!(
            self,
            Self::NoSchemaMetaReference { .. }
                | Self::UnsupportedSchema { .. }
                | Self::NoIdentity { .. }
        )
    }
}

/// A primary key value already registered by another document.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct KeyCollision {
    /// Canonical key string.
    pub key: String,
    /// Source of the document that registered the key first.
    pub original: String,
}

/// One unresolved foreign key of a document.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForeignKeyFailure {
    /// The key is not among the primary keys recorded for the target schema.
    MissingKey { target: SchemaId, key: String },
    /// The target schema itself is not loaded. The consistency pass reports
    /// these up front, so reaching one here is an internal inconsistency.
    UnknownTarget { target: SchemaId },
}

impl ForeignKeyFailure {
    pub fn is_assertion(&self) -> bool {
        matches!(self, Self::UnknownTarget { .. })
    }
}

impl std::fmt::Display for ForeignKeyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingKey { target, key } => {
                write!(f, "no document of schema {} has primary key {}", target, key)
            }
            Self::UnknownTarget { target } => {
                write!(f, "foreign key points to schema {}, which is not loaded", target)
            }
        }
    }
}

/// Errors while validating a document in pass 1 or pass 2.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("unable to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no schema declared in {source_id}")]
    NoSchemaId { source_id: String },

    #[error("schema {schema_id} used by {source_id} was not loaded")]
    SchemaNotLoaded {
        source_id: String,
        schema_id: SchemaId,
    },

    #[error("{source_id} does not validate against {schema_id} ({} violation(s))", violations.len())]
    StructurallyInvalid {
        source_id: String,
        schema_id: SchemaId,
        violations: Vec<Violation>,
    },

    #[error("{source_id} repeats {} primary key(s) of schema {schema_id}", collisions.len())]
    DuplicatePrimaryKey {
        source_id: String,
        schema_id: SchemaId,
        collisions: Vec<KeyCollision>,
    },

    #[error("{source_id} has {} unresolved foreign key(s)", failures.len())]
    ForeignKeyViolation {
        source_id: String,
        failures: Vec<ForeignKeyFailure>,
    },
}

impl DocumentError {
    /// Stable reason code used in reports.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Io { .. } | Self::InvalidJson { .. } => "fatal",
            Self::NoSchemaId { .. } => "no_schema_id",
            Self::SchemaNotLoaded { .. } => "schema_unknown",
            Self::StructurallyInvalid { .. } => "schema_error",
            Self::DuplicatePrimaryKey { .. } => "dup_pk",
            Self::ForeignKeyViolation { .. } => "fk_missing",
        }
    }

    /// Documents without a usable schema are ignored, not failed.
    pub fn is_ignorable(&self) -> bool {
        matches!(self, Self::NoSchemaId { .. } | Self::SchemaNotLoaded { .. })
    }
}

/// Problems found by the schema-set consistency pass.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inconsistency {
    #[error("foreign key points to schema {target}, which is not loaded")]
    MissingTarget { target: SchemaId },

    #[error("foreign key to {target} has {found} member(s) but its primary key has {expected}")]
    ArityMismatch {
        target: SchemaId,
        expected: usize,
        found: usize,
    },

    #[error("foreign key points to schema {target}, which declares no primary key")]
    TargetWithoutPrimaryKey { target: SchemaId },
}

/// Errors that stop the whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("no schema was successfully loaded")]
    NoSchemasLoaded,
}

impl RunError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::NoSchemasLoaded => 1,
        }
    }
}

/// Single structural violation with path context.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Violation {
    /// JSON Pointer (RFC 6901) to the invalid value.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "/: {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> SchemaId {
        SchemaId::parse(s).unwrap()
    }

    #[test]
    fn load_error_ignorable_split() {
        let err = LoadError::NoIdentity {
            path: PathBuf::from("a.json"),
        };
        assert!(err.is_ignorable());
        assert_eq!(err.reason(), "no_id");

        let err = LoadError::RepeatedIdentity {
            id: id("https://example.org/a.json"),
            path: PathBuf::from("a.json"),
            previous: PathBuf::from("b.json"),
        };
        assert!(!err.is_ignorable());
        assert_eq!(err.reason(), "dup_id");
        assert!(err.to_string().contains("b.json"));
    }

    #[test]
    fn document_error_ignorable_split() {
        let err = DocumentError::NoSchemaId {
            source_id: "doc.json".into(),
        };
        assert!(err.is_ignorable());

        let err = DocumentError::DuplicatePrimaryKey {
            source_id: "doc.json".into(),
            schema_id: id("https://example.org/a.json"),
            collisions: vec![KeyCollision {
                key: r#"["x"]"#.into(),
                original: "first.json".into(),
            }],
        };
        assert!(!err.is_ignorable());
        assert_eq!(err.reason(), "dup_pk");
    }

    #[test]
    fn foreign_key_failure_kinds() {
        let missing = ForeignKeyFailure::MissingKey {
            target: id("https://example.org/a.json"),
            key: r#"["x"]"#.into(),
        };
        assert!(!missing.is_assertion());
        assert!(missing.to_string().contains(r#"["x"]"#));

        let unknown = ForeignKeyFailure::UnknownTarget {
            target: id("https://example.org/a.json"),
        };
        assert!(unknown.is_assertion());
    }

    #[test]
    fn violation_display() {
        let v = Violation {
            path: "/experiment/id".into(),
            message: "expected string, got number".into(),
        };
        assert_eq!(v.to_string(), "/experiment/id: expected string, got number");

        let root = Violation {
            path: String::new(),
            message: "\"id\" is a required property".into(),
        };
        assert_eq!(root.to_string(), "/: \"id\" is a required property");
    }

    #[test]
    fn run_error_exit_code() {
        assert_eq!(RunError::NoSchemasLoaded.exit_code(), 1);
    }
}
