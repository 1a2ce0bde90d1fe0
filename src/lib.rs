//! FAIR Tracks Validator
//!
//! Schema and referential-integrity validation of JSON metadata documents.
//!
//! Documents are validated against a linked set of JSON Schemas, then
//! checked across the whole corpus: primary keys declared by a schema must
//! be unique among its documents, and foreign keys must resolve to primary
//! keys registered by other documents.
//!
//! # Example
//!
//! ```
//! use fairtracks_validator::{generate_key_strings, materialize};
//! use serde_json::json;
//!
//! let doc = json!({
//!     "lab": "L1",
//!     "runs": [{ "id": "r1" }, { "id": "r2" }]
//! });
//!
//! let labs = materialize(&doc, "lab");
//! let runs = materialize(&doc, "runs[].id");
//! assert_eq!(runs, vec!["r1", "r2"]);
//!
//! // One canonical key per combination of component values
//! let keys = generate_key_strings(&[labs, runs]);
//! assert_eq!(keys, vec![r#"["L1","r1"]"#, r#"["L1","r2"]"#]);
//! ```
//!
//! # Key Declarations
//!
//! | Keyword | Where | Content |
//! |---------|-------|---------|
//! | `primary_key` | schema root | array of member paths |
//! | `foreign_keys` | root, or any `properties` / `items` level | array of `{ "schema_id", "members" }` |
//!
//! Member paths are dot-separated; a segment may end in `[n]` to pick an
//! array element or `[]` to expand all of them.
//!
//! # Running
//!
//! [`run`] sequences linking, loading, the consistency pass and both
//! document passes, and returns a [`RunReport`].

mod document;
mod driver;
mod error;
mod format;
mod keys;
mod linker;
mod loader;
mod meta;
mod registry;
mod report;
mod schema;
mod types;
mod validator;

pub use document::{declared_schema, Document};
pub use driver::{run, RunOptions};
pub use error::{
    DocumentError, ForeignKeyFailure, Inconsistency, JsonFileError, KeyCollision, LoadError,
    RunError, Violation,
};
pub use format::{CurieFormat, FormatRegistry, FormatValidator, MatchType};
pub use keys::{
    canonical_key, generate_key_strings, key_values, materialize, ArraySelector, KeyPath,
    PathStep,
};
pub use linker::{link_schemas, LinkDuplicate, LinkOutcome, LinkedSchema};
pub use loader::{expand_paths, load_json, load_json_str, DirectoryFailure, Expansion};
pub use meta::{MetaSchemas, SUPPORTED_META_SCHEMAS};
pub use registry::{SchemaInconsistency, SchemaLoad, SchemaRegistry};
pub use report::{
    ConsistencyStats, Diagnostic, FileReport, FileStatus, LinkStats, LoadStats, Phase, RunReport,
    Severity, ValidationStats,
};
pub use schema::{find_foreign_keys, CompileContext, ForeignKeyDecl, LocalSchemaStore, SchemaModel};
pub use types::SchemaId;
pub use validator::{DocumentValidator, ForeignKeyValidator, PrimaryKeyIndex};
