//! Compiled schemas and their key declarations.
//!
//! Besides standard JSON Schema keywords, schemas may declare:
//!
//! ```json
//! {
//!   "primary_key": ["id"],
//!   "properties": {
//!     "experiments": {
//!       "type": "array",
//!       "items": {
//!         "foreign_keys": [
//!           { "schema_id": "experiment.json", "members": ["experiment_id"] }
//!         ]
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Foreign key members are rewritten into document paths while descending
//! (`experiments[].experiment_id` above), and `schema_id` is resolved against
//! the declaring schema's own identity.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jsonschema::paths::{LazyLocation, Location};
use jsonschema::{Draft, Keyword, Retrieve, Uri, ValidationError, Validator};
use serde_json::{Map, Value};

use crate::error::{LoadError, Violation};
use crate::format::{FormatRegistry, FormatValidator};
use crate::meta::MetaSchemas;
use crate::registry::SchemaRegistry;
use crate::types::{
    declared_identity, json_type_name, SchemaId, FK_MEMBERS_KEY, FK_SCHEMA_ID_KEY,
    FOREIGN_KEYS_KEY, META_SCHEMA_KEY, PRIMARY_KEY_KEY,
};

/// Linked schema documents offered to the engine for `$ref` resolution.
///
/// All references are resolved from memory; an unknown URI is an error,
/// never a network request.
#[derive(Debug, Clone, Default)]
pub struct LocalSchemaStore {
    schemas_by_uri: Arc<HashMap<String, Value>>,
}

impl LocalSchemaStore {
    pub fn new<I>(schemas: I) -> Self
    where
        I: IntoIterator<Item = (SchemaId, Value)>,
    {
        let schemas_by_uri = schemas
            .into_iter()
            .map(|(id, value)| (id.as_str().to_string(), value))
            .collect();
        Self {
            schemas_by_uri: Arc::new(schemas_by_uri),
        }
    }

    pub fn get(&self, uri: &str) -> Option<&Value> {
        if let Some(value) = self.schemas_by_uri.get(uri) {
            return Some(value);
        }
        let normalized = SchemaId::parse(uri)?;
        self.schemas_by_uri.get(normalized.as_str())
    }

    pub fn len(&self) -> usize {
        self.schemas_by_uri.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas_by_uri.is_empty()
    }
}

impl Retrieve for LocalSchemaStore {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();
        match self.get(uri_str) {
            Some(value) => Ok(value.clone()),
            None => Err(format!("schema {} is not among the linked schemas", uri_str).into()),
        }
    }
}

/// Shared services needed to compile schemas.
#[derive(Debug, Clone, Copy)]
pub struct CompileContext<'a> {
    pub meta: &'a MetaSchemas,
    pub formats: &'a FormatRegistry,
    pub store: &'a LocalSchemaStore,
}

/// A foreign key declared somewhere in a schema.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ForeignKeyDecl {
    /// Identity of the referenced schema.
    pub target: SchemaId,
    /// Document paths of the key members, in order.
    pub components: Vec<String>,
}

/// A schema validated against its meta-schema, with its key declarations.
pub struct SchemaModel {
    id: SchemaId,
    source: PathBuf,
    draft: Draft,
    primary_key: Option<Vec<String>>,
    foreign_keys: Vec<ForeignKeyDecl>,
    warnings: Vec<String>,
    validator: Validator,
}

impl std::fmt::Debug for SchemaModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaModel")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("draft", &self.draft)
            .field("primary_key", &self.primary_key)
            .field("foreign_keys", &self.foreign_keys)
            .field("warnings", &self.warnings)
            .finish_non_exhaustive()
    }
}

impl SchemaModel {
    /// Compile a parsed schema document.
    ///
    /// `registry` holds the schemas compiled so far and is only consulted for
    /// identity collisions.
    ///
    /// # Errors
    ///
    /// Fails, in this order of checks, with `NoSchemaMetaReference`,
    /// `UnsupportedSchema`, `StructuralViolation`, `NoIdentity`,
    /// `InvalidIdentity`, `RepeatedIdentity` or `ValidatorBuild`.
    pub fn compile(
        schema: &Value,
        source: &Path,
        registry: &SchemaRegistry,
        ctx: CompileContext<'_>,
    ) -> Result<Self, LoadError> {
        let meta = schema
            .get(META_SCHEMA_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| LoadError::NoSchemaMetaReference {
                path: source.to_path_buf(),
            })?;

        let unsupported = || LoadError::UnsupportedSchema {
            path: source.to_path_buf(),
            meta: meta.to_string(),
        };
        let draft = ctx.meta.draft_for(meta).ok_or_else(unsupported)?;
        let violations = ctx.meta.check(meta, schema).ok_or_else(unsupported)?;
        if !violations.is_empty() {
            return Err(LoadError::StructuralViolation {
                path: source.to_path_buf(),
                violations,
            });
        }

        let raw_id = declared_identity(schema).ok_or_else(|| LoadError::NoIdentity {
            path: source.to_path_buf(),
        })?;
        let id = SchemaId::parse(raw_id).ok_or_else(|| LoadError::InvalidIdentity {
            path: source.to_path_buf(),
            raw: raw_id.to_string(),
        })?;
        if let Some(previous) = registry.get(&id) {
            return Err(LoadError::RepeatedIdentity {
                id,
                path: source.to_path_buf(),
                previous: previous.source().to_path_buf(),
            });
        }

        let mut warnings = Vec::new();
        let primary_key = parse_primary_key(schema, source, &mut warnings);
        let foreign_keys = find_foreign_keys(schema, &id, &mut warnings);

        let validator = build_validator(schema, draft, ctx).map_err(|message| {
            LoadError::ValidatorBuild {
                path: source.to_path_buf(),
                message,
            }
        })?;

        Ok(Self {
            id,
            source: source.to_path_buf(),
            draft,
            primary_key,
            foreign_keys,
            warnings,
            validator,
        })
    }

    pub fn id(&self) -> &SchemaId {
        &self.id
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn draft(&self) -> Draft {
        self.draft
    }

    /// Primary key members, or `None` when the schema declares no usable key.
    pub fn primary_key(&self) -> Option<&[String]> {
        self.primary_key.as_deref()
    }

    pub fn foreign_keys(&self) -> &[ForeignKeyDecl] {
        &self.foreign_keys
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Structural validation of an instance, collecting every violation.
    pub fn validate(&self, instance: &Value) -> Result<(), Vec<Violation>> {
        let violations: Vec<Violation> = self
            .validator
            .iter_errors(instance)
            .map(|e| Violation {
                path: e.instance_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

fn build_validator(schema: &Value, draft: Draft, ctx: CompileContext<'_>) -> Result<Validator, String> {
    let formats = ctx.formats.clone();
    let mut options = jsonschema::options();
    options
        .with_draft(draft)
        .with_retriever(ctx.store.clone())
        .should_validate_formats(true)
        .with_keyword("format", move |parent, value, path| {
            format_keyword(&formats, draft, parent, value, path)
        });

    options.build(schema).map_err(|e| e.to_string())
}

/// Compile one `format` occurrence.
///
/// Registered plugins receive the enclosing schema object as their options,
/// so sibling keywords such as `namespace` reach them. Other format names
/// keep the engine's own checks.
fn format_keyword<'a>(
    formats: &FormatRegistry,
    draft: Draft,
    parent: &'a Map<String, Value>,
    value: &'a Value,
    path: Location,
) -> Result<Box<dyn Keyword>, ValidationError<'a>> {
    if let Some((name, plugin)) = value.as_str().and_then(|name| Some((name, formats.get(name)?))) {
        return Ok(Box::new(PluginFormat {
            name: name.to_string(),
            plugin: Arc::clone(plugin),
            options: parent.clone(),
            schema_path: path,
        }));
    }

    let mut fragment = Map::new();
    fragment.insert("format".to_string(), value.clone());
    let validator = jsonschema::options()
        .with_draft(draft)
        .should_validate_formats(true)
        .build(&Value::Object(fragment))?;
    Ok(Box::new(EngineFormat {
        validator,
        schema_path: path,
    }))
}

struct PluginFormat {
    name: String,
    plugin: Arc<dyn FormatValidator>,
    options: Map<String, Value>,
    schema_path: Location,
}

impl PluginFormat {
    fn check(&self, instance: &Value) -> Result<(), String> {
        match instance {
            Value::String(value) => self.plugin.validate(value, &self.options),
            _ => Ok(()),
        }
    }
}

impl Keyword for PluginFormat {
    fn validate<'i>(&self, instance: &'i Value, location: &LazyLocation) -> Result<(), ValidationError<'i>> {
        self.check(instance).map_err(|reason| {
            tracing::debug!(format = %self.name, %reason, "format check failed");
            ValidationError::custom(
                self.schema_path.clone(),
                location.into(),
                instance,
                format!("{} is not a \"{}\": {}", instance, self.name, reason),
            )
        })
    }

    fn is_valid(&self, instance: &Value) -> bool {
        self.check(instance).is_ok()
    }
}

struct EngineFormat {
    validator: Validator,
    schema_path: Location,
}

impl Keyword for EngineFormat {
    fn validate<'i>(&self, instance: &'i Value, location: &LazyLocation) -> Result<(), ValidationError<'i>> {
        match self.validator.validate(instance) {
            Ok(()) => Ok(()),
            Err(e) => Err(ValidationError::custom(
                self.schema_path.clone(),
                location.into(),
                instance,
                e.to_string(),
            )),
        }
    }

    fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }
}

fn parse_primary_key(schema: &Value, source: &Path, warnings: &mut Vec<String>) -> Option<Vec<String>> {
    let declared = schema.get(PRIMARY_KEY_KEY)?;
    let Value::Array(members) = declared else {
        warnings.push(format!(
            "primary key in {} is a {}, not an array. Ignoring it",
            source.display(),
            json_type_name(declared)
        ));
        return None;
    };

    let members: Option<Vec<String>> = members
        .iter()
        .map(|member| member.as_str().map(String::from))
        .collect();
    if members.is_none() {
        warnings.push(format!(
            "primary key in {} is not composed by strings defining its attributes. Ignoring it",
            source.display()
        ));
    }
    members
}

/// Collect every foreign key declared in `schema`.
///
/// Relative `schema_id`s are resolved against `base`. Ill-formed declarations
/// are skipped with a warning.
pub fn find_foreign_keys(schema: &Value, base: &SchemaId, warnings: &mut Vec<String>) -> Vec<ForeignKeyDecl> {
    let mut found = Vec::new();
    collect_foreign_keys(schema, base, String::new(), &mut found, warnings);
    found
}

fn collect_foreign_keys(
    node: &Value,
    base: &SchemaId,
    mut prefix: String,
    found: &mut Vec<ForeignKeyDecl>,
    warnings: &mut Vec<String>,
) {
    let mut node = node;
    if let Some(items @ Value::Object(_)) = node.get("items") {
        node = items;
        if !prefix.is_empty() {
            prefix.push_str("[]");
        }
    }
    let Value::Object(map) = node else {
        return;
    };

    if let Some(Value::Array(decls)) = map.get(FOREIGN_KEYS_KEY) {
        for decl in decls {
            match parse_foreign_key(decl, base, &prefix) {
                Ok(fk) => found.push(fk),
                Err(reason) => warnings.push(format!(
                    "ignoring foreign key declaration at '{}': {}",
                    if prefix.is_empty() { "." } else { prefix.as_str() },
                    reason
                )),
            }
        }
    }

    if let Some(Value::Object(properties)) = map.get("properties") {
        for (name, sub_schema) in properties {
            if sub_schema.is_object() {
                let child = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{}.{}", prefix, name)
                };
                collect_foreign_keys(sub_schema, base, child, found, warnings);
            }
        }
    }
}

fn parse_foreign_key(decl: &Value, base: &SchemaId, prefix: &str) -> Result<ForeignKeyDecl, String> {
    let raw_target = decl
        .get(FK_SCHEMA_ID_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing '{}' string", FK_SCHEMA_ID_KEY))?;
    let members = decl
        .get(FK_MEMBERS_KEY)
        .and_then(Value::as_array)
        .ok_or_else(|| format!("missing '{}' array", FK_MEMBERS_KEY))?;

    let target = base
        .join(raw_target)
        .ok_or_else(|| format!("cannot resolve schema id '{}'", raw_target))?;

    let components = members
        .iter()
        .map(|member| {
            let member = member
                .as_str()
                .ok_or_else(|| format!("'{}' must only contain strings", FK_MEMBERS_KEY))?;
            Ok(match (prefix.is_empty(), member.is_empty() || member == ".") {
                (_, true) => prefix.to_string(),
                (true, false) => member.to_string(),
                (false, false) => format!("{}.{}", prefix, member),
            })
        })
        .collect::<Result<Vec<_>, String>>()?;

    Ok(ForeignKeyDecl { target, components })
}
