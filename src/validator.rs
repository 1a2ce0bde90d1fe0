//! Two-pass document validation.
//!
//! Pass 1 checks each document structurally and registers its primary keys.
//! Pass 2 resolves foreign keys against the keys every document registered.
//! [`DocumentValidator::finish`] is the barrier between them: it consumes
//! the pass 1 state and hands the frozen indices to a [`ForeignKeyValidator`].

use std::collections::{HashMap, HashSet};

use crate::document::Document;
use crate::error::{DocumentError, ForeignKeyFailure, KeyCollision};
use crate::keys::{generate_key_strings, key_values};
use crate::registry::SchemaRegistry;
use crate::schema::SchemaModel;
use crate::types::SchemaId;

/// Canonical primary key strings of one schema, each mapped to the source
/// of the document that registered it first.
#[derive(Debug, Clone, Default)]
pub struct PrimaryKeyIndex {
    keys: HashMap<String, String>,
}

impl PrimaryKeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys among `keys` that are already registered.
    pub fn collisions(&self, keys: &[String]) -> Vec<KeyCollision> {
        keys.iter()
            .filter_map(|key| {
                self.keys.get(key).map(|original| KeyCollision {
                    key: key.clone(),
                    original: original.clone(),
                })
            })
            .collect()
    }

    /// Register every key of `keys` unless one of them is taken.
    ///
    /// Either all keys are recorded, or none is and the collisions are returned.
    pub fn register_all(&mut self, keys: Vec<String>, source: &str) -> Result<(), Vec<KeyCollision>> {
        let collisions = self.collisions(&keys);
        if !collisions.is_empty() {
            return Err(collisions);
        }
        for key in keys {
            self.keys.entry(key).or_insert_with(|| source.to_string());
        }
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    /// Source that registered `key`.
    pub fn owner(&self, key: &str) -> Option<&str> {
        self.keys.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn schema_of<'r>(registry: &'r SchemaRegistry, doc: &Document) -> Result<&'r SchemaModel, DocumentError> {
    let schema_id = doc.schema_id().ok_or_else(|| DocumentError::NoSchemaId {
        source_id: doc.source().to_string(),
    })?;
    registry
        .get(schema_id)
        .ok_or_else(|| DocumentError::SchemaNotLoaded {
            source_id: doc.source().to_string(),
            schema_id: schema_id.clone(),
        })
}

/// Pass 1: structural validation and primary key registration.
#[derive(Debug)]
pub struct DocumentValidator<'r> {
    registry: &'r SchemaRegistry,
    indices: HashMap<SchemaId, PrimaryKeyIndex>,
}

impl<'r> DocumentValidator<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self {
            registry,
            indices: HashMap::new(),
        }
    }

    /// Validate one document and register its primary keys.
    ///
    /// # Errors
    ///
    /// `NoSchemaId` and `SchemaNotLoaded` mark the document as ignored;
    /// `StructurallyInvalid` and `DuplicatePrimaryKey` as failed. A rejected
    /// document registers no key at all.
    pub fn validate(&mut self, doc: &Document) -> Result<(), DocumentError> {
        let schema = schema_of(self.registry, doc)?;

        schema
            .validate(doc.value())
            .map_err(|violations| DocumentError::StructurallyInvalid {
                source_id: doc.source().to_string(),
                schema_id: schema.id().clone(),
                violations,
            })?;

        let Some(members) = schema.primary_key() else {
            return Ok(());
        };
        let keys = generate_key_strings(&key_values(doc.value(), members));
        if keys.is_empty() {
            tracing::debug!(source = doc.source(), "no primary key values materialized");
            return Ok(());
        }

        self.indices
            .entry(schema.id().clone())
            .or_default()
            .register_all(keys, doc.source())
            .map_err(|collisions| DocumentError::DuplicatePrimaryKey {
                source_id: doc.source().to_string(),
                schema_id: schema.id().clone(),
                collisions,
            })
    }

    /// Primary keys registered so far for `schema`.
    pub fn index(&self, schema: &SchemaId) -> Option<&PrimaryKeyIndex> {
        self.indices.get(schema)
    }

    /// End pass 1. The indices are read-only from here on.
    pub fn finish(self) -> ForeignKeyValidator<'r> {
        ForeignKeyValidator {
            registry: self.registry,
            indices: self.indices,
        }
    }
}

/// Pass 2: foreign key resolution against the finished primary key indices.
#[derive(Debug)]
pub struct ForeignKeyValidator<'r> {
    registry: &'r SchemaRegistry,
    indices: HashMap<SchemaId, PrimaryKeyIndex>,
}

impl<'r> ForeignKeyValidator<'r> {
    /// Resolve every foreign key of `doc`, collecting all failures.
    pub fn validate(&self, doc: &Document) -> Result<(), DocumentError> {
        let schema = schema_of(self.registry, doc)?;
        let empty = PrimaryKeyIndex::new();
        let mut failures = Vec::new();
        let mut seen: HashSet<(&SchemaId, String)> = HashSet::new();

        for fk in schema.foreign_keys() {
            if !self.registry.contains(&fk.target) {
                failures.push(ForeignKeyFailure::UnknownTarget {
                    target: fk.target.clone(),
                });
                continue;
            }
            let index = self.indices.get(&fk.target).unwrap_or(&empty);
            for key in generate_key_strings(&key_values(doc.value(), &fk.components)) {
                // Array-expanded members can yield the same tuple more than once.
                if index.contains(&key) || !seen.insert((&fk.target, key.clone())) {
                    continue;
                }
                failures.push(ForeignKeyFailure::MissingKey {
                    target: fk.target.clone(),
                    key,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DocumentError::ForeignKeyViolation {
                source_id: doc.source().to_string(),
                failures,
            })
        }
    }
}
