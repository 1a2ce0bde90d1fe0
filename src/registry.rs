//! The set of compiled schemas and its consistency pass.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{Inconsistency, LoadError};
use crate::linker::LinkedSchema;
use crate::report::{ConsistencyStats, LoadStats};
use crate::schema::{CompileContext, SchemaModel};
use crate::types::SchemaId;

/// Successfully compiled schemas keyed by identity.
///
/// Filled once during loading and read-only afterwards.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<SchemaId, SchemaModel>,
}

/// Outcome of loading one linked schema.
#[derive(Debug)]
pub struct SchemaLoad {
    pub path: PathBuf,
    pub result: Result<SchemaId, LoadError>,
}

/// Inconsistencies found for one schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaInconsistency {
    pub schema: SchemaId,
    pub source: PathBuf,
    pub problems: Vec<Inconsistency>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile every linked schema, in order.
    ///
    /// Schemas failing any load check are left out and reported in the
    /// returned list, which has one entry per linked schema.
    pub fn load(linked: &[LinkedSchema], ctx: CompileContext<'_>) -> (Self, Vec<SchemaLoad>, LoadStats) {
        let mut registry = Self::new();
        let mut loads = Vec::with_capacity(linked.len());
        let mut stats = LoadStats::default();

        for schema in linked {
            let result = SchemaModel::compile(&schema.value, &schema.path, &registry, ctx)
                .and_then(|model| registry.insert(model));

            match &result {
                Ok(id) => {
                    tracing::info!(file = %schema.path.display(), id = %id, "loaded schema");
                    stats.loaded += 1;
                }
                Err(e) if e.is_ignorable() => {
                    tracing::warn!(file = %schema.path.display(), error = %e, "ignoring schema");
                    stats.ignored += 1;
                }
                Err(e) => {
                    tracing::warn!(file = %schema.path.display(), error = %e, "schema failed to load");
                    stats.failed += 1;
                }
            }
            loads.push(SchemaLoad {
                path: schema.path.clone(),
                result,
            });
        }

        (registry, loads, stats)
    }

    /// Add a compiled schema.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::RepeatedIdentity` if the identity is taken; the
    /// registered schema is kept.
    pub fn insert(&mut self, model: SchemaModel) -> Result<SchemaId, LoadError> {
        if let Some(previous) = self.schemas.get(model.id()) {
            return Err(LoadError::RepeatedIdentity {
                id: model.id().clone(),
                path: model.source().to_path_buf(),
                previous: previous.source().to_path_buf(),
            });
        }
        let id = model.id().clone();
        self.schemas.insert(id.clone(), model);
        Ok(id)
    }

    pub fn get(&self, id: &SchemaId) -> Option<&SchemaModel> {
        self.schemas.get(id)
    }

    pub fn contains(&self, id: &SchemaId) -> bool {
        self.schemas.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaModel> {
        self.schemas.values()
    }

    /// Check every foreign key of every schema against the loaded set.
    ///
    /// All problems of a schema are grouped in a single entry. Schemas are
    /// never removed; the run goes on whatever is found.
    pub fn check_consistency(&self) -> (Vec<SchemaInconsistency>, ConsistencyStats) {
        let mut found = Vec::new();
        let mut stats = ConsistencyStats::default();

        for model in self.iter() {
            let mut problems: Vec<Inconsistency> = Vec::new();
            for fk in model.foreign_keys() {
                let problem = match self.get(&fk.target) {
                    None => Some(Inconsistency::MissingTarget {
                        target: fk.target.clone(),
                    }),
                    Some(target) => match target.primary_key() {
                        None => Some(Inconsistency::TargetWithoutPrimaryKey {
                            target: fk.target.clone(),
                        }),
                        Some(pk) if pk.len() != fk.components.len() => {
                            Some(Inconsistency::ArityMismatch {
                                target: fk.target.clone(),
                                expected: pk.len(),
                                found: fk.components.len(),
                            })
                        }
                        Some(_) => None,
                    },
                };
                if let Some(problem) = problem {
                    if !problems.contains(&problem) {
                        problems.push(problem);
                    }
                }
            }

            if problems.is_empty() {
                stats.consistent += 1;
            } else {
                for problem in &problems {
                    tracing::warn!(schema = %model.id(), "{}", problem);
                }
                stats.inconsistent += 1;
                found.push(SchemaInconsistency {
                    schema: model.id().clone(),
                    source: model.source().to_path_buf(),
                    problems,
                });
            }
        }

        (found, stats)
    }
}
