//! Schema discovery and linking.
//!
//! Linking reads every candidate schema file and indexes it by declared
//! identity, before anything is compiled. The linked documents are what
//! `$ref`s resolve against during compilation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::LoadError;
use crate::loader::{expand_paths, load_json};
use crate::report::LinkStats;
use crate::schema::LocalSchemaStore;
use crate::types::{declared_identity, SchemaId};

/// A parsed schema candidate.
#[derive(Debug, Clone)]
pub struct LinkedSchema {
    pub path: PathBuf,
    pub value: Value,
    /// Normalised identity, when the document declares a usable one.
    pub id: Option<SchemaId>,
}

/// A candidate skipped because an earlier file declared the same identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDuplicate {
    pub path: PathBuf,
    pub id: SchemaId,
    pub first: PathBuf,
}

#[derive(Debug, Default)]
pub struct LinkOutcome {
    /// Linked candidates in discovery order, including those without identity.
    pub schemas: Vec<LinkedSchema>,
    pub duplicates: Vec<LinkDuplicate>,
    /// Unreadable files and directories, and unparsable files.
    pub failures: Vec<LoadError>,
    pub stats: LinkStats,
}

impl LinkOutcome {
    /// Store of every linked document with an identity, for `$ref` resolution.
    pub fn store(&self) -> LocalSchemaStore {
        LocalSchemaStore::new(
            self.schemas
                .iter()
                .filter_map(|s| s.id.clone().map(|id| (id, s.value.clone()))),
        )
    }
}

/// Discover and parse the schemas reachable from `paths`.
pub fn link_schemas<P: AsRef<Path>>(paths: &[P]) -> LinkOutcome {
    let expansion = expand_paths(paths);
    let mut outcome = LinkOutcome::default();
    let mut first_seen: HashMap<SchemaId, PathBuf> = HashMap::new();

    for failure in expansion.failed_directories {
        outcome.stats.failed += 1;
        outcome.failures.push(LoadError::Io {
            path: failure.path,
            source: failure.source,
        });
    }

    for path in expansion.files {
        let value = match load_json(&path) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "unable to read schema");
                outcome.stats.failed += 1;
                outcome.failures.push(e.into());
                continue;
            }
        };

        let id = declared_identity(&value).and_then(SchemaId::parse);
        if let Some(id) = &id {
            if let Some(first) = first_seen.get(id) {
                tracing::warn!(
                    file = %path.display(),
                    first = %first.display(),
                    id = %id,
                    "schema identity already linked, skipping"
                );
                outcome.stats.duplicated += 1;
                outcome.duplicates.push(LinkDuplicate {
                    path,
                    id: id.clone(),
                    first: first.clone(),
                });
                continue;
            }
            first_seen.insert(id.clone(), path.clone());
        }

        tracing::debug!(file = %path.display(), "linked schema");
        outcome.stats.linked += 1;
        outcome.schemas.push(LinkedSchema { path, value, id });
    }

    tracing::info!(
        linked = outcome.stats.linked,
        duplicated = outcome.stats.duplicated,
        failed = outcome.stats.failed,
        "schema linking finished"
    );
    outcome
}
