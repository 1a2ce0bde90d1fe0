//! Run sequencing: linking, loading, consistency, pass 1, pass 2.

use std::path::{Path, PathBuf};

use crate::document::Document;
use crate::error::{DocumentError, LoadError, RunError};
use crate::format::{CurieFormat, FormatRegistry, FormatValidator};
use crate::linker::link_schemas;
use crate::loader::expand_paths;
use crate::meta::MetaSchemas;
use crate::registry::SchemaRegistry;
use crate::report::{Diagnostic, FileStatus, Phase, RunReport, ValidationStats};
use crate::schema::CompileContext;
use crate::validator::DocumentValidator;

/// Options for a validation run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    formats: FormatRegistry,
}

impl RunOptions {
    /// Options with the built-in `curie` format registered.
    pub fn new() -> Self {
        Self {
            formats: FormatRegistry::new().with(CurieFormat::new()),
        }
    }

    /// Replace the whole format table.
    pub fn with_formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = formats;
        self
    }

    /// Add or replace one format plugin.
    pub fn with_format<F: FormatValidator + 'static>(mut self, plugin: F) -> Self {
        self.formats.register(plugin);
        self
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate the documents reachable from `documents` against the schemas
/// reachable from `schema_root`.
///
/// Every problem is collected in the returned report; no phase stops at
/// the first failure.
///
/// # Errors
///
/// Returns `RunError::NoSchemasLoaded` if documents were given but no
/// schema could be loaded.
pub fn run<P: AsRef<Path>>(schema_root: &Path, documents: &[P], options: &RunOptions) -> Result<RunReport, RunError> {
    let mut report = RunReport::default();

    // Linking
    let linked = link_schemas(&[schema_root]);
    for failure in &linked.failures {
        let path = match failure {
            LoadError::Io { path, .. } | LoadError::InvalidJson { path, .. } => path.display().to_string(),
            _ => schema_root.display().to_string(),
        };
        report.push(path, Phase::Linking, FileStatus::Failed, Diagnostic::from_load_error(failure));
    }
    for dup in &linked.duplicates {
        report.push(
            dup.path.display().to_string(),
            Phase::Linking,
            FileStatus::Ignored,
            vec![Diagnostic::warning(
                "dup_id",
                "/",
                format!("identity {} already linked from {}", dup.id, dup.first.display()),
            )],
        );
    }
    report.linking = linked.stats;

    // Loading
    let meta = MetaSchemas::new();
    let store = linked.store();
    let ctx = CompileContext {
        meta: &meta,
        formats: options.formats(),
        store: &store,
    };
    let (registry, loads, load_stats) = SchemaRegistry::load(&linked.schemas, ctx);
    report.loading = load_stats;
    for load in &loads {
        let file = load.path.display().to_string();
        match &load.result {
            Ok(id) => {
                let warnings: Vec<Diagnostic> = registry
                    .get(id)
                    .map(|model| model.warnings())
                    .unwrap_or_default()
                    .iter()
                    .map(|w| {
                        tracing::warn!(file = %file, "{}", w);
                        Diagnostic::warning("schema_warning", "/", w.clone())
                    })
                    .collect();
                let status = if warnings.is_empty() {
                    FileStatus::Ok
                } else {
                    FileStatus::Warning
                };
                report.push(file, Phase::Loading, status, warnings);
            }
            Err(e) => {
                let status = if e.is_ignorable() {
                    FileStatus::Ignored
                } else {
                    FileStatus::Failed
                };
                report.push(file, Phase::Loading, status, Diagnostic::from_load_error(e));
            }
        }
    }
    tracing::info!(
        loaded = report.loading.loaded,
        ignored = report.loading.ignored,
        failed = report.loading.failed,
        "schema loading finished"
    );

    // Consistency
    let (inconsistencies, consistency) = registry.check_consistency();
    report.consistency = consistency;
    for found in &inconsistencies {
        report.push(
            found.source.display().to_string(),
            Phase::Consistency,
            FileStatus::Failed,
            found.problems.iter().map(Diagnostic::from_inconsistency).collect(),
        );
    }

    if documents.is_empty() {
        return Ok(report);
    }
    if registry.is_empty() {
        tracing::error!("no schema was successfully loaded, documents cannot be validated");
        return Err(RunError::NoSchemasLoaded);
    }

    let mut stats = ValidationStats::default();
    let expansion = expand_paths(documents);
    stats.directories_ok = expansion.directories;
    stats.directories_failed = expansion.failed_directories.len();
    for failure in &expansion.failed_directories {
        report.push(
            failure.path.display().to_string(),
            Phase::Pass1,
            FileStatus::Failed,
            vec![Diagnostic::error("fatal", "/", format!("unable to open directory: {}", failure.source))],
        );
    }

    // Pass 1
    let mut pass1 = DocumentValidator::new(&registry);
    let mut accepted: Vec<PathBuf> = Vec::new();
    for path in &expansion.files {
        let file = path.display().to_string();
        let result = Document::from_file(path).and_then(|doc| pass1.validate(&doc));
        match result {
            Ok(()) => {
                tracing::info!(file = %file, "pass 1 ok");
                stats.pass1_ok += 1;
                accepted.push(path.clone());
                report.push(file, Phase::Pass1, FileStatus::Ok, Vec::new());
            }
            Err(e) => {
                let status = record_document_error(&e, &file, "pass 1");
                if status == FileStatus::Ignored {
                    stats.pass1_ignored += 1;
                } else {
                    stats.pass1_failed += 1;
                }
                report.push(file, Phase::Pass1, status, Diagnostic::from_document_error(&e));
            }
        }
    }

    // Barrier: pass 2 reads the indices pass 1 left behind.
    let pass2 = pass1.finish();
    for path in &accepted {
        let file = path.display().to_string();
        let result = Document::from_file(path).and_then(|doc| pass2.validate(&doc));
        match result {
            Ok(()) => {
                tracing::info!(file = %file, "pass 2 ok");
                stats.pass2_ok += 1;
                report.push(file, Phase::Pass2, FileStatus::Ok, Vec::new());
            }
            Err(e) => {
                record_document_error(&e, &file, "pass 2");
                stats.pass2_failed += 1;
                report.push(file, Phase::Pass2, FileStatus::Failed, Diagnostic::from_document_error(&e));
            }
        }
    }

    tracing::info!(
        pass1_ok = stats.pass1_ok,
        pass1_ignored = stats.pass1_ignored,
        pass1_failed = stats.pass1_failed,
        pass2_ok = stats.pass2_ok,
        pass2_failed = stats.pass2_failed,
        "document validation finished"
    );
    report.validation = Some(stats);
    Ok(report)
}

fn record_document_error(err: &DocumentError, file: &str, pass: &str) -> FileStatus {
    if err.is_ignorable() {
        tracing::info!(file, pass, reason = err.reason(), "ignoring document: {}", err);
        FileStatus::Ignored
    } else {
        tracing::warn!(file, pass, reason = err.reason(), "{}", err);
        FileStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_register_curie_by_default() {
        let options = RunOptions::new();
        assert!(options.formats().get(CurieFormat::NAME).is_some());

        let options = RunOptions::new().with_formats(FormatRegistry::new());
        assert!(options.formats().is_empty());
    }

    #[test]
    fn no_schema_with_documents_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(dir.path(), &[dir.path()], &RunOptions::new()).unwrap_err();
        assert!(matches!(err, RunError::NoSchemasLoaded));
    }

    #[test]
    fn no_documents_only_loads_schemas() {
        let dir = tempfile::tempdir().unwrap();
        let report = run::<&Path>(dir.path(), &[], &RunOptions::new()).unwrap();
        assert!(report.validation.is_none());
        assert_eq!(report.loading.loaded, 0);
    }
}
