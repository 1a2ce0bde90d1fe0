//! Run report: per-phase counters plus per-file diagnostics.

use serde::Serialize;

use crate::error::{DocumentError, Inconsistency, LoadError};

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic attached to a file.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Stable reason code (e.g. "dup_pk", "fk_missing").
    pub reason: String,
    /// JSON Pointer to the issue, "/" when it concerns the whole file.
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    pub fn error(reason: &str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            reason: reason.to_string(),
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn warning(reason: &str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            reason: reason.to_string(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Diagnostics for a schema that could not be loaded.
    pub fn from_load_error(err: &LoadError) -> Vec<Self> {
        let severity = if err.is_ignorable() {
            Severity::Warning
        } else {
            Severity::Error
        };
        match err {
            LoadError::StructuralViolation { violations, .. } => violations
                .iter()
                .map(|v| Self {
                    severity,
                    reason: err.reason().to_string(),
                    path: pointer_or_root(&v.path),
                    message: v.message.clone(),
                })
                .collect(),
            _ => vec![Self {
                severity,
                reason: err.reason().to_string(),
                path: "/".to_string(),
                message: err.to_string(),
            }],
        }
    }

    /// Diagnostics for a document rejected or ignored in either pass.
    pub fn from_document_error(err: &DocumentError) -> Vec<Self> {
        let reason = err.reason();
        match err {
            DocumentError::StructurallyInvalid { violations, .. } => violations
                .iter()
                .map(|v| Self::error(reason, pointer_or_root(&v.path), v.message.clone()))
                .collect(),
            DocumentError::DuplicatePrimaryKey { collisions, .. } => collisions
                .iter()
                .map(|c| {
                    Self::error(
                        reason,
                        "/",
                        format!("duplicated primary key {} (first seen in {})", c.key, c.original),
                    )
                })
                .collect(),
            DocumentError::ForeignKeyViolation { failures, .. } => failures
                .iter()
                .map(|f| {
                    let reason = if f.is_assertion() { "fk_no_schema" } else { reason };
                    Self::error(reason, "/", f.to_string())
                })
                .collect(),
            _ if err.is_ignorable() => vec![Self::warning(reason, "/", err.to_string())],
            _ => vec![Self::error(reason, "/", err.to_string())],
        }
    }

    pub fn from_inconsistency(inconsistency: &Inconsistency) -> Self {
        let reason = match inconsistency {
            Inconsistency::MissingTarget { .. } => "fk_schema_missing",
            Inconsistency::ArityMismatch { .. } => "fk_arity",
            Inconsistency::TargetWithoutPrimaryKey { .. } => "fk_no_pk",
        };
        Self::error(reason, "/", inconsistency.to_string())
    }
}

fn pointer_or_root(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

/// Phase a file report belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Linking,
    Loading,
    Consistency,
    Pass1,
    Pass2,
}

/// Outcome of a file within a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Warning,
    Ignored,
    Failed,
}

/// Result of processing a single file in one phase.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    pub phase: Phase,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub linked: usize,
    /// Candidates skipped because an earlier file already declared their identity.
    pub duplicated: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub loaded: usize,
    pub ignored: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyStats {
    pub consistent: usize,
    pub inconsistent: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationStats {
    pub directories_ok: usize,
    pub directories_failed: usize,
    pub pass1_ok: usize,
    pub pass1_ignored: usize,
    pub pass1_failed: usize,
    pub pass2_ok: usize,
    pub pass2_failed: usize,
}

/// Everything a run found, in phase order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub linking: LinkStats,
    pub loading: LoadStats,
    pub consistency: ConsistencyStats,
    /// Absent when no documents were given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationStats>,
    pub files: Vec<FileReport>,
}

impl RunReport {
    /// Returns true if any phase counted a failure.
    pub fn has_failures(&self) -> bool {
        let validation_failed = self.validation.is_some_and(|v| {
            v.directories_failed > 0 || v.pass1_failed > 0 || v.pass2_failed > 0
        });
        self.linking.failed > 0
            || self.loading.failed > 0
            || self.consistency.inconsistent > 0
            || validation_failed
    }

    pub fn push(&mut self, file: impl Into<String>, phase: Phase, status: FileStatus, diagnostics: Vec<Diagnostic>) {
        self.files.push(FileReport {
            file: file.into(),
            phase,
            status,
            diagnostics,
        });
    }

    /// Files reported in `phase`, in processing order.
    pub fn files_in(&self, phase: Phase) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(move |f| f.phase == phase)
    }

    /// Human-readable counter lines, one per phase.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!(
                "SCHEMA LINKING STATS: {} linked, {} duplicated, {} failed",
                self.linking.linked, self.linking.duplicated, self.linking.failed
            ),
            format!(
                "SCHEMA VALIDATION STATS: loaded {} schemas, ignored {} schemas, failed {} schemas",
                self.loading.loaded, self.loading.ignored, self.loading.failed
            ),
            format!(
                "SCHEMA CONSISTENCY STATS: {} schemas right, {} with inconsistencies",
                self.consistency.consistent, self.consistency.inconsistent
            ),
        ];
        if let Some(v) = &self.validation {
            lines.push(format!(
                "VALIDATION STATS: directories ({} OK, {} failed)",
                v.directories_ok, v.directories_failed
            ));
            lines.push(format!(
                "  PASS 1: files ({} OK, {} ignored, {} error)",
                v.pass1_ok, v.pass1_ignored, v.pass1_failed
            ));
            lines.push(format!(
                "  PASS 2: files ({} OK, {} error)",
                v.pass2_ok, v.pass2_failed
            ));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ForeignKeyFailure, KeyCollision, Violation};
    use crate::types::SchemaId;
    use std::path::PathBuf;

    fn id(s: &str) -> SchemaId {
        SchemaId::parse(s).unwrap()
    }

    #[test]
    fn structural_violations_become_one_diagnostic_each() {
        let err = DocumentError::StructurallyInvalid {
            source_id: "doc.json".into(),
            schema_id: id("https://example.org/a.json"),
            violations: vec![
                Violation {
                    path: String::new(),
                    message: "\"id\" is a required property".into(),
                },
                Violation {
                    path: "/name".into(),
                    message: "1 is not of type \"string\"".into(),
                },
            ],
        };
        let diags = Diagnostic::from_document_error(&err);
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].path, "/");
        assert_eq!(diags[1].path, "/name");
        assert!(diags.iter().all(|d| d.reason == "schema_error"));
    }

    #[test]
    fn key_diagnostics() {
        let err = DocumentError::DuplicatePrimaryKey {
            source_id: "b.json".into(),
            schema_id: id("https://example.org/a.json"),
            collisions: vec![KeyCollision {
                key: r#"["x"]"#.into(),
                original: "a.json".into(),
            }],
        };
        let diags = Diagnostic::from_document_error(&err);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("a.json"));

        let err = DocumentError::ForeignKeyViolation {
            source_id: "b.json".into(),
            failures: vec![
                ForeignKeyFailure::MissingKey {
                    target: id("https://example.org/a.json"),
                    key: r#"["x"]"#.into(),
                },
                ForeignKeyFailure::UnknownTarget {
                    target: id("https://example.org/z.json"),
                },
            ],
        };
        let reasons: Vec<String> = Diagnostic::from_document_error(&err)
            .into_iter()
            .map(|d| d.reason)
            .collect();
        assert_eq!(reasons, vec!["fk_missing", "fk_no_schema"]);
    }

    #[test]
    fn ignorable_errors_are_warnings() {
        let diags = Diagnostic::from_load_error(&LoadError::NoIdentity {
            path: PathBuf::from("a.json"),
        });
        assert_eq!(diags[0].severity, Severity::Warning);

        let diags = Diagnostic::from_document_error(&DocumentError::NoSchemaId {
            source_id: "doc.json".into(),
        });
        assert_eq!(diags[0].severity, Severity::Warning);
        assert_eq!(diags[0].reason, "no_schema_id");
    }

    #[test]
    fn failures_and_summary() {
        let mut report = RunReport::default();
        assert!(!report.has_failures());
        assert_eq!(report.summary_lines().len(), 3);

        report.validation = Some(ValidationStats {
            pass1_ok: 2,
            pass2_failed: 1,
            ..Default::default()
        });
        assert!(report.has_failures());
        let lines = report.summary_lines();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[5], "  PASS 2: files (0 OK, 1 error)");
    }

    #[test]
    fn json_shape() {
        let mut report = RunReport::default();
        report.push("a.json", Phase::Pass1, FileStatus::Ok, Vec::new());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["files"][0]["phase"], "pass1");
        assert_eq!(value["files"][0]["status"], "ok");
        assert!(value["files"][0].get("diagnostics").is_none());
        assert!(value.get("validation").is_none());
    }
}
