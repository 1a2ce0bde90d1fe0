//! CLI integration tests for fairtracks-validate binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("fairtracks-validate"))
}

// Helper to create a temp file, creating parent directories as needed
fn write_temp_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

const EXPERIMENT_SCHEMA: &str = r#"{
    "$schema": "http://json-schema.org/draft-07/schema#",
    "$id": "https://example.org/schemas/experiment.json",
    "type": "object",
    "required": ["id"],
    "properties": { "id": { "type": "string" } },
    "primary_key": ["id"]
}"#;

const TRACK_SCHEMA: &str = r#"{
    "$schema": "http://json-schema.org/draft-07/schema#",
    "$id": "https://example.org/schemas/track.json",
    "type": "object",
    "required": ["id"],
    "properties": {
        "id": { "type": "string" },
        "experiment": { "type": "string" }
    },
    "primary_key": ["id"],
    "foreign_keys": [
        { "schema_id": "experiment.json", "members": ["experiment"] }
    ]
}"#;

/// Schemas under `schemas/`, documents under `docs/`.
fn corpus(dir: &TempDir) -> (PathBuf, PathBuf) {
    let schemas = dir.path().join("schemas");
    let docs = dir.path().join("docs");
    write_temp_file(&schemas, "experiment.json", EXPERIMENT_SCHEMA);
    write_temp_file(&schemas, "track.json", TRACK_SCHEMA);
    fs::create_dir_all(&docs).unwrap();
    (schemas, docs)
}

fn experiment(id: &str) -> String {
    format!(
        r#"{{"$schema": "https://example.org/schemas/experiment.json", "id": "{}"}}"#,
        id
    )
}

fn track(id: &str, experiment: &str) -> String {
    format!(
        r#"{{"$schema": "https://example.org/schemas/track.json", "id": "{}", "experiment": "{}"}}"#,
        id, experiment
    )
}

mod valid_corpus {
    use super::*;

    #[test]
    fn all_documents_pass() {
        let dir = TempDir::new().unwrap();
        let (schemas, docs) = corpus(&dir);
        write_temp_file(&docs, "a-track.json", &track("t1", "e1"));
        write_temp_file(&docs, "b-experiment.json", &experiment("e1"));

        cmd()
            .arg(&schemas)
            .arg(&docs)
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "SCHEMA VALIDATION STATS: loaded 2 schemas, ignored 0 schemas, failed 0 schemas",
            ))
            .stdout(predicate::str::contains("PASS 1: files (2 OK, 0 ignored, 0 error)"))
            .stdout(predicate::str::contains("PASS 2: files (2 OK, 0 error)"));
    }

    #[test]
    fn schemas_only() {
        let dir = TempDir::new().unwrap();
        let (schemas, _) = corpus(&dir);

        cmd()
            .arg(&schemas)
            .assert()
            .success()
            .stdout(predicate::str::contains("SCHEMA CONSISTENCY STATS: 2 schemas right"))
            .stdout(predicate::str::contains("VALIDATION STATS: directories").not())
            .stdout(predicate::str::contains("PASS 1: files").not());
    }

    #[test]
    fn quiet_hides_passing_files() {
        let dir = TempDir::new().unwrap();
        let (schemas, docs) = corpus(&dir);
        write_temp_file(&docs, "experiment.json", &experiment("e1"));

        cmd()
            .arg("--quiet")
            .arg(&schemas)
            .arg(&docs)
            .assert()
            .success()
            .stdout(predicate::str::contains("experiment.json").not());
    }
}

mod invalid_corpus {
    use super::*;

    #[test]
    fn failures_do_not_change_exit_code_by_default() {
        let dir = TempDir::new().unwrap();
        let (schemas, docs) = corpus(&dir);
        write_temp_file(&docs, "track.json", &track("t1", "nope"));

        cmd()
            .arg(&schemas)
            .arg(&docs)
            .assert()
            .success()
            .stdout(predicate::str::contains("fk_missing"))
            .stdout(predicate::str::contains("PASS 2: files (0 OK, 1 error)"));
    }

    #[test]
    fn fail_on_invalid_sets_exit_code() {
        let dir = TempDir::new().unwrap();
        let (schemas, docs) = corpus(&dir);
        write_temp_file(&docs, "a.json", &experiment("e1"));
        write_temp_file(&docs, "b.json", &experiment("e1"));

        cmd()
            .arg("--fail-on-invalid")
            .arg(&schemas)
            .arg(&docs)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("dup_pk"));
    }

    #[test]
    fn structural_errors_listed_with_path() {
        let dir = TempDir::new().unwrap();
        let (schemas, docs) = corpus(&dir);
        let doc = write_temp_file(
            &docs,
            "bad.json",
            r#"{"$schema": "https://example.org/schemas/experiment.json", "id": 12}"#,
        );

        cmd()
            .arg(&schemas)
            .arg(&doc)
            .assert()
            .success()
            .stdout(predicate::str::contains("schema_error"))
            .stdout(predicate::str::contains("/id"));
    }

    #[test]
    fn documents_without_schema_are_ignored() {
        let dir = TempDir::new().unwrap();
        let (schemas, docs) = corpus(&dir);
        write_temp_file(&docs, "plain.json", r#"{"id": "x"}"#);

        cmd()
            .arg("--fail-on-invalid")
            .arg(&schemas)
            .arg(&docs)
            .assert()
            .success()
            .stdout(predicate::str::contains("PASS 1: files (0 OK, 1 ignored, 0 error)"));
    }
}

mod json_output {
    use super::*;

    #[test]
    fn report_is_json() {
        let dir = TempDir::new().unwrap();
        let (schemas, docs) = corpus(&dir);
        write_temp_file(&docs, "track.json", &track("t1", "missing"));

        let output = cmd()
            .arg("--json")
            .arg(&schemas)
            .arg(&docs)
            .output()
            .unwrap();
        assert!(output.status.success());

        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(report["loading"]["loaded"], 2);
        assert_eq!(report["validation"]["pass2_failed"], 1);

        let pass2: Vec<&serde_json::Value> = report["files"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|f| f["phase"] == "pass2")
            .collect();
        assert_eq!(pass2.len(), 1);
        assert_eq!(pass2[0]["status"], "failed");
        assert_eq!(pass2[0]["diagnostics"][0]["reason"], "fk_missing");
    }
}

mod error_handling {
    use super::*;

    #[test]
    fn no_arguments_exits_with_one() {
        cmd()
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Usage"));
    }

    #[test]
    fn unknown_flag_is_a_usage_error() {
        cmd().arg("--frobnicate").arg("schemas").assert().code(2);
    }

    #[test]
    fn no_schema_loaded_with_documents() {
        let dir = TempDir::new().unwrap();
        let schemas = dir.path().join("schemas");
        write_temp_file(&schemas, "broken.json", "{ not json");
        let doc = write_temp_file(dir.path(), "doc.json", &experiment("e1"));

        cmd()
            .arg(&schemas)
            .arg(&doc)
            .assert()
            .code(1)
            .stderr(predicate::str::contains("no schema was successfully loaded"));
    }

    #[test]
    fn missing_document_is_counted_as_failed() {
        let dir = TempDir::new().unwrap();
        let (schemas, _) = corpus(&dir);

        cmd()
            .arg(&schemas)
            .arg(dir.path().join("nowhere.json"))
            .assert()
            .success()
            .stdout(predicate::str::contains("PASS 1: files (0 OK, 0 ignored, 1 error)"));
    }
}

mod formats {
    use super::*;

    const SAMPLE_SCHEMA: &str = r#"{
        "$schema": "http://json-schema.org/draft-07/schema#",
        "$id": "https://example.org/schemas/sample.json",
        "type": "object",
        "properties": { "organism": { "type": "string", "format": "curie" } }
    }"#;

    #[test]
    fn curie_namespaces_from_flag() {
        let dir = TempDir::new().unwrap();
        let schemas = dir.path().join("schemas");
        write_temp_file(&schemas, "sample.json", SAMPLE_SCHEMA);
        let docs = dir.path().join("docs");
        write_temp_file(
            &docs,
            "good.json",
            r#"{"$schema": "https://example.org/schemas/sample.json", "organism": "ncbitaxon:9606"}"#,
        );
        write_temp_file(
            &docs,
            "other.json",
            r#"{"$schema": "https://example.org/schemas/sample.json", "organism": "uniprot:P12345"}"#,
        );

        cmd()
            .args(["--curie-namespace", "ncbitaxon"])
            .arg(&schemas)
            .arg(&docs)
            .assert()
            .success()
            .stdout(predicate::str::contains("PASS 1: files (1 OK, 0 ignored, 1 error)"));
    }
}

mod help_and_version {
    use super::*;

    #[test]
    fn help() {
        cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--fail-on-invalid"))
            .stdout(predicate::str::contains("--curie-namespace"));
    }

    #[test]
    fn version() {
        cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("fairtracks-validate"));
    }
}
