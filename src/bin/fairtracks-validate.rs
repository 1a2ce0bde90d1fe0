//! FAIR Tracks validator CLI
//!
//! Validates JSON documents against a set of schemas and checks primary and
//! foreign keys across the whole corpus.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use fairtracks_validator::{
    run, CurieFormat, FileStatus, Phase, RunOptions, RunReport, Severity,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fairtracks-validate")]
#[command(about = "Validate FAIR Tracks JSON documents against their schemas")]
#[command(version)]
struct Cli {
    /// Schema file or directory of schemas
    schema: PathBuf,

    /// Documents or directories of documents to validate
    documents: Vec<PathBuf>,

    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output the report as JSON (for automation)
    #[arg(long)]
    json: bool,

    /// Only list files with problems
    #[arg(long, short)]
    quiet: bool,

    /// Exit with status 1 when any schema or document fails
    #[arg(long)]
    fail_on_invalid: bool,

    /// Namespace accepted by the curie format (repeatable)
    #[arg(long = "curie-namespace", value_name = "NS")]
    curie_namespaces: Vec<String>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = usage_exit_code(&e);
            // Printing only fails when stdout/stderr are gone.
            let _ = e.print();
            return code;
        }
    };

    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.is_empty() => EnvFilter::new(directives),
        _ => match cli.verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        },
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let options = RunOptions::new().with_format(CurieFormat::with_namespaces(cli.curie_namespaces.clone()));

    let report = match run(&cli.schema, &cli.documents, &options) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: cannot serialize report: {}", e);
                return ExitCode::from(1);
            }
        }
    } else {
        print_text(&report, cli.quiet);
    }

    if cli.fail_on_invalid && report.has_failures() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

/// Help and version exit 0. A bare invocation exits 1, other usage errors
/// keep clap's status 2.
fn usage_exit_code(e: &clap::Error) -> ExitCode {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
        ErrorKind::MissingRequiredArgument
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => ExitCode::from(1),
        _ => ExitCode::from(2),
    }
}

fn print_text(report: &RunReport, quiet: bool) {
    let phases = [
        (Phase::Linking, "Schema linking"),
        (Phase::Loading, "Schema loading"),
        (Phase::Consistency, "Schema consistency"),
        (Phase::Pass1, "Pass 1 (structure and primary keys)"),
        (Phase::Pass2, "Pass 2 (foreign keys)"),
    ];

    for (phase, title) in phases {
        let files: Vec<_> = report
            .files_in(phase)
            .filter(|f| !quiet || f.status != FileStatus::Ok)
            .collect();
        if files.is_empty() {
            continue;
        }

        println!("{} ...", title);
        for file in files {
            let status_icon = match file.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Ignored => "\x1b[33m-\x1b[0m",
                FileStatus::Failed => "\x1b[31m✗\x1b[0m",
            };
            println!("  {} {}", status_icon, file.file);

            for diag in &file.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                println!(
                    "    {}{}[{}]\x1b[0m: {} - {}",
                    color, label, diag.reason, diag.path, diag.message
                );
            }
        }
        println!();
    }

    for line in report.summary_lines() {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parse_verbose_levels() {
        let cli = Cli::try_parse_from(["fairtracks-validate", "schemas"]).unwrap();
        assert_eq!(cli.verbose, 0);
        assert!(cli.documents.is_empty());

        let cli = Cli::try_parse_from(["fairtracks-validate", "-vv", "schemas", "a.json", "docs"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.documents.len(), 2);
    }

    #[test]
    fn cli_requires_schema() {
        let err = Cli::try_parse_from(["fairtracks-validate"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(usage_exit_code(&err), ExitCode::from(1));

        let err = Cli::try_parse_from(["fairtracks-validate", "--help"]).unwrap_err();
        assert_eq!(usage_exit_code(&err), ExitCode::SUCCESS);
    }

    #[test]
    fn cli_repeated_namespaces() {
        let cli = Cli::try_parse_from([
            "fairtracks-validate",
            "--curie-namespace",
            "efo",
            "--curie-namespace",
            "obi",
            "--fail-on-invalid",
            "schemas",
        ])
        .unwrap();
        assert_eq!(cli.curie_namespaces, vec!["efo", "obi"]);
        assert!(cli.fail_on_invalid);
    }
}
