//! annotation-lint CLI

use annotation_lint::{
    collect_python_files, config,
    config::RuleSpec,
    lint_files_parallel,
    logging::{LintLogEntry, LintLogger},
    models::{LintResult, Severity},
    rules,
    utils::SourceLines,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "annotation-lint")]
#[command(version, about = "Flag Python decorators that are missing required keyword parameters")]
struct Args {
    /// Files or directories to lint
    #[arg(default_value = ".")]
    paths: Vec<String>,

    /// Require parameters on a decorator: NAME=param1,param2 (repeatable)
    #[arg(long = "require", value_name = "NAME=PARAMS")]
    require: Vec<RuleSpec>,

    /// Disable rule ids (comma-separated)
    #[arg(long, value_delimiter = ',')]
    disable: Vec<String>,

    /// Exclude paths matching patterns
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output_format: OutputFormat,

    /// Read configuration from this file instead of the nearest pyproject.toml
    #[arg(long, conflicts_with = "no_config")]
    config: Option<PathBuf>,

    /// Ignore pyproject.toml configuration
    #[arg(long)]
    no_config: bool,

    /// Append a JSON Lines record of this run to a file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .try_init()
        .ok();

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> Result<ExitCode> {
    let config = if args.no_config {
        None
    } else {
        config::load_config(args.config.as_deref()).context("failed to load configuration")?
    };

    let settings = config::merge_config(config.as_ref(), &args.require, &args.disable, &args.exclude);
    log::debug!("Exclude patterns: {:?}", settings.exclude);

    let active_rules = rules::get_enabled_rules(&settings.required, &settings.disable);
    let rule_ids = rules::rule_ids(&active_rules);
    for rule in &active_rules {
        log::debug!("Active rule {}: {}", rule.rule_id(), rule.description());
    }

    if active_rules.is_empty() {
        eprintln!(
            "No decorators configured. Add [[tool.annotation-lint.required]] to pyproject.toml or pass --require NAME=PARAMS"
        );
        return Ok(ExitCode::SUCCESS);
    }

    let files = collect_python_files(&args.paths, &settings.exclude);
    log::debug!("Found {} Python files", files.len());

    if files.is_empty() {
        eprintln!("No Python files found");
        return Ok(ExitCode::SUCCESS);
    }

    let results = lint_files_parallel(&files, &active_rules);

    if let Some(log_path) = &args.log_file {
        let entry = LintLogEntry::from_results(&results, rule_ids);
        let mut logger = LintLogger::new(log_path)
            .with_context(|| format!("failed to open log file {}", log_path.display()))?;
        logger
            .log(&entry)
            .with_context(|| format!("failed to write log file {}", logger.log_path().display()))?;
    }

    let count = |severity: Severity| -> usize {
        results.iter().map(|r| r.count_by_severity(severity)).sum()
    };
    let error_count = count(Severity::Error);
    let warning_count = count(Severity::Warning);
    let info_count = count(Severity::Info);

    match args.output_format {
        OutputFormat::Json => print_json(&results)?,
        OutputFormat::Text => print_text_grouped(&results),
    }

    let total = error_count + warning_count + info_count;
    if total > 0 {
        eprintln!(
            "\nFound {} issue(s): {} error(s), {} warning(s), {} info",
            total, error_count, warning_count, info_count
        );
    } else if args.verbose {
        eprintln!("\nNo issues found.");
    }

    if error_count > 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

const RULE_NAME: &str = "Required Decorator Parameters";
const RULE_FIX: &str = "Pass every required parameter by keyword at the decorator use site, or suppress with `# noqa: <ID>`.";

/// Violation info for grouping
struct ViolationInfo {
    file_path: String,
    line: usize,
    severity: Severity,
    message: String,
    source_line: String,
}

fn group_by_rule(results: &[LintResult]) -> BTreeMap<String, Vec<ViolationInfo>> {
    let mut sources = SourceLines::new();
    let mut grouped: BTreeMap<String, Vec<ViolationInfo>> = BTreeMap::new();

    for result in results {
        for v in &result.violations {
            grouped
                .entry(v.rule_id.clone())
                .or_default()
                .push(ViolationInfo {
                    file_path: v.file_path.clone(),
                    line: v.line,
                    severity: v.severity,
                    message: v.message.clone(),
                    source_line: sources.get(&v.file_path, v.line).to_string(),
                });
        }
    }

    grouped
}

fn print_text_grouped(results: &[LintResult]) {
    for result in results {
        if let Some(error) = &result.error {
            eprintln!("{}: {}", result.file_path.red(), error);
        }
    }

    for (rule_id, violations) in &group_by_rule(results) {
        let count = violations.len();

        let severity = violations
            .first()
            .map(|v| v.severity)
            .unwrap_or(Severity::Error);
        let header_color = match severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Info => "info".blue().bold(),
        };

        println!(
            "\n{} {} - {} ({} occurrence{})",
            header_color,
            rule_id.cyan().bold(),
            RULE_NAME.white().bold(),
            count,
            if count == 1 { "" } else { "s" }
        );
        println!("{}", "─".repeat(80).dimmed());
        println!("  {}  {}", "Fix:".bright_green(), RULE_FIX);
        println!();

        for v in violations {
            println!(
                "    {}:{}  {}",
                v.file_path.dimmed(),
                v.line.to_string().yellow(),
                v.message
            );
            if !v.source_line.is_empty() {
                println!("      {}", v.source_line.bright_white());
            }
        }
    }
}

fn print_json(results: &[LintResult]) -> Result<()> {
    let output: Vec<serde_json::Value> = group_by_rule(results)
        .into_iter()
        .map(|(rule_id, violations)| {
            let violations: Vec<serde_json::Value> = violations
                .iter()
                .map(|v| {
                    serde_json::json!({
                        "file": v.file_path,
                        "line": v.line,
                        "severity": v.severity,
                        "message": v.message,
                        "source": v.source_line,
                    })
                })
                .collect();
            serde_json::json!({
                "rule": rule_id,
                "name": RULE_NAME,
                "count": violations.len(),
                "violations": violations,
            })
        })
        .collect();

    let errors: Vec<serde_json::Value> = results
        .iter()
        .filter_map(|r| {
            r.error
                .as_ref()
                .map(|e| serde_json::json!({ "file": r.file_path, "error": e }))
        })
        .collect();

    let report = serde_json::json!({ "rules": output, "errors": errors });
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to serialize report")?
    );
    Ok(())
}
