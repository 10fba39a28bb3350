//! Run log for annotation-lint
//!
//! Appends one JSON object per lint run to a file (JSON Lines), so results
//! can be compared across runs.

use crate::models::{LintResult, Severity};
use crate::utils::{truncate_source_line, SourceLines};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const MAX_SOURCE_CHARS: usize = 200;

/// A single log entry representing one lint run
#[derive(Debug, Serialize, Deserialize)]
pub struct LintLogEntry {
    /// Unix timestamp of when the lint was run
    pub timestamp: i64,
    /// ISO 8601 formatted date string
    pub datetime: String,
    pub files_scanned: usize,
    /// Files that could not be read or parsed
    pub files_failed: usize,
    pub total_violations: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub violations: Vec<ViolationLogEntry>,
    /// Rule ids active for this run
    pub enabled_rules: Vec<String>,
}

/// Log entry for a single violation
#[derive(Debug, Serialize, Deserialize)]
pub struct ViolationLogEntry {
    pub rule_id: String,
    pub file_path: String,
    pub line: usize,
    pub severity: Severity,
    pub message: String,
    /// Source line content (truncated if too long)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_line: Option<String>,
}

impl LintLogEntry {
    pub fn from_results(results: &[LintResult], enabled_rules: Vec<String>) -> Self {
        let now = Utc::now();
        let mut sources = SourceLines::new();

        let violations: Vec<ViolationLogEntry> = results
            .iter()
            .flat_map(|result| result.violations.iter())
            .map(|v| {
                let source_line = sources.get(&v.file_path, v.line);
                ViolationLogEntry {
                    rule_id: v.rule_id.clone(),
                    file_path: v.file_path.clone(),
                    line: v.line,
                    severity: v.severity,
                    message: v.message.clone(),
                    source_line: (!source_line.is_empty())
                        .then(|| truncate_source_line(source_line, MAX_SOURCE_CHARS)),
                }
            })
            .collect();

        let count = |severity: Severity| -> usize {
            results.iter().map(|r| r.count_by_severity(severity)).sum()
        };

        Self {
            timestamp: now.timestamp(),
            datetime: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            files_scanned: results.len(),
            files_failed: results.iter().filter(|r| r.error.is_some()).count(),
            total_violations: violations.len(),
            error_count: count(Severity::Error),
            warning_count: count(Severity::Warning),
            info_count: count(Severity::Info),
            violations,
            enabled_rules,
        }
    }
}

/// Logger that appends lint runs to a file
pub struct LintLogger {
    writer: BufWriter<File>,
    log_path: PathBuf,
}

impl LintLogger {
    /// Open `log_path` for appending, creating it and its parent
    /// directories if needed
    pub fn new(log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            writer: BufWriter::new(file),
            log_path: log_path.to_path_buf(),
        })
    }

    pub fn log(&mut self, entry: &LintLogEntry) -> std::io::Result<()> {
        let json = serde_json::to_string(entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}
