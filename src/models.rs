//! Core data models for annotation-lint

use crate::noqa::offset_to_line;
use crate::syntax::AnnotationUse;
use serde::{Deserialize, Serialize};

/// A violation detected by a lint rule
#[derive(Debug, Clone)]
pub struct Violation {
    pub rule_id: String,
    pub message: String,
    pub offset: usize,
    /// 1-indexed line of `offset`
    pub line: usize,
    pub file_path: String,
    pub severity: Severity,
}

/// Severity level of a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
}

impl Violation {
    pub fn new(
        rule_id: String,
        message: String,
        offset: usize,
        line: usize,
        file_path: String,
        severity: Severity,
    ) -> Self {
        Self {
            rule_id,
            message,
            offset,
            line,
            file_path,
            severity,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Context passed to each rule for checking one annotation use
pub struct RuleContext<'a> {
    pub annotation: &'a AnnotationUse,
    pub file_path: &'a str,
    pub source: &'a str,
}

impl RuleContext<'_> {
    /// Line number (1-indexed) of a byte offset in the checked source
    pub fn line_of(&self, offset: usize) -> usize {
        offset_to_line(self.source, offset)
    }
}

/// Result of linting a single file
#[derive(Debug, Default)]
pub struct LintResult {
    pub file_path: String,
    pub violations: Vec<Violation>,
    pub error: Option<String>,
}

impl LintResult {
    pub fn new(file_path: String) -> Self {
        Self {
            file_path,
            violations: Vec::new(),
            error: None,
        }
    }

    pub fn with_error(file_path: String, error: String) -> Self {
        Self {
            file_path,
            violations: Vec::new(),
            error: Some(error),
        }
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == severity)
            .count()
    }
}
