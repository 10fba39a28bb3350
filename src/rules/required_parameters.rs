//! ANN001: Required Decorator Parameters
//!
//! A configured decorator must be applied with every required keyword
//! parameter spelled out at the use site:
//!
//! ```python
//! @route("/users", methods=["GET"], endpoint="users")   # ok
//! @route("/users", methods=["GET"])                     # missing endpoint
//! ```
//!
//! Only presence is checked. Values, defaults and unknown keywords are not.

use crate::models::{RuleContext, Severity, Violation};
use crate::rules::base::LintRule;
use crate::syntax::AnnotationUse;
use std::collections::BTreeSet;

pub const DEFAULT_RULE_ID: &str = "ANN001";

pub const DEFAULT_MESSAGE: &str =
    "Annotation @{annotation} missing one of these required parameters: ({parameters})";

/// Which decorator to check and which keywords it must carry.
///
/// Immutable once built; one value is shared by every check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredParameters {
    annotation_name: Option<String>,
    required: BTreeSet<String>,
}

impl RequiredParameters {
    pub fn new<I, S>(annotation_name: impl Into<String>, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            annotation_name: Some(annotation_name.into()),
            required: required.into_iter().map(Into::into).collect(),
        }
    }

    /// A configuration without a target name; it matches nothing.
    pub fn unnamed<I, S>(required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            annotation_name: None,
            required: required.into_iter().map(Into::into).collect(),
        }
    }

    pub fn annotation_name(&self) -> Option<&str> {
        self.annotation_name.as_deref()
    }

    pub fn required(&self) -> &BTreeSet<String> {
        &self.required
    }

    fn matches(&self, annotation: &AnnotationUse) -> bool {
        self.annotation_name.as_deref() == Some(annotation.simple_name())
    }

    /// Supplied names that are required. A required name written twice
    /// counts twice.
    fn found_count(&self, annotation: &AnnotationUse) -> usize {
        annotation
            .parameter_names()
            .filter(|name| self.required.contains(*name))
            .count()
    }
}

pub struct RequiredParametersRule {
    id: String,
    severity: Severity,
    message: String,
    description: String,
    parameters: RequiredParameters,
}

impl RequiredParametersRule {
    pub fn new(parameters: RequiredParameters) -> Self {
        let description = match parameters.annotation_name() {
            Some(name) => format!("@{} must be given its required keyword parameters", name),
            None => "Decorator rule without a target annotation (inactive)".to_string(),
        };
        Self {
            id: DEFAULT_RULE_ID.to_string(),
            severity: Severity::Error,
            message: DEFAULT_MESSAGE.to_string(),
            description,
            parameters,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Replace the message template. `{annotation}` and `{parameters}` are
    /// substituted.
    pub fn with_message(mut self, template: impl Into<String>) -> Self {
        self.message = template.into();
        self
    }

    pub fn parameters(&self) -> &RequiredParameters {
        &self.parameters
    }

    /// Validate one annotation use, returning the diagnostic message when a
    /// required parameter is missing.
    pub fn check_annotation(&self, annotation: &AnnotationUse) -> Option<String> {
        if !self.parameters.matches(annotation) {
            return None;
        }

        let found = self.parameters.found_count(annotation);
        if found >= self.parameters.required.len() {
            return None;
        }

        Some(self.format_message())
    }

    fn format_message(&self) -> String {
        let annotation = self.parameters.annotation_name().unwrap_or_default();
        let parameters = self
            .parameters
            .required
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");
        self.message
            .replace("{annotation}", annotation)
            .replace("{parameters}", &parameters)
    }
}

impl LintRule for RequiredParametersRule {
    fn rule_id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn is_enabled(&self) -> bool {
        self.parameters.annotation_name.is_some()
    }

    fn check(&self, context: &RuleContext) -> Option<Violation> {
        let message = self.check_annotation(context.annotation)?;
        let offset = context.annotation.offset();
        Some(Violation::new(
            self.id.clone(),
            message,
            offset,
            context.line_of(offset),
            context.file_path.to_string(),
            self.severity,
        ))
    }
}
