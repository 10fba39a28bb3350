//! Base trait for all lint rules

use crate::models::{RuleContext, Violation};

/// Base trait that all lint rules must implement
pub trait LintRule: Send + Sync {
    /// The identifier reported with violations (e.g., "ANN001")
    fn rule_id(&self) -> &str;

    /// Short description of what the rule checks
    fn description(&self) -> &str;

    /// Check if this rule is enabled (default: true)
    fn is_enabled(&self) -> bool {
        true
    }

    /// Check one annotation use; at most one violation per use
    fn check(&self, context: &RuleContext) -> Option<Violation>;
}
