//! Lint rules for annotation-lint

pub mod base;

pub mod required_parameters;

use crate::config::RuleSpec;
use base::LintRule;
use required_parameters::{RequiredParameters, RequiredParametersRule};

/// Build a rule instance from its configuration
pub fn rule_from_spec(spec: &RuleSpec) -> Box<dyn LintRule> {
    let parameters = match &spec.annotation {
        Some(name) => RequiredParameters::new(name.as_str(), spec.parameters.iter().cloned()),
        None => RequiredParameters::unnamed(spec.parameters.iter().cloned()),
    };

    let mut rule = RequiredParametersRule::new(parameters).with_id(spec.rule_id());
    if let Some(severity) = spec.severity {
        rule = rule.with_severity(severity);
    }
    if let Some(message) = &spec.message {
        rule = rule.with_message(message.as_str());
    }
    Box::new(rule)
}

/// Build the active rules: configured instances minus disabled ids and
/// instances without a target annotation
pub fn get_enabled_rules(specs: &[RuleSpec], disabled: &[String]) -> Vec<Box<dyn LintRule>> {
    specs
        .iter()
        .map(rule_from_spec)
        .filter(|rule| {
            if disabled.iter().any(|id| id == rule.rule_id()) {
                log::debug!("Rule {} disabled", rule.rule_id());
                return false;
            }
            if !rule.is_enabled() {
                log::debug!("Rule {} has no annotation configured, skipping", rule.rule_id());
                return false;
            }
            true
        })
        .collect()
}

/// Distinct ids of the given rules, in order of first appearance
pub fn rule_ids(rules: &[Box<dyn LintRule>]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for rule in rules {
        if !ids.iter().any(|id| id == rule.rule_id()) {
            ids.push(rule.rule_id().to_string());
        }
    }
    ids
}
