//! Configuration loading for annotation-lint
//!
//! Loads configuration from the pyproject.toml [tool.annotation-lint] section

use crate::models::Severity;
use crate::ExcludePatterns;
use crate::rules::required_parameters::DEFAULT_RULE_ID;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const TOOL_SECTION: &str = "annotation-lint";

static RULE_ID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9]*$").unwrap());

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{} has no [tool.annotation-lint] section", .0.display())]
    MissingSection(PathBuf),

    #[error("invalid rule id '{0}': expected uppercase letters and digits, starting with a letter")]
    InvalidRuleId(String),

    #[error("invalid --require value '{0}': expected NAME=param1,param2")]
    InvalidRequire(String),
}

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Config {
    /// Paths to exclude from linting
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Rule ids to disable
    #[serde(default)]
    pub disable: Vec<String>,

    /// One entry per checked decorator
    #[serde(default)]
    pub required: Vec<RuleSpec>,
}

/// One required-parameters rule instance
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct RuleSpec {
    /// Simple name of the decorator; absent means the rule matches nothing
    pub annotation: Option<String>,

    /// Keyword parameters that must be written at every use
    #[serde(default)]
    pub parameters: Vec<String>,

    #[serde(default)]
    pub severity: Option<Severity>,

    /// Reported rule id, default ANN001
    #[serde(default)]
    pub id: Option<String>,

    /// Message template with {annotation} and {parameters} placeholders
    #[serde(default)]
    pub message: Option<String>,
}

impl RuleSpec {
    pub fn rule_id(&self) -> &str {
        self.id.as_deref().unwrap_or(DEFAULT_RULE_ID)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let id = self.rule_id();
        if !RULE_ID_REGEX.is_match(id) {
            return Err(ConfigError::InvalidRuleId(id.to_string()));
        }
        Ok(())
    }
}

/// `NAME=param1,param2` as given to `--require`
impl FromStr for RuleSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, params) = s.split_once('=').unwrap_or((s, ""));
        let name = name.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidRequire(s.to_string()));
        }

        let parameters = params
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        Ok(RuleSpec {
            annotation: Some(name.to_string()),
            parameters,
            ..Default::default()
        })
    }
}

/// Find pyproject.toml with [tool.annotation-lint] section, walking up from
/// `start_path`
pub fn find_config_pyproject_toml(start_path: &Path) -> Option<PathBuf> {
    let mut current = if start_path.is_file() {
        start_path.parent()?
    } else {
        start_path
    };

    loop {
        let pyproject = current.join("pyproject.toml");
        if pyproject.exists() {
            if let Ok(content) = std::fs::read_to_string(&pyproject) {
                if let Ok(value) = toml::from_str::<toml::Value>(&content) {
                    if tool_section(&value).is_some() {
                        return Some(pyproject);
                    }
                }
            }
        }

        current = current.parent()?;
    }
}

fn tool_section(value: &toml::Value) -> Option<&toml::Value> {
    value.get("tool")?.get(TOOL_SECTION)
}

/// Load configuration.
///
/// With an explicit path the file must exist and carry the tool section.
/// Without one, the nearest pyproject.toml with the section is used;
/// `Ok(None)` when there is none.
pub fn load_config(path: Option<&Path>) -> Result<Option<Config>, ConfigError> {
    let config_path = match path {
        Some(p) if p.exists() => p.to_path_buf(),
        Some(p) => return Err(ConfigError::NotFound(p.to_path_buf())),
        None => {
            let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
                path: PathBuf::from("."),
                source,
            })?;
            match find_config_pyproject_toml(&cwd) {
                Some(found) => found,
                None => return Ok(None),
            }
        }
    };

    log::debug!("Loading configuration from {}", config_path.display());

    let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Io {
        path: config_path.clone(),
        source,
    })?;
    let value: toml::Value = toml::from_str(&content).map_err(|source| ConfigError::Toml {
        path: config_path.clone(),
        source,
    })?;

    let section = tool_section(&value)
        .ok_or_else(|| ConfigError::MissingSection(config_path.clone()))?
        .clone();
    let config: Config = section.try_into().map_err(|source| ConfigError::Toml {
        path: config_path.clone(),
        source,
    })?;

    for spec in &config.required {
        spec.validate()?;
    }

    Ok(Some(config))
}

/// Settings after merging the config file with command line arguments
#[derive(Debug, Default, Clone)]
pub struct Settings {
    pub required: Vec<RuleSpec>,
    pub disable: Vec<String>,
    pub exclude: ExcludePatterns,
}

/// Merge command line arguments with config file settings.
/// CLI rules and patterns are added to those of the config file.
pub fn merge_config(
    config: Option<&Config>,
    cli_require: &[RuleSpec],
    cli_disable: &[String],
    cli_exclude: &[String],
) -> Settings {
    let mut settings = Settings::default();

    if let Some(cfg) = config {
        settings.required.extend(cfg.required.iter().cloned());
        settings.disable.extend(cfg.disable.iter().cloned());
        settings.exclude.patterns.extend(cfg.exclude.iter().cloned());
    }

    settings.required.extend(cli_require.iter().cloned());
    settings.disable.extend(cli_disable.iter().cloned());
    settings.exclude.patterns.extend(cli_exclude.iter().cloned());

    // Tool and environment directories, matched as whole path components
    let defaults = [
        ".venv",
        "venv",
        "__pycache__",
        ".git",
        ".tox",
        "build",
        "dist",
        ".pytest_cache",
        ".ruff_cache",
        "node_modules",
        ".mypy_cache",
    ];
    settings.exclude.directories = defaults.iter().map(|d| d.to_string()).collect();

    settings
}
