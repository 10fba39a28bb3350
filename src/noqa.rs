//! noqa comment parsing and handling
//!
//! Supports inline comments on the decorator line:
//! - `@route("/")  # noqa` - suppress all rules on this line
//! - `@route("/")  # noqa: ANN001` - suppress specific rule
//! - `@route("/")  # noqa: ANN001, ANN002` - suppress multiple rules
//!
//! and a file-level directive on a line of its own:
//! - `# annotation-lint: noqa` - skip the whole file

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

static NOQA_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\s*noqa(?:\s*:\s*([A-Za-z0-9,\s]+))?").unwrap());

static FILE_NOQA_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*#\s*annotation-lint\s*:\s*noqa\s*$").unwrap());

/// Parsed noqa directives for a file
#[derive(Debug, Default)]
pub struct NoqaDirectives {
    /// The file carries `# annotation-lint: noqa`
    pub skip_file: bool,
    /// Lines where all rules are suppressed
    pub suppress_all: HashSet<usize>,
    /// Lines where specific rules are suppressed: line -> set of rule IDs
    pub suppress_rules: HashMap<usize, HashSet<String>>,
}

impl NoqaDirectives {
    /// Parse noqa directives from source code
    pub fn parse(source: &str) -> Self {
        let mut directives = NoqaDirectives::default();

        for (line_num, line) in source.lines().enumerate() {
            let line_number = line_num + 1;

            if FILE_NOQA_REGEX.is_match(line) {
                directives.skip_file = true;
                continue;
            }

            let Some(caps) = NOQA_REGEX.captures(line) else {
                continue;
            };

            let rules: HashSet<String> = caps
                .get(1)
                .map(|m| {
                    m.as_str()
                        .split(|c: char| c == ',' || c.is_whitespace())
                        .map(str::to_uppercase)
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default();

            if rules.is_empty() {
                directives.suppress_all.insert(line_number);
            } else {
                directives
                    .suppress_rules
                    .entry(line_number)
                    .or_default()
                    .extend(rules);
            }
        }

        directives
    }

    /// Check if a rule is suppressed at a given line
    pub fn is_suppressed(&self, line: usize, rule_id: &str) -> bool {
        if self.skip_file || self.suppress_all.contains(&line) {
            return true;
        }

        self.suppress_rules
            .get(&line)
            .is_some_and(|rules| rules.contains(rule_id))
    }
}

/// Convert byte offset to line number (1-indexed)
pub fn offset_to_line(source: &str, offset: usize) -> usize {
    source.as_bytes()[..offset.min(source.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_noqa_all() {
        let source = r#"
@route("/")  # noqa
def index():
    pass
"#;
        let directives = NoqaDirectives::parse(source);
        assert!(directives.suppress_all.contains(&2));
        assert!(!directives.skip_file);
    }

    #[test]
    fn test_parse_noqa_specific() {
        let source = r#"
@route("/")  # noqa: ANN001
def index():
    pass
"#;
        let directives = NoqaDirectives::parse(source);
        assert!(!directives.suppress_all.contains(&2));
        assert!(directives.suppress_rules.get(&2).unwrap().contains("ANN001"));
    }

    #[test]
    fn test_parse_noqa_multiple() {
        let source = r#"
@task(retries=3)  # noqa: ANN001, ROUTE2
"#;
        let directives = NoqaDirectives::parse(source);
        let rules = directives.suppress_rules.get(&2).unwrap();
        assert!(rules.contains("ANN001"));
        assert!(rules.contains("ROUTE2"));
    }

    #[test]
    fn test_lowercase_ids_are_normalized() {
        let source = r#"
@route("/")  # noqa: other1
@task()  # noqa: ann001, Route2
@job()  # noqa: ANN001 legacy handler
"#;
        let directives = NoqaDirectives::parse(source);

        assert!(!directives.suppress_all.contains(&2));
        assert!(directives.is_suppressed(2, "OTHER1"));
        assert!(!directives.is_suppressed(2, "ANN001"));

        assert!(directives.is_suppressed(3, "ANN001"));
        assert!(directives.is_suppressed(3, "ROUTE2"));
        assert!(!directives.is_suppressed(3, "ANN002"));

        assert!(directives.is_suppressed(4, "ANN001"));
        assert!(!directives.is_suppressed(4, "ANN002"));
    }

    #[test]
    fn test_is_suppressed() {
        let source = r#"
line1  # noqa
line2  # noqa: ANN001
line3
"#;
        let directives = NoqaDirectives::parse(source);

        assert!(directives.is_suppressed(2, "ANN001"));
        assert!(directives.is_suppressed(2, "ANN002"));

        assert!(directives.is_suppressed(3, "ANN001"));
        assert!(!directives.is_suppressed(3, "ANN002"));

        assert!(!directives.is_suppressed(4, "ANN001"));
    }

    #[test]
    fn test_file_level_noqa() {
        let source = r#"# annotation-lint: noqa
@route("/")
def index():
    pass
"#;
        let directives = NoqaDirectives::parse(source);
        assert!(directives.skip_file);
        assert!(directives.is_suppressed(2, "ANN001"));
    }

    #[test]
    fn test_file_level_noqa_must_stand_alone() {
        let source = "x = 1  # annotation-lint: noqa\n";
        let directives = NoqaDirectives::parse(source);
        assert!(!directives.skip_file);
    }

    #[test]
    fn test_offset_to_line() {
        let source = "line1\nline2\nline3";
        assert_eq!(offset_to_line(source, 0), 1);
        assert_eq!(offset_to_line(source, 5), 1);
        assert_eq!(offset_to_line(source, 6), 2);
        assert_eq!(offset_to_line(source, 12), 3);
        assert_eq!(offset_to_line(source, 100), 3);
    }
}
