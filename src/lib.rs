//! annotation-lint: flags Python decorators missing required keyword
//! parameters
//!
//! Each configured rule names a decorator and the keywords every use of it
//! must spell out. Files are parsed with `rustpython-parser`, every
//! decorator on a `def`, `async def` or `class` (at any nesting depth) is
//! lowered into a [`syntax::AnnotationUse`], and each rule checks it.

pub mod config;
pub mod logging;
pub mod models;
pub mod noqa;
pub mod rules;
pub mod syntax;
pub mod utils;

use models::{LintResult, RuleContext, Violation};
use noqa::NoqaDirectives;
use rayon::prelude::*;
use rules::base::LintRule;
use rustpython_ast::{ExceptHandler, Expr, Mod, Stmt};
use rustpython_parser::{parse, Mode};
use std::path::{Path, PathBuf};
use syntax::AnnotationUse;
use walkdir::WalkDir;

/// Lint a single file and return the results
pub fn lint_file(file_path: &Path, rules: &[Box<dyn LintRule>]) -> LintResult {
    let path_str = file_path.to_string_lossy().to_string();

    let source = match std::fs::read_to_string(file_path) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("Failed to read {}: {}", path_str, e);
            return LintResult::with_error(path_str, format!("Failed to read file: {}", e));
        }
    };

    lint_source(&path_str, &source, rules)
}

/// Lint source code and return the results
pub fn lint_source(file_path: &str, source: &str, rules: &[Box<dyn LintRule>]) -> LintResult {
    let noqa = NoqaDirectives::parse(source);
    if noqa.skip_file {
        log::debug!("Skipping {}: file-level noqa", file_path);
        return LintResult::new(file_path.to_string());
    }

    let ast = match parse(source, Mode::Module, file_path) {
        Ok(ast) => ast,
        Err(e) => {
            log::warn!("Failed to parse {}: {}", file_path, e);
            return LintResult::with_error(file_path.to_string(), format!("Parse error: {}", e));
        }
    };

    let mut result = LintResult::new(file_path.to_string());
    let walker = Walker {
        file_path,
        source,
        rules,
        noqa: &noqa,
    };

    if let Mod::Module(module) = &ast {
        walker.check_body(&module.body, &mut result.violations);
    }

    result
}

struct Walker<'a> {
    file_path: &'a str,
    source: &'a str,
    rules: &'a [Box<dyn LintRule>],
    noqa: &'a NoqaDirectives,
}

impl Walker<'_> {
    fn check_body(&self, body: &[Stmt], violations: &mut Vec<Violation>) {
        for stmt in body {
            self.check_stmt(stmt, violations);
        }
    }

    fn check_decorators(&self, decorators: &[Expr], violations: &mut Vec<Violation>) {
        for decorator in decorators {
            let Some(annotation) = AnnotationUse::from_decorator(decorator) else {
                continue;
            };
            let context = RuleContext {
                annotation: &annotation,
                file_path: self.file_path,
                source: self.source,
            };

            for rule in self.rules {
                if let Some(v) = rule.check(&context) {
                    if !self.noqa.is_suppressed(v.line, &v.rule_id) {
                        violations.push(v);
                    }
                }
            }
        }
    }

    fn check_stmt(&self, stmt: &Stmt, violations: &mut Vec<Violation>) {
        match stmt {
            Stmt::ClassDef(class_def) => {
                self.check_decorators(&class_def.decorator_list, violations);
                self.check_body(&class_def.body, violations);
            }
            Stmt::FunctionDef(func) => {
                self.check_decorators(&func.decorator_list, violations);
                self.check_body(&func.body, violations);
            }
            Stmt::AsyncFunctionDef(func) => {
                self.check_decorators(&func.decorator_list, violations);
                self.check_body(&func.body, violations);
            }
            Stmt::If(if_stmt) => {
                self.check_body(&if_stmt.body, violations);
                self.check_body(&if_stmt.orelse, violations);
            }
            Stmt::While(while_stmt) => {
                self.check_body(&while_stmt.body, violations);
                self.check_body(&while_stmt.orelse, violations);
            }
            Stmt::For(for_stmt) => {
                self.check_body(&for_stmt.body, violations);
                self.check_body(&for_stmt.orelse, violations);
            }
            Stmt::AsyncFor(for_stmt) => {
                self.check_body(&for_stmt.body, violations);
                self.check_body(&for_stmt.orelse, violations);
            }
            Stmt::With(with_stmt) => {
                self.check_body(&with_stmt.body, violations);
            }
            Stmt::AsyncWith(with_stmt) => {
                self.check_body(&with_stmt.body, violations);
            }
            Stmt::Try(try_stmt) => {
                self.check_body(&try_stmt.body, violations);
                self.check_handlers(&try_stmt.handlers, violations);
                self.check_body(&try_stmt.orelse, violations);
                self.check_body(&try_stmt.finalbody, violations);
            }
            Stmt::TryStar(try_stmt) => {
                self.check_body(&try_stmt.body, violations);
                self.check_handlers(&try_stmt.handlers, violations);
                self.check_body(&try_stmt.orelse, violations);
                self.check_body(&try_stmt.finalbody, violations);
            }
            Stmt::Match(match_stmt) => {
                for case in &match_stmt.cases {
                    self.check_body(&case.body, violations);
                }
            }
            _ => {}
        }
    }

    fn check_handlers(&self, handlers: &[ExceptHandler], violations: &mut Vec<Violation>) {
        for handler in handlers {
            if let ExceptHandler::ExceptHandler(h) = handler {
                self.check_body(&h.body, violations);
            }
        }
    }
}

/// Paths skipped while walking a directory.
///
/// Both lists are matched against the path relative to the directory being
/// walked, so the location of the project itself never excludes it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExcludePatterns {
    /// User patterns: an exact path component, or a fragment of a file or
    /// directory name
    pub patterns: Vec<String>,
    /// Directory names skipped only on an exact component match
    pub directories: Vec<String>,
}

impl ExcludePatterns {
    fn is_excluded(&self, relative: &Path) -> bool {
        let name = relative.file_name().and_then(|n| n.to_str());
        let has_component = |wanted: &str| {
            relative
                .components()
                .any(|c| c.as_os_str().to_str() == Some(wanted))
        };

        self.directories.iter().any(|dir| has_component(dir.as_str()))
            || self.patterns.iter().any(|pattern| {
                name.is_some_and(|n| n.contains(pattern.as_str())) || has_component(pattern.as_str())
            })
    }
}

/// Collect Python files from paths
pub fn collect_python_files(paths: &[String], exclude: &ExcludePatterns) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        let p = Path::new(path);
        if p.is_file() {
            if is_python_file(p) {
                files.push(p.to_path_buf());
            }
        } else if p.is_dir() {
            for entry in WalkDir::new(p)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| {
                    let relative = e.path().strip_prefix(p).unwrap_or(e.path());
                    !exclude.is_excluded(relative)
                })
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if path.is_file() && is_python_file(path) {
                    files.push(path.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path);
        }
    }

    files
}

fn is_python_file(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "py")
}

/// Lint multiple files in parallel
pub fn lint_files_parallel(files: &[PathBuf], rules: &[Box<dyn LintRule>]) -> Vec<LintResult> {
    files
        .par_iter()
        .map(|file| lint_file(file, rules))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::required_parameters::{RequiredParameters, RequiredParametersRule};
    use std::fs;
    use tempfile::TempDir;

    fn route_rules() -> Vec<Box<dyn LintRule>> {
        vec![Box::new(RequiredParametersRule::new(RequiredParameters::new(
            "route",
            ["endpoint"],
        )))]
    }

    fn lines(result: &LintResult) -> Vec<usize> {
        result.violations.iter().map(|v| v.line).collect()
    }

    #[test]
    fn test_nested_definitions_are_checked() {
        let code = r#"
class Api:
    @route("/a")
    def a(self):
        @route("/inner")
        def inner():
            pass

    @route("/b", endpoint="b")
    async def b(self):
        pass

if DEBUG:
    @route("/debug")
    def debug():
        pass
else:
    try:
        @route("/x")
        def x():
            pass
    except ImportError:
        @route("/y")
        def y():
            pass
"#;
        let result = lint_source("api.py", code, &route_rules());
        assert!(result.error.is_none());
        assert_eq!(lines(&result), vec![3, 5, 14, 19, 23]);
    }

    #[test]
    fn test_class_decorators_are_checked() {
        let rules: Vec<Box<dyn LintRule>> = vec![Box::new(RequiredParametersRule::new(
            RequiredParameters::new("dataclass", ["frozen"]),
        ))];
        let code = r#"
@dataclass(frozen=True)
class A:
    x: int

@dataclasses.dataclass
class B:
    x: int
"#;
        let result = lint_source("models.py", code, &rules);
        assert_eq!(lines(&result), vec![6]);
    }

    #[test]
    fn test_match_and_loop_bodies() {
        let code = r#"
for name in names:
    @route("/loop")
    def handler():
        pass
else:
    pass

match mode:
    case "web":
        @route("/web")
        def web():
            pass
"#;
        let result = lint_source("app.py", code, &route_rules());
        assert_eq!(lines(&result), vec![3, 11]);
    }

    #[test]
    fn test_noqa_suppresses_decorator_line() {
        let code = r#"
@route("/a")  # noqa: ANN001
def a():
    pass

@route("/b")  # noqa: OTHER1
def b():
    pass

@route("/lower")  # noqa: other1
def lower():
    pass

@route("/c")  # noqa
def c():
    pass
"#;
        let result = lint_source("app.py", code, &route_rules());
        assert_eq!(lines(&result), vec![6, 10]);
    }

    #[test]
    fn test_file_level_noqa_skips_parse() {
        let code = "# annotation-lint: noqa\ndef broken(:\n";
        let result = lint_source("app.py", code, &route_rules());
        assert!(result.error.is_none());
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_parse_error_is_reported() {
        let result = lint_source("broken.py", "def broken(:\n", &route_rules());
        assert!(result.error.unwrap().starts_with("Parse error"));
    }

    #[test]
    fn test_multiple_rules_each_report() {
        let rules: Vec<Box<dyn LintRule>> = vec![
            Box::new(RequiredParametersRule::new(RequiredParameters::new(
                "route",
                ["endpoint"],
            ))),
            Box::new(
                RequiredParametersRule::new(RequiredParameters::new("route", ["methods"]))
                    .with_id("ANN002"),
            ),
        ];
        let code = r#"
@route("/", endpoint="index")
def index():
    pass
"#;
        let result = lint_source("app.py", code, &rules);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].rule_id, "ANN002");
    }

    #[test]
    fn test_collect_python_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::create_dir_all(root.join(".venv/lib")).unwrap();
        fs::write(root.join("pkg/a.py"), "").unwrap();
        fs::write(root.join("pkg/b.txt"), "").unwrap();
        fs::write(root.join("pkg/generated_models.py"), "").unwrap();
        fs::write(root.join(".venv/lib/c.py"), "").unwrap();

        let exclude = ExcludePatterns {
            patterns: vec!["generated".to_string()],
            directories: vec![".venv".to_string()],
        };
        let files = collect_python_files(&[root.to_string_lossy().to_string()], &exclude);

        assert_eq!(files, vec![root.join("pkg/a.py")]);
    }

    #[test]
    fn test_default_directories_match_whole_components_only() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("build").join("proj");
        fs::create_dir_all(project.join("dist")).unwrap();
        fs::create_dir_all(project.join("venv_tools")).unwrap();
        fs::write(project.join("distance.py"), "").unwrap();
        fs::write(project.join("builder.py"), "").unwrap();
        fs::write(project.join("views.py"), "").unwrap();
        fs::write(project.join("dist/bundle.py"), "").unwrap();
        fs::write(project.join("venv_tools/setup.py"), "").unwrap();

        let settings = crate::config::merge_config(None, &[], &[], &[]);
        let files = collect_python_files(&[project.to_string_lossy().to_string()], &settings.exclude);

        assert_eq!(
            files,
            vec![
                project.join("builder.py"),
                project.join("distance.py"),
                project.join("venv_tools/setup.py"),
                project.join("views.py"),
            ]
        );
    }

    #[test]
    fn test_lint_files_parallel_keeps_file_order() {
        let dir = TempDir::new().unwrap();
        let ok = dir.path().join("ok.py");
        let bad = dir.path().join("bad.py");
        fs::write(&ok, "@route(\"/\", endpoint=\"x\")\ndef f(): pass\n").unwrap();
        fs::write(&bad, "@route(\"/\")\ndef f(): pass\n").unwrap();

        let results = lint_files_parallel(&[ok.clone(), bad.clone()], &route_rules());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].file_path, ok.to_string_lossy());
        assert!(results[0].violations.is_empty());
        assert_eq!(results[1].violations.len(), 1);
    }
}
