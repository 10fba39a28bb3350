//! Annotation-use view over parsed decorators
//!
//! Rules never inspect raw `rustpython_ast` expressions. A decorator is
//! lowered once into an [`AnnotationUse`]: a head naming the annotation and
//! the argument children written at the use site.
//!
//! ```text
//! @route                      -> Ident("route"), []
//! @app.route("/", name="x")   -> Qualified(app.route), [Value, Pair(name)]
//! @pkg.sub.Target(**opts)     -> Qualified(pkg.sub.Target), [Unpacked]
//! ```

use rustpython_ast::{Expr, ExprCall};

/// One application of a decorator at a use site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationUse {
    head: AnnotationHead,
    arguments: Vec<AnnotationArgument>,
    offset: usize,
}

/// How the annotation was named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationHead {
    /// `@Target`
    Ident(String),
    /// `@pkg.sub.Target`
    Qualified(QualifiedName),
}

/// A dotted annotation path.
///
/// The final segment is stored apart from its qualifier so a chain always
/// has a simple name to resolve to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    qualifier: Vec<String>,
    last: String,
}

/// A direct child of an annotation use, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationArgument {
    /// `name=value`
    Pair(MemberValuePair),
    /// A positional value
    Value,
    /// `*args` / `**kwargs`
    Unpacked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberValuePair {
    pub name: String,
}

impl QualifiedName {
    pub fn new(qualifier: Vec<String>, last: impl Into<String>) -> Self {
        Self {
            qualifier,
            last: last.into(),
        }
    }

    pub fn qualifier(&self) -> &[String] {
        &self.qualifier
    }

    pub fn last(&self) -> &str {
        &self.last
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for segment in &self.qualifier {
            write!(f, "{}.", segment)?;
        }
        write!(f, "{}", self.last)
    }
}

impl AnnotationHead {
    /// Build a head from a written path: `Target` or `pkg.sub.Target`.
    /// Returns `None` for an empty path or an empty segment.
    pub fn from_path(path: &str) -> Option<Self> {
        let mut segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        let last = segments.pop()?;
        if segments.is_empty() {
            Some(AnnotationHead::Ident(last))
        } else {
            Some(AnnotationHead::Qualified(QualifiedName::new(segments, last)))
        }
    }

    pub fn simple_name(&self) -> &str {
        match self {
            AnnotationHead::Ident(name) => name,
            AnnotationHead::Qualified(qualified) => qualified.last(),
        }
    }
}

impl AnnotationUse {
    pub fn new(head: AnnotationHead, arguments: Vec<AnnotationArgument>, offset: usize) -> Self {
        Self {
            head,
            arguments,
            offset,
        }
    }

    /// Lower a decorator expression.
    ///
    /// Decorators that do not name an annotation (subscripts, lambdas,
    /// `@factory()(...)`, chains rooted at a call) yield `None`.
    pub fn from_decorator(decorator: &Expr) -> Option<Self> {
        match decorator {
            Expr::Call(call) => {
                let head = head_from_expr(&call.func)?;
                Some(Self::new(
                    head,
                    arguments_from_call(call),
                    call.range.start().to_usize(),
                ))
            }
            Expr::Name(name) => Some(Self::new(
                AnnotationHead::Ident(name.id.as_str().to_string()),
                Vec::new(),
                name.range.start().to_usize(),
            )),
            Expr::Attribute(attr) => Some(Self::new(
                head_from_expr(decorator)?,
                Vec::new(),
                attr.range.start().to_usize(),
            )),
            _ => None,
        }
    }

    pub fn head(&self) -> &AnnotationHead {
        &self.head
    }

    pub fn arguments(&self) -> &[AnnotationArgument] {
        &self.arguments
    }

    /// Byte offset of the decorator expression (just after the `@`)
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The unqualified annotation name: `Target` for both `@Target` and
    /// `@pkg.sub.Target`.
    pub fn simple_name(&self) -> &str {
        self.head.simple_name()
    }

    /// Names of the `name=value` arguments in source order, duplicates kept.
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.arguments.iter().filter_map(|argument| match argument {
            AnnotationArgument::Pair(pair) => Some(pair.name.as_str()),
            AnnotationArgument::Value | AnnotationArgument::Unpacked => None,
        })
    }
}

fn head_from_expr(expr: &Expr) -> Option<AnnotationHead> {
    match expr {
        Expr::Name(name) => Some(AnnotationHead::Ident(name.id.as_str().to_string())),
        Expr::Attribute(attr) => {
            let qualifier = dotted_segments(&attr.value)?;
            Some(AnnotationHead::Qualified(QualifiedName::new(
                qualifier,
                attr.attr.as_str(),
            )))
        }
        _ => None,
    }
}

fn dotted_segments(expr: &Expr) -> Option<Vec<String>> {
    match expr {
        Expr::Name(name) => Some(vec![name.id.as_str().to_string()]),
        Expr::Attribute(attr) => {
            let mut segments = dotted_segments(&attr.value)?;
            segments.push(attr.attr.as_str().to_string());
            Some(segments)
        }
        _ => None,
    }
}

// Python requires positional arguments before keywords, apart from `*args`
// after a keyword. Only pair order is observable by rules.
fn arguments_from_call(call: &ExprCall) -> Vec<AnnotationArgument> {
    let positional = call.args.iter().map(|arg| match arg {
        Expr::Starred(_) => AnnotationArgument::Unpacked,
        _ => AnnotationArgument::Value,
    });
    let keywords = call.keywords.iter().map(|keyword| match &keyword.arg {
        Some(name) => AnnotationArgument::Pair(MemberValuePair {
            name: name.as_str().to_string(),
        }),
        None => AnnotationArgument::Unpacked,
    });
    positional.chain(keywords).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustpython_ast::{Mod, Stmt};
    use rustpython_parser::{parse, Mode};

    fn first_decorator(code: &str) -> Option<AnnotationUse> {
        let ast = parse(code, Mode::Module, "test.py").unwrap();
        let Mod::Module(module) = ast else {
            panic!("expected module");
        };
        match &module.body[0] {
            Stmt::FunctionDef(func) => AnnotationUse::from_decorator(&func.decorator_list[0]),
            Stmt::ClassDef(class_def) => {
                AnnotationUse::from_decorator(&class_def.decorator_list[0])
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_bare_name() {
        let annotation = first_decorator("@Required\ndef f(): pass\n").unwrap();
        assert_eq!(annotation.head(), &AnnotationHead::Ident("Required".to_string()));
        assert!(annotation.arguments().is_empty());
        assert_eq!(annotation.offset(), 1);
    }

    #[test]
    fn test_call_with_keywords() {
        let annotation = first_decorator("@Required(id=1, name=\"x\")\ndef f(): pass\n").unwrap();
        assert_eq!(annotation.simple_name(), "Required");
        let names: Vec<_> = annotation.parameter_names().collect();
        assert_eq!(names, vec!["id", "name"]);
    }

    #[test]
    fn test_qualified_name_resolves_last_segment() {
        let annotation = first_decorator("@pkg.sub.Target(id=1)\nclass C: pass\n").unwrap();
        match annotation.head() {
            AnnotationHead::Qualified(qualified) => {
                assert_eq!(qualified.qualifier(), ["pkg", "sub"]);
                assert_eq!(qualified.to_string(), "pkg.sub.Target");
            }
            other => panic!("expected qualified head, got {:?}", other),
        }
        assert_eq!(annotation.simple_name(), "Target");
    }

    #[test]
    fn test_positional_and_unpacked_arguments() {
        let annotation =
            first_decorator("@Required(\"x\", *extra, id=1, **rest)\ndef f(): pass\n").unwrap();
        assert_eq!(
            annotation.arguments(),
            [
                AnnotationArgument::Value,
                AnnotationArgument::Unpacked,
                AnnotationArgument::Pair(MemberValuePair {
                    name: "id".to_string()
                }),
                AnnotationArgument::Unpacked,
            ]
        );
        assert_eq!(annotation.parameter_names().collect::<Vec<_>>(), vec!["id"]);
    }

    #[test]
    fn test_single_value_has_no_parameter_names() {
        let annotation = first_decorator("@Required(\"x\")\ndef f(): pass\n").unwrap();
        assert_eq!(annotation.parameter_names().count(), 0);
    }

    #[test]
    fn test_non_annotation_shapes_are_skipped() {
        assert!(first_decorator("@handlers[0]\ndef f(): pass\n").is_none());
        assert!(first_decorator("@factory()(id=1)\ndef f(): pass\n").is_none());
        assert!(first_decorator("@get_app().route(id=1)\ndef f(): pass\n").is_none());
    }

    #[test]
    fn test_head_from_path() {
        assert_eq!(
            AnnotationHead::from_path("Required"),
            Some(AnnotationHead::Ident("Required".to_string()))
        );
        let head = AnnotationHead::from_path("pkg.Required").unwrap();
        assert_eq!(head.simple_name(), "Required");
        assert_eq!(AnnotationHead::from_path(""), None);
        assert_eq!(AnnotationHead::from_path("pkg..Required"), None);
    }
}
