//! Engine error types

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Maximum Levenshtein distance considered for "did you mean" hints
const MAX_SUGGESTION_DISTANCE: usize = 3;

#[derive(Error, Debug, Diagnostic)]
pub enum EngineError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),

    #[error("Failed to serialize template context: {0}")]
    Context(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TemplateErrorKind {
    /// A field or key the context does not define
    UndefinedField,
    UnknownFilter,
    SyntaxError,
    InvalidOperation,
    Other,
}

/// Template failure with the offending source attached
#[derive(Error, Debug, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(meshhub::template::render))]
pub struct TemplateError {
    pub message: String,

    pub kind: TemplateErrorKind,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("error occurred here")]
    pub span: Option<SourceSpan>,

    #[help]
    pub suggestion: Option<String>,
}

impl TemplateError {
    /// Build from a MiniJinja error
    ///
    /// `available` lists the top-level context keys, used to suggest a close
    /// match for undefined fields.
    pub fn from_minijinja(
        err: minijinja::Error,
        template_name: &str,
        template_source: &str,
        available: &[String],
    ) -> Self {
        let span = err
            .range()
            .map(|range| SourceSpan::new(range.start.into(), (range.end - range.start).into()))
            .or_else(|| err.line().and_then(|line| line_span(template_source, line)));

        let (kind, message, suggestion) = match err.kind() {
            minijinja::ErrorKind::UndefinedError => {
                let expression = err
                    .range()
                    .and_then(|range| template_source.get(range))
                    .map(clean_expression)
                    .filter(|expr| !expr.is_empty())
                    .or_else(|| expression_from_display(&format!("{:#}", err)));
                match expression {
                    Some(expr) => {
                        let field = field_name(&expr);
                        let root = expr.split('.').next().unwrap_or(&expr);
                        (
                            TemplateErrorKind::UndefinedField,
                            format!("template: {template_name}: can't evaluate field {field}"),
                            suggest(root, available),
                        )
                    }
                    None => (
                        TemplateErrorKind::UndefinedField,
                        format!("template: {template_name}: can't evaluate field: {err}"),
                        None,
                    ),
                }
            }
            minijinja::ErrorKind::UnknownFilter => (
                TemplateErrorKind::UnknownFilter,
                format!("template: {template_name}: {err}"),
                Some(format!(
                    "Available filters: {}",
                    crate::filters::AVAILABLE_FILTERS.join(", ")
                )),
            ),
            minijinja::ErrorKind::SyntaxError => (
                TemplateErrorKind::SyntaxError,
                format!("template: {template_name}: {}", err.to_string().replace("syntax error: ", "")),
                None,
            ),
            minijinja::ErrorKind::InvalidOperation => (
                TemplateErrorKind::InvalidOperation,
                format!("template: {template_name}: {}", err.to_string().replace("invalid operation: ", "")),
                None,
            ),
            _ => (
                TemplateErrorKind::Other,
                format!("template: {template_name}: {err}"),
                None,
            ),
        };

        Self {
            message,
            kind,
            src: NamedSource::new(template_name, template_source.to_string()),
            span,
            suggestion,
        }
    }

    /// Create a simple error without source mapping
    pub fn simple(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: TemplateErrorKind::Other,
            src: NamedSource::new("<unknown>", String::new()),
            span: None,
            suggestion: None,
        }
    }

    pub fn kind(&self) -> TemplateErrorKind {
        self.kind
    }
}

/// Strip action delimiters and filters from an expression
fn clean_expression(expression: &str) -> String {
    let expr = expression
        .trim_matches(|c: char| c == '{' || c == '}' || c == '-' || c.is_whitespace());
    expr.split('|').next().unwrap_or(expr).trim().to_string()
}

/// Last path segment of an expression (`MeshRef.Nmae` -> `Nmae`)
fn field_name(expression: &str) -> &str {
    expression.rsplit('.').next().unwrap_or(expression)
}

/// Pull the failing `{{ ... }}` expression out of MiniJinja's debug display
///
/// The error line is marked with `>`:
/// `   1 > top: {{ Nmae }}`
fn expression_from_display(display: &str) -> Option<String> {
    display
        .lines()
        .filter(|line| line.trim_start().contains(" > ") || line.trim_start().starts_with("> "))
        .find_map(|line| {
            let start = line.find("{{")?;
            let end = line[start..].find("}}")?;
            let expr = clean_expression(&line[start + 2..start + end]);
            (!expr.is_empty()).then_some(expr)
        })
}

fn line_span(source: &str, line_num: usize) -> Option<SourceSpan> {
    let mut offset = 0;
    for (idx, line) in source.lines().enumerate() {
        if idx + 1 == line_num {
            return Some(SourceSpan::new(offset.into(), line.len().into()));
        }
        offset += line.len() + 1;
    }
    None
}

/// Closest available key to `input`, if any is near enough
pub fn suggest(input: &str, available: &[String]) -> Option<String> {
    available
        .iter()
        .map(|candidate| (candidate, strsim::levenshtein(input, candidate)))
        .filter(|(_, distance)| *distance > 0 && *distance <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| format!("Did you mean `{candidate}`?"))
}
