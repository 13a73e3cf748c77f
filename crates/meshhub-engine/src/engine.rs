//! Template engine based on MiniJinja
//!
//! Catalog templates address the render context the way Go templates do,
//! with a leading dot (`{{ .InstallNamespace }}`, `{{ .MeshRef.Name }}`).
//! Those field actions are normalized to plain MiniJinja attribute access
//! before compiling; filters and control blocks use MiniJinja syntax.

use minijinja::{AutoEscape, Environment, UndefinedBehavior, Value};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::borrow::Cow;

use crate::error::{EngineError, Result, TemplateError};
use crate::filters;

/// A `{{ ... }}` action, including whitespace-control markers
static ACTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{\{(.*?)\}\}").expect("valid regex")
});

/// A field reference with a leading dot, at the start of an operand
static DOT_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(^|[\s(\[,|!=+-])\.([A-Za-z_])").expect("valid regex")
});

/// Rewrite Go-style `.Field` references inside actions
///
/// Text outside `{{ }}` is left untouched.
pub fn normalize_go_actions(template: &str) -> Cow<'_, str> {
    if !template.contains("{{") {
        return Cow::Borrowed(template);
    }
    ACTION.replace_all(template, |caps: &Captures<'_>| {
        let body = DOT_FIELD.replace_all(&caps[1], "${1}${2}");
        format!("{{{{{body}}}}}")
    })
}

/// Template engine builder
pub struct EngineBuilder {
    strict_mode: bool,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self { strict_mode: true }
    }

    /// Set strict mode (fail on undefined fields)
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    pub fn build(self) -> Engine {
        Engine::new(self.strict_mode)
    }
}

/// The template engine
#[derive(Debug, Clone)]
pub struct Engine {
    strict_mode: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Engine {
    pub fn new(strict_mode: bool) -> Self {
        Self { strict_mode }
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    fn create_environment(&self) -> Environment<'static> {
        let mut env = Environment::new();

        if self.strict_mode {
            env.set_undefined_behavior(UndefinedBehavior::Strict);
        } else {
            env.set_undefined_behavior(UndefinedBehavior::Lenient);
        }
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_debug(true);

        env.add_filter("toyaml", filters::toyaml);
        env.add_filter("tojson", filters::tojson);
        env.add_filter("b64encode", filters::b64encode);
        env.add_filter("b64decode", filters::b64decode);
        env.add_filter("quote", filters::quote);
        env.add_filter("squote", filters::squote);
        env.add_filter("nindent", filters::nindent);
        env.add_filter("indent", filters::indent);
        env.add_filter("required", filters::required);
        env.add_filter("sha256", filters::sha256sum);
        env.add_filter("trunc", filters::trunc);
        env.add_filter("trimprefix", filters::trimprefix);
        env.add_filter("trimsuffix", filters::trimsuffix);

        env
    }

    /// Render a single template string against any serializable context
    ///
    /// Top-level fields of `context` are addressable directly.
    pub fn render_string<S: Serialize + ?Sized>(
        &self,
        template: &str,
        context: &S,
        template_name: &str,
    ) -> Result<String> {
        let context = serde_json::to_value(context)?;
        let available: Vec<String> = context
            .as_object()
            .map(|obj| obj.keys().cloned().collect())
            .unwrap_or_default();

        let source = normalize_go_actions(template).into_owned();
        let mut env = self.create_environment();
        env.add_template_owned(template_name.to_string(), source.clone())
            .map_err(|e| template_error(e, template_name, &source, &available))?;

        let tmpl = env
            .get_template(template_name)
            .map_err(|e| template_error(e, template_name, &source, &available))?;

        tmpl.render(Value::from_serialize(&context))
            .map_err(|e| template_error(e, template_name, &source, &available))
    }
}

fn template_error(
    err: minijinja::Error,
    template_name: &str,
    source: &str,
    available: &[String],
) -> EngineError {
    EngineError::Template(TemplateError::from_minijinja(
        err,
        template_name,
        source,
        available,
    ))
}
