//! Meshhub Engine - templating for input values and overlay manifests
//!
//! This crate provides a MiniJinja-based template engine with:
//! - Go-style `{{ .Field }}` actions over a serialized context
//! - Kubernetes-oriented filters (toyaml, b64encode, nindent, ...)
//! - Diagnostics that name the unresolved field and suggest close matches

pub mod engine;
pub mod error;
pub mod filters;

pub use engine::{Engine, EngineBuilder, normalize_go_actions};
pub use error::{EngineError, Result, TemplateError, TemplateErrorKind};
pub use filters::AVAILABLE_FILTERS;
