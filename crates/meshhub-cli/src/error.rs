//! CLI error type and its exit codes

use meshhub_core::CoreError;
use meshhub_fetch::FetchError;
use meshhub_render::RenderError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Validation failed: {message}")]
    #[diagnostic(code(meshhub::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Render failed: {message}")]
    #[diagnostic(code(meshhub::cli::render))]
    Render { message: String },

    #[error("Catalog error: {message}")]
    #[diagnostic(code(meshhub::cli::catalog))]
    Catalog {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("{message}")]
    #[diagnostic(code(meshhub::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("IO error: {message}")]
    #[diagnostic(code(meshhub::cli::io))]
    Io { message: String },

    #[error("operation cancelled")]
    #[diagnostic(code(meshhub::cli::cancelled))]
    Cancelled,

    /// Passthrough for reports built with `wrap_err`
    #[error("{message}")]
    #[diagnostic(code(meshhub::cli::error))]
    Other { message: String },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Render { .. } => exit_codes::RENDER_ERROR,
            CliError::Catalog { .. } => exit_codes::CATALOG_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Cancelled => exit_codes::CANCELLED,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: None,
        }
    }

    pub fn usage_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
            help: None,
        }
    }

    pub fn catalog_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<RenderError> for CliError {
    fn from(err: RenderError) -> Self {
        if matches!(err, RenderError::Cancelled) {
            return CliError::Cancelled;
        }
        if err.is_validation() {
            let message = err.to_string();
            // "did you mean" hints become miette help
            return match message.split_once("\nHint: ") {
                Some((message, hint)) => CliError::Validation {
                    message: message.to_string(),
                    help: Some(hint.to_string()),
                },
                None => CliError::Validation {
                    message,
                    help: None,
                },
            };
        }
        CliError::Render {
            message: error_chain(&err),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        CliError::catalog(err.to_string())
    }
}

impl From<FetchError> for CliError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Cancelled => CliError::Cancelled,
            other => CliError::catalog(error_chain(&other)),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<miette::Report> for CliError {
    fn from(err: miette::Report) -> Self {
        CliError::Other {
            message: format!("{err:?}"),
        }
    }
}

/// Display of `err` followed by every source not already part of it
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

pub type Result<T> = std::result::Result<T, CliError>;
