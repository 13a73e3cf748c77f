//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unable to parse parameter with key '{key}' and value '{value}': {message}")]
    UnableToParseParameter {
        key: String,
        value: String,
        message: String,
    },

    #[error("Unable to parse yaml string: {input}: {message}")]
    UnableToParseYaml { input: String, message: String },

    #[error("Unable to marshal map to yaml: {message}")]
    UnableToMarshalYaml { message: String },

    #[error("missing installation spec")]
    MissingInstallSpec,

    #[error("expected exactly one installation spec, found {found}: {variants}")]
    AmbiguousInstallSpec { found: usize, variants: String },

    #[error("no kustomize location option found")]
    MissingKustomizeLocation,

    #[error("The operator does not currently support params of type {kind}")]
    UnsupportedParamType { kind: String },

    #[error("error converting YAML to JSON: {message}")]
    InvalidManifest { message: String },

    #[error("Archive error: {message}")]
    Archive { message: String },

    #[error("Failed to read application spec {path}: {message}")]
    InvalidApplicationSpec { path: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
