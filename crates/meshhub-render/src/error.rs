//! Render pipeline errors

use meshhub_core::CoreError;
use meshhub_engine::EngineError;
use meshhub_fetch::FetchError;
use meshhub_kustomize::KustomizeError;
use thiserror::Error;

/// Result type for render operations
pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RenderError {
    // ============ Flavor and Layer Lookup ============
    #[error("flavor name cannot be nil")]
    NilFlavor,

    #[error("expected at most {desired} {item}, found {found}")]
    ExpectedAtMost {
        item: &'static str,
        desired: usize,
        found: usize,
    },

    #[error("could not find flavor with name: {name}{}", hint(.suggestion))]
    FlavorNotFound {
        name: String,
        suggestion: Option<String>,
    },

    #[error("user selected flavor {expected}, but renderer was provided flavor {actual}")]
    UnexpectedFlavor { expected: String, actual: String },

    #[error("Layer {layer_id} not found for flavor {flavor}{}", hint(.suggestion))]
    LayerNotFound {
        layer_id: String,
        flavor: String,
        suggestion: Option<String>,
    },

    #[error("Layer option {option_id} not found for layer {layer_id}{}", hint(.suggestion))]
    LayerOptionNotFound {
        option_id: String,
        layer_id: String,
        suggestion: Option<String>,
    },

    // ============ Input Validation ============
    #[error("incorrect number of input layers: expected between {required} and {declared}, found {found}")]
    IncorrectNumberOfInputLayers {
        required: usize,
        declared: usize,
        found: usize,
    },

    #[error("duplicate input for layer {layer_id}")]
    DuplicateInputLayer { layer_id: String },

    #[error("missing input for required layer {layer_id}")]
    MissingRequiredLayer { layer_id: String },

    #[error("missing input for required parameter {name}")]
    MissingRequiredParameter { name: String },

    #[error("unrecognized parameter {name}{}", hint(.suggestion))]
    UnrecognizedParameter {
        name: String,
        suggestion: Option<String>,
    },

    #[error("{message}")]
    InvalidDependency { message: String },

    // ============ Templates ============
    #[error("error rendering input value templates: {0}")]
    InputTemplates(#[source] EngineError),

    // ============ Manifests ============
    #[error("must provide at least one installation step")]
    NoInstallationSteps,

    #[error("step must be named")]
    UnnamedStep,

    #[error("step names must be unique; {name} duplicated")]
    DuplicateStep { name: String },

    #[error("installation step {name}: {source}")]
    InvalidStep {
        name: String,
        #[source]
        source: CoreError,
    },

    #[error("error rendering manifests from {source_ref} (release '{release}', namespace '{namespace}'): {source}")]
    RenderManifests {
        source_ref: String,
        values: String,
        release: String,
        namespace: String,
        #[source]
        source: Box<RenderError>,
    },

    #[error("error converting manifests to raw resources: {0}")]
    ConvertManifests(#[source] CoreError),

    #[error("failed to run '{binary}': {source}\nHint: install helm or point MESHHUB_HELM_BIN at it")]
    HelmSpawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("helm template exited with {status}: {stderr}")]
    HelmFailed { status: String, stderr: String },

    // ============ Wrapped ============
    #[error(transparent)]
    Kustomize(#[from] KustomizeError),

    #[error(transparent)]
    Fetch(FetchError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled,
}

fn hint(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!("\nHint: did you mean '{s}'?"))
        .unwrap_or_default()
}

impl From<FetchError> for RenderError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Cancelled => RenderError::Cancelled,
            other => RenderError::Fetch(other),
        }
    }
}

impl RenderError {
    /// Whether the request failed before any manifest source was touched
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RenderError::NilFlavor
                | RenderError::ExpectedAtMost { .. }
                | RenderError::FlavorNotFound { .. }
                | RenderError::UnexpectedFlavor { .. }
                | RenderError::LayerNotFound { .. }
                | RenderError::LayerOptionNotFound { .. }
                | RenderError::IncorrectNumberOfInputLayers { .. }
                | RenderError::DuplicateInputLayer { .. }
                | RenderError::MissingRequiredLayer { .. }
                | RenderError::MissingRequiredParameter { .. }
                | RenderError::UnrecognizedParameter { .. }
                | RenderError::InvalidDependency { .. }
                | RenderError::NoInstallationSteps
                | RenderError::UnnamedStep
                | RenderError::DuplicateStep { .. }
                | RenderError::InvalidStep { .. }
        )
    }
}
