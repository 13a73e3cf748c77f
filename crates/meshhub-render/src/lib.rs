//! Meshhub Render - manifest computation pipeline
//!
//! Turns a caller's [`ValuesInputs`](meshhub_core::ValuesInputs) and a
//! catalog version into the exact set of Kubernetes resources to install:
//!
//! - `validation`: layer and parameter checks against the selected flavor
//! - `templates`: self-referential templating of input values
//! - `values`: precedence-ordered value overrides
//! - `manifest`: base manifests from charts, archives or installation steps
//! - `layer`: the optional kustomize overlay
//! - `renderer`: the orchestrator

pub mod dependencies;
pub mod error;
pub mod flavor;
pub mod helm;
pub mod layer;
pub mod manifest;
pub mod params;
pub mod renderer;
pub mod templates;
pub mod validation;
pub mod values;

pub use dependencies::{DependencyValidator, NoopDependencyValidator, StaticDependencyValidator};
pub use error::{RenderError, Result};
pub use flavor::{
    get_installed_flavor, get_layer, get_layer_option, get_layer_option_from_flavor,
    required_layer_count,
};
pub use helm::{HELM_BIN_ENV, HelmTemplateRenderer, RemoteTarFetcher};
pub use layer::apply_layers;
pub use manifest::{
    ChartRenderer, ChartSource, INSTALLATION_STEP_LABEL, ManifestArchiveFetcher, ManifestResolver,
};
pub use params::resolve_parameters;
pub use renderer::ManifestRenderer;
pub use templates::exec_input_values_templates;
pub use validation::validate_inputs;
pub use values::compute_value_overrides;
