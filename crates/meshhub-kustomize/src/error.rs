//! Layer engine errors

use meshhub_core::CoreError;
use meshhub_engine::EngineError;
use meshhub_fetch::FetchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KustomizeError {
    // ============ Plugin Errors ============
    #[error(
        "invalid kustomize plugin: plugin {name} of type {type_name} must implement either the generator or the transformer interfaces"
    )]
    InvalidPlugin { name: String, type_name: String },

    #[error("plugin {name} was never loaded")]
    PluginNotLoaded { name: String },

    #[error("manifest in ManifestRender cannot be empty")]
    EmptyManifest,

    #[error("error rendering ManifestRender template: {0}")]
    Template(#[from] EngineError),

    // ============ Build Errors ============
    #[error("{path}: no such file or directory")]
    MissingPath { path: String },

    #[error(
        "unable to find one of 'kustomization.yaml', 'kustomization.yml' or 'Kustomization' in directory '{dir}'"
    )]
    MissingKustomization { dir: String },

    #[error("invalid kustomization {path}: {message}")]
    InvalidKustomization { path: String, message: String },

    #[error("cycle detected: {path} is already being built")]
    CyclicReference { path: String },

    #[error("may not add resource with an already registered id: {id}")]
    DuplicateResource { id: String },

    #[error("failed to find target for patch {id}")]
    PatchTargetNotFound { id: String },

    // ============ Source Errors ============
    #[error("failed to retrieve kustomize layer: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize kustomization: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to convert resource: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, KustomizeError>;

impl KustomizeError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            KustomizeError::MissingPath {
                path: path.display().to_string(),
            }
        } else {
            KustomizeError::Io {
                path: path.display().to_string(),
                source,
            }
        }
    }
}
