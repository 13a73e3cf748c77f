//! Meshhub Kustomize - structural overlays for rendered manifests
//!
//! A layer option may carry a kustomize overlay. The [`Kustomizer`] retrieves
//! the overlay source, writes the rendered manifests as its `base` package and
//! builds the overlay in-process with statically registered plugins such as
//! [`ManifestRenderPlugin`].

pub mod build;
pub mod error;
pub mod fs;
pub mod kustomization;
pub mod kustomizer;
pub mod loader;
pub mod plugins;

pub use build::KustomizeBuilder;
pub use error::{KustomizeError, Result};
pub use fs::{Filesystem, OsFilesystem, WorkDir};
pub use kustomization::Kustomization;
pub use kustomizer::{Kustomizer, LayerEngine};
pub use loader::{KustomizeLoader, Loader};
pub use plugins::{
    Generator, MANIFEST_RENDER_PLUGIN_NAME, ManifestRenderPlugin, NamedPlugin, PluginLoader,
    Transformer,
};
