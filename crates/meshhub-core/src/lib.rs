//! Meshhub Core - Core types and utilities for the catalog-driven installer
//!
//! This crate provides the foundational types used throughout meshhub:
//! - `ApplicationSpec`: Catalog entries with versions, flavors and layers
//! - `Values`: Nested value maps with precedence coalescing
//! - `ValuesInputs`: The caller's render request
//! - `Manifests`: Rendered manifest documents
//! - `resources`: Unstructured Kubernetes resources and label filtering

pub mod archive;
pub mod catalog;
pub mod error;
pub mod inputs;
pub mod manifest;
pub mod resources;
pub mod spec;
pub mod strvals;
pub mod values;

pub use catalog::{DirectorySpecReader, SpecReader};
pub use error::{CoreError, Result};
pub use inputs::{InstallSpec, LayerInput, ManifestRenderValues, ResourceRef, ValuesInputs};
pub use manifest::{Manifest, Manifests};
pub use resources::UnstructuredResources;
pub use spec::{
    ApplicationSpec, ApplicationSpecs, ApplicationType, Flavor, GithubRepositoryLocation,
    InstallationSpec, InstallationStep, InstallationSteps, Kustomize, KustomizeLocation, Layer,
    LayerOption, Parameter, ParameterValue, ResourceDependency, SecretDependency, SecretValue,
    StepSource, TgzLocation, VersionedApplicationSpec,
};
pub use values::{NestedMap, Values};
