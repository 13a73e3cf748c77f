//! Render request inputs
//!
//! Field names are PascalCase so templates can address them the same way the
//! install-spec files spell them, e.g. `{{ .InstallNamespace }}`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::spec::VersionedApplicationSpec;
use crate::values::NestedMap;

/// Reference to a namespaced resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceRef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

impl ResourceRef {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

/// Caller selection for one customization layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LayerInput {
    pub layer_id: String,
    pub option_id: String,
}

impl LayerInput {
    pub fn new(layer_id: impl Into<String>, option_id: impl Into<String>) -> Self {
        Self {
            layer_id: layer_id.into(),
            option_id: option_id.into(),
        }
    }
}

/// Everything the caller supplies for one render request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ValuesInputs {
    /// Application (release) name
    pub name: String,

    pub install_namespace: String,

    pub flavor_name: String,

    /// Ordered layer selections
    pub layers: Vec<LayerInput>,

    pub mesh_ref: ResourceRef,

    /// Flat dotted-key parameters
    pub params: BTreeMap<String, String>,

    /// Values YAML defined by the application spec
    pub spec_defined_values: String,

    /// User supplied override YAML
    pub user_defined_values: String,
}

impl ValuesInputs {
    /// The caller's selection for `layer_id`, if any
    pub fn layer(&self, layer_id: &str) -> Option<&LayerInput> {
        self.layers.iter().find(|l| l.layer_id == layer_id)
    }
}

/// Data context handed to the `ManifestRender` kustomize plugin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManifestRenderValues {
    pub name: String,
    pub install_namespace: String,
    pub mesh_ref: ResourceRef,
    /// Nested map built from the resolved parameters
    pub custom: NestedMap,
}

/// A persisted render request: inputs plus the version they apply to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallSpec {
    pub values: ValuesInputs,
    pub version: VersionedApplicationSpec,
}

impl InstallSpec {
    /// Load an install spec from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| CoreError::InvalidApplicationSpec {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save the install spec as YAML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }
}
