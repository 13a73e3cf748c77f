//! Statically registered kustomize plugins
//!
//! Plugins are keyed by the `kind` of the config resources that invoke them.
//! The registry is built per run from the plugins the caller passes in.

pub mod manifest_render;

use kube::core::DynamicObject;
use meshhub_core::UnstructuredResources;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{KustomizeError, Result};

pub use manifest_render::{MANIFEST_RENDER_PLUGIN_NAME, ManifestRenderPlugin};

/// Produces new resources from a config resource
pub trait Generator: Send + Sync {
    fn generate(&self, config: &DynamicObject) -> Result<UnstructuredResources>;
}

/// Rewrites the accumulated resources according to a config resource
pub trait Transformer: Send + Sync {
    fn transform(&self, config: &DynamicObject, resources: &mut UnstructuredResources)
    -> Result<()>;
}

/// A plugin addressed by name; it must offer at least one capability
pub trait NamedPlugin: Send + Sync {
    fn name(&self) -> &str;

    fn as_generator(&self) -> Option<&dyn Generator> {
        None
    }

    fn as_transformer(&self) -> Option<&dyn Transformer> {
        None
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Lookup table from config `kind` to plugin
#[derive(Default, Clone)]
pub struct PluginLoader {
    generators: BTreeMap<String, Arc<dyn NamedPlugin>>,
    transformers: BTreeMap<String, Arc<dyn NamedPlugin>>,
}

impl PluginLoader {
    /// Register every plugin under its capabilities
    ///
    /// A plugin that is neither a generator nor a transformer is rejected.
    pub fn new(plugins: Vec<Arc<dyn NamedPlugin>>) -> Result<Self> {
        let mut loader = PluginLoader::default();
        for plugin in plugins {
            let mut assigned = false;
            if plugin.as_generator().is_some() {
                loader
                    .generators
                    .insert(plugin.name().to_string(), plugin.clone());
                assigned = true;
            }
            if plugin.as_transformer().is_some() {
                loader
                    .transformers
                    .insert(plugin.name().to_string(), plugin.clone());
                assigned = true;
            }
            if !assigned {
                return Err(KustomizeError::InvalidPlugin {
                    name: plugin.name().to_string(),
                    type_name: plugin.type_name().to_string(),
                });
            }
        }
        Ok(loader)
    }

    pub fn load_generator(&self, kind: &str) -> Result<&dyn Generator> {
        self.generators
            .get(kind)
            .and_then(|plugin| plugin.as_generator())
            .ok_or_else(|| KustomizeError::PluginNotLoaded {
                name: kind.to_string(),
            })
    }

    pub fn load_transformer(&self, kind: &str) -> Result<&dyn Transformer> {
        self.transformers
            .get(kind)
            .and_then(|plugin| plugin.as_transformer())
            .ok_or_else(|| KustomizeError::PluginNotLoaded {
                name: kind.to_string(),
            })
    }
}

impl std::fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginLoader")
            .field("generators", &self.generators.keys().collect::<Vec<_>>())
            .field("transformers", &self.transformers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Kind of a config resource, or an empty string
pub(crate) fn config_kind(config: &DynamicObject) -> &str {
    config.types.as_ref().map(|t| t.kind.as_str()).unwrap_or("")
}


#[cfg(test)]
mod tests {
    use super::test_plugins::*;
    use super::*;

    #[test]
    fn test_rejects_plugin_without_capability() {
        let err = PluginLoader::new(vec![Arc::new(IncorrectPlugin)]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("invalid kustomize plugin"));
        assert!(message.contains("plugin incorrect of type"));
        assert!(message.contains("IncorrectPlugin"));
    }

    #[test]
    fn test_load_by_kind() {
        let loader =
            PluginLoader::new(vec![Arc::new(ConfigMapGenerator), Arc::new(LabelTransformer)])
                .unwrap();

        assert!(loader.load_generator("ConfigMapMaker").is_ok());
        assert!(loader.load_transformer("Labeler").is_ok());

        let err = loader.load_generator("Labeler").err().unwrap();
        assert_eq!(err.to_string(), "plugin Labeler was never loaded");
        assert!(loader.load_transformer("Unknown").is_err());
    }
}
