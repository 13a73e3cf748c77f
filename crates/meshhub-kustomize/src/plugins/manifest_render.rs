//! `ManifestRender` generator: a templated manifest embedded in a config resource
//!
//! ```yaml
//! apiVersion: meshhub.solo.io/v1
//! kind: ManifestRender
//! metadata:
//!   name: ingress
//! manifest: |
//!   apiVersion: v1
//!   kind: Namespace
//!   metadata:
//!     name: {{ .InstallNamespace }}
//! ```

use kube::core::DynamicObject;
use meshhub_core::UnstructuredResources;
use meshhub_core::resources::yaml_to_resources;
use meshhub_engine::Engine;
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::{Generator, NamedPlugin};
use crate::error::{KustomizeError, Result};

pub const MANIFEST_RENDER_PLUGIN_NAME: &str = "ManifestRender";

const MANIFEST_FIELD: &str = "manifest";
const TEMPLATE_NAME: &str = "manifest";

pub struct ManifestRenderPlugin {
    values: JsonValue,
    engine: Engine,
}

impl ManifestRenderPlugin {
    /// Plugin rendering against `values`, usually a `ManifestRenderValues`
    pub fn new<S: Serialize + ?Sized>(values: &S) -> Result<Self> {
        Ok(Self {
            values: serde_json::to_value(values)?,
            engine: Engine::default(),
        })
    }

    /// Render a manifest template and parse the result
    pub fn render(&self, manifest: &str) -> Result<UnstructuredResources> {
        if manifest.is_empty() {
            return Err(KustomizeError::EmptyManifest);
        }
        let rendered = self
            .engine
            .render_string(manifest, &self.values, TEMPLATE_NAME)?;
        Ok(yaml_to_resources(&rendered)?)
    }
}

impl NamedPlugin for ManifestRenderPlugin {
    fn name(&self) -> &str {
        MANIFEST_RENDER_PLUGIN_NAME
    }

    fn as_generator(&self) -> Option<&dyn Generator> {
        Some(self)
    }
}

impl Generator for ManifestRenderPlugin {
    fn generate(&self, config: &DynamicObject) -> Result<UnstructuredResources> {
        let manifest = config.data[MANIFEST_FIELD].as_str().unwrap_or_default();
        tracing::debug!(
            config = config.metadata.name.as_deref().unwrap_or_default(),
            "rendering ManifestRender config"
        );
        self.render(manifest)
    }
}
