//! Structural layer application

use meshhub_core::resources::yaml_to_resources;
use meshhub_core::values::params_to_nested_map;
use meshhub_core::{Flavor, ManifestRenderValues, Manifests, UnstructuredResources, ValuesInputs};
use meshhub_fetch::{FetchError, Fetcher};
use meshhub_kustomize::{
    Filesystem, KustomizeError, KustomizeLoader, Kustomizer, LayerEngine, ManifestRenderPlugin,
    NamedPlugin, WorkDir,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{RenderError, Result};
use crate::flavor::selected_options;

const WORK_DIR_PREFIX: &str = "layers";

/// Apply the kustomize overlay of the selected layer options, if any
///
/// Without an overlay the manifests are parsed as-is. At most one selected
/// option may carry an overlay. The working directory is removed on every
/// exit path.
pub async fn apply_layers(
    cancel: &CancellationToken,
    inputs: &ValuesInputs,
    flavor: &Flavor,
    manifests: &Manifests,
    fetcher: &Fetcher,
    fs: Arc<dyn Filesystem>,
) -> Result<UnstructuredResources> {
    let overlays: Vec<_> = selected_options(inputs, flavor)?
        .into_iter()
        .filter_map(|option| option.kustomize.as_ref())
        .collect();

    let overlay = match overlays.as_slice() {
        [] => {
            return manifests
                .resource_list()
                .map_err(RenderError::ConvertManifests);
        }
        [overlay] => (*overlay).clone(),
        _ => {
            return Err(RenderError::ExpectedAtMost {
                item: "customization layer",
                desired: 1,
                found: overlays.len(),
            });
        }
    };

    let render_values = ManifestRenderValues {
        name: inputs.name.clone(),
        install_namespace: inputs.install_namespace.clone(),
        mesh_ref: inputs.mesh_ref.clone(),
        custom: params_to_nested_map(&inputs.params)?,
    };
    let plugins: Vec<Arc<dyn NamedPlugin>> =
        vec![Arc::new(ManifestRenderPlugin::new(&render_values)?)];

    let loader = KustomizeLoader::new(fetcher.clone(), fs.clone());
    let kustomizer = Kustomizer::new(
        Arc::new(loader),
        fs.clone(),
        manifests.clone(),
        overlay,
        plugins,
    )?;

    let work = WorkDir::create(fs, WORK_DIR_PREFIX)?;
    let output = kustomizer
        .run(work.path(), cancel)
        .await
        .map_err(|e| match e {
            KustomizeError::Fetch(FetchError::Cancelled) => RenderError::Cancelled,
            other => RenderError::Kustomize(other),
        })?;

    yaml_to_resources(&output).map_err(RenderError::ConvertManifests)
}
