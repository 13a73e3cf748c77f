//! Render orchestration
//!
//! [`ManifestRenderer::compute_resources_for_application`] runs one request top
//! to bottom: flavor selection, parameter defaults, validation, input
//! templating, manifest resolution, layer application and label filtering.
//! Nothing is fetched until validation has passed.

use meshhub_core::resources::filter_by_labels;
use meshhub_core::{Flavor, UnstructuredResources, ValuesInputs, VersionedApplicationSpec};
use meshhub_fetch::Fetcher;
use meshhub_kustomize::{Filesystem, OsFilesystem};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::dependencies::{DependencyValidator, NoopDependencyValidator};
use crate::error::{RenderError, Result};
use crate::flavor::get_installed_flavor;
use crate::helm::{HelmTemplateRenderer, RemoteTarFetcher};
use crate::layer::apply_layers;
use crate::manifest::{ChartRenderer, ManifestArchiveFetcher, ManifestResolver};
use crate::params::resolve_parameters;
use crate::templates::exec_input_values_templates;
use crate::validation::validate_inputs;

/// Computes the resources of an application install
#[derive(Clone)]
pub struct ManifestRenderer {
    charts: Arc<dyn ChartRenderer>,
    archives: Arc<dyn ManifestArchiveFetcher>,
    dependencies: Arc<dyn DependencyValidator>,
    fs: Arc<dyn Filesystem>,
    fetcher: Fetcher,
}

impl ManifestRenderer {
    pub fn new(
        charts: Arc<dyn ChartRenderer>,
        archives: Arc<dyn ManifestArchiveFetcher>,
        fetcher: Fetcher,
    ) -> Self {
        Self {
            charts,
            archives,
            dependencies: Arc::new(NoopDependencyValidator),
            fs: Arc::new(OsFilesystem),
            fetcher,
        }
    }

    /// Render charts with `helm template` and read archives through `fetcher`
    pub fn with_helm(fetcher: Fetcher, helm_bin: impl Into<String>) -> Self {
        let charts = HelmTemplateRenderer::new(fetcher.clone()).with_helm_bin(helm_bin);
        let archives = RemoteTarFetcher::new(fetcher.clone());
        Self::new(Arc::new(charts), Arc::new(archives), fetcher)
    }

    pub fn with_dependency_validator(mut self, validator: Arc<dyn DependencyValidator>) -> Self {
        self.dependencies = validator;
        self
    }

    pub fn with_filesystem(mut self, fs: Arc<dyn Filesystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Select the flavor, fill parameter defaults and validate the request
    ///
    /// Returns the flavor in effect and the inputs with defaults applied.
    pub fn validate<'a>(
        &self,
        inputs: ValuesInputs,
        version: &'a VersionedApplicationSpec,
        flavor: Option<&'a Flavor>,
    ) -> Result<(ValuesInputs, &'a Flavor)> {
        let flavor = select_flavor(&inputs, version, flavor)?;

        let mut inputs = inputs;
        resolve_parameters(&mut inputs, version, flavor)?;
        validate_inputs(&inputs, version, flavor, self.dependencies.as_ref())?;
        Ok((inputs, flavor))
    }

    /// Compute the exact resources to install
    ///
    /// `flavor` may be a custom flavor absent from `version`. When it is
    /// `None` the flavor named by the inputs is looked up in `version`.
    pub async fn compute_resources_for_application(
        &self,
        cancel: &CancellationToken,
        inputs: ValuesInputs,
        version: &VersionedApplicationSpec,
        flavor: Option<&Flavor>,
    ) -> Result<UnstructuredResources> {
        let (inputs, flavor) = self.validate(inputs, version, flavor)?;
        let inputs = exec_input_values_templates(inputs)?;

        let manifests = ManifestResolver::new(self.charts.as_ref(), self.archives.as_ref())
            .get_manifests_from_application_spec(cancel, &inputs, version, flavor)
            .await?;

        let resources = apply_layers(
            cancel,
            &inputs,
            flavor,
            &manifests,
            &self.fetcher,
            self.fs.clone(),
        )
        .await?;

        Ok(filter_by_label(resources, version))
    }
}

impl std::fmt::Debug for ManifestRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestRenderer")
            .field("fetcher", &self.fetcher)
            .finish_non_exhaustive()
    }
}

fn select_flavor<'a>(
    inputs: &ValuesInputs,
    version: &'a VersionedApplicationSpec,
    flavor: Option<&'a Flavor>,
) -> Result<&'a Flavor> {
    match flavor {
        Some(flavor) => {
            if !inputs.flavor_name.is_empty() && inputs.flavor_name != flavor.name {
                return Err(RenderError::UnexpectedFlavor {
                    expected: inputs.flavor_name.clone(),
                    actual: flavor.name.clone(),
                });
            }
            Ok(flavor)
        }
        None => get_installed_flavor(&inputs.flavor_name, &version.flavors),
    }
}

fn filter_by_label(
    resources: UnstructuredResources,
    version: &VersionedApplicationSpec,
) -> UnstructuredResources {
    if version.required_labels.is_empty() {
        return resources;
    }
    tracing::info!(labels = ?version.required_labels, "filtering resources by required labels");
    let before = resources.len();
    let filtered = filter_by_labels(resources, &version.required_labels);
    tracing::debug!(before, after = filtered.len(), "filtered resources");
    filtered
}
