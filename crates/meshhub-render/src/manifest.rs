//! Manifest source resolution
//!
//! A version installs from exactly one source: a Helm chart archive, a Helm
//! chart inside a GitHub repository, a tarball of pre-rendered manifests, or
//! an ordered list of named steps, each one of the former three.

use async_trait::async_trait;
use meshhub_core::resources::set_label;
use meshhub_core::{
    Flavor, GithubRepositoryLocation, InstallationSpec, InstallationStep, InstallationSteps,
    Manifests, StepSource, TgzLocation, ValuesInputs, VersionedApplicationSpec,
};
use std::collections::BTreeSet;
use tokio_util::sync::CancellationToken;

use crate::error::{RenderError, Result};
use crate::values::compute_value_overrides;

/// Label recording which installation step produced a resource
pub const INSTALLATION_STEP_LABEL: &str = "service-mesh-hub.solo.io/installation_step";

/// Where a Helm chart comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartSource {
    /// URI of a packaged chart (`.tgz`), remote or local
    Archive(String),
    /// Chart directory inside a GitHub repository
    Github(GithubRepositoryLocation),
}

impl std::fmt::Display for ChartSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartSource::Archive(uri) => write!(f, "{uri}"),
            ChartSource::Github(location) => write!(f, "github:{location}"),
        }
    }
}

/// Renders a Helm chart with a values document
#[async_trait]
pub trait ChartRenderer: Send + Sync {
    async fn render_chart(
        &self,
        cancel: &CancellationToken,
        chart: &ChartSource,
        values_yaml: &str,
        release: &str,
        namespace: &str,
    ) -> Result<Manifests>;
}

/// Retrieves a tarball of pre-rendered manifests
#[async_trait]
pub trait ManifestArchiveFetcher: Send + Sync {
    async fn fetch_manifests(&self, cancel: &CancellationToken, uri: &str) -> Result<Manifests>;
}

/// Dispatches on the installation source of a version
pub struct ManifestResolver<'a> {
    charts: &'a dyn ChartRenderer,
    archives: &'a dyn ManifestArchiveFetcher,
}

impl<'a> ManifestResolver<'a> {
    pub fn new(charts: &'a dyn ChartRenderer, archives: &'a dyn ManifestArchiveFetcher) -> Self {
        Self { charts, archives }
    }

    /// Produce the base manifests of a version
    pub async fn get_manifests_from_application_spec(
        &self,
        cancel: &CancellationToken,
        inputs: &ValuesInputs,
        version: &VersionedApplicationSpec,
        flavor: &Flavor,
    ) -> Result<Manifests> {
        match version.installation_spec()? {
            InstallationSpec::HelmArchive(archive) => {
                let chart = ChartSource::Archive(archive.uri.clone());
                self.from_chart(cancel, inputs, flavor, &chart).await
            }
            InstallationSpec::GithubChart(location) => {
                let chart = ChartSource::Github(location.clone());
                self.from_chart(cancel, inputs, flavor, &chart).await
            }
            InstallationSpec::ManifestsArchive(archive) => {
                self.from_archive(cancel, inputs, archive).await
            }
            InstallationSpec::InstallationSteps(steps) => {
                self.from_steps(cancel, inputs, flavor, steps).await
            }
        }
    }

    async fn from_chart(
        &self,
        cancel: &CancellationToken,
        inputs: &ValuesInputs,
        flavor: &Flavor,
        chart: &ChartSource,
    ) -> Result<Manifests> {
        let values = compute_value_overrides(inputs, flavor)?;
        tracing::info!(chart = %chart, values = %values, "rendering with values");

        self.charts
            .render_chart(cancel, chart, &values, &inputs.name, &inputs.install_namespace)
            .await
            .map_err(|e| wrap_render_error(e, chart.to_string(), values, inputs))
    }

    async fn from_archive(
        &self,
        cancel: &CancellationToken,
        inputs: &ValuesInputs,
        archive: &TgzLocation,
    ) -> Result<Manifests> {
        tracing::info!(uri = %archive.uri, "fetching manifests archive");
        self.archives
            .fetch_manifests(cancel, &archive.uri)
            .await
            .map_err(|e| wrap_render_error(e, archive.uri.clone(), String::new(), inputs))
    }

    async fn from_steps(
        &self,
        cancel: &CancellationToken,
        inputs: &ValuesInputs,
        flavor: &Flavor,
        steps: &InstallationSteps,
    ) -> Result<Manifests> {
        validate_steps(steps)?;

        let mut combined = Manifests::new();
        for step in &steps.steps {
            tracing::debug!(step = %step.name, "rendering installation step");
            let manifests = match step_source(step)? {
                StepSource::HelmArchive(archive) => {
                    let chart = ChartSource::Archive(archive.uri.clone());
                    self.from_chart(cancel, inputs, flavor, &chart).await?
                }
                StepSource::GithubChart(location) => {
                    let chart = ChartSource::Github(location.clone());
                    self.from_chart(cancel, inputs, flavor, &chart).await?
                }
                StepSource::ManifestsArchive(archive) => {
                    self.from_archive(cancel, inputs, archive).await?
                }
            };
            combined.extend(label_step(&manifests, &step.name)?);
        }
        Ok(combined)
    }
}

/// Steps must exist, be named, have unique names and exactly one source each
pub fn validate_steps(steps: &InstallationSteps) -> Result<()> {
    if steps.steps.is_empty() {
        return Err(RenderError::NoInstallationSteps);
    }
    let mut names = BTreeSet::new();
    for step in &steps.steps {
        if step.name.is_empty() {
            return Err(RenderError::UnnamedStep);
        }
        if !names.insert(step.name.as_str()) {
            return Err(RenderError::DuplicateStep {
                name: step.name.clone(),
            });
        }
        step_source(step)?;
    }
    Ok(())
}

fn step_source(step: &InstallationStep) -> Result<StepSource<'_>> {
    step.source().map_err(|source| RenderError::InvalidStep {
        name: step.name.clone(),
        source,
    })
}

/// Label every resource of `manifests` with the step that produced it
fn label_step(manifests: &Manifests, step: &str) -> Result<Manifests> {
    let mut resources = manifests
        .resource_list()
        .map_err(RenderError::ConvertManifests)?;
    for resource in &mut resources {
        set_label(resource, INSTALLATION_STEP_LABEL, step);
    }
    Ok(Manifests::from_resources(&resources)?)
}

fn wrap_render_error(
    err: RenderError,
    source_ref: String,
    values: String,
    inputs: &ValuesInputs,
) -> RenderError {
    if matches!(err, RenderError::Cancelled) {
        return err;
    }
    tracing::error!(
        error = %err,
        source = %source_ref,
        values = %values,
        release = %inputs.name,
        namespace = %inputs.install_namespace,
        "error rendering manifests"
    );
    RenderError::RenderManifests {
        source_ref,
        values,
        release: inputs.name.clone(),
        namespace: inputs.install_namespace.clone(),
        source: Box::new(err),
    }
}
