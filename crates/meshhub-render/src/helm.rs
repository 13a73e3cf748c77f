//! Default manifest sources: `helm template` and remote manifest tarballs

use async_trait::async_trait;
use meshhub_core::Manifests;
use meshhub_core::archive::manifests_from_archive;
use meshhub_fetch::Fetcher;
use std::path::PathBuf;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::{RenderError, Result};
use crate::manifest::{ChartRenderer, ChartSource, ManifestArchiveFetcher};

/// Environment variable naming the helm executable
pub const HELM_BIN_ENV: &str = "MESHHUB_HELM_BIN";

const DEFAULT_HELM_BIN: &str = "helm";

/// Renders charts by running `helm template` on a local copy of the chart
#[derive(Debug, Clone)]
pub struct HelmTemplateRenderer {
    fetcher: Fetcher,
    helm_bin: String,
}

impl HelmTemplateRenderer {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            helm_bin: DEFAULT_HELM_BIN.to_string(),
        }
    }

    pub fn with_helm_bin(mut self, helm_bin: impl Into<String>) -> Self {
        self.helm_bin = helm_bin.into();
        self
    }

    /// Local path of the chart, retrieved into `dir`
    async fn fetch_chart(
        &self,
        cancel: &CancellationToken,
        chart: &ChartSource,
        dir: &std::path::Path,
    ) -> Result<PathBuf> {
        match chart {
            ChartSource::Archive(uri) => {
                let bytes = self.fetcher.fetch_bytes(uri, cancel).await?;
                let path = dir.join("chart.tgz");
                tokio::fs::write(&path, bytes).await?;
                Ok(path)
            }
            ChartSource::Github(location) => {
                let repo_dir = dir.join("repo");
                tokio::fs::create_dir_all(&repo_dir).await?;
                Ok(self
                    .fetcher
                    .download_github_repo(location, &repo_dir, cancel)
                    .await?)
            }
        }
    }
}

#[async_trait]
impl ChartRenderer for HelmTemplateRenderer {
    async fn render_chart(
        &self,
        cancel: &CancellationToken,
        chart: &ChartSource,
        values_yaml: &str,
        release: &str,
        namespace: &str,
    ) -> Result<Manifests> {
        let work = tempfile::Builder::new().prefix("chart").tempdir()?;
        let chart_path = self.fetch_chart(cancel, chart, work.path()).await?;

        let values_path = work.path().join("values.yaml");
        tokio::fs::write(&values_path, values_yaml).await?;

        let mut command = Command::new(&self.helm_bin);
        command
            .arg("template")
            .arg(release)
            .arg(&chart_path)
            .arg("--namespace")
            .arg(namespace)
            .arg("--values")
            .arg(&values_path)
            .kill_on_drop(true);
        tracing::debug!(helm = %self.helm_bin, chart = %chart_path.display(), release, namespace, "running helm template");

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RenderError::Cancelled),
            output = command.output() => output.map_err(|source| RenderError::HelmSpawn {
                binary: self.helm_bin.clone(),
                source,
            })?,
        };

        if !output.status.success() {
            return Err(RenderError::HelmFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stream = String::from_utf8_lossy(&output.stdout);
        let manifests = Manifests::from_stream(release, &stream);
        tracing::debug!(count = manifests.len(), "rendered chart manifests");
        Ok(manifests)
    }
}

/// Downloads a tarball and reads its manifest members
#[derive(Debug, Clone)]
pub struct RemoteTarFetcher {
    fetcher: Fetcher,
}

impl RemoteTarFetcher {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl ManifestArchiveFetcher for RemoteTarFetcher {
    async fn fetch_manifests(&self, cancel: &CancellationToken, uri: &str) -> Result<Manifests> {
        let bytes = self.fetcher.fetch_bytes(uri, cancel).await?;
        Ok(manifests_from_archive(&bytes)?)
    }
}
