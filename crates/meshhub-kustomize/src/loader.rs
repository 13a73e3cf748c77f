//! Overlay retrieval and base layout
//!
//! After [`Loader::retrieve_layers`] and [`Loader::load_base`] the working
//! directory looks like:
//!
//! ```text
//! dir/
//!   kustomization.yaml      # bases: [./<every retrieved directory>]
//!   <retrieved layers>/...
//!   base/
//!     kustomization.yaml    # resources: [resource.yaml]
//!     resource.yaml         # the rendered manifests
//! ```
//!
//! Overlays reference the rendered manifests as `../base` (or deeper).

use async_trait::async_trait;
use meshhub_core::{Kustomize, KustomizeLocation, Manifests};
use meshhub_fetch::Fetcher;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{KustomizeError, Result};
use crate::fs::Filesystem;
use crate::kustomization::Kustomization;

pub const BASE_DIR: &str = "base";
pub const RESOURCE_FILE: &str = "resource.yaml";

#[async_trait]
pub trait Loader: Send + Sync {
    /// Retrieve the overlay source into `dir` and return the tree root to build from
    async fn retrieve_layers(
        &self,
        dir: &Path,
        kustomize: &Kustomize,
        cancel: &CancellationToken,
    ) -> Result<PathBuf>;

    /// Write the rendered manifests as the `base` package under `dir`
    fn load_base(&self, manifests: &Manifests, dir: &Path) -> Result<()>;
}

/// Loader backed by a [`Fetcher`] and a [`Filesystem`]
pub struct KustomizeLoader {
    fetcher: Fetcher,
    fs: Arc<dyn Filesystem>,
}

impl KustomizeLoader {
    pub fn new(fetcher: Fetcher, fs: Arc<dyn Filesystem>) -> Self {
        Self { fetcher, fs }
    }

    fn gather_bases(&self, dir: &Path) -> Result<Vec<String>> {
        let entries = self
            .fs
            .read_dir(dir)
            .map_err(|e| KustomizeError::io(dir, e))?;

        Ok(entries
            .iter()
            .filter(|path| self.fs.is_dir(path))
            .filter_map(|path| path.file_name())
            .map(|name| format!("./{}", name.to_string_lossy()))
            .collect())
    }
}

#[async_trait]
impl Loader for KustomizeLoader {
    async fn retrieve_layers(
        &self,
        dir: &Path,
        kustomize: &Kustomize,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        match kustomize.location()? {
            KustomizeLocation::Github(github) => {
                tracing::debug!(location = %github, "retrieving kustomize layers from github");
                Ok(self.fetcher.download_github_repo(github, dir, cancel).await?)
            }
            KustomizeLocation::TgzArchive(tgz) => {
                tracing::debug!(uri = %tgz.uri, "retrieving kustomize layers from archive");
                self.fetcher.download_tgz(&tgz.uri, dir, cancel).await?;
                Ok(dir.to_path_buf())
            }
        }
    }

    fn load_base(&self, manifests: &Manifests, dir: &Path) -> Result<()> {
        let bases = self.gather_bases(dir)?;
        Kustomization::with_bases(bases).write(self.fs.as_ref(), dir)?;

        let base_dir = dir.join(BASE_DIR);
        self.fs
            .create_dir_all(&base_dir)
            .map_err(|e| KustomizeError::io(&base_dir, e))?;

        let resource_path = base_dir.join(RESOURCE_FILE);
        self.fs
            .write(&resource_path, manifests.combined_string().as_bytes())
            .map_err(|e| KustomizeError::io(&resource_path, e))?;

        Kustomization::with_resources(vec![RESOURCE_FILE.to_string()])
            .write(self.fs.as_ref(), &base_dir)
    }
}
