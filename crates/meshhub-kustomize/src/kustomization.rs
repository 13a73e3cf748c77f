//! `kustomization.yaml` file model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{KustomizeError, Result};
use crate::fs::Filesystem;

/// Accepted kustomization file names, in lookup order
pub const KUSTOMIZATION_FILE_NAMES: &[&str] =
    &["kustomization.yaml", "kustomization.yml", "Kustomization"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kustomization {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,

    /// Older spelling of directory resources
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,

    /// Files holding generator plugin configs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generators: Vec<String>,

    /// Files holding transformer plugin configs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transformers: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches_strategic_merge: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_suffix: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub common_labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub common_annotations: BTreeMap<String, String>,
}

impl Kustomization {
    pub fn with_bases(bases: Vec<String>) -> Self {
        Self {
            bases,
            ..Default::default()
        }
    }

    pub fn with_resources(resources: Vec<String>) -> Self {
        Self {
            resources,
            ..Default::default()
        }
    }

    /// Find and parse the kustomization file in `dir`
    pub fn load(fs: &dyn Filesystem, dir: &Path) -> Result<(PathBuf, Self)> {
        let path = KUSTOMIZATION_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| fs.exists(path))
            .ok_or_else(|| KustomizeError::MissingKustomization {
                dir: dir.display().to_string(),
            })?;

        let content = fs
            .read_to_string(&path)
            .map_err(|e| KustomizeError::io(&path, e))?;
        let kustomization = serde_yaml::from_str(&content).map_err(|e| {
            KustomizeError::InvalidKustomization {
                path: path.display().to_string(),
                message: e.to_string(),
            }
        })?;
        Ok((path, kustomization))
    }

    /// Write as `kustomization.yaml` in `dir`
    pub fn write(&self, fs: &dyn Filesystem, dir: &Path) -> Result<()> {
        let path = dir.join(KUSTOMIZATION_FILE_NAMES[0]);
        let yaml = serde_yaml::to_string(self)?;
        fs.write(&path, yaml.as_bytes())
            .map_err(|e| KustomizeError::io(&path, e))
    }
}
