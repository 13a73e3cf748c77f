//! Application catalog model
//!
//! These types mirror the catalog `spec.yaml` files. Field names follow the
//! camelCase convention of the catalog. One-of groups (installation source,
//! kustomize location, parameter value) are stored as sibling optional fields
//! and exposed through accessors returning a tagged enum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Catalog entry for one installable application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    pub name: String,

    #[serde(default, rename = "type")]
    pub app_type: ApplicationType,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logo_url: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub short_description: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub documentation_url: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository_url: String,

    #[serde(default)]
    pub versions: Vec<VersionedApplicationSpec>,
}

impl ApplicationSpec {
    /// Load an application spec from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| CoreError::InvalidApplicationSpec {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Parse an application spec from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Find a version by its version string
    pub fn version(&self, version: &str) -> Option<&VersionedApplicationSpec> {
        self.versions.iter().find(|v| v.version == version)
    }
}

/// A bundle of application specs, as served by a remote catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSpecs {
    #[serde(default)]
    pub specs: Vec<ApplicationSpec>,
}

/// Application category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationType {
    #[default]
    Extension,
    Demo,
    Mesh,
}

/// One installable version of an application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedApplicationSpec {
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_chart: Option<GithubRepositoryLocation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm_archive: Option<TgzLocation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifests_archive: Option<TgzLocation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_steps: Option<InstallationSteps>,

    /// Default Helm values for the chart
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub values_yaml: String,

    #[serde(default)]
    pub flavors: Vec<Flavor>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,

    /// Rendered resources must carry all of these labels to be kept
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub required_labels: BTreeMap<String, String>,
}

/// Installation source of a version, one of the four supported kinds
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InstallationSpec<'a> {
    GithubChart(&'a GithubRepositoryLocation),
    HelmArchive(&'a TgzLocation),
    ManifestsArchive(&'a TgzLocation),
    InstallationSteps(&'a InstallationSteps),
}

impl VersionedApplicationSpec {
    /// The populated installation source
    ///
    /// Exactly one source must be set.
    pub fn installation_spec(&self) -> Result<InstallationSpec<'_>> {
        let mut found = Vec::new();
        if let Some(github) = &self.github_chart {
            found.push(("githubChart", InstallationSpec::GithubChart(github)));
        }
        if let Some(helm) = &self.helm_archive {
            found.push(("helmArchive", InstallationSpec::HelmArchive(helm)));
        }
        if let Some(archive) = &self.manifests_archive {
            found.push(("manifestsArchive", InstallationSpec::ManifestsArchive(archive)));
        }
        if let Some(steps) = &self.installation_steps {
            found.push(("installationSteps", InstallationSpec::InstallationSteps(steps)));
        }

        match found.len() {
            0 => Err(CoreError::MissingInstallSpec),
            1 => Ok(found.remove(0).1),
            n => Err(CoreError::AmbiguousInstallSpec {
                found: n,
                variants: found
                    .iter()
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Find a flavor by name
    pub fn flavor(&self, name: &str) -> Option<&Flavor> {
        self.flavors.iter().find(|f| f.name == name)
    }
}

/// Location of a gzipped tarball (remote URL or local path)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TgzLocation {
    pub uri: String,
}

impl TgzLocation {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

/// Directory inside a GitHub repository at a given ref
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubRepositoryLocation {
    pub org: String,
    pub repo: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(default)]
    pub directory: String,
}

impl std::fmt::Display for GithubRepositoryLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}@{}", self.org, self.repo, self.git_ref)?;
        if !self.directory.is_empty() {
            write!(f, ":{}", self.directory)?;
        }
        Ok(())
    }
}

/// Ordered multi-stage installation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallationSteps {
    #[serde(default)]
    pub steps: Vec<InstallationStep>,
}

/// One named installation stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationStep {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_chart: Option<GithubRepositoryLocation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm_archive: Option<TgzLocation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifests_archive: Option<TgzLocation>,
}

/// Source of a single installation step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepSource<'a> {
    GithubChart(&'a GithubRepositoryLocation),
    HelmArchive(&'a TgzLocation),
    ManifestsArchive(&'a TgzLocation),
}

impl InstallationStep {
    /// The populated step source; exactly one must be set
    pub fn source(&self) -> Result<StepSource<'_>> {
        match (&self.github_chart, &self.helm_archive, &self.manifests_archive) {
            (Some(github), None, None) => Ok(StepSource::GithubChart(github)),
            (None, Some(helm), None) => Ok(StepSource::HelmArchive(helm)),
            (None, None, Some(archive)) => Ok(StepSource::ManifestsArchive(archive)),
            (None, None, None) => Err(CoreError::MissingInstallSpec),
            (github, helm, archive) => Err(CoreError::AmbiguousInstallSpec {
                found: [github.is_some(), helm.is_some(), archive.is_some()]
                    .iter()
                    .filter(|set| **set)
                    .count(),
                variants: format!("step {}", self.name),
            }),
        }
    }
}

/// Named installation variant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flavor {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default)]
    pub customization_layers: Vec<Layer>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_dependencies: Vec<ResourceDependency>,
}

/// Customization point of a flavor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default)]
    pub optional: bool,

    #[serde(default)]
    pub options: Vec<LayerOption>,
}

/// One concrete choice for a layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerOption {
    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Helm values fragment merged over the spec values
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub helm_values: String,

    /// Structural overlay applied to the rendered manifests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kustomize: Option<Kustomize>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_dependencies: Vec<ResourceDependency>,
}

/// Kustomize overlay descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kustomize {
    /// Path of the overlay inside the retrieved source tree
    #[serde(default)]
    pub overlay_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubRepositoryLocation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tgz_archive: Option<TgzLocation>,
}

/// Where a kustomize overlay is retrieved from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KustomizeLocation<'a> {
    Github(&'a GithubRepositoryLocation),
    TgzArchive(&'a TgzLocation),
}

impl Kustomize {
    pub fn location(&self) -> Result<KustomizeLocation<'_>> {
        match (&self.github, &self.tgz_archive) {
            (Some(github), None) => Ok(KustomizeLocation::Github(github)),
            (None, Some(tgz)) => Ok(KustomizeLocation::TgzArchive(tgz)),
            (None, None) => Err(CoreError::MissingKustomizeLocation),
            (Some(_), Some(_)) => Err(CoreError::AmbiguousInstallSpec {
                found: 2,
                variants: "github, tgzArchive".to_string(),
            }),
        }
    }
}

/// Named, typed input of an application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ParameterValue>,
}

/// Typed parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterValue {
    StringValue(String),
    BooleanValue(bool),
    IntValue(i64),
    FloatValue(f64),
    DateValue(DateTime<Utc>),
    SecretValue(SecretValue),
}

impl ParameterValue {
    /// Render the value in the flat string form used by parameter maps
    pub fn to_param_string(&self) -> Result<String> {
        Ok(match self {
            ParameterValue::StringValue(s) => s.clone(),
            ParameterValue::BooleanValue(b) => b.to_string(),
            ParameterValue::IntValue(i) => i.to_string(),
            ParameterValue::FloatValue(f) => f.to_string(),
            ParameterValue::DateValue(d) => d.to_rfc3339(),
            ParameterValue::SecretValue(secret) => secret.plain_text()?.to_string(),
        })
    }
}

/// Secret parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SecretValue {
    PlainText(String),
    /// Reference to a file holding the secret
    File(String),
}

impl SecretValue {
    pub fn plain_text(&self) -> Result<&str> {
        match self {
            SecretValue::PlainText(text) => Ok(text),
            SecretValue::File(_) => Err(CoreError::UnsupportedParamType {
                kind: "file secret".to_string(),
            }),
        }
    }
}

/// External resource a flavor or layer option relies on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceDependency {
    SecretDependency(SecretDependency),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretDependency {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub keys: Vec<String>,
}
