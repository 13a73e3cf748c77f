//! Turning command line selections into an install spec

use clap::Args;
use meshhub_core::{
    ApplicationSpec, DirectorySpecReader, GithubRepositoryLocation, InstallSpec, LayerInput,
    ResourceRef, SpecReader, Values, ValuesInputs, VersionedApplicationSpec,
};
use meshhub_fetch::{Fetcher, GithubSpecReader, RemoteSpecReader};
use miette::{IntoDiagnostic, WrapErr};
use semver::Version;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use crate::error::{CliError, Result};

/// Where application specs are read from
#[derive(Args, Debug, Clone, Default)]
#[group(multiple = false)]
pub struct CatalogArgs {
    /// Local catalog directory (one `<app>/spec.yaml` per application)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// URL of a catalog bundle (`specs: [...]`)
    #[arg(long)]
    pub catalog_url: Option<String>,

    /// Catalog directory in a GitHub repository, as ORG/REPO@REF[:DIR]
    #[arg(long, value_name = "ORG/REPO@REF[:DIR]")]
    pub github_catalog: Option<String>,
}

impl CatalogArgs {
    fn is_set(&self) -> bool {
        self.catalog.is_some() || self.catalog_url.is_some() || self.github_catalog.is_some()
    }

    fn describe(&self) -> String {
        match (&self.catalog, &self.catalog_url, &self.github_catalog) {
            (Some(dir), _, _) => dir.display().to_string(),
            (_, Some(url), _) => url.clone(),
            (_, _, Some(github)) => github.clone(),
            _ => String::new(),
        }
    }

    /// Read every application spec of the selected catalog
    pub async fn load(
        &self,
        fetcher: &Fetcher,
        cancel: &CancellationToken,
    ) -> Result<Vec<ApplicationSpec>> {
        if let Some(dir) = &self.catalog {
            return DirectorySpecReader::new(dir)
                .get_specs()
                .map_err(|e| CliError::catalog(e.to_string()));
        }
        if let Some(url) = &self.catalog_url {
            return Ok(RemoteSpecReader::new(fetcher.clone(), url)
                .get_specs(cancel)
                .await?);
        }
        if let Some(github) = &self.github_catalog {
            let location = parse_github_location(github)?;
            return Ok(GithubSpecReader::new(fetcher.clone(), location)
                .get_specs(cancel)
                .await?);
        }
        Err(CliError::usage_with_help(
            "no catalog given",
            "pass --catalog DIR, --catalog-url URL or --github-catalog ORG/REPO@REF[:DIR]",
        ))
    }
}

/// Which application, version and flavor to render, and with what inputs
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Install spec file holding the inputs and the version to render
    #[arg(short = 'i', long, conflicts_with_all = ["catalog", "catalog_url", "github_catalog", "application"])]
    pub install_spec_file: Option<PathBuf>,

    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Application name
    #[arg(short, long)]
    pub application: Option<String>,

    /// Application version (default: highest semantic version)
    #[arg(long)]
    pub version: Option<String>,

    /// Flavor (default: the only flavor of the version)
    #[arg(long)]
    pub flavor: Option<String>,

    /// Release name (default: the application name)
    #[arg(long)]
    pub name: Option<String>,

    /// Install namespace
    #[arg(short, long, default_value = "default")]
    pub namespace: String,

    /// Layer selection as LAYER=OPTION, in order
    #[arg(short, long = "layer", value_name = "LAYER=OPTION")]
    pub layers: Vec<String>,

    /// Parameter as NAME=VALUE
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    /// Values file(s) merged in order into the user values
    #[arg(short = 'f', long = "values")]
    pub values: Vec<PathBuf>,

    /// Name of the mesh the application belongs to
    #[arg(long)]
    pub mesh_name: Option<String>,

    /// Namespace of the mesh resource
    #[arg(long)]
    pub mesh_namespace: Option<String>,
}

impl SelectionArgs {
    /// Load or assemble the install spec described by the arguments
    pub async fn install_spec(
        &self,
        fetcher: &Fetcher,
        cancel: &CancellationToken,
    ) -> Result<InstallSpec> {
        if let Some(path) = &self.install_spec_file {
            tracing::debug!(path = %path.display(), "loading install spec");
            return InstallSpec::load(path).map_err(|e| {
                CliError::catalog(format!(
                    "failed to load install spec {}: {e}",
                    path.display()
                ))
            });
        }

        if !self.catalog.is_set() {
            return Err(CliError::usage_with_help(
                "no catalog given",
                "pass --catalog DIR or --install-spec-file FILE",
            ));
        }
        let application_name = self
            .application
            .as_deref()
            .ok_or_else(|| CliError::usage("--application is required with a catalog"))?;

        let specs = self.catalog.load(fetcher, cancel).await?;
        let application = find_application(specs, application_name, &self.catalog.describe())?;
        let version = select_version(&application, self.version.as_deref())?;
        let flavor_name = select_flavor(version, self.flavor.as_deref())?;

        let values = ValuesInputs {
            name: self
                .name
                .clone()
                .unwrap_or_else(|| application.name.clone()),
            install_namespace: self.namespace.clone(),
            flavor_name,
            layers: parse_layers(&self.layers)?,
            mesh_ref: ResourceRef::new(
                self.mesh_name.clone().unwrap_or_default(),
                self.mesh_namespace.clone().unwrap_or_default(),
            ),
            params: parse_params(&self.set)?,
            spec_defined_values: version.values_yaml.clone(),
            user_defined_values: merge_values_files(&self.values)?,
        };

        Ok(InstallSpec {
            values,
            version: version.clone(),
        })
    }
}

fn find_application(
    specs: Vec<ApplicationSpec>,
    name: &str,
    catalog: &str,
) -> Result<ApplicationSpec> {
    let available = specs
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    specs
        .into_iter()
        .find(|spec| spec.name == name)
        .ok_or_else(|| {
            CliError::catalog_with_help(
                format!("application {name} not found in {catalog}"),
                format!("available applications: {available}"),
            )
        })
}

/// Semantic version of a catalog version string, tolerating a `v` prefix
pub fn parse_version(version: &str) -> Option<Version> {
    Version::parse(version.trim_start_matches('v')).ok()
}

/// Orders parsable versions semantically, after every unparsable one
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (parse_version(a), parse_version(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn select_version<'a>(
    application: &'a ApplicationSpec,
    requested: Option<&str>,
) -> Result<&'a VersionedApplicationSpec> {
    let available = || {
        application
            .versions
            .iter()
            .map(|v| v.version.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let selected = match requested {
        Some(requested) => application.version(requested),
        None => application
            .versions
            .iter()
            .max_by(|a, b| compare_versions(&a.version, &b.version)),
    };

    selected.ok_or_else(|| match requested {
        Some(requested) => CliError::catalog_with_help(
            format!("version {requested} of {} not found", application.name),
            format!("available versions: {}", available()),
        ),
        None => CliError::catalog(format!("{} has no versions", application.name)),
    })
}

fn select_flavor(version: &VersionedApplicationSpec, requested: Option<&str>) -> Result<String> {
    if let Some(requested) = requested {
        return Ok(requested.to_string());
    }
    match version.flavors.as_slice() {
        [only] => Ok(only.name.clone()),
        flavors => Err(CliError::usage_with_help(
            "--flavor is required",
            format!(
                "available flavors: {}",
                flavors
                    .iter()
                    .map(|f| f.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )),
    }
}

/// Parse `ORG/REPO@REF[:DIR]`
fn parse_github_location(arg: &str) -> Result<GithubRepositoryLocation> {
    let invalid = || {
        CliError::usage(format!(
            "invalid --github-catalog '{arg}', expected ORG/REPO@REF[:DIR]"
        ))
    };
    let (repository, rest) = arg.split_once('@').ok_or_else(invalid)?;
    let (org, repo) = repository.split_once('/').ok_or_else(invalid)?;
    let (git_ref, directory) = rest.split_once(':').unwrap_or((rest, ""));
    if org.is_empty() || repo.is_empty() || git_ref.is_empty() {
        return Err(invalid());
    }
    Ok(GithubRepositoryLocation {
        org: org.to_string(),
        repo: repo.to_string(),
        git_ref: git_ref.to_string(),
        directory: directory.to_string(),
    })
}

fn split_assignment<'a>(arg: &'a str, flag: &str, expected: &str) -> Result<(&'a str, &'a str)> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => Err(CliError::usage(format!(
            "invalid {flag} '{arg}', expected {expected}"
        ))),
    }
}

fn parse_layers(args: &[String]) -> Result<Vec<LayerInput>> {
    args.iter()
        .map(|arg| {
            let (layer, option) = split_assignment(arg, "--layer", "LAYER=OPTION")?;
            Ok(LayerInput::new(layer, option))
        })
        .collect()
}

fn parse_params(args: &[String]) -> Result<BTreeMap<String, String>> {
    args.iter()
        .map(|arg| {
            let (name, value) = split_assignment(arg, "--set", "NAME=VALUE")?;
            Ok((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Later files override earlier ones
fn merge_values_files(files: &[PathBuf]) -> Result<String> {
    let mut merged = Values::new();
    for file in files {
        let values = Values::from_file(file)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read values file {}", file.display()))?;
        merged = merged.coalesce(values);
    }
    Ok(merged.to_yaml()?)
}
