//! Application catalog readers

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{CoreError, Result};
use crate::spec::{ApplicationSpec, ApplicationSpecs};

/// File holding an application spec inside its catalog directory
pub const SPEC_FILENAME: &str = "spec.yaml";

/// Optional long description next to the spec file
pub const DESCRIPTION_FILENAME: &str = "description.md";

/// Source of application specs
pub trait SpecReader {
    fn get_specs(&self) -> Result<Vec<ApplicationSpec>>;
}

/// Reads `<dir>/<app>/spec.yaml` for every application subdirectory
///
/// Subdirectories whose spec is missing or malformed are skipped with an error
/// log; they never fail the whole catalog.
#[derive(Debug, Clone)]
pub struct DirectorySpecReader {
    root: PathBuf,
}

impl DirectorySpecReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SpecReader for DirectorySpecReader {
    fn get_specs(&self) -> Result<Vec<ApplicationSpec>> {
        if !self.root.is_dir() {
            return Err(CoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!(
                    "Failed to get local application specs: {} is not a directory",
                    self.root.display()
                ),
            )));
        }
        Ok(specs_from_directory(&self.root))
    }
}

/// Load every application spec found one level below `parent`
pub fn specs_from_directory(parent: &Path) -> Vec<ApplicationSpec> {
    let mut specs = Vec::new();

    let subdirs = WalkDir::new(parent)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir());

    for subdir in subdirs {
        let spec_path = subdir.path().join(SPEC_FILENAME);
        let mut spec = match ApplicationSpec::from_file(&spec_path) {
            Ok(spec) => spec,
            Err(e) => {
                tracing::error!(file = %spec_path.display(), error = %e, "Failed to load spec file");
                continue;
            }
        };

        let description_path = subdir.path().join(DESCRIPTION_FILENAME);
        match std::fs::read_to_string(&description_path) {
            Ok(description) => spec.description = description,
            Err(_) => tracing::debug!(
                application = %spec.name,
                "{} not found, keeping inline description",
                DESCRIPTION_FILENAME
            ),
        }

        specs.push(spec);
    }

    specs
}

/// Parse a served catalog bundle (`specs: [...]`)
pub fn specs_from_bytes(bytes: &[u8]) -> Result<Vec<ApplicationSpec>> {
    let bundle: ApplicationSpecs = serde_yaml::from_slice(bytes)?;
    Ok(bundle.specs)
}
