//! `.tar.gz` creation and extraction
//!
//! Used for chart archives, manifest bundles and kustomize overlay sources.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::{Archive, Builder};

use crate::error::{CoreError, Result};
use crate::manifest::{Manifest, Manifests};

/// File extensions collected from manifest bundles
const MANIFEST_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Create a tar.gz archive of `src_dir`'s contents at `output`
///
/// Entries are stored relative to `src_dir`.
pub fn create_archive(src_dir: &Path, output: &Path) -> Result<PathBuf> {
    let file = File::create(output)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    builder.append_dir_all(".", src_dir)?;

    let encoder = builder.into_inner()?;
    encoder.finish()?;

    Ok(output.to_path_buf())
}

/// Extract in-memory tar.gz bytes into `dest`
pub fn extract_bytes(data: &[u8], dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)?;
    let mut archive = Archive::new(GzDecoder::new(data));
    archive.unpack(dest).map_err(|e| CoreError::Archive {
        message: format!("failed to extract archive into {}: {}", dest.display(), e),
    })
}

/// Read every manifest file from in-memory tar.gz bytes
///
/// Members ending in `.yaml`, `.yml` or `.json` are returned ordered by path.
pub fn manifests_from_archive(data: &[u8]) -> Result<Manifests> {
    let mut archive = Archive::new(GzDecoder::new(data));
    let mut manifests = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry.path()?.to_string_lossy().to_string();
        if !is_manifest_file(&path) {
            continue;
        }

        let mut content = String::new();
        entry.read_to_string(&mut content).map_err(|e| CoreError::Archive {
            message: format!("{path} is not valid UTF-8: {e}"),
        })?;
        manifests.push(Manifest::new(path.trim_start_matches("./"), content));
    }

    manifests.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Manifests(manifests))
}

fn is_manifest_file(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MANIFEST_EXTENSIONS.contains(&ext))
}

/// First top-level directory under `dir`
///
/// GitHub repository archives wrap their content in a `<org>-<repo>-<sha>/` folder.
pub fn first_directory(dir: &Path) -> Result<PathBuf> {
    let mut dirs = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.path())
        .collect::<Vec<_>>();
    dirs.sort();
    dirs.into_iter().next().ok_or_else(|| CoreError::Archive {
        message: "unable to find directory in archive of git repo".to_string(),
    })
}
