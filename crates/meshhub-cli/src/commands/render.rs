//! Render command - compute the manifest of an application install

use console::style;
use meshhub_core::Manifests;
use meshhub_fetch::Fetcher;
use meshhub_render::ManifestRenderer;
use miette::{IntoDiagnostic, WrapErr};
use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::error::{CliError, Result};
use crate::selection::SelectionArgs;

pub async fn run(
    renderer: &ManifestRenderer,
    fetcher: &Fetcher,
    selection: &SelectionArgs,
    manifest_file: Option<&Path>,
    save_install_spec: Option<&Path>,
    cancel: &CancellationToken,
) -> Result<()> {
    let install_spec = selection.install_spec(fetcher, cancel).await?;

    if let Some(path) = save_install_spec {
        install_spec
            .save(path)
            .map_err(|e| CliError::Io {
                message: format!("failed to save install spec {}: {e}", path.display()),
            })?;
        eprintln!(
            "{} Saved install spec to {}",
            style("✓").green(),
            path.display()
        );
    }

    let resources = renderer
        .compute_resources_for_application(
            cancel,
            install_spec.values.clone(),
            &install_spec.version,
            None,
        )
        .await?;
    tracing::info!(count = resources.len(), "rendered resources");

    let manifest = Manifests::from_resources(&resources)
        .map_err(|e| CliError::Render {
            message: e.to_string(),
        })?
        .combined_string()
        + "\n";

    match manifest_file {
        Some(path) => {
            std::fs::write(path, &manifest)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to write manifest to {}", path.display()))?;
            eprintln!(
                "{} Wrote {} resource(s) to {}",
                style("✓").green(),
                resources.len(),
                path.display()
            );
        }
        None => print!("{manifest}"),
    }
    Ok(())
}
