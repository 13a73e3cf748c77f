//! Validate command - check a selection against the application schema

use meshhub_fetch::Fetcher;
use meshhub_render::ManifestRenderer;
use tokio_util::sync::CancellationToken;

use crate::display::print_validation_success;
use crate::error::Result;
use crate::selection::SelectionArgs;

pub async fn run(
    renderer: &ManifestRenderer,
    fetcher: &Fetcher,
    selection: &SelectionArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    let install_spec = selection.install_spec(fetcher, cancel).await?;
    let (inputs, flavor) = renderer.validate(install_spec.values, &install_spec.version, None)?;
    print_validation_success(&inputs, &install_spec.version, flavor);
    Ok(())
}
