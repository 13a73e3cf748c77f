//! List command - applications, versions and flavors of a catalog

use meshhub_fetch::Fetcher;
use miette::IntoDiagnostic;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::display::{print_catalog, sorted_versions};
use crate::error::Result;
use crate::selection::CatalogArgs;

#[derive(Serialize)]
struct ApplicationSummary<'a> {
    name: &'a str,
    versions: Vec<VersionSummary<'a>>,
}

#[derive(Serialize)]
struct VersionSummary<'a> {
    version: &'a str,
    flavors: Vec<&'a str>,
}

pub async fn run(
    catalog: &CatalogArgs,
    fetcher: &Fetcher,
    output_json: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let apps = catalog.load(fetcher, cancel).await?;

    if output_json {
        let summary: Vec<_> = apps
            .iter()
            .map(|app| ApplicationSummary {
                name: &app.name,
                versions: sorted_versions(app)
                    .into_iter()
                    .map(|v| VersionSummary {
                        version: &v.version,
                        flavors: v.flavors.iter().map(|f| f.name.as_str()).collect(),
                    })
                    .collect(),
            })
            .collect();
        let json = serde_json::to_string_pretty(&summary).into_diagnostic()?;
        println!("{json}");
        return Ok(());
    }

    print_catalog(&apps);
    Ok(())
}
