//! Terminal output for the catalog and validation summaries

use console::style;
use meshhub_core::{ApplicationSpec, Flavor, ValuesInputs, VersionedApplicationSpec};

use crate::selection::compare_versions;

/// Versions of an application, highest first
pub fn sorted_versions(app: &ApplicationSpec) -> Vec<&VersionedApplicationSpec> {
    let mut versions: Vec<_> = app.versions.iter().collect();
    versions.sort_by(|a, b| compare_versions(&b.version, &a.version));
    versions
}

pub fn print_catalog(apps: &[ApplicationSpec]) {
    if apps.is_empty() {
        println!("No applications found");
        return;
    }

    for app in apps {
        println!(
            "{} {}",
            style(&app.name).cyan().bold(),
            style(format!("({})", app_type(app))).dim()
        );
        if !app.short_description.is_empty() {
            println!("  {}", app.short_description);
        }
        for version in sorted_versions(app) {
            let flavors = version
                .flavors
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "  {} {:<12} {} {}",
                style("•").blue(),
                version.version,
                style("flavors:").dim(),
                if flavors.is_empty() { "-" } else { &flavors }
            );
        }
    }
}

fn app_type(app: &ApplicationSpec) -> &'static str {
    match app.app_type {
        meshhub_core::ApplicationType::Extension => "extension",
        meshhub_core::ApplicationType::Demo => "demo",
        meshhub_core::ApplicationType::Mesh => "mesh",
    }
}

pub fn print_validation_success(
    inputs: &ValuesInputs,
    version: &VersionedApplicationSpec,
    flavor: &Flavor,
) {
    println!(
        "{} {} {} is valid (flavor {})",
        style("✓").green(),
        inputs.name,
        version.version,
        style(&flavor.name).bold()
    );

    for layer in &flavor.customization_layers {
        let selection = inputs
            .layer(&layer.id)
            .map(|l| l.option_id.as_str())
            .unwrap_or("-");
        println!("  {} layer {}: {}", style("→").blue(), layer.id, selection);
    }
    for (name, value) in &inputs.params {
        println!("  {} param {}={}", style("→").blue(), name, value);
    }
}
