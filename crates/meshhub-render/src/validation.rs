//! Pre-flight validation of a render request
//!
//! Every check is local and runs before any manifest source is fetched.

use meshhub_core::{Flavor, ResourceDependency, ValuesInputs, VersionedApplicationSpec};
use std::collections::BTreeSet;

use crate::dependencies::DependencyValidator;
use crate::error::{RenderError, Result};
use crate::flavor::{get_layer, get_layer_option, required_layer_count, selected_options, suggest};
use crate::params::declared_parameters;

/// Validate caller inputs against the selected flavor
///
/// Checks, in order:
/// 1. the number of layer selections lies between the required and declared layer counts
///    inclusive; selections beyond the required count must be optional layers
/// 2. each required layer has a selection and every selection names a declared option
/// 3. every required parameter has a non-empty value; defaults only count once
///    [`resolve_parameters`](crate::params::resolve_parameters) has filled them in
/// 4. every supplied parameter is declared by the version, flavor or a selected option
/// 5. the dependency validator accepts the flavor and option dependencies
pub fn validate_inputs(
    inputs: &ValuesInputs,
    version: &VersionedApplicationSpec,
    flavor: &Flavor,
    dependencies: &dyn DependencyValidator,
) -> Result<()> {
    validate_layers(inputs, flavor)?;
    validate_parameters(inputs, version, flavor)?;
    dependencies.validate(&collect_dependencies(inputs, flavor)?)
}

fn validate_layers(inputs: &ValuesInputs, flavor: &Flavor) -> Result<()> {
    let required = required_layer_count(flavor);
    let declared = flavor.customization_layers.len();
    let found = inputs.layers.len();
    if found < required || found > declared {
        return Err(RenderError::IncorrectNumberOfInputLayers {
            required,
            declared,
            found,
        });
    }

    let mut seen = BTreeSet::new();
    for input in &inputs.layers {
        get_layer(&input.layer_id, flavor)?;
        if !seen.insert(input.layer_id.as_str()) {
            return Err(RenderError::DuplicateInputLayer {
                layer_id: input.layer_id.clone(),
            });
        }
    }

    for layer in &flavor.customization_layers {
        match inputs.layer(&layer.id) {
            Some(input) => {
                get_layer_option(&input.option_id, layer)?;
            }
            None if layer.optional => continue,
            None => {
                return Err(RenderError::MissingRequiredLayer {
                    layer_id: layer.id.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_parameters(
    inputs: &ValuesInputs,
    version: &VersionedApplicationSpec,
    flavor: &Flavor,
) -> Result<()> {
    let declared = declared_parameters(inputs, version, flavor);

    for parameter in declared.iter().filter(|p| p.required) {
        let supplied = inputs
            .params
            .get(&parameter.name)
            .is_some_and(|value| !value.is_empty());
        if !supplied {
            return Err(RenderError::MissingRequiredParameter {
                name: parameter.name.clone(),
            });
        }
    }

    for name in inputs.params.keys() {
        if !declared.iter().any(|p| &p.name == name) {
            return Err(RenderError::UnrecognizedParameter {
                name: name.clone(),
                suggestion: suggest(name, declared.iter().map(|p| p.name.as_str())),
            });
        }
    }
    Ok(())
}

/// Flavor dependencies followed by those of the selected options
pub fn collect_dependencies(
    inputs: &ValuesInputs,
    flavor: &Flavor,
) -> Result<Vec<ResourceDependency>> {
    let mut dependencies = flavor.resource_dependencies.clone();
    for option in selected_options(inputs, flavor)? {
        dependencies.extend(option.resource_dependencies.iter().cloned());
    }
    Ok(dependencies)
}
