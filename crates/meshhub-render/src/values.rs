//! Value override computation
//!
//! Precedence, lowest first: spec values, selected layer option Helm values
//! (in input order), parameters, user values.

use meshhub_core::values::{
    coalesce, nested_map_to_yaml, params_to_nested_map, yaml_string_to_nested_map,
};
use meshhub_core::{Flavor, NestedMap, ValuesInputs};

use crate::error::Result;
use crate::flavor::selected_options;

/// Coalesce every values source of a request into one YAML document
///
/// Returns an empty string when no values are set.
pub fn compute_value_overrides(inputs: &ValuesInputs, flavor: &Flavor) -> Result<String> {
    let mut values = NestedMap::new();

    let spec_values = yaml_string_to_nested_map(&inputs.spec_defined_values).inspect_err(|e| {
        tracing::error!(error = %e, values = %inputs.spec_defined_values, "error parsing spec values yaml");
    })?;
    values = coalesce(values, spec_values);

    for option in selected_options(inputs, flavor)? {
        if option.helm_values.is_empty() {
            continue;
        }
        let layer_values = yaml_string_to_nested_map(&option.helm_values).inspect_err(|e| {
            tracing::error!(error = %e, option = %option.id, "error parsing layer values yaml");
        })?;
        values = coalesce(values, layer_values);
    }

    let param_values = params_to_nested_map(&inputs.params).inspect_err(|e| {
        tracing::error!(error = %e, params = ?inputs.params, "error parsing install params");
    })?;
    values = coalesce(values, param_values);

    let user_values = yaml_string_to_nested_map(&inputs.user_defined_values).inspect_err(|e| {
        tracing::error!(error = %e, values = %inputs.user_defined_values, "error parsing user values yaml");
    })?;
    values = coalesce(values, user_values);

    Ok(nested_map_to_yaml(&values)?)
}
