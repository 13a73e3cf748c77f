//! Parameter defaults

use meshhub_core::{Flavor, Parameter, ValuesInputs, VersionedApplicationSpec};

use crate::error::Result;
use crate::flavor::get_layer_option_from_flavor;

/// Every parameter declared for this request
///
/// Order is version, flavor, then the selected layer options in input order.
/// Selections that do not resolve are skipped here and reported by validation.
pub fn declared_parameters<'a>(
    inputs: &ValuesInputs,
    version: &'a VersionedApplicationSpec,
    flavor: &'a Flavor,
) -> Vec<&'a Parameter> {
    let options = inputs
        .layers
        .iter()
        .filter_map(|l| get_layer_option_from_flavor(&l.layer_id, &l.option_id, flavor).ok());

    version
        .parameters
        .iter()
        .chain(&flavor.parameters)
        .chain(options.flat_map(|option| &option.parameters))
        .collect()
}

/// Fill unset or empty parameters with their declared defaults
///
/// Non-empty values supplied by the caller always win.
pub fn resolve_parameters(
    inputs: &mut ValuesInputs,
    version: &VersionedApplicationSpec,
    flavor: &Flavor,
) -> Result<()> {
    let mut defaults = Vec::new();
    for parameter in declared_parameters(inputs, version, flavor) {
        let Some(default) = &parameter.default else {
            continue;
        };
        if inputs
            .params
            .get(&parameter.name)
            .is_some_and(|value| !value.is_empty())
        {
            continue;
        }
        defaults.push((parameter.name.clone(), default.to_param_string()?));
    }

    for (name, value) in defaults {
        tracing::debug!(parameter = %name, value = %value, "using parameter default");
        inputs.params.insert(name, value);
    }
    Ok(())
}
