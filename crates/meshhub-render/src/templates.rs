//! Self-templating of input values
//!
//! `SpecDefinedValues`, `UserDefinedValues` and every `Params` value may hold
//! template actions that reference other fields of the same inputs, e.g.
//! `namespace: {{ .InstallNamespace }}`. No other field is rendered.

use meshhub_core::ValuesInputs;
use meshhub_engine::Engine;

use crate::error::{RenderError, Result};

/// Render the template-eligible fields of `inputs` against the inputs themselves
///
/// Every field is rendered against the original inputs, so one rendered field
/// never feeds another.
pub fn exec_input_values_templates(inputs: ValuesInputs) -> Result<ValuesInputs> {
    let engine = Engine::default();
    let render = |template: &str, name: &str| {
        engine
            .render_string(template, &inputs, name)
            .map_err(RenderError::InputTemplates)
    };

    let spec_defined_values = render(&inputs.spec_defined_values, "specValues")?;
    let user_defined_values = render(&inputs.user_defined_values, "userValues")?;
    let params = inputs
        .params
        .iter()
        .map(|(name, value)| Ok((name.clone(), render(value, name)?)))
        .collect::<Result<_>>()?;

    Ok(ValuesInputs {
        spec_defined_values,
        user_defined_values,
        params,
        ..inputs
    })
}
