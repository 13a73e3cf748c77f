//! Flavor, layer and layer option lookup

use meshhub_core::{Flavor, Layer, LayerOption, ValuesInputs};

use crate::error::{RenderError, Result};

/// Maximum edit distance for "did you mean" hints
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Closest candidate to `input`, if any is near enough
pub(crate) fn suggest<'a, I>(input: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .map(|candidate| (candidate, strsim::levenshtein(input, candidate)))
        .filter(|(_, distance)| *distance > 0 && *distance <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate.to_string())
}

/// Find the flavor the caller selected
pub fn get_installed_flavor<'a>(name: &str, flavors: &'a [Flavor]) -> Result<&'a Flavor> {
    if name.is_empty() {
        return Err(RenderError::NilFlavor);
    }
    if flavors.is_empty() {
        return Err(RenderError::ExpectedAtMost {
            item: "flavor",
            desired: 1,
            found: 0,
        });
    }

    flavors
        .iter()
        .find(|flavor| flavor.name == name)
        .ok_or_else(|| RenderError::FlavorNotFound {
            name: name.to_string(),
            suggestion: suggest(name, flavors.iter().map(|f| f.name.as_str())),
        })
}

/// Number of non-optional layers of a flavor
pub fn required_layer_count(flavor: &Flavor) -> usize {
    flavor
        .customization_layers
        .iter()
        .filter(|layer| !layer.optional)
        .count()
}

pub fn get_layer<'a>(layer_id: &str, flavor: &'a Flavor) -> Result<&'a Layer> {
    flavor
        .customization_layers
        .iter()
        .find(|layer| layer.id == layer_id)
        .ok_or_else(|| RenderError::LayerNotFound {
            layer_id: layer_id.to_string(),
            flavor: flavor.name.clone(),
            suggestion: suggest(
                layer_id,
                flavor.customization_layers.iter().map(|l| l.id.as_str()),
            ),
        })
}

pub fn get_layer_option<'a>(option_id: &str, layer: &'a Layer) -> Result<&'a LayerOption> {
    layer
        .options
        .iter()
        .find(|option| option.id == option_id)
        .ok_or_else(|| RenderError::LayerOptionNotFound {
            option_id: option_id.to_string(),
            layer_id: layer.id.clone(),
            suggestion: suggest(option_id, layer.options.iter().map(|o| o.id.as_str())),
        })
}

pub fn get_layer_option_from_flavor<'a>(
    layer_id: &str,
    option_id: &str,
    flavor: &'a Flavor,
) -> Result<&'a LayerOption> {
    let layer = get_layer(layer_id, flavor)?;
    get_layer_option(option_id, layer)
}

/// Options selected by the caller, in input order
pub fn selected_options<'a>(inputs: &ValuesInputs, flavor: &'a Flavor) -> Result<Vec<&'a LayerOption>> {
    inputs
        .layers
        .iter()
        .map(|input| get_layer_option_from_flavor(&input.layer_id, &input.option_id, flavor))
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use meshhub_core::{Flavor, Layer, LayerOption, Parameter, ParameterValue};

    pub fn option(id: &str, helm_values: &str) -> LayerOption {
        LayerOption {
            id: id.to_string(),
            helm_values: helm_values.to_string(),
            ..Default::default()
        }
    }

    pub fn layer(id: &str, optional: bool, options: Vec<LayerOption>) -> Layer {
        Layer {
            id: id.to_string(),
            optional,
            options,
            ..Default::default()
        }
    }

    pub fn parameter(name: &str, required: bool, default: Option<&str>) -> Parameter {
        Parameter {
            name: name.to_string(),
            required,
            default: default.map(|d| ParameterValue::StringValue(d.to_string())),
            ..Default::default()
        }
    }

    /// Flavor with a required `mtls` layer and an optional `ingress` layer
    pub fn flavor() -> Flavor {
        Flavor {
            name: "default".to_string(),
            customization_layers: vec![
                layer(
                    "mtls",
                    false,
                    vec![
                        option("enabled", "mtls:\n  enabled: true\n"),
                        option("disabled", "mtls:\n  enabled: false\n"),
                    ],
                ),
                layer("ingress", true, vec![option("gloo", "ingress: gloo\n")]),
            ],
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::flavor;
    use super::*;
    use meshhub_core::LayerInput;

    #[test]
    fn test_installed_flavor() {
        let flavors = vec![flavor()];
        assert_eq!(get_installed_flavor("default", &flavors).unwrap().name, "default");

        let err = get_installed_flavor("doesnotexist", &[]).unwrap_err();
        assert_eq!(err.to_string(), "expected at most 1 flavor, found 0");

        let err = get_installed_flavor("", &flavors).unwrap_err();
        assert_eq!(err.to_string(), "flavor name cannot be nil");

        let err = get_installed_flavor("defualt", &flavors).unwrap_err();
        assert!(matches!(
            &err,
            RenderError::FlavorNotFound { suggestion: Some(s), .. } if s == "default"
        ));
        assert!(err.to_string().starts_with("could not find flavor with name: defualt"));
    }

    #[test]
    fn test_required_layer_count() {
        assert_eq!(required_layer_count(&flavor()), 1);
        assert_eq!(required_layer_count(&Flavor::default()), 0);
    }

    #[test]
    fn test_layer_lookup() {
        let flavor = flavor();
        assert_eq!(
            get_layer_option_from_flavor("mtls", "disabled", &flavor)
                .unwrap()
                .id,
            "disabled"
        );

        let err = get_layer_option_from_flavor("tracing", "on", &flavor).unwrap_err();
        assert!(err.to_string().starts_with("Layer tracing not found for flavor default"));

        let err = get_layer_option_from_flavor("mtls", "maybe", &flavor).unwrap_err();
        assert!(err.to_string().starts_with("Layer option maybe not found for layer mtls"));
    }

    #[test]
    fn test_selected_options_keep_input_order() {
        let flavor = flavor();
        let inputs = ValuesInputs {
            layers: vec![
                LayerInput::new("ingress", "gloo"),
                LayerInput::new("mtls", "enabled"),
            ],
            ..Default::default()
        };
        let ids: Vec<_> = selected_options(&inputs, &flavor)
            .unwrap()
            .iter()
            .map(|o| o.id.as_str())
            .collect();
        assert_eq!(ids, vec!["gloo", "enabled"]);
    }
}
