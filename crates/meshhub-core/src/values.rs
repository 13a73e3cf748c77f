//! Values handling with precedence-ordered coalescing
//!
//! Nested values are plain JSON-like maps. Several layers of overrides are
//! merged with [`coalesce`], where the overrides side always wins.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::strvals;

/// Nested key/value mapping used for chart values
pub type NestedMap = Map<String, JsonValue>;

/// Values container with coalescing support
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub NestedMap);

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(NestedMap::new())
    }

    /// Load values from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse values from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        yaml_string_to_nested_map(yaml).map(Self)
    }

    /// Coalesce `overrides` on top of these values
    pub fn coalesce(self, overrides: Values) -> Self {
        Self(coalesce(self.0, overrides.0))
    }

    /// Get a value by dotted path
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        parts.try_fold(self.0.get(first)?, |value, key| value.get(key))
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serialize to YAML; empty values serialize to an empty string
    pub fn to_yaml(&self) -> Result<String> {
        nested_map_to_yaml(&self.0)
    }
}

/// Merge `overrides` into `initial`, with `overrides` taking precedence
///
/// Rules:
/// - Map over map: recursive merge
/// - Map over scalar, or scalar over map: the override wins, conflict is logged
/// - Keys only present in `initial` are kept untouched
/// - Lists are treated as scalars
pub fn coalesce(initial: NestedMap, overrides: NestedMap) -> NestedMap {
    let mut merged = initial;
    coalesce_into(&mut merged, overrides, "");
    merged
}

fn coalesce_into(dst: &mut NestedMap, overrides: NestedMap, prefix: &str) {
    for (key, value) in overrides {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        match dst.get_mut(&key) {
            None => {
                dst.insert(key, value);
            }
            Some(existing) => match (existing, value) {
                (JsonValue::Object(inner), JsonValue::Object(table)) => {
                    coalesce_into(inner, table, &path);
                }
                (existing, value) => {
                    if existing.is_object() {
                        tracing::warn!(
                            key = %path,
                            table = %existing,
                            value = %value,
                            "coalescing value into table, table replaced by scalar"
                        );
                    } else if value.is_object() {
                        tracing::warn!(
                            key = %path,
                            value = %existing,
                            table = %value,
                            "coalescing table into value, scalar replaced by table"
                        );
                    }
                    *existing = value;
                }
            },
        }
    }
}

/// Convert flat dotted-key parameters into one nested map
///
/// Each `key`/`value` pair is parsed as the assignment `key=value`.
pub fn params_to_nested_map<'a, I>(params: I) -> Result<NestedMap>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut nested = NestedMap::new();
    for (key, value) in params {
        let assignment = format!("{key}={value}");
        strvals::parse_into(&assignment, &mut nested).map_err(|e| {
            CoreError::UnableToParseParameter {
                key: key.clone(),
                value: value.clone(),
                message: e.message,
            }
        })?;
    }
    Ok(nested)
}

/// Parse a YAML document into a nested map
///
/// Empty input yields an empty map. A document that is not a mapping is an error.
pub fn yaml_string_to_nested_map(yaml: &str) -> Result<NestedMap> {
    let parse_error = |message: String| CoreError::UnableToParseYaml {
        input: yaml.to_string(),
        message,
    };

    if yaml.trim().is_empty() {
        return Ok(NestedMap::new());
    }

    let value: JsonValue = serde_yaml::from_str(yaml).map_err(|e| parse_error(e.to_string()))?;
    match value {
        JsonValue::Object(map) => Ok(map),
        JsonValue::Null => Ok(NestedMap::new()),
        other => Err(parse_error(format!(
            "expected a mapping, found {}",
            json_type_name(&other)
        ))),
    }
}

/// Serialize a nested map to YAML with sorted keys
///
/// An empty map serializes to an empty string, never `{}` or `null`.
pub fn nested_map_to_yaml(map: &NestedMap) -> Result<String> {
    if map.is_empty() {
        return Ok(String::new());
    }
    let sorted = sorted_map(map);
    serde_yaml::to_string(&sorted).map_err(|e| CoreError::UnableToMarshalYaml {
        message: e.to_string(),
    })
}

/// Key-sorted mirror of a JSON value, so output does not depend on map ordering
#[derive(Serialize)]
#[serde(untagged)]
enum Sorted<'a> {
    Map(BTreeMap<&'a str, Sorted<'a>>),
    List(Vec<Sorted<'a>>),
    Leaf(&'a JsonValue),
}

fn sorted_map(map: &NestedMap) -> BTreeMap<&str, Sorted<'_>> {
    map.iter().map(|(k, v)| (k.as_str(), sorted(v))).collect()
}

fn sorted(value: &JsonValue) -> Sorted<'_> {
    match value {
        JsonValue::Object(map) => Sorted::Map(sorted_map(map)),
        JsonValue::Array(list) => Sorted::List(list.iter().map(sorted).collect()),
        leaf => Sorted::Leaf(leaf),
    }
}

pub(crate) fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "sequence",
        JsonValue::Object(_) => "mapping",
    }
}
