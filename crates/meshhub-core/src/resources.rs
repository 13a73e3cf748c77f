//! Unstructured Kubernetes resources
//!
//! Multi-document YAML streams are split, converted to JSON and decoded into
//! [`DynamicObject`]s. `*List` documents are flattened into their items.

use kube::core::DynamicObject;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::values::json_type_name;

/// Rendered resources, in manifest order
pub type UnstructuredResources = Vec<DynamicObject>;

/// Split a YAML stream on `---` document separators
///
/// Separator lines may carry a trailing comment (`--- # Source: x`).
pub fn split_documents(stream: &str) -> Vec<&str> {
    let mut documents = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in stream.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed.starts_with("--- ") {
            documents.push(&stream[start..offset]);
            start = offset + line.len();
        }
        offset += line.len();
    }
    documents.push(&stream[start..]);
    documents
}

/// A document holding only whitespace and comments
pub fn is_empty_manifest(document: &str) -> bool {
    document
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#'))
}

/// Parse a YAML stream into resources, skipping empty documents
pub fn yaml_to_resources(stream: &str) -> Result<UnstructuredResources> {
    let mut resources = Vec::new();
    for document in split_documents(stream) {
        if is_empty_manifest(document) {
            continue;
        }
        let value: JsonValue =
            serde_yaml::from_str(document).map_err(|e| CoreError::InvalidManifest {
                message: e.to_string(),
            })?;
        decode_into(value, &mut resources)?;
    }
    Ok(resources)
}

fn decode_into(value: JsonValue, resources: &mut UnstructuredResources) -> Result<()> {
    let JsonValue::Object(mut object) = value else {
        return Err(CoreError::InvalidManifest {
            message: format!(
                "expected a resource mapping, found {}",
                json_type_name(&value)
            ),
        });
    };

    let is_list = object
        .get("kind")
        .and_then(JsonValue::as_str)
        .is_some_and(|kind| kind.ends_with("List"));
    if is_list {
        if let Some(JsonValue::Array(items)) = object.remove("items") {
            for item in items {
                decode_into(item, resources)?;
            }
            return Ok(());
        }
    }

    object
        .entry("metadata")
        .or_insert_with(|| JsonValue::Object(Default::default()));
    let resource: DynamicObject = serde_json::from_value(JsonValue::Object(object))?;
    resources.push(resource);
    Ok(())
}

/// Serialize resources back into a YAML stream
pub fn resources_to_yaml(resources: &[DynamicObject]) -> Result<String> {
    let documents = resources
        .iter()
        .map(serde_yaml::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(documents.join("---\n"))
}

/// Keep only resources carrying every required label with the same value
///
/// With no required labels every resource passes through.
pub fn filter_by_labels(
    resources: UnstructuredResources,
    required: &BTreeMap<String, String>,
) -> UnstructuredResources {
    if required.is_empty() {
        return resources;
    }
    resources
        .into_iter()
        .filter(|resource| has_labels(resource, required))
        .collect()
}

fn has_labels(resource: &DynamicObject, required: &BTreeMap<String, String>) -> bool {
    let Some(labels) = &resource.metadata.labels else {
        return false;
    };
    required
        .iter()
        .all(|(key, value)| labels.get(key) == Some(value))
}

/// Set a label on a resource, creating the label map if needed
pub fn set_label(resource: &mut DynamicObject, key: &str, value: &str) {
    resource
        .metadata
        .labels
        .get_or_insert_with(BTreeMap::new)
        .insert(key.to_string(), value.to_string());
}

/// `kind/name` of a resource, for logs and manifest names
pub fn resource_id(resource: &DynamicObject) -> String {
    let kind = resource
        .types
        .as_ref()
        .map(|t| t.kind.as_str())
        .unwrap_or("Unknown");
    let name = resource.metadata.name.as_deref().unwrap_or("");
    format!("{kind}/{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = r#"
# leading comment
apiVersion: v1
kind: ServiceAccount
metadata:
  name: flagger
  labels:
    app: flagger
---
# Source: flagger/templates/empty.yaml
---
apiVersion: v1
kind: List
items:
- apiVersion: v1
  kind: ConfigMap
  metadata:
    name: one
- apiVersion: v1
  kind: ConfigMap
  metadata:
    name: two
    labels:
      app: flagger
--- # trailing document
apiVersion: apps/v1
kind: Deployment
metadata:
  name: flagger
spec:
  replicas: 1
"#;

    #[test]
    fn test_split_documents() {
        let docs = split_documents("a: 1\n---\nb: 2\n--- # c\nc: 3");
        assert_eq!(docs, vec!["a: 1\n", "b: 2\n", "c: 3"]);
    }

    #[test]
    fn test_yaml_to_resources() {
        let resources = yaml_to_resources(STREAM).unwrap();
        let ids: Vec<String> = resources.iter().map(resource_id).collect();
        assert_eq!(
            ids,
            vec![
                "ServiceAccount/flagger",
                "ConfigMap/one",
                "ConfigMap/two",
                "Deployment/flagger"
            ]
        );
        assert_eq!(resources[3].data["spec"]["replicas"], 1);
    }

    #[test]
    fn test_yaml_to_resources_invalid() {
        assert!(yaml_to_resources("just a string").is_err());
        assert!(yaml_to_resources("apiVersion: v1: 32\n").is_err());
    }

    #[test]
    fn test_missing_metadata() {
        let resources = yaml_to_resources("apiVersion: v1\nkind: Namespace\n").unwrap();
        assert_eq!(resources.len(), 1);
        assert!(resources[0].metadata.name.is_none());
    }

    #[test]
    fn test_filter_by_labels() {
        let resources = yaml_to_resources(STREAM).unwrap();
        let mut required = BTreeMap::new();
        required.insert("app".to_string(), "flagger".to_string());

        let filtered = filter_by_labels(resources.clone(), &required);
        let ids: Vec<String> = filtered.iter().map(resource_id).collect();
        assert_eq!(ids, vec!["ServiceAccount/flagger", "ConfigMap/two"]);

        let unfiltered = filter_by_labels(resources.clone(), &BTreeMap::new());
        assert_eq!(unfiltered.len(), resources.len());

        required.insert("app".to_string(), "other".to_string());
        assert!(filter_by_labels(resources, &required).is_empty());
    }

    #[test]
    fn test_set_label_and_serialize() {
        let mut resources = yaml_to_resources("apiVersion: v1\nkind: Namespace\nmetadata:\n  name: test\n").unwrap();
        set_label(&mut resources[0], "step", "crds");

        let yaml = resources_to_yaml(&resources).unwrap();
        let reparsed = yaml_to_resources(&yaml).unwrap();
        let labels = reparsed[0].metadata.labels.as_ref().unwrap();
        assert_eq!(labels.get("step").unwrap(), "crds");
    }
}
