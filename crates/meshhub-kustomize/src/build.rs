//! In-process kustomization build
//!
//! Supports the subset of kustomize that layer overlays rely on:
//! `resources`/`bases` (files or directories), plugin `generators`,
//! `patchesStrategicMerge`, `namespace`, `namePrefix`/`nameSuffix`,
//! `commonLabels`, `commonAnnotations` and plugin `transformers`, applied in
//! that order.

use kube::core::DynamicObject;
use meshhub_core::UnstructuredResources;
use meshhub_core::resources::{is_empty_manifest, resource_id, split_documents, yaml_to_resources};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::error::{KustomizeError, Result};
use crate::fs::Filesystem;
use crate::kustomization::Kustomization;
use crate::plugins::{PluginLoader, config_kind};

/// Kinds that never receive a namespace
const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "APIService",
    "ClusterRole",
    "ClusterRoleBinding",
    "CustomResourceDefinition",
    "MutatingWebhookConfiguration",
    "Namespace",
    "Node",
    "PersistentVolume",
    "PodSecurityPolicy",
    "PriorityClass",
    "StorageClass",
    "ValidatingWebhookConfiguration",
];

/// Kinds whose pod template and selector follow `commonLabels`
const WORKLOAD_KINDS: &[&str] = &[
    "DaemonSet",
    "Deployment",
    "Job",
    "ReplicaSet",
    "StatefulSet",
];

const PATCH_DIRECTIVE: &str = "$patch";

pub struct KustomizeBuilder<'a> {
    fs: &'a dyn Filesystem,
    plugins: &'a PluginLoader,
}

impl<'a> KustomizeBuilder<'a> {
    pub fn new(fs: &'a dyn Filesystem, plugins: &'a PluginLoader) -> Self {
        Self { fs, plugins }
    }

    /// Build the kustomization rooted at `path`
    pub fn build(&self, path: &Path) -> Result<UnstructuredResources> {
        let mut visiting = Vec::new();
        self.build_dir(&normalize(path), &mut visiting)
    }

    fn build_dir(&self, dir: &Path, visiting: &mut Vec<PathBuf>) -> Result<UnstructuredResources> {
        if !self.fs.exists(dir) {
            return Err(KustomizeError::MissingPath {
                path: dir.display().to_string(),
            });
        }
        if visiting.iter().any(|p| p == dir) {
            return Err(KustomizeError::CyclicReference {
                path: dir.display().to_string(),
            });
        }
        visiting.push(dir.to_path_buf());

        let (file, kustomization) = Kustomization::load(self.fs, dir)?;
        tracing::debug!(kustomization = %file.display(), "building kustomization");

        let mut resources = Vec::new();
        for entry in kustomization.resources.iter().chain(&kustomization.bases) {
            let path = normalize(&dir.join(entry));
            let loaded = if self.fs.is_dir(&path) {
                self.build_dir(&path, visiting)?
            } else {
                yaml_to_resources(&self.read(&path)?)?
            };
            append(&mut resources, loaded)?;
        }

        for entry in &kustomization.generators {
            for config in yaml_to_resources(&self.read(&dir.join(entry))?)? {
                let generator = self.plugins.load_generator(config_kind(&config))?;
                append(&mut resources, generator.generate(&config)?)?;
            }
        }

        for entry in &kustomization.patches_strategic_merge {
            for patch in read_documents(&self.read(&dir.join(entry))?)? {
                apply_patch(&mut resources, &patch)?;
            }
        }

        if let Some(namespace) = &kustomization.namespace {
            set_namespace(&mut resources, namespace);
        }
        if kustomization.name_prefix.is_some() || kustomization.name_suffix.is_some() {
            add_name_affixes(
                &mut resources,
                kustomization.name_prefix.as_deref().unwrap_or_default(),
                kustomization.name_suffix.as_deref().unwrap_or_default(),
            );
        }
        if !kustomization.common_labels.is_empty() {
            add_common_labels(&mut resources, &kustomization.common_labels)?;
        }
        if !kustomization.common_annotations.is_empty() {
            add_common_annotations(&mut resources, &kustomization.common_annotations)?;
        }

        for entry in &kustomization.transformers {
            for config in yaml_to_resources(&self.read(&dir.join(entry))?)? {
                let transformer = self.plugins.load_transformer(config_kind(&config))?;
                transformer.transform(&config, &mut resources)?;
            }
        }

        visiting.pop();
        Ok(resources)
    }

    fn read(&self, path: &Path) -> Result<String> {
        let path = normalize(path);
        self.fs
            .read_to_string(&path)
            .map_err(|e| KustomizeError::io(&path, e))
    }
}

/// Resolve `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn read_documents(stream: &str) -> Result<Vec<JsonValue>> {
    split_documents(stream)
        .into_iter()
        .filter(|doc| !is_empty_manifest(doc))
        .map(|doc| serde_yaml::from_str(doc).map_err(KustomizeError::from))
        .collect()
}

/// Group, kind/name and namespace; the API version within a group does not matter
fn identity(resource: &DynamicObject) -> (&str, String, Option<&str>) {
    (
        group_of(resource),
        resource_id(resource),
        resource.metadata.namespace.as_deref(),
    )
}

/// API group of an `apiVersion`, empty for the core group
fn api_group(api_version: &str) -> &str {
    api_version
        .rsplit_once('/')
        .map(|(group, _)| group)
        .unwrap_or("")
}

fn group_of(resource: &DynamicObject) -> &str {
    resource
        .types
        .as_ref()
        .map(|t| api_group(&t.api_version))
        .unwrap_or("")
}

fn append(resources: &mut UnstructuredResources, added: UnstructuredResources) -> Result<()> {
    for resource in added {
        if resources.iter().any(|r| identity(r) == identity(&resource)) {
            return Err(KustomizeError::DuplicateResource {
                id: resource_id(&resource),
            });
        }
        resources.push(resource);
    }
    Ok(())
}

fn kind_of(resource: &DynamicObject) -> &str {
    resource.types.as_ref().map(|t| t.kind.as_str()).unwrap_or("")
}

fn apply_patch(resources: &mut UnstructuredResources, patch: &JsonValue) -> Result<()> {
    let kind = patch["kind"].as_str().unwrap_or_default();
    let name = patch["metadata"]["name"].as_str().unwrap_or_default();
    let namespace = patch["metadata"]["namespace"].as_str();
    let group = patch["apiVersion"].as_str().map(api_group);
    let id = format!("{kind}/{name}");

    let index = resources
        .iter()
        .position(|r| {
            kind_of(r) == kind
                && r.metadata.name.as_deref() == Some(name)
                && group.is_none_or(|g| group_of(r) == g)
                && namespace.is_none_or(|ns| r.metadata.namespace.as_deref() == Some(ns))
        })
        .ok_or(KustomizeError::PatchTargetNotFound { id: id.clone() })?;

    if patch[PATCH_DIRECTIVE] == "delete" {
        tracing::debug!(resource = %id, "deleting resource by patch");
        resources.remove(index);
        return Ok(());
    }

    let mut target = serde_json::to_value(&resources[index])?;
    merge(&mut target, patch);
    resources[index] = serde_json::from_value(target)?;
    Ok(())
}

/// Strategic merge of `patch` into `target`
///
/// Maps merge recursively and `null` removes a key. Lists whose items all
/// carry a `name` merge item by item; `$patch: delete` on an item removes it.
/// Any other value replaces the target.
fn merge(target: &mut JsonValue, patch: &JsonValue) {
    match (target, patch) {
        (JsonValue::Object(target), JsonValue::Object(patch)) => {
            for (key, value) in patch {
                if key == PATCH_DIRECTIVE {
                    continue;
                }
                if value.is_null() {
                    target.remove(key);
                } else if let Some(existing) = target.get_mut(key) {
                    merge(existing, value);
                } else {
                    target.insert(key.clone(), strip_directives(value));
                }
            }
        }
        (JsonValue::Array(target), JsonValue::Array(patch)) if is_named_list(patch) => {
            for item in patch {
                let name = &item["name"];
                let position = target.iter().position(|existing| &existing["name"] == name);
                match position {
                    Some(i) if item[PATCH_DIRECTIVE] == "delete" => {
                        target.remove(i);
                    }
                    Some(i) => merge(&mut target[i], item),
                    None if item[PATCH_DIRECTIVE] == "delete" => {}
                    None => target.push(strip_directives(item)),
                }
            }
        }
        (target, patch) => *target = strip_directives(patch),
    }
}

fn is_named_list(items: &[JsonValue]) -> bool {
    !items.is_empty() && items.iter().all(|item| item["name"].is_string())
}

fn strip_directives(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => JsonValue::Object(
            map.iter()
                .filter(|(key, _)| key.as_str() != PATCH_DIRECTIVE)
                .map(|(key, value)| (key.clone(), strip_directives(value)))
                .collect(),
        ),
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(strip_directives).collect()),
        other => other.clone(),
    }
}

fn set_namespace(resources: &mut UnstructuredResources, namespace: &str) {
    for resource in resources.iter_mut() {
        if !CLUSTER_SCOPED_KINDS.contains(&kind_of(resource)) {
            resource.metadata.namespace = Some(namespace.to_string());
        }
    }
}

fn add_name_affixes(resources: &mut UnstructuredResources, prefix: &str, suffix: &str) {
    for resource in resources.iter_mut() {
        if kind_of(resource) == "CustomResourceDefinition" {
            continue;
        }
        if let Some(name) = &resource.metadata.name {
            resource.metadata.name = Some(format!("{prefix}{name}{suffix}"));
        }
    }
}

fn add_common_labels(
    resources: &mut UnstructuredResources,
    labels: &BTreeMap<String, String>,
) -> Result<()> {
    for resource in resources.iter_mut() {
        resource
            .metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .extend(labels.clone());

        let kind = kind_of(resource).to_string();
        if WORKLOAD_KINDS.contains(&kind.as_str()) {
            let spec = object_at(&mut resource.data, &["spec"])?;
            insert_all(object_at(spec, &["selector", "matchLabels"])?, labels);
            insert_all(object_at(spec, &["template", "metadata", "labels"])?, labels);
        } else if kind == "Service" {
            insert_all(object_at(&mut resource.data, &["spec", "selector"])?, labels);
        }
    }
    Ok(())
}

fn add_common_annotations(
    resources: &mut UnstructuredResources,
    annotations: &BTreeMap<String, String>,
) -> Result<()> {
    for resource in resources.iter_mut() {
        resource
            .metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .extend(annotations.clone());

        if WORKLOAD_KINDS.contains(&kind_of(resource)) {
            let template = object_at(&mut resource.data, &["spec", "template", "metadata"])?;
            insert_all(object_at(template, &["annotations"])?, annotations);
        }
    }
    Ok(())
}

/// The object at `path` under `value`, created when absent
fn object_at<'v>(value: &'v mut JsonValue, path: &[&str]) -> Result<&'v mut JsonValue> {
    let mut current = value;
    for key in path {
        let map = as_object(current)?;
        current = map
            .entry(key.to_string())
            .or_insert_with(|| JsonValue::Object(Map::new()));
    }
    as_object(current)?;
    Ok(current)
}

fn as_object(value: &mut JsonValue) -> Result<&mut Map<String, JsonValue>> {
    if value.is_null() {
        *value = JsonValue::Object(Map::new());
    }
    value.as_object_mut().ok_or_else(|| {
        KustomizeError::Core(meshhub_core::CoreError::InvalidManifest {
            message: "expected a mapping while applying common metadata".to_string(),
        })
    })
}

fn insert_all(target: &mut JsonValue, entries: &BTreeMap<String, String>) {
    if let Some(map) = target.as_object_mut() {
        for (key, value) in entries {
            map.insert(key.clone(), JsonValue::String(value.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::OsFilesystem;
    use crate::plugins::test_plugins::{ConfigMapGenerator, LabelTransformer};
    use std::sync::Arc;

    const DEPLOYMENT: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  replicas: 1
  template:
    spec:
      containers:
      - name: web
        image: web:1
      - name: sidecar
        image: proxy:1
"#;

    const SERVICE: &str = r#"apiVersion: v1
kind: Service
metadata:
  name: web
spec:
  ports:
  - port: 80
"#;

    fn write(root: &Path, path: &str, content: &str) {
        let path = root.join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn build(root: &Path, overlay: &str) -> Result<UnstructuredResources> {
        let plugins =
            PluginLoader::new(vec![Arc::new(ConfigMapGenerator), Arc::new(LabelTransformer)])
                .unwrap();
        KustomizeBuilder::new(&OsFilesystem, &plugins).build(&root.join(overlay))
    }

    fn base(root: &Path) {
        write(root, "base/resource.yaml", &format!("{DEPLOYMENT}---\n{SERVICE}"));
        write(root, "base/kustomization.yaml", "resources:\n- resource.yaml\n");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Path::new("/tmp/x/overlay/../base/./resource.yaml")),
            PathBuf::from("/tmp/x/base/resource.yaml")
        );
    }

    #[test]
    fn test_missing_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let err = build(dir.path(), "fails").unwrap_err();
        assert!(err.to_string().ends_with("fails: no such file or directory"));
    }

    #[test]
    fn test_base_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        base(dir.path());
        write(dir.path(), "overlay/kustomization.yaml", "bases:\n- ../base\n");

        let resources = build(dir.path(), "overlay").unwrap();
        let ids: Vec<_> = resources.iter().map(resource_id).collect();
        assert_eq!(ids, vec!["Deployment/web", "Service/web"]);
    }

    #[test]
    fn test_strategic_merge_patch() {
        let dir = tempfile::tempdir().unwrap();
        base(dir.path());
        write(
            dir.path(),
            "overlay/kustomization.yaml",
            "resources:\n- ../base\npatchesStrategicMerge:\n- patch.yaml\n",
        );
        write(
            dir.path(),
            "overlay/patch.yaml",
            r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  replicas: 3
  template:
    spec:
      containers:
      - name: web
        image: web:2
      - name: sidecar
        $patch: delete
---
apiVersion: v1
kind: Service
metadata:
  name: web
$patch: delete
"#,
        );

        let resources = build(dir.path(), "overlay").unwrap();
        assert_eq!(resources.len(), 1);
        let spec = &resources[0].data["spec"];
        assert_eq!(spec["replicas"], 3);
        let containers = spec["template"]["spec"]["containers"].as_array().unwrap();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0]["image"], "web:2");
    }

    #[test]
    fn test_patch_without_target() {
        let dir = tempfile::tempdir().unwrap();
        base(dir.path());
        write(
            dir.path(),
            "overlay/kustomization.yaml",
            "resources:\n- ../base\npatchesStrategicMerge:\n- patch.yaml\n",
        );
        write(
            dir.path(),
            "overlay/patch.yaml",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: nope\n",
        );

        let err = build(dir.path(), "overlay").unwrap_err();
        assert!(matches!(err, KustomizeError::PatchTargetNotFound { .. }));
    }

    #[test]
    fn test_builtin_transforms() {
        let dir = tempfile::tempdir().unwrap();
        base(dir.path());
        write(
            dir.path(),
            "overlay/kustomization.yaml",
            r#"resources:
- ../base
- namespace.yaml
namespace: mesh
namePrefix: dev-
commonLabels:
  app: web
commonAnnotations:
  owner: team
"#,
        );
        write(
            dir.path(),
            "overlay/namespace.yaml",
            "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: mesh\n",
        );

        let resources = build(dir.path(), "overlay").unwrap();
        let deployment = &resources[0];
        assert_eq!(deployment.metadata.name.as_deref(), Some("dev-web"));
        assert_eq!(deployment.metadata.namespace.as_deref(), Some("mesh"));
        assert_eq!(
            deployment.metadata.labels.as_ref().unwrap().get("app").unwrap(),
            "web"
        );
        assert_eq!(deployment.data["spec"]["selector"]["matchLabels"]["app"], "web");
        assert_eq!(deployment.data["spec"]["template"]["metadata"]["labels"]["app"], "web");
        assert_eq!(
            deployment.data["spec"]["template"]["metadata"]["annotations"]["owner"],
            "team"
        );

        let service = &resources[1];
        assert_eq!(service.data["spec"]["selector"]["app"], "web");

        let namespace = &resources[2];
        assert_eq!(namespace.metadata.namespace, None);
    }

    #[test]
    fn test_plugins() {
        let dir = tempfile::tempdir().unwrap();
        base(dir.path());
        write(
            dir.path(),
            "overlay/kustomization.yaml",
            "resources:\n- ../base\ngenerators:\n- gen.yaml\ntransformers:\n- tr.yaml\n",
        );
        write(
            dir.path(),
            "overlay/gen.yaml",
            "apiVersion: test/v1\nkind: ConfigMapMaker\nmetadata:\n  name: gen\nspec:\n  name: settings\n",
        );
        write(
            dir.path(),
            "overlay/tr.yaml",
            "apiVersion: test/v1\nkind: Labeler\nmetadata:\n  name: tr\nspec:\n  key: tier\n  value: edge\n",
        );

        let resources = build(dir.path(), "overlay").unwrap();
        assert_eq!(resources.len(), 3);
        assert_eq!(resource_id(&resources[2]), "ConfigMap/settings");
        assert!(resources.iter().all(|r| {
            r.metadata.labels.as_ref().and_then(|l| l.get("tier")).map(String::as_str)
                == Some("edge")
        }));
    }

    #[test]
    fn test_unknown_plugin_kind() {
        let dir = tempfile::tempdir().unwrap();
        base(dir.path());
        write(
            dir.path(),
            "overlay/kustomization.yaml",
            "resources:\n- ../base\ngenerators:\n- gen.yaml\n",
        );
        write(
            dir.path(),
            "overlay/gen.yaml",
            "apiVersion: test/v1\nkind: IncorrectName\nmetadata:\n  name: gen\n",
        );

        let err = build(dir.path(), "overlay").unwrap_err();
        assert!(err.to_string().contains("was never loaded"));
    }

    #[test]
    fn test_duplicate_resources() {
        let dir = tempfile::tempdir().unwrap();
        base(dir.path());
        write(
            dir.path(),
            "overlay/kustomization.yaml",
            "resources:\n- ../base\n- ../base/resource.yaml\n",
        );

        let err = build(dir.path(), "overlay").unwrap_err();
        assert_eq!(
            err.to_string(),
            "may not add resource with an already registered id: Deployment/web"
        );
    }

    #[test]
    fn test_same_kind_and_name_in_different_groups() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "base/kustomization.yaml", "resources:\n- gateways.yaml\n");
        write(
            dir.path(),
            "base/gateways.yaml",
            r#"apiVersion: networking.istio.io/v1beta1
kind: Gateway
metadata:
  name: ingress
spec:
  selector:
    istio: ingressgateway
---
apiVersion: gateway.networking.k8s.io/v1
kind: Gateway
metadata:
  name: ingress
spec:
  gatewayClassName: istio
"#,
        );
        write(
            dir.path(),
            "overlay/kustomization.yaml",
            "resources:\n- ../base\npatchesStrategicMerge:\n- patch.yaml\n",
        );
        write(
            dir.path(),
            "overlay/patch.yaml",
            "apiVersion: gateway.networking.k8s.io/v1\nkind: Gateway\nmetadata:\n  name: ingress\nspec:\n  gatewayClassName: mesh\n",
        );

        let resources = build(dir.path(), "overlay").unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].data["spec"]["selector"]["istio"], "ingressgateway");
        assert!(resources[0].data["spec"].get("gatewayClassName").is_none());
        assert_eq!(resources[1].data["spec"]["gatewayClassName"], "mesh");
    }

    #[test]
    fn test_api_group() {
        assert_eq!(api_group("v1"), "");
        assert_eq!(api_group("apps/v1"), "apps");
        assert_eq!(api_group("networking.istio.io/v1beta1"), "networking.istio.io");
    }

    #[test]
    fn test_cycle() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a/kustomization.yaml", "bases:\n- ../b\n");
        write(dir.path(), "b/kustomization.yaml", "bases:\n- ../a\n");

        let err = build(dir.path(), "a").unwrap_err();
        assert!(matches!(err, KustomizeError::CyclicReference { .. }));
    }
}
