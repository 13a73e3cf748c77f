//! Layer engine: overlay a kustomization on top of rendered manifests

use async_trait::async_trait;
use meshhub_core::resources::resources_to_yaml;
use meshhub_core::{Kustomize, Manifests};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::build::KustomizeBuilder;
use crate::error::Result;
use crate::fs::Filesystem;
use crate::loader::Loader;
use crate::plugins::{NamedPlugin, PluginLoader};

/// Produces the overlaid manifest stream for one layer
#[async_trait]
pub trait LayerEngine: Send + Sync {
    /// Run inside `dir`, an empty scratch directory owned by the caller
    async fn run(&self, dir: &Path, cancel: &CancellationToken) -> Result<String>;
}

pub struct Kustomizer {
    loader: Arc<dyn Loader>,
    fs: Arc<dyn Filesystem>,
    manifests: Manifests,
    overlay: Kustomize,
    plugins: PluginLoader,
}

impl Kustomizer {
    /// Fails when a plugin is neither a generator nor a transformer
    pub fn new(
        loader: Arc<dyn Loader>,
        fs: Arc<dyn Filesystem>,
        manifests: Manifests,
        overlay: Kustomize,
        plugins: Vec<Arc<dyn NamedPlugin>>,
    ) -> Result<Self> {
        Ok(Self {
            loader,
            fs,
            manifests,
            overlay,
            plugins: PluginLoader::new(plugins)?,
        })
    }
}

#[async_trait]
impl LayerEngine for Kustomizer {
    async fn run(&self, dir: &Path, cancel: &CancellationToken) -> Result<String> {
        let root = self
            .loader
            .retrieve_layers(dir, &self.overlay, cancel)
            .await?;
        self.loader.load_base(&self.manifests, &root)?;

        let overlay = root.join(&self.overlay.overlay_path);
        tracing::debug!(overlay = %overlay.display(), "building kustomize overlay");

        let resources = KustomizeBuilder::new(self.fs.as_ref(), &self.plugins).build(&overlay)?;
        Ok(resources_to_yaml(&resources)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KustomizeError;
    use crate::fs::OsFilesystem;
    use crate::loader::KustomizeLoader;
    use crate::plugins::ManifestRenderPlugin;
    use crate::plugins::test_plugins::IncorrectPlugin;
    use meshhub_core::archive::create_archive;
    use meshhub_core::resources::yaml_to_resources;
    use meshhub_core::{Manifest, ManifestRenderValues, ResourceRef, TgzLocation};
    use meshhub_fetch::{FetchConfig, Fetcher};
    use tempfile::TempDir;

    const CHART_MANIFEST: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: hello-world
  namespace: test
spec:
  replicas: 1
  template:
    spec:
      containers:
      - name: hello-world
        image: hello-world:1.0
"#;

    const RENDER_CONFIG: &str = r#"apiVersion: meshhub.solo.io/v1
kind: ManifestRender
metadata:
  name: mesh
manifest: |
  apiVersion: v1
  kind: ConfigMap
  metadata:
    name: {{ .MeshRef.Name }}
    namespace: {{ .InstallNamespace }}
  data:
    release: {{ .Name }}
"#;

    const PATCH: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: hello-world
  namespace: test
spec:
  replicas: 2
"#;

    /// Package overlay fixtures as a local tgz layer
    fn fixtures(scratch: &TempDir, overlay_path: &str) -> Kustomize {
        let src = scratch.path().join("fixtures");
        let files = [
            ("supergloo/kustomization.yaml", "bases:\n- ../base\ngenerators:\n- render.yaml\npatchesStrategicMerge:\n- patch.yaml\n"),
            ("supergloo/render.yaml", RENDER_CONFIG),
            ("supergloo/patch.yaml", PATCH),
            ("error/kustomization.yaml", "bases:\n- ../base\ngenerators:\n- render.yaml\n"),
            ("error/render.yaml", "apiVersion: meshhub.solo.io/v1\nkind: IncorrectName\nmetadata:\n  name: bad\n"),
        ];
        for (path, content) in files {
            let path = src.join(path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        let archive = create_archive(&src, &scratch.path().join("layer.tgz")).unwrap();

        Kustomize {
            overlay_path: overlay_path.to_string(),
            tgz_archive: Some(TgzLocation::new(archive.display().to_string())),
            ..Default::default()
        }
    }

    fn kustomizer(overlay: Kustomize, plugins: Vec<Arc<dyn NamedPlugin>>) -> Result<Kustomizer> {
        let fs: Arc<dyn Filesystem> = Arc::new(OsFilesystem);
        let loader = KustomizeLoader::new(Fetcher::new(FetchConfig::default()).unwrap(), fs.clone());
        let manifests = Manifests(vec![Manifest::new("deployment.yaml", CHART_MANIFEST)]);
        Kustomizer::new(Arc::new(loader), fs, manifests, overlay, plugins)
    }

    fn render_plugin() -> Arc<dyn NamedPlugin> {
        Arc::new(
            ManifestRenderPlugin::new(&ManifestRenderValues {
                name: "hello-world".to_string(),
                install_namespace: "test".to_string(),
                mesh_ref: ResourceRef::new("my-mesh", "supergloo-system"),
                ..Default::default()
            })
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_e2e() {
        let scratch = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let k = kustomizer(fixtures(&scratch, "supergloo"), vec![render_plugin()]).unwrap();

        let output = k.run(work.path(), &CancellationToken::new()).await.unwrap();
        assert!(!output.is_empty());

        let resources = yaml_to_resources(&output).unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].data["spec"]["replicas"], 2);
        assert_eq!(resources[1].metadata.name.as_deref(), Some("my-mesh"));
        assert_eq!(resources[1].data["data"]["release"], "hello-world");
    }

    #[tokio::test]
    async fn test_unknown_plugin_kind() {
        let scratch = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let k = kustomizer(fixtures(&scratch, "error"), vec![]).unwrap();

        let err = k.run(work.path(), &CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("was never loaded"));
    }

    #[tokio::test]
    async fn test_missing_overlay_path() {
        let scratch = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let k = kustomizer(fixtures(&scratch, "fails"), vec![]).unwrap();

        let err = k.run(work.path(), &CancellationToken::new()).await.unwrap_err();
        assert!(
            err.to_string().contains("fails: no such file or directory"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_incorrect_plugin() {
        let scratch = tempfile::tempdir().unwrap();
        let err = kustomizer(fixtures(&scratch, "fails"), vec![Arc::new(IncorrectPlugin)])
            .err()
            .unwrap();
        assert!(matches!(err, KustomizeError::InvalidPlugin { .. }));
        assert!(err.to_string().contains("invalid kustomize plugin"));
    }
}
