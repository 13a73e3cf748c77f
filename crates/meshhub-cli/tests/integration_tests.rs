//! Integration tests for CLI commands

use meshhub_core::archive::create_archive;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to run the meshhub binary
fn meshhub(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_meshhub"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute meshhub")
}

fn catalog_path() -> String {
    format!("{}/../../fixtures/catalog", env!("CARGO_MANIFEST_DIR"))
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let path = root.join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
}

/// Catalog with a `demo` application backed by local manifest and overlay archives
fn demo_catalog() -> (TempDir, PathBuf) {
    let scratch = TempDir::new().unwrap();

    write_files(
        &scratch.path().join("manifests-src"),
        &[
            (
                "manifests/deployment.yaml",
                "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: demo\n  namespace: demo-system\n  labels:\n    app: demo\nspec:\n  replicas: 1\n",
            ),
            (
                "manifests/service.yaml",
                "apiVersion: v1\nkind: Service\nmetadata:\n  name: demo\n  namespace: demo-system\n  labels:\n    app: demo\n",
            ),
        ],
    );
    let manifests = create_archive(
        &scratch.path().join("manifests-src"),
        &scratch.path().join("manifests.tgz"),
    )
    .unwrap();

    write_files(
        &scratch.path().join("overlay-src"),
        &[
            (
                "ha/kustomization.yaml",
                "bases:\n- ../base\ngenerators:\n- render.yaml\npatchesStrategicMerge:\n- patch.yaml\n",
            ),
            (
                "ha/render.yaml",
                "apiVersion: meshhub.solo.io/v1\nkind: ManifestRender\nmetadata:\n  name: settings\nmanifest: |\n  apiVersion: v1\n  kind: ConfigMap\n  metadata:\n    name: {{ .Name }}-settings\n    namespace: {{ .InstallNamespace }}\n    labels:\n      app: demo\n  data:\n    zones: \"{{ .Custom.zones }}\"\n",
            ),
            (
                "ha/patch.yaml",
                "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: demo\n  namespace: demo-system\nspec:\n  replicas: 3\n",
            ),
        ],
    );
    let overlay = create_archive(
        &scratch.path().join("overlay-src"),
        &scratch.path().join("overlay.tgz"),
    )
    .unwrap();

    let spec = format!(
        r#"name: demo
versions:
- version: 0.1.0
  manifestsArchive:
    uri: {manifests}
  requiredLabels:
    app: demo
  flavors:
  - name: default
    customizationLayers:
    - id: topology
      optional: true
      options:
      - id: ha
        kustomize:
          overlayPath: ha
          tgzArchive:
            uri: {overlay}
        parameters:
        - name: zones
          default:
            stringValue: "2"
"#,
        manifests = manifests.display(),
        overlay = overlay.display(),
    );
    let catalog = scratch.path().join("catalog");
    write_files(&catalog, &[("demo/spec.yaml", &spec)]);

    (scratch, catalog)
}

mod list_command {
    use super::*;

    #[test]
    fn test_list_catalog() {
        let output = meshhub(&["list", "--catalog", &catalog_path()]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let out = stdout(&output);
        assert!(out.contains("istio"));
        assert!(out.contains("kiali"));
        let newest = out.find("1.1.0").unwrap();
        let oldest = out.find("1.0.9").unwrap();
        assert!(newest < oldest, "versions should be listed highest first");
    }

    #[test]
    fn test_list_json() {
        let output = meshhub(&["list", "--catalog", &catalog_path(), "--json"]);
        assert!(output.status.success());

        let json: serde_json::Value =
            serde_json::from_str(&stdout(&output)).expect("Output should be valid JSON");
        let apps = json.as_array().unwrap();
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0]["name"], "istio");
        assert_eq!(apps[0]["versions"][0]["version"], "1.1.0");
        assert_eq!(apps[0]["versions"][0]["flavors"][1], "lite");
    }

    #[test]
    fn test_list_catalog_bundle() {
        let scratch = TempDir::new().unwrap();
        let bundle = scratch.path().join("specs.yaml");
        std::fs::write(
            &bundle,
            "specs:\n- name: gloo\n  versions:\n  - version: 1.2.0\n    flavors:\n    - name: vanilla\n",
        )
        .unwrap();

        let output = meshhub(&["list", "--catalog-url", bundle.to_str().unwrap(), "--json"]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
        assert_eq!(json[0]["name"], "gloo");
        assert_eq!(json[0]["versions"][0]["flavors"][0], "vanilla");
    }

    #[test]
    fn test_list_single_catalog_source() {
        let output = meshhub(&[
            "list",
            "--catalog",
            &catalog_path(),
            "--catalog-url",
            "https://example.com/specs.yaml",
        ]);
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_list_missing_catalog() {
        let output = meshhub(&["list", "--catalog", "/nonexistent/catalog"]);
        assert_eq!(output.status.code(), Some(4));
        assert!(stderr(&output).contains("is not a directory"));
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn test_validate_valid_selection() {
        let catalog = catalog_path();
        let output = meshhub(&[
            "validate", "--catalog", &catalog, "-a", "istio", "--flavor", "default", "--layer",
            "mtls=strict",
        ]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let out = stdout(&output);
        assert!(out.contains("istio 1.1.0 is valid"));
        assert!(out.contains("layer mtls: strict"));
        assert!(out.contains("param global.controlPlaneSecurityEnabled=true"));
    }

    #[test]
    fn test_validate_missing_required_layer() {
        let catalog = catalog_path();
        let output = meshhub(&[
            "validate", "--catalog", &catalog, "-a", "istio", "--flavor", "default", "--layer",
            "tracing=jaeger",
        ]);
        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("missing input for required layer mtls"));
    }

    #[test]
    fn test_validate_option_typo_has_hint() {
        let catalog = catalog_path();
        let output = meshhub(&[
            "validate", "--catalog", &catalog, "-a", "istio", "--flavor", "default", "--layer",
            "mtls=stirct",
        ]);
        assert_eq!(output.status.code(), Some(2));
        let err = stderr(&output);
        assert!(err.contains("Layer option stirct not found for layer mtls"));
        assert!(err.contains("did you mean 'strict'?"));
    }

    #[test]
    fn test_validate_unrecognized_parameter() {
        let catalog = catalog_path();
        let output = meshhub(&[
            "validate", "--catalog", &catalog, "-a", "istio", "--flavor", "default", "--layer",
            "mtls=permissive", "--set", "global.tga=1.1.1",
        ]);
        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("unrecognized parameter global.tga"));
    }

    #[test]
    fn test_validate_flavor_required() {
        let catalog = catalog_path();
        let output = meshhub(&["validate", "--catalog", &catalog, "-a", "istio"]);
        assert_eq!(output.status.code(), Some(64));
        assert!(stderr(&output).contains("--flavor is required"));
    }

    #[test]
    fn test_validate_required_parameter() {
        let catalog = catalog_path();
        let output = meshhub(&["validate", "--catalog", &catalog, "-a", "kiali"]);
        assert_eq!(output.status.code(), Some(2));
        assert!(
            stderr(&output).contains("missing input for required parameter kiali.dashboard.username")
        );

        let output = meshhub(&[
            "validate", "--catalog", &catalog, "-a", "kiali", "--set",
            "kiali.dashboard.username=admin",
        ]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert!(stdout(&output).contains("kiali v0.16.2 is valid"));
    }

    #[test]
    fn test_validate_without_catalog() {
        let output = meshhub(&["validate", "-a", "istio"]);
        assert_eq!(output.status.code(), Some(64));
    }
}

mod render_command {
    use super::*;

    #[test]
    fn test_render_manifests_archive() {
        let (_scratch, catalog) = demo_catalog();
        let output = meshhub(&[
            "render",
            "--catalog",
            catalog.to_str().unwrap(),
            "-a",
            "demo",
        ]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let out = stdout(&output);
        assert!(out.contains("kind: Deployment"));
        assert!(out.contains("kind: Service"));
        assert!(out.contains("replicas: 1"));
        assert!(!out.contains("kind: ConfigMap"));
    }

    #[test]
    fn test_render_with_overlay() {
        let (_scratch, catalog) = demo_catalog();
        let output = meshhub(&[
            "render",
            "--catalog",
            catalog.to_str().unwrap(),
            "-a",
            "demo",
            "--name",
            "shop",
            "--namespace",
            "shop-system",
            "--layer",
            "topology=ha",
            "--set",
            "zones=3",
        ]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let out = stdout(&output);
        assert!(out.contains("replicas: 3"));
        assert!(out.contains("name: shop-settings"));
        assert!(out.contains("namespace: shop-system"));
        assert!(out.contains("zones: '3'") || out.contains("zones: \"3\""));
    }

    #[test]
    fn test_render_install_spec_round_trip() {
        let (scratch, catalog) = demo_catalog();
        let spec_file = scratch.path().join("install-spec.yaml");
        let manifest_file = scratch.path().join("manifest.yaml");

        let output = meshhub(&[
            "render",
            "--catalog",
            catalog.to_str().unwrap(),
            "-a",
            "demo",
            "--layer",
            "topology=ha",
            "--save-install-spec",
            spec_file.to_str().unwrap(),
            "--manifest-file",
            manifest_file.to_str().unwrap(),
        ]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let first = std::fs::read_to_string(&manifest_file).unwrap();
        assert!(first.contains("zones: '2'") || first.contains("zones: \"2\""));

        let output = meshhub(&["render", "-i", spec_file.to_str().unwrap()]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert_eq!(stdout(&output), first);
    }

    /// Catalog with one application rendered from a (dummy) Helm archive
    fn charted_catalog(scratch: &Path) -> PathBuf {
        let chart = scratch.join("chart.tgz");
        std::fs::write(&chart, b"").unwrap();
        let spec = format!(
            "name: charted\nversions:\n- version: 1.0.0\n  helmArchive:\n    uri: {}\n  flavors:\n  - name: default\n",
            chart.display()
        );
        let catalog = scratch.join("catalog");
        write_files(&catalog, &[("charted/spec.yaml", &spec)]);
        catalog
    }

    #[test]
    fn test_render_helm_bin_from_env() {
        let scratch = TempDir::new().unwrap();
        let catalog = charted_catalog(scratch.path());

        let output = Command::new(env!("CARGO_BIN_EXE_meshhub"))
            .args(["render", "--catalog", catalog.to_str().unwrap(), "-a", "charted"])
            .env_remove("RUST_LOG")
            .env("MESHHUB_HELM_BIN", "/nonexistent/env-helm")
            .output()
            .expect("Failed to execute meshhub");
        assert_eq!(output.status.code(), Some(3));
        assert!(stderr(&output).contains("failed to run '/nonexistent/env-helm'"));
    }

    #[test]
    fn test_render_missing_helm() {
        let scratch = TempDir::new().unwrap();
        let catalog = charted_catalog(scratch.path());

        let output = meshhub(&[
            "render",
            "--catalog",
            catalog.to_str().unwrap(),
            "-a",
            "charted",
            "--helm-bin",
            "/nonexistent/helm",
        ]);
        assert_eq!(output.status.code(), Some(3));
        let err = stderr(&output);
        assert!(err.contains("error rendering manifests from"));
        assert!(err.contains("failed to run '/nonexistent/helm'"));
    }

    #[test]
    fn test_render_unknown_application() {
        let output = meshhub(&["render", "--catalog", &catalog_path(), "-a", "linkerd"]);
        assert_eq!(output.status.code(), Some(4));
        let err = stderr(&output);
        assert!(err.contains("application linkerd not found"));
        assert!(err.contains("istio, kiali"));
    }
}
