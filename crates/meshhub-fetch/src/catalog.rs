//! Remote application catalogs

use meshhub_core::catalog::{specs_from_bytes, specs_from_directory};
use meshhub_core::{ApplicationSpec, GithubRepositoryLocation};
use tokio_util::sync::CancellationToken;

use crate::client::Fetcher;
use crate::error::{FetchError, Result};

/// Catalog served as a single `specs:` YAML bundle over HTTP
#[derive(Debug, Clone)]
pub struct RemoteSpecReader {
    fetcher: Fetcher,
    url: String,
}

impl RemoteSpecReader {
    pub fn new(fetcher: Fetcher, url: impl Into<String>) -> Self {
        let url = url.into();
        tracing::info!(url = %url, "initializing reader for remote application spec registry");
        Self { fetcher, url }
    }

    pub async fn get_specs(&self, cancel: &CancellationToken) -> Result<Vec<ApplicationSpec>> {
        let bytes = self.fetcher.fetch_bytes(&self.url, cancel).await?;
        specs_from_bytes(&bytes).map_err(FetchError::Catalog)
    }
}

/// Catalog stored as `<directory>/<app>/spec.yaml` in a GitHub repository
#[derive(Debug, Clone)]
pub struct GithubSpecReader {
    fetcher: Fetcher,
    location: GithubRepositoryLocation,
}

impl GithubSpecReader {
    pub fn new(fetcher: Fetcher, location: GithubRepositoryLocation) -> Self {
        tracing::info!(location = %location, "initializing reader for github spec registry");
        Self { fetcher, location }
    }

    pub async fn get_specs(&self, cancel: &CancellationToken) -> Result<Vec<ApplicationSpec>> {
        let scratch = tempfile::Builder::new().prefix("catalog").tempdir()?;
        let spec_parent = self
            .fetcher
            .download_github_repo(&self.location, scratch.path(), cancel)
            .await?;

        if !spec_parent.is_dir() {
            return Err(FetchError::LocalSource {
                path: spec_parent.display().to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "catalog directory not found in repository",
                ),
            });
        }
        Ok(specs_from_directory(&spec_parent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use meshhub_core::archive::create_archive;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_remote_spec_reader() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/specs.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "specs:\n- name: kiali\n  type: extension\n- name: istio\n  type: mesh\n",
            ))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(FetchConfig::default()).unwrap();
        let reader = RemoteSpecReader::new(fetcher, format!("{}/specs.yaml", server.uri()));
        let specs = reader.get_specs(&CancellationToken::new()).await.unwrap();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["kiali", "istio"]);
    }

    #[tokio::test]
    async fn test_remote_spec_reader_invalid_bundle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("specs: 12"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(FetchConfig::default()).unwrap();
        let reader = RemoteSpecReader::new(fetcher, server.uri());
        let err = reader.get_specs(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, FetchError::Catalog(_)));
    }

    #[tokio::test]
    async fn test_github_spec_reader() {
        let scratch = tempfile::tempdir().unwrap();
        let src = scratch.path().join("src");
        let app = src.join("solo-io-hub-abc123/extensions/v1/flagger");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::write(app.join("spec.yaml"), "name: flagger\n").unwrap();
        let tgz = scratch.path().join("hub.tgz");
        create_archive(&src, &tgz).unwrap();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/solo-io/hub/tarball/master"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(std::fs::read(&tgz).unwrap()))
            .mount(&server)
            .await;

        let fetcher =
            Fetcher::new(FetchConfig::default().with_github_api_url(server.uri())).unwrap();
        let reader = GithubSpecReader::new(
            fetcher,
            GithubRepositoryLocation {
                org: "solo-io".to_string(),
                repo: "hub".to_string(),
                git_ref: "master".to_string(),
                directory: "extensions/v1".to_string(),
            },
        );
        let specs = reader.get_specs(&CancellationToken::new()).await.unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "flagger");
    }
}
