//! Cancellable retrieval of remote and local sources
//!
//! A source URI is either an `http(s)://` URL, a `file://` URL or a plain
//! filesystem path. Every request races the caller's cancellation token.

use meshhub_core::archive;
use meshhub_core::{CoreError, GithubRepositoryLocation};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::FetchConfig;
use crate::error::{FetchError, Result};

/// Run `fut` unless `cancel` fires first
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FetchError::Cancelled),
        result = fut => result,
    }
}

/// Where a source URI points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Remote(Url),
    Local(PathBuf),
}

impl SourceLocation {
    pub fn parse(uri: &str) -> Result<Self> {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            let url = Url::parse(uri).map_err(|e| FetchError::InvalidUrl {
                url: uri.to_string(),
                reason: e.to_string(),
            })?;
            return Ok(SourceLocation::Remote(url));
        }
        if let Some(path) = uri.strip_prefix("file://") {
            return Ok(SourceLocation::Local(PathBuf::from(path)));
        }
        if uri.is_empty() {
            return Err(FetchError::InvalidUrl {
                url: String::new(),
                reason: "empty location".to_string(),
            });
        }
        Ok(SourceLocation::Local(PathBuf::from(uri)))
    }
}

/// HTTP client for charts, archives and catalogs
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::NetworkError {
                message: e.to_string(),
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Read the full content behind `uri`
    pub async fn fetch_bytes(&self, uri: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        match SourceLocation::parse(uri)? {
            SourceLocation::Remote(url) => {
                tracing::debug!(url = %url, "downloading");
                cancellable(cancel, self.get_bytes(url, None)).await
            }
            SourceLocation::Local(path) => {
                tracing::debug!(path = %path.display(), "reading local source");
                cancellable(cancel, async {
                    tokio::fs::read(&path)
                        .await
                        .map_err(|source| FetchError::LocalSource {
                            path: path.display().to_string(),
                            source,
                        })
                })
                .await
            }
        }
    }

    /// Download a `.tgz` and unpack it into `dest`
    pub async fn download_tgz(
        &self,
        uri: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let data = self.fetch_bytes(uri, cancel).await?;
        archive::extract_bytes(&data, dest).map_err(|source| FetchError::Archive {
            location: uri.to_string(),
            source,
        })
    }

    /// Download the tarball of a GitHub repository at a ref
    pub async fn fetch_github_archive(
        &self,
        location: &GithubRepositoryLocation,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        let url = format!(
            "{}/repos/{}/{}/tarball/{}",
            self.config.github_api_url, location.org, location.repo, location.git_ref
        );
        let url = Url::parse(&url).map_err(|e| FetchError::InvalidUrl {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        if self.config.github_token.is_none() {
            tracing::warn!(
                "GITHUB_TOKEN not set; private repositories will fail to load and requests may be rate limited"
            );
        }
        tracing::info!(location = %location, "downloading github repository");

        let token = self.config.github_token.as_deref();
        cancellable(cancel, self.get_bytes(url, token)).await
    }

    /// Download and unpack a GitHub repository into `dest`
    ///
    /// Returns the location's `directory` inside the unpacked repository root.
    pub async fn download_github_repo(
        &self,
        location: &GithubRepositoryLocation,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let data = self.fetch_github_archive(location, cancel).await?;
        let archive_error = |source: CoreError| FetchError::Archive {
            location: location.to_string(),
            source,
        };

        archive::extract_bytes(&data, dest).map_err(archive_error)?;
        let repo_root = archive::first_directory(dest).map_err(archive_error)?;
        Ok(repo_root.join(&location.directory))
    }

    async fn get_bytes(&self, url: Url, bearer: Option<&str>) -> Result<Vec<u8>> {
        let mut request = self.client.get(url.clone());
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Err(FetchError::RateLimited { retry_after });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(FetchError::AuthRequired {
                url: url.to_string(),
            });
        }
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(FetchError::AuthFailed {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::HttpError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
