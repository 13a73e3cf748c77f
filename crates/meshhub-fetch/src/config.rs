//! HTTP client configuration

use std::time::Duration;

/// Environment variable holding the GitHub API token
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Token for GitHub API requests; anonymous requests are rate limited
    pub github_token: Option<String>,

    /// Whole-request timeout
    pub timeout: Duration,

    pub user_agent: String,

    /// Base URL of the GitHub API (overridable for tests and GHE)
    pub github_api_url: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            github_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("meshhub/{}", env!("CARGO_PKG_VERSION")),
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn with_github_token(mut self, token: Option<String>) -> Self {
        self.github_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_github_api_url(mut self, url: impl Into<String>) -> Self {
        self.github_api_url = url.into().trim_end_matches('/').to_string();
        self
    }
}
