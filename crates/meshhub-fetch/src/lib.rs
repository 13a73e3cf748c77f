//! Meshhub Fetch - retrieval of installation sources
//!
//! - `Fetcher`: cancellable downloads from HTTP URLs and local paths
//! - GitHub repository tarballs (`/repos/{org}/{repo}/tarball/{ref}`)
//! - Remote and GitHub-hosted application catalogs

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;

pub use catalog::{GithubSpecReader, RemoteSpecReader};
pub use client::{Fetcher, SourceLocation, cancellable};
pub use config::FetchConfig;
pub use error::{FetchError, Result};
