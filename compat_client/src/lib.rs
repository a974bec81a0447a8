//! Client for the catalog platform's metadata and blob-store APIs
//!
//! [`CatalogApi`] is the seam the rest of the workspace programs against; [`CatalogClient`] is
//! the HTTP implementation. Every request is authenticated with the shared bearer token from a
//! [`compat_auth::TokenManager`] and retried exactly once, after invalidating the token, if the
//! upstream answers `401 Unauthorized`.
use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Method, StatusCode};
use serde::Deserialize;

mod client;

pub use client::{CatalogClient, CatalogEndpoints};

/// Primary error type for the [`CatalogApi`]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] compat_auth::Error),

    #[error("catalog {catalog_hrn} responded with error [{status}]: {body}")]
    Upstream {
        catalog_hrn: String,
        status: StatusCode,
        body: String,
    },

    #[error("layer '{layer}' not found in catalog {catalog_hrn}")]
    LayerNotFound { catalog_hrn: String, layer: String },

    #[error("base URL error: {0}")]
    BaseUrl(#[source] reqwest::Error),

    #[error("base URL '{0}' cannot be used as a catalog API root")]
    CannotBeABase(String),

    #[error("failed to send {method} {url} request: {source}")]
    RequestSend {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to parse JSON response from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read the API response bytes: {0}")]
    Bytes(#[source] reqwest::Error),

    #[error("failed to read the API error response: {0}")]
    Text(#[source] reqwest::Error),
}

impl Error {
    /// The upstream status code, when the upstream answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the requested entity does not exist, as opposed to a service failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::LayerNotFound { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// One published version of a catalog, as listed by the version-range endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VersionInfo {
    pub version: i64,
    /// Publication time in milliseconds since the epoch
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub dependencies: Vec<VersionDependency>,
}

/// A catalog version that a [`VersionInfo`] was built from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VersionDependency {
    pub hrn: String,
    pub version: i64,
    #[serde(default)]
    pub direct: bool,
}

/// Read access to catalogs on the platform
///
/// All operations are idempotent reads keyed by the catalog HRN.
#[async_trait]
pub trait CatalogApi: Debug + Send + Sync + 'static {
    /// The latest published version of the catalog
    async fn latest_version(&self, catalog_hrn: &str) -> Result<i64>;

    /// The oldest version of the catalog that is still available
    async fn minimum_version(&self, catalog_hrn: &str) -> Result<i64>;

    /// Versions in the range `(start_version, end_version]` with their dependencies
    async fn versions(
        &self,
        catalog_hrn: &str,
        start_version: i64,
        end_version: i64,
    ) -> Result<Vec<VersionInfo>>;

    /// The version of `layer` that belongs to `catalog_version`
    async fn layer_version(&self, catalog_hrn: &str, catalog_version: i64, layer: &str)
    -> Result<i64>;

    /// The blob-store data handle of the partition published in `layer` at `layer_version`
    async fn data_handle(&self, catalog_hrn: &str, layer_version: i64, layer: &str)
    -> Result<String>;

    /// The raw partition payload stored under `data_handle`
    async fn partition_bytes(&self, catalog_hrn: &str, layer: &str, data_handle: &str)
    -> Result<Bytes>;
}
