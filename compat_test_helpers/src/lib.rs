//! Test doubles for the catalog platform
//!
//! [`MockCatalog`] is an in-memory [`CatalogApi`] that serves any number of catalogs by HRN and
//! records how often each endpoint was called, so tests can assert that work was (or was not)
//! sent upstream.
use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use compat_client::{CatalogApi, Error, Result, VersionDependency, VersionInfo};
use parking_lot::Mutex;
use reqwest::StatusCode;

/// The upstream endpoints of a catalog, used to count and fail calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    LatestVersion,
    MinimumVersion,
    Versions,
    LayerVersion,
    DataHandle,
    PartitionBytes,
}

#[derive(Debug, Default)]
struct CatalogState {
    latest: Option<i64>,
    minimum: Option<i64>,
    versions: Vec<VersionInfo>,
    /// catalog version -> layer -> layer version
    layer_versions: HashMap<i64, HashMap<String, i64>>,
    /// (layer, layer version) -> data handle
    handles: HashMap<(String, i64), String>,
    /// (layer, data handle) -> payload
    blobs: HashMap<(String, String), Bytes>,
    failures: HashMap<Endpoint, StatusCode>,
}

/// An in-memory [`CatalogApi`]
#[derive(Debug, Default)]
pub struct MockCatalog {
    catalogs: Mutex<HashMap<String, CatalogState>>,
    calls: Mutex<HashMap<(String, Endpoint), usize>>,
    yield_on_call: bool,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Yield to the runtime before answering each call, which lets concurrency tests interleave
    /// callers at every upstream request
    pub fn with_yield(mut self) -> Self {
        self.yield_on_call = true;
        self
    }

    /// Publish `payload` as the single partition of `layer` at catalog `version` and make that
    /// version the latest one
    ///
    /// The layer version equals the catalog version and the data handle is `"{layer}-{version}"`.
    pub fn publish_partition(
        &self,
        catalog_hrn: &str,
        layer: &str,
        version: i64,
        payload: impl Into<Bytes>,
    ) {
        let handle = format!("{layer}-{version}");
        let mut catalogs = self.catalogs.lock();
        let state = catalogs.entry(catalog_hrn.to_string()).or_default();
        state.latest = Some(version);
        state
            .layer_versions
            .entry(version)
            .or_default()
            .insert(layer.to_string(), version);
        state
            .handles
            .insert((layer.to_string(), version), handle.clone());
        state
            .blobs
            .insert((layer.to_string(), handle), payload.into());
    }

    pub fn set_latest_version(&self, catalog_hrn: &str, version: i64) {
        self.catalogs
            .lock()
            .entry(catalog_hrn.to_string())
            .or_default()
            .latest = Some(version);
    }

    /// Replace the version listing of a catalog
    ///
    /// The latest version becomes the highest listed version.
    pub fn set_versions(&self, catalog_hrn: &str, minimum: i64, versions: Vec<VersionInfo>) {
        let mut catalogs = self.catalogs.lock();
        let state = catalogs.entry(catalog_hrn.to_string()).or_default();
        state.minimum = Some(minimum);
        state.latest = versions.iter().map(|v| v.version).max().or(state.latest);
        state.versions = versions;
    }

    /// Make every call to `endpoint` of the catalog fail with `status` until cleared
    pub fn fail_endpoint(&self, catalog_hrn: &str, endpoint: Endpoint, status: StatusCode) {
        self.catalogs
            .lock()
            .entry(catalog_hrn.to_string())
            .or_default()
            .failures
            .insert(endpoint, status);
    }

    pub fn clear_failures(&self, catalog_hrn: &str) {
        if let Some(state) = self.catalogs.lock().get_mut(catalog_hrn) {
            state.failures.clear();
        }
    }

    /// Number of calls made to `endpoint` of the catalog so far
    pub fn calls(&self, catalog_hrn: &str, endpoint: Endpoint) -> usize {
        self.calls
            .lock()
            .get(&(catalog_hrn.to_string(), endpoint))
            .copied()
            .unwrap_or_default()
    }

    /// Number of calls made to any endpoint of the catalog so far
    pub fn total_calls(&self, catalog_hrn: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|((hrn, _), _)| hrn == catalog_hrn)
            .map(|(_, count)| count)
            .sum()
    }

    async fn enter(&self, catalog_hrn: &str, endpoint: Endpoint) -> Result<()> {
        *self
            .calls
            .lock()
            .entry((catalog_hrn.to_string(), endpoint))
            .or_default() += 1;
        if self.yield_on_call {
            tokio::task::yield_now().await;
        }
        let status = self
            .catalogs
            .lock()
            .get(catalog_hrn)
            .and_then(|state| state.failures.get(&endpoint).copied());
        match status {
            Some(status) => Err(Error::Upstream {
                catalog_hrn: catalog_hrn.to_string(),
                status,
                body: format!("injected {endpoint:?} failure"),
            }),
            None => Ok(()),
        }
    }

    fn with_state<T>(
        &self,
        catalog_hrn: &str,
        f: impl FnOnce(&CatalogState) -> Option<T>,
    ) -> Result<Option<T>> {
        match self.catalogs.lock().get(catalog_hrn) {
            Some(state) => Ok(f(state)),
            None => Err(not_found(catalog_hrn)),
        }
    }
}

fn not_found(catalog_hrn: &str) -> Error {
    Error::Upstream {
        catalog_hrn: catalog_hrn.to_string(),
        status: StatusCode::NOT_FOUND,
        body: format!("catalog {catalog_hrn} not found"),
    }
}

fn layer_not_found(catalog_hrn: &str, layer: &str) -> Error {
    Error::LayerNotFound {
        catalog_hrn: catalog_hrn.to_string(),
        layer: layer.to_string(),
    }
}

#[async_trait]
impl CatalogApi for MockCatalog {
    async fn latest_version(&self, catalog_hrn: &str) -> Result<i64> {
        self.enter(catalog_hrn, Endpoint::LatestVersion).await?;
        self.with_state(catalog_hrn, |s| s.latest)?
            .ok_or_else(|| not_found(catalog_hrn))
    }

    async fn minimum_version(&self, catalog_hrn: &str) -> Result<i64> {
        self.enter(catalog_hrn, Endpoint::MinimumVersion).await?;
        self.with_state(catalog_hrn, |s| s.minimum)?
            .ok_or_else(|| not_found(catalog_hrn))
    }

    async fn versions(
        &self,
        catalog_hrn: &str,
        start_version: i64,
        end_version: i64,
    ) -> Result<Vec<VersionInfo>> {
        self.enter(catalog_hrn, Endpoint::Versions).await?;
        Ok(self
            .with_state(catalog_hrn, |s| {
                Some(
                    s.versions
                        .iter()
                        .filter(|v| v.version > start_version && v.version <= end_version)
                        .cloned()
                        .collect(),
                )
            })?
            .unwrap_or_default())
    }

    async fn layer_version(
        &self,
        catalog_hrn: &str,
        catalog_version: i64,
        layer: &str,
    ) -> Result<i64> {
        self.enter(catalog_hrn, Endpoint::LayerVersion).await?;
        self.with_state(catalog_hrn, |s| {
            s.layer_versions
                .get(&catalog_version)
                .and_then(|layers| layers.get(layer).copied())
        })?
        .ok_or_else(|| layer_not_found(catalog_hrn, layer))
    }

    async fn data_handle(
        &self,
        catalog_hrn: &str,
        layer_version: i64,
        layer: &str,
    ) -> Result<String> {
        self.enter(catalog_hrn, Endpoint::DataHandle).await?;
        self.with_state(catalog_hrn, |s| {
            s.handles.get(&(layer.to_string(), layer_version)).cloned()
        })?
        .ok_or_else(|| layer_not_found(catalog_hrn, layer))
    }

    async fn partition_bytes(
        &self,
        catalog_hrn: &str,
        layer: &str,
        data_handle: &str,
    ) -> Result<Bytes> {
        self.enter(catalog_hrn, Endpoint::PartitionBytes).await?;
        self.with_state(catalog_hrn, |s| {
            s.blobs
                .get(&(layer.to_string(), data_handle.to_string()))
                .cloned()
        })?
        .ok_or_else(|| Error::Upstream {
            catalog_hrn: catalog_hrn.to_string(),
            status: StatusCode::NOT_FOUND,
            body: format!("no blob for data handle {data_handle}"),
        })
    }
}

/// A [`VersionInfo`] with the given direct dependencies, published at `timestamp_ms`
pub fn version_info(version: i64, timestamp_ms: i64, dependencies: &[(&str, i64)]) -> VersionInfo {
    VersionInfo {
        version,
        timestamp: Some(timestamp_ms),
        dependencies: dependencies
            .iter()
            .map(|(hrn, version)| VersionDependency {
                hrn: hrn.to_string(),
                version: *version,
                direct: true,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const HRN: &str = "hrn:test:data::compat:catalog";

    #[tokio::test]
    async fn serves_published_partitions() {
        let catalog = MockCatalog::new();
        catalog.publish_partition(HRN, "versions", 4, vec![1_u8, 2, 3]);

        let latest = catalog.latest_version(HRN).await.unwrap();
        let layer_version = catalog.layer_version(HRN, latest, "versions").await.unwrap();
        let handle = catalog
            .data_handle(HRN, layer_version, "versions")
            .await
            .unwrap();
        let bytes = catalog
            .partition_bytes(HRN, "versions", &handle)
            .await
            .unwrap();

        assert_eq!(handle, "versions-4");
        assert_eq!(bytes.as_ref(), &[1, 2, 3]);
        assert_eq!(catalog.calls(HRN, Endpoint::LatestVersion), 1);
        assert_eq!(catalog.total_calls(HRN), 4);
    }

    #[tokio::test]
    async fn unknown_layers_and_catalogs() {
        let catalog = MockCatalog::new();
        catalog.publish_partition(HRN, "versions", 4, Vec::<u8>::new());

        let err = catalog.layer_version(HRN, 4, "other").await.unwrap_err();
        assert!(err.is_not_found());

        let err = catalog.latest_version("unknown").await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn versions_are_filtered_by_range() {
        let catalog = MockCatalog::new();
        catalog.set_versions(
            HRN,
            1,
            (1..=5).map(|v| version_info(v, v * 1000, &[])).collect(),
        );

        assert_eq!(catalog.latest_version(HRN).await.unwrap(), 5);
        let versions: Vec<_> = catalog
            .versions(HRN, 2, 4)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.version)
            .collect();
        assert_eq!(versions, vec![3, 4]);
    }

    #[tokio::test]
    async fn injected_failures() {
        let catalog = MockCatalog::new();
        catalog.set_latest_version(HRN, 1);
        catalog.fail_endpoint(HRN, Endpoint::LatestVersion, StatusCode::BAD_GATEWAY);

        let err = catalog.latest_version(HRN).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));

        catalog.clear_failures(HRN);
        assert_eq!(catalog.latest_version(HRN).await.unwrap(), 1);
        assert_eq!(catalog.calls(HRN, Endpoint::LatestVersion), 2);
    }
}
