use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, SecondsFormat};
use compat_client::{CatalogApi, VersionInfo};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::{Error, Result};

/// Version windows kept before the window cache is cleared
const MAX_CACHED_WINDOWS: usize = 64;

/// A version of the dependency catalog, with its publication time in RFC 3339
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependentVersion {
    pub version: i64,
    pub timestamp: Option<String>,
}

impl DependentVersion {
    fn from_info(info: &VersionInfo) -> Self {
        Self {
            version: info.version,
            timestamp: info
                .timestamp
                .and_then(DateTime::from_timestamp_millis)
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}

/// Queries over the version history of one catalog and the catalogs it was built from
///
/// Published versions never change, so a fetched `(start, end]` window is kept and reused for
/// repeated requests of the same window once its `end` version has been published. Windows
/// reaching past the latest version are fetched again every time.
#[derive(Debug)]
pub struct DependencyEngine {
    catalog_hrn: String,
    api: Arc<dyn CatalogApi>,
    windows: Mutex<HashMap<(i64, i64), Arc<[VersionInfo]>>>,
}

impl DependencyEngine {
    pub fn new(catalog_hrn: impl Into<String>, api: Arc<dyn CatalogApi>) -> Self {
        Self {
            catalog_hrn: catalog_hrn.into(),
            api,
            windows: Default::default(),
        }
    }

    pub fn catalog_hrn(&self) -> &str {
        &self.catalog_hrn
    }

    async fn window(&self, start_exclusive: i64, end_inclusive: i64) -> Result<Arc<[VersionInfo]>> {
        let key = (start_exclusive, end_inclusive);
        let cached = self.windows.lock().get(&key).map(Arc::clone);
        if let Some(versions) = cached {
            debug!(
                catalog_hrn = %self.catalog_hrn,
                start_exclusive,
                end_inclusive,
                "using cached version window"
            );
            return Ok(versions);
        }

        let versions: Arc<[VersionInfo]> = self
            .api
            .versions(&self.catalog_hrn, start_exclusive, end_inclusive)
            .await?
            .into();

        if !versions.iter().any(|info| info.version == end_inclusive) {
            return Ok(versions);
        }
        let mut windows = self.windows.lock();
        if windows.len() >= MAX_CACHED_WINDOWS {
            windows.clear();
        }
        windows.insert(key, Arc::clone(&versions));
        Ok(versions)
    }

    /// The version of `target_hrn` that `version` of this catalog was built from
    ///
    /// Only the single-version window `(version - 1, version]` is fetched.
    pub async fn resolve_dependency_version(&self, version: i64, target_hrn: &str) -> Result<i64> {
        let window = self.window(version.saturating_sub(1), version).await?;
        let dependency_of = |info: &VersionInfo| {
            info.dependencies
                .iter()
                .find(|d| d.hrn == target_hrn)
                .map(|d| d.version)
        };

        window
            .iter()
            .find(|info| info.version == version)
            .and_then(dependency_of)
            .or_else(|| window.iter().find_map(dependency_of))
            .ok_or_else(|| Error::DependencyNotFound {
                catalog_hrn: self.catalog_hrn.clone(),
                version,
                target_hrn: target_hrn.to_string(),
            })
    }

    /// Versions of this catalog built from a version of `target_hrn` within `[min, max]`
    ///
    /// Either bound may be absent. The whole available history, from the minimum to the latest
    /// version, is searched. When nothing falls inside the bounds and `min` is given, the single
    /// version whose dependency is closest to `min` is returned instead.
    pub async fn dependent_versions(
        &self,
        target_hrn: &str,
        min: Option<i64>,
        max: Option<i64>,
    ) -> Result<Vec<DependentVersion>> {
        let earliest = self.api.minimum_version(&self.catalog_hrn).await?;
        let latest = self.api.latest_version(&self.catalog_hrn).await?;
        let history = self.window(earliest.saturating_sub(1), latest).await?;

        let mut within = vec![];
        let mut closest: Option<(u64, &VersionInfo)> = None;
        for info in history.iter() {
            let Some(dependency) = info.dependencies.iter().find(|d| d.hrn == target_hrn) else {
                continue;
            };
            let v = dependency.version;
            if min.is_none_or(|min| v >= min) && max.is_none_or(|max| v <= max) {
                within.push(DependentVersion::from_info(info));
            } else if let Some(min) = min {
                let distance = v.abs_diff(min);
                if closest.is_none_or(|(best, _)| distance < best) {
                    closest = Some((distance, info));
                }
            }
        }

        if within.is_empty() {
            if let Some((_, info)) = closest {
                debug!(
                    catalog_hrn = %self.catalog_hrn,
                    target_hrn,
                    version = info.version,
                    "no dependent version in range, using the closest one"
                );
                return Ok(vec![DependentVersion::from_info(info)]);
            }
        }
        Ok(within)
    }
}

#[cfg(test)]
mod tests {
    use compat_test_helpers::{Endpoint, MockCatalog, version_info};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_util::{DEPENDENCY_HRN, HMC_HRN};

    const OTHER_HRN: &str = "hrn:test:data::compat:other";

    fn engine(catalog: &Arc<MockCatalog>) -> DependencyEngine {
        DependencyEngine::new(DEPENDENCY_HRN, Arc::clone(catalog) as Arc<dyn CatalogApi>)
    }

    fn history(catalog: &MockCatalog) {
        catalog.set_versions(
            DEPENDENCY_HRN,
            10,
            vec![
                version_info(10, 1_700_000_000_000, &[(HMC_HRN, 100), (OTHER_HRN, 1)]),
                version_info(11, 1_700_000_060_000, &[(OTHER_HRN, 2), (HMC_HRN, 105)]),
                version_info(12, 1_700_000_120_000, &[(HMC_HRN, 110)]),
                version_info(13, 1_700_000_180_000, &[(OTHER_HRN, 3)]),
            ],
        );
    }

    #[tokio::test]
    async fn resolves_the_dependency_of_one_version() {
        let catalog = Arc::new(MockCatalog::new());
        history(&catalog);
        let engine = engine(&catalog);

        assert_eq!(engine.resolve_dependency_version(11, HMC_HRN).await.unwrap(), 105);
        assert_eq!(engine.resolve_dependency_version(11, OTHER_HRN).await.unwrap(), 2);
        // same window, served from the cache
        assert_eq!(catalog.calls(DEPENDENCY_HRN, Endpoint::Versions), 1);

        let err = engine
            .resolve_dependency_version(13, HMC_HRN)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            format!("no dependency on {HMC_HRN} found for version 13 of catalog {DEPENDENCY_HRN}")
        );

        let err = engine
            .resolve_dependency_version(99, HMC_HRN)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DependencyNotFound { version: 99, .. }));
    }

    #[tokio::test]
    async fn unpublished_versions_are_not_cached() {
        let catalog = Arc::new(MockCatalog::new());
        catalog.set_versions(
            DEPENDENCY_HRN,
            10,
            vec![version_info(10, 1_700_000_000_000, &[(HMC_HRN, 100)])],
        );
        let engine = engine(&catalog);

        let err = engine
            .resolve_dependency_version(11, HMC_HRN)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DependencyNotFound { version: 11, .. }));

        catalog.set_versions(
            DEPENDENCY_HRN,
            10,
            vec![
                version_info(10, 1_700_000_000_000, &[(HMC_HRN, 100)]),
                version_info(11, 1_700_000_060_000, &[(HMC_HRN, 105)]),
            ],
        );
        assert_eq!(engine.resolve_dependency_version(11, HMC_HRN).await.unwrap(), 105);
        assert_eq!(engine.resolve_dependency_version(11, HMC_HRN).await.unwrap(), 105);
        // the miss was fetched again, the published window only once
        assert_eq!(catalog.calls(DEPENDENCY_HRN, Endpoint::Versions), 2);
    }

    #[tokio::test]
    async fn dependent_versions_within_bounds() {
        let catalog = Arc::new(MockCatalog::new());
        history(&catalog);
        let engine = engine(&catalog);

        let versions = engine
            .dependent_versions(HMC_HRN, Some(101), Some(110))
            .await
            .unwrap();
        assert_eq!(
            versions,
            vec![
                DependentVersion {
                    version: 11,
                    timestamp: Some("2023-11-14T22:14:20Z".to_string()),
                },
                DependentVersion {
                    version: 12,
                    timestamp: Some("2023-11-14T22:15:20Z".to_string()),
                },
            ]
        );

        let all = engine.dependent_versions(HMC_HRN, None, None).await.unwrap();
        assert_eq!(
            all.iter().map(|v| v.version).collect::<Vec<_>>(),
            vec![10, 11, 12]
        );
        // the whole history window is fetched once
        assert_eq!(catalog.calls(DEPENDENCY_HRN, Endpoint::Versions), 1);
    }

    #[tokio::test]
    async fn falls_back_to_the_closest_version() {
        let catalog = Arc::new(MockCatalog::new());
        history(&catalog);
        let engine = engine(&catalog);

        let versions = engine
            .dependent_versions(HMC_HRN, Some(104), Some(104))
            .await
            .unwrap();
        assert_eq!(
            versions.iter().map(|v| v.version).collect::<Vec<_>>(),
            vec![11]
        );

        // no fallback without a lower bound
        let versions = engine
            .dependent_versions(HMC_HRN, None, Some(50))
            .await
            .unwrap();
        assert_eq!(versions, vec![]);
    }

    #[tokio::test]
    async fn upstream_errors_propagate() {
        let catalog = Arc::new(MockCatalog::new());
        history(&catalog);
        catalog.fail_endpoint(
            DEPENDENCY_HRN,
            Endpoint::Versions,
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
        );

        let err = engine(&catalog)
            .resolve_dependency_version(11, HMC_HRN)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Catalog(_)));
        assert!(!err.is_not_found());
    }
}
