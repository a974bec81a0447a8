use std::sync::Arc;

use compat_cache::RefreshOutcome;
use compat_client::CatalogApi;
use tracing::debug;

use crate::{
    CompatibilityEngine, DependencyEngine, LookupResult, Result, VersionSelector, chained_lookup,
    lookup::{RegionCatalogs, ReverseRow},
    response::{
        CatalogMatch, ChainedLookupQuery, ChainedLookupResponse, ForwardQuery, ForwardResponse,
        HmcLookupQuery, HmcLookupResponse, NO_MATCHING_VERSION, NO_MATCHING_VERSIONS,
        QueryResponse, ReverseQuery,
    },
};

/// Every compatibility query a front end exposes, on one shared set of engines
///
/// Each query refreshes the compatibility index first, so answers always reflect the catalog's
/// latest published version. A failed refresh is returned as the query's error.
#[derive(Debug)]
pub struct CompatibilityService {
    compatibility: CompatibilityEngine,
    dependency: DependencyEngine,
    hmc_catalog_hrn: String,
    hmc_api: Arc<dyn CatalogApi>,
}

impl CompatibilityService {
    pub fn new(
        compatibility: CompatibilityEngine,
        dependency: DependencyEngine,
        hmc_catalog_hrn: impl Into<String>,
        hmc_api: Arc<dyn CatalogApi>,
    ) -> Self {
        Self {
            compatibility,
            dependency,
            hmc_catalog_hrn: hmc_catalog_hrn.into(),
            hmc_api,
        }
    }

    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        self.compatibility.refresh().await
    }

    /// Region builds compatible with `hmc_version`
    pub async fn lookup(&self, hmc_version: i64, region: Option<&str>) -> Result<ForwardResponse> {
        self.refresh().await?;
        Ok(QueryResponse::new(
            ForwardQuery {
                hmc_version,
                region: region.map(str::to_string),
            },
            self.compatibility.forward_lookup(hmc_version, region, None),
            NO_MATCHING_VERSION,
        ))
    }

    /// Region builds compatible with a version of the map content catalog
    ///
    /// [`VersionSelector::Latest`] resolves to the latest version of the HMC catalog.
    pub async fn hmc_lookup(
        &self,
        selector: VersionSelector,
        region: Option<&str>,
        target_hrn: Option<&str>,
    ) -> Result<HmcLookupResponse> {
        self.refresh().await?;
        let catalog_version = match selector {
            VersionSelector::Exact(version) => version,
            VersionSelector::Latest => {
                let version = self.hmc_api.latest_version(&self.hmc_catalog_hrn).await?;
                debug!(catalog_hrn = %self.hmc_catalog_hrn, version, "resolved latest HMC version");
                version
            }
        };
        Ok(QueryResponse::new(
            HmcLookupQuery {
                catalog_version,
                catalog_hrn: target_hrn.map(str::to_string),
                region: region.map(str::to_string),
            },
            self.compatibility
                .hmc_lookup(catalog_version, region, target_hrn),
            NO_MATCHING_VERSION,
        ))
    }

    /// Every compatibility interval of the region builds named `dvn`
    pub async fn reverse_lookup(
        &self,
        dvn: &str,
        region: Option<&str>,
    ) -> Result<QueryResponse<ReverseQuery, Vec<ReverseRow>>> {
        self.refresh().await?;
        Ok(QueryResponse::new(
            reverse_query(dvn, region),
            self.compatibility.reverse_lookup(dvn, region),
            NO_MATCHING_VERSIONS,
        ))
    }

    /// [`reverse_lookup`](Self::reverse_lookup) grouped by region
    ///
    /// With `with_dependent_versions`, every interval is annotated with the versions of the
    /// dependency catalog that were built from a version of the interval's catalog inside it.
    pub async fn reverse_lookup_grouped(
        &self,
        dvn: &str,
        region: Option<&str>,
        with_dependent_versions: bool,
    ) -> Result<QueryResponse<ReverseQuery, Vec<RegionCatalogs<CatalogMatch>>>> {
        self.refresh().await?;
        let result = match self.compatibility.reverse_lookup_grouped(dvn, region) {
            LookupResult::Found(groups) => {
                let mut annotated = Vec::with_capacity(groups.len());
                for group in groups {
                    let mut catalogs = Vec::with_capacity(group.catalogs.len());
                    for interval in group.catalogs {
                        let dependent_versions = if with_dependent_versions {
                            Some(
                                self.dependency
                                    .dependent_versions(
                                        &interval.hrn,
                                        interval.min_version,
                                        interval.max_version,
                                    )
                                    .await?,
                            )
                        } else {
                            None
                        };
                        catalogs.push(CatalogMatch {
                            interval,
                            dependent_versions,
                        });
                    }
                    annotated.push(RegionCatalogs {
                        region: group.region,
                        catalogs,
                    });
                }
                LookupResult::Found(annotated)
            }
            LookupResult::NoMatch => LookupResult::NoMatch,
            LookupResult::CacheNotReady => LookupResult::CacheNotReady,
        };
        Ok(QueryResponse::new(
            reverse_query(dvn, region),
            result,
            NO_MATCHING_VERSIONS,
        ))
    }

    /// Region builds compatible with the `target_hrn` version that `dependent_version` of the
    /// dependency catalog was built from
    pub async fn chained_lookup(
        &self,
        dependent_version: i64,
        target_hrn: &str,
    ) -> Result<ChainedLookupResponse> {
        self.refresh().await?;
        let chained = chained_lookup(
            &self.dependency,
            &self.compatibility,
            dependent_version,
            target_hrn,
        )
        .await?;
        Ok(QueryResponse::new(
            ChainedLookupQuery {
                dependent_version,
                catalog_hrn: chained.catalog_hrn,
                catalog_dvn: chained.catalog_dvn,
            },
            chained.result,
            NO_MATCHING_VERSION,
        ))
    }
}

fn reverse_query(dvn: &str, region: Option<&str>) -> ReverseQuery {
    ReverseQuery {
        dvn: dvn.to_string(),
        region: region.map(str::to_string),
    }
}
