use std::sync::Arc;

use compat_cache::{PartitionCache, PartitionIndex, RefreshOutcome};

use crate::{
    LookupResult, Result,
    lookup::{self, ForwardMatch, RegionCatalogs, ReverseRow},
};

/// Compatibility queries against the index published by one [`PartitionCache`]
///
/// Queries never touch the network: they read whatever snapshot is published when they start.
/// Call [`refresh`](Self::refresh) first to bring the index up to date.
#[derive(Debug, Clone)]
pub struct CompatibilityEngine {
    cache: Arc<PartitionCache>,
}

impl CompatibilityEngine {
    pub fn new(cache: Arc<PartitionCache>) -> Self {
        Self { cache }
    }

    pub fn catalog_hrn(&self) -> &str {
        &self.cache.location().catalog_hrn
    }

    /// Bring the published index up to the catalog's latest version
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        Ok(self.cache.ensure_fresh().await?)
    }

    fn query<T>(&self, f: impl FnOnce(&PartitionIndex) -> Vec<T>) -> LookupResult<Vec<T>> {
        match self.cache.snapshot() {
            Some(snapshot) => LookupResult::from_matches(f(&snapshot.index)),
            None => LookupResult::CacheNotReady,
        }
    }

    /// Region builds compatible with `version` of any catalog, or of `target_hrn` only
    pub fn forward_lookup(
        &self,
        version: i64,
        region: Option<&str>,
        target_hrn: Option<&str>,
    ) -> LookupResult<Vec<ForwardMatch>> {
        self.query(|index| lookup::forward_lookup(index, version, region, target_hrn))
    }

    /// Region builds compatible with `version` of a `HERE_MAP_CONTENT` catalog
    pub fn hmc_lookup(
        &self,
        version: i64,
        region: Option<&str>,
        target_hrn: Option<&str>,
    ) -> LookupResult<Vec<ForwardMatch>> {
        self.query(|index| lookup::hmc_lookup(index, version, region, target_hrn))
    }

    pub fn reverse_lookup(&self, dvn: &str, region: Option<&str>) -> LookupResult<Vec<ReverseRow>> {
        self.query(|index| lookup::reverse_lookup(index, dvn, region))
    }

    /// [`reverse_lookup`](Self::reverse_lookup) grouped by region
    pub fn reverse_lookup_grouped(
        &self,
        dvn: &str,
        region: Option<&str>,
    ) -> LookupResult<Vec<RegionCatalogs>> {
        self.query(|index| lookup::group_by_region(lookup::reverse_lookup(index, dvn, region)))
    }
}
