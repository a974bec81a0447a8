use std::sync::Arc;

use compat_client::CatalogApi;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{Error, PartitionIndex, Result};

/// Where a compatibility partition is published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionLocation {
    pub catalog_hrn: String,
    pub layer: String,
}

impl PartitionLocation {
    pub fn new(catalog_hrn: impl Into<String>, layer: impl Into<String>) -> Self {
        Self {
            catalog_hrn: catalog_hrn.into(),
            layer: layer.into(),
        }
    }
}

/// A published index together with the catalog version it was decoded from
#[derive(Debug)]
pub struct IndexSnapshot {
    pub version: i64,
    pub index: PartitionIndex,
}

/// What [`PartitionCache::ensure_fresh`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The published index already matched the latest catalog version
    Unchanged { version: i64 },
    /// A new index was decoded and published
    Refreshed { previous: Option<i64>, version: i64 },
}

impl RefreshOutcome {
    pub fn version(&self) -> i64 {
        match self {
            Self::Unchanged { version } | Self::Refreshed { version, .. } => *version,
        }
    }
}

/// Version-gated cache of one catalog's compatibility partition
///
/// Readers take an `Arc` of the current [`IndexSnapshot`] and keep using it for as long as they
/// need; a refresh builds a complete new snapshot and swaps the pointer, so a reader sees either
/// the old or the new index, never a mix. The refresh lock belongs to this cache alone, so a slow
/// refresh of one catalog never blocks another catalog.
#[derive(Debug)]
pub struct PartitionCache {
    location: PartitionLocation,
    api: Arc<dyn CatalogApi>,
    current: RwLock<Option<Arc<IndexSnapshot>>>,
    refresh_lock: Mutex<()>,
}

impl PartitionCache {
    pub fn new(location: PartitionLocation, api: Arc<dyn CatalogApi>) -> Self {
        Self {
            location,
            api,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn location(&self) -> &PartitionLocation {
        &self.location
    }

    /// The currently published snapshot, `None` until the first successful refresh
    pub fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.current.read().as_ref().map(Arc::clone)
    }

    /// The catalog version of the currently published snapshot
    pub fn version(&self) -> Option<i64> {
        self.current.read().as_ref().map(|s| s.version)
    }

    /// Make sure the published index matches the catalog's latest version
    ///
    /// Polls the latest version and returns straight away when the published one is at least as
    /// new. Otherwise the refresh runs under the refresh lock, re-checking the version first since
    /// a concurrent caller may have just published it. The published version never goes
    /// backwards, and a failed refresh leaves the previous snapshot in place.
    pub async fn ensure_fresh(&self) -> Result<RefreshOutcome> {
        let catalog_hrn = self.location.catalog_hrn.as_str();
        let latest = self.api.latest_version(catalog_hrn).await?;
        if let Some(version) = self.version().filter(|v| *v >= latest) {
            debug!(catalog_hrn, version, "compatibility index is current");
            return Ok(RefreshOutcome::Unchanged { version });
        }

        let _guard = self.refresh_lock.lock().await;
        let previous = self.version();
        if let Some(version) = previous.filter(|v| *v >= latest) {
            debug!(catalog_hrn, version, "compatibility index refreshed concurrently");
            return Ok(RefreshOutcome::Unchanged { version });
        }

        let index = self.fetch_index(latest).await?;
        let entries = index.len();
        *self.current.write() = Some(Arc::new(IndexSnapshot {
            version: latest,
            index,
        }));
        info!(
            catalog_hrn,
            layer = %self.location.layer,
            ?previous,
            version = latest,
            entries,
            "published compatibility index"
        );
        Ok(RefreshOutcome::Refreshed {
            previous,
            version: latest,
        })
    }

    async fn fetch_index(&self, catalog_version: i64) -> Result<PartitionIndex> {
        let PartitionLocation { catalog_hrn, layer } = &self.location;
        let layer_version = self
            .api
            .layer_version(catalog_hrn, catalog_version, layer)
            .await?;
        let data_handle = self
            .api
            .data_handle(catalog_hrn, layer_version, layer)
            .await?;
        let bytes = self
            .api
            .partition_bytes(catalog_hrn, layer, &data_handle)
            .await?;
        debug!(
            catalog_hrn = %catalog_hrn,
            catalog_version,
            layer_version,
            %data_handle,
            len = bytes.len(),
            "decoding compatibility partition"
        );
        PartitionIndex::decode(&bytes).map_err(|source| Error::Decode {
            catalog_hrn: catalog_hrn.clone(),
            version: catalog_version,
            source,
        })
    }
}
