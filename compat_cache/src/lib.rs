//! The compatibility partition of a catalog and its version-gated cache
//!
//! A catalog publishes its compatibility data as a single protobuf partition (see [`schema`]).
//! [`PartitionIndex::decode`] turns the raw bytes into an immutable [`PartitionIndex`], and the
//! [`PartitionCache`] keeps the index of the catalog's latest version published for readers,
//! re-fetching only when the catalog version moves.
mod cache;
mod index;
pub mod schema;

pub use cache::{IndexSnapshot, PartitionCache, PartitionLocation, RefreshOutcome};
pub use index::{CatalogInterval, CatalogType, CompatibilityEntry, DecodeError, PartitionIndex};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] compat_client::Error),

    #[error("failed to decode compatibility partition of {catalog_hrn} at version {version}: {source}")]
    Decode {
        catalog_hrn: String,
        version: i64,
        #[source]
        source: DecodeError,
    },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Catalog(e) => e.is_not_found(),
            Self::Decode { .. } => false,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod test_util {
    use prost::Message;

    use crate::schema::{CatalogCompatibility, CatalogType, Compatibility, VersionsPartition};

    pub(crate) fn hmc(hrn: &str, min: i64, max: i64) -> CatalogCompatibility {
        CatalogCompatibility {
            catalog_type: CatalogType::HereMapContent as i32,
            hrn: hrn.to_string(),
            min_version: Some(min),
            max_version: Some(max),
        }
    }

    pub(crate) fn entry(region: &str, dvn: &str, catalogs: Vec<CatalogCompatibility>) -> Compatibility {
        Compatibility {
            region: region.to_string(),
            dvn: dvn.to_string(),
            catalogs,
        }
    }

    pub(crate) fn partition(compatibility: Vec<Compatibility>) -> Vec<u8> {
        VersionsPartition { compatibility }.encode_to_vec()
    }
}
