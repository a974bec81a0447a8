//! Catalog compatibility queries
//!
//! * [`lookup`] holds the pure forward and reverse lookups over a decoded
//!   [`compat_cache::PartitionIndex`].
//! * [`CompatibilityEngine`] runs those lookups against the index currently published by a
//!   [`compat_cache::PartitionCache`], answering [`LookupResult::CacheNotReady`] until the first
//!   refresh succeeded.
//! * [`DependencyEngine`] answers questions about a catalog's version history, i.e. which version
//!   of another catalog a given version was built from.
//! * [`chained_lookup`] composes the two: it translates a dependent catalog version into the
//!   version of the catalog it depends on and looks that up in the compatibility index.
//! * [`CompatibilityService`] wires everything for a front end and produces the JSON records in
//!   [`response`].
use std::str::FromStr;

mod chained;
mod dependency;
mod engine;
pub mod lookup;
pub mod response;
mod service;

pub use chained::{ChainedLookup, chained_lookup};
pub use dependency::{DependencyEngine, DependentVersion};
pub use engine::CompatibilityEngine;
pub use service::CompatibilityService;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Cache(#[from] compat_cache::Error),

    #[error(transparent)]
    Catalog(#[from] compat_client::Error),

    #[error(
        "no dependency on {target_hrn} found for version {version} of catalog {catalog_hrn}"
    )]
    DependencyNotFound {
        catalog_hrn: String,
        version: i64,
        target_hrn: String,
    },
}

impl Error {
    /// Whether the error means an entity does not exist rather than a service failure
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Cache(e) => e.is_not_found(),
            Self::Catalog(e) => e.is_not_found(),
            Self::DependencyNotFound { .. } => true,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Outcome of a query against a published index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult<T> {
    Found(T),
    /// The index was consulted and nothing matched
    NoMatch,
    /// No index has been published yet; the caller should try again later
    CacheNotReady,
}

impl<T> LookupResult<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> LookupResult<U> {
        match self {
            Self::Found(t) => LookupResult::Found(f(t)),
            Self::NoMatch => LookupResult::NoMatch,
            Self::CacheNotReady => LookupResult::CacheNotReady,
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(t) => Some(t),
            Self::NoMatch | Self::CacheNotReady => None,
        }
    }
}

impl<T> LookupResult<Vec<T>> {
    /// `Found` for a non-empty list, `NoMatch` otherwise
    pub fn from_matches(matches: Vec<T>) -> Self {
        if matches.is_empty() {
            Self::NoMatch
        } else {
            Self::Found(matches)
        }
    }
}

/// A catalog version given either explicitly or as the catalog's latest one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
    Exact(i64),
    Latest,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid catalog version '{0}': expected an integer or 'latest'")]
pub struct InvalidVersionSelector(String);

impl FromStr for VersionSelector {
    type Err = InvalidVersionSelector;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }
        s.trim()
            .parse()
            .map(Self::Exact)
            .map_err(|_| InvalidVersionSelector(s.to_string()))
    }
}

#[cfg(test)]
mod test_util {
    use compat_cache::schema::{CatalogCompatibility, CatalogType, Compatibility, VersionsPartition};
    use prost::Message;

    pub(crate) const COMPAT_HRN: &str = "hrn:test:data::compat:rib-product-compatibility-1";
    pub(crate) const HMC_HRN: &str = "hrn:test:data::compat:rib-2";
    pub(crate) const DEPENDENCY_HRN: &str = "hrn:test:data::compat:opensearch-3";
    pub(crate) const LAYER: &str = "versions";

    pub(crate) fn hmc(hrn: &str, min: i64, max: i64) -> CatalogCompatibility {
        CatalogCompatibility {
            catalog_type: CatalogType::HereMapContent as i32,
            hrn: hrn.to_string(),
            min_version: Some(min),
            max_version: Some(max),
        }
    }

    pub(crate) fn entry(
        region: &str,
        dvn: &str,
        catalogs: Vec<CatalogCompatibility>,
    ) -> Compatibility {
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

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn version_selector_parsing() {
        assert_eq!("42".parse::<VersionSelector>().unwrap(), VersionSelector::Exact(42));
        assert_eq!("latest".parse::<VersionSelector>().unwrap(), VersionSelector::Latest);
        assert_eq!("LATEST".parse::<VersionSelector>().unwrap(), VersionSelector::Latest);
        let err = "newest".parse::<VersionSelector>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid catalog version 'newest': expected an integer or 'latest'"
        );
    }

    #[test]
    fn lookup_result_from_matches() {
        assert_eq!(LookupResult::from_matches(vec![1]), LookupResult::Found(vec![1]));
        assert_eq!(LookupResult::<Vec<i32>>::from_matches(vec![]), LookupResult::NoMatch);
        assert_eq!(LookupResult::Found(2).map(|v| v * 2).found(), Some(4));
        assert_eq!(LookupResult::<i32>::CacheNotReady.found(), None);
    }
}
