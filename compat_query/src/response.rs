//! JSON records returned to callers of the [`CompatibilityService`](crate::CompatibilityService)
//!
//! Every record echoes the query it answers and then carries either `matches` or a `message`
//! saying nothing matched. Before the first index is published the record is
//! `{"error": "Data is not available yet. Try again later."}` instead.
use compat_cache::CatalogInterval;
use serde::Serialize;

use crate::{DependentVersion, LookupResult, lookup::ForwardMatch};

pub const NO_MATCHING_VERSION: &str = "No matching version found";
pub const NO_MATCHING_VERSIONS: &str = "No matching versions found";
pub const CACHE_NOT_READY: &str = "Data is not available yet. Try again later.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryResponse<Q, T> {
    Ready(ReadyResponse<Q, T>),
    NotReady(NotReady),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadyResponse<Q, T> {
    #[serde(flatten)]
    pub query: Q,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotReady {
    pub error: &'static str,
}

impl<Q, T> QueryResponse<Q, T> {
    /// Build the record for `result`, using `no_match` as the message when nothing matched
    pub fn new(query: Q, result: LookupResult<T>, no_match: &'static str) -> Self {
        let (matches, message) = match result {
            LookupResult::Found(matches) => (Some(matches), None),
            LookupResult::NoMatch => (None, Some(no_match)),
            LookupResult::CacheNotReady => {
                return Self::NotReady(NotReady {
                    error: CACHE_NOT_READY,
                });
            }
        };
        Self::Ready(ReadyResponse {
            query,
            matches,
            message,
        })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn matches(&self) -> Option<&T> {
        match self {
            Self::Ready(ready) => ready.matches.as_ref(),
            Self::NotReady(_) => None,
        }
    }
}

/// Query echo of a forward lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForwardQuery {
    pub hmc_version: i64,
    pub region: Option<String>,
}

/// Query echo of an HMC lookup; `catalog_version` is the resolved version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HmcLookupQuery {
    pub catalog_version: i64,
    pub catalog_hrn: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReverseQuery {
    pub dvn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Query echo of a chained lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainedLookupQuery {
    pub dependent_version: i64,
    pub catalog_hrn: String,
    pub catalog_dvn: i64,
}

/// An interval of a grouped reverse lookup, optionally with the dependency catalog versions
/// built from a version inside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogMatch {
    #[serde(flatten)]
    pub interval: CatalogInterval,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependent_versions: Option<Vec<DependentVersion>>,
}

pub type ForwardResponse = QueryResponse<ForwardQuery, Vec<ForwardMatch>>;
pub type HmcLookupResponse = QueryResponse<HmcLookupQuery, Vec<ForwardMatch>>;
pub type ChainedLookupResponse = QueryResponse<ChainedLookupQuery, Vec<ForwardMatch>>;
