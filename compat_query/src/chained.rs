use tracing::debug;

use crate::{
    CompatibilityEngine, DependencyEngine, LookupResult, Result, lookup::ForwardMatch,
};

/// Result of a [`chained_lookup`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainedLookup {
    /// The catalog the dependent version was translated into
    pub catalog_hrn: String,
    /// The version of `catalog_hrn` the dependent version was built from
    pub catalog_dvn: i64,
    pub result: LookupResult<Vec<ForwardMatch>>,
}

/// Translate `dependent_version` of the dependency engine's catalog into the version of
/// `target_hrn` it was built from, then look that version up in the compatibility index
///
/// Fails with [`Error::DependencyNotFound`](crate::Error::DependencyNotFound) when the dependent
/// version does not depend on `target_hrn`.
pub async fn chained_lookup(
    dependency: &DependencyEngine,
    compatibility: &CompatibilityEngine,
    dependent_version: i64,
    target_hrn: &str,
) -> Result<ChainedLookup> {
    let catalog_dvn = dependency
        .resolve_dependency_version(dependent_version, target_hrn)
        .await?;
    debug!(
        dependency_hrn = dependency.catalog_hrn(),
        dependent_version,
        target_hrn,
        catalog_dvn,
        "resolved dependency version"
    );
    Ok(ChainedLookup {
        catalog_hrn: target_hrn.to_string(),
        catalog_dvn,
        result: compatibility.hmc_lookup(catalog_dvn, None, Some(target_hrn)),
    })
}
