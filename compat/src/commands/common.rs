use std::sync::Arc;

use compat_auth::TokenManager;
use compat_cache::{PartitionCache, PartitionLocation};
use compat_clap_blocks::{
    catalog::CatalogConfig, credentials::CredentialsConfig, token::TokenConfig,
};
use compat_client::{CatalogApi, CatalogClient, CatalogEndpoints};
use compat_query::{CompatibilityEngine, CompatibilityService, DependencyEngine};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Auth(#[from] compat_auth::Error),

    #[error(transparent)]
    Client(#[from] compat_client::Error),

    #[error(transparent)]
    Query(#[from] compat_query::Error),

    #[error("failed to serialize the result: {0}")]
    Json(#[from] serde_json::Error),
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

/// Config shared by every command talking to the platform
#[derive(Debug, clap::Parser)]
pub(crate) struct CompatConfig {
    #[clap(flatten)]
    pub(crate) credentials: CredentialsConfig,

    #[clap(flatten)]
    pub(crate) token: TokenConfig,

    #[clap(flatten)]
    pub(crate) catalogs: CatalogConfig,
}

impl CompatConfig {
    /// Wire the engines for the configured catalogs, sharing one token manager
    pub(crate) fn service(&self) -> Result<CompatibilityService> {
        let tokens = token_manager(&self.credentials, &self.token)?;
        let catalogs = &self.catalogs;

        let primary: Arc<dyn CatalogApi> = Arc::new(CatalogClient::new(
            CatalogEndpoints::new(catalogs.metadata_url.clone(), catalogs.blobstore_url.clone())?,
            Arc::clone(&tokens),
        ));
        let dependency: Arc<dyn CatalogApi> = Arc::new(CatalogClient::new(
            CatalogEndpoints::new(
                catalogs.dependency_metadata_url.clone(),
                catalogs.dependency_blobstore_url.clone(),
            )?,
            tokens,
        ));

        let cache = PartitionCache::new(
            PartitionLocation::new(
                catalogs.compatibility_catalog_hrn.as_str(),
                catalogs.compatibility_layer.as_str(),
            ),
            Arc::clone(&primary),
        );
        Ok(CompatibilityService::new(
            CompatibilityEngine::new(Arc::new(cache)),
            DependencyEngine::new(catalogs.dependency_catalog_hrn.as_str(), dependency),
            catalogs.hmc_catalog_hrn.as_str(),
            primary,
        ))
    }
}

/// Load the credentials and set up the process-wide token manager
pub(crate) fn token_manager(
    credentials: &CredentialsConfig,
    token: &TokenConfig,
) -> Result<Arc<TokenManager>, compat_auth::Error> {
    let credentials = credentials.load()?;
    debug!(?credentials, policy = ?token.policy(), "loaded credentials");
    Ok(Arc::new(
        TokenManager::new(credentials).with_policy(token.policy()),
    ))
}

/// Print a result record as pretty JSON on stdout
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
