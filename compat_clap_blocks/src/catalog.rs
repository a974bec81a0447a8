//! CLI config for the catalogs queried for compatibility data.

use url::Url;

pub const DEFAULT_COMPATIBILITY_CATALOG_HRN: &str =
    "hrn:here:data::olp-here:rib-product-compatibility-1";
pub const DEFAULT_COMPATIBILITY_LAYER: &str = "versions";
pub const DEFAULT_HMC_CATALOG_HRN: &str = "hrn:here:data::olp-here:rib-2";
pub const DEFAULT_DEPENDENCY_CATALOG_HRN: &str =
    "hrn:here:data::olp-here:here-optimized-map-for-opensearch-3";

/// The compatibility, map content and dependency catalogs, and the service roots hosting them
///
/// The compatibility and map content catalogs share one set of service roots; the dependency
/// catalog is hosted separately.
#[derive(Debug, Clone, clap::Parser)]
pub struct CatalogConfig {
    /// Root of the metadata API hosting the compatibility and map content catalogs
    #[clap(
        long = "metadata-url",
        env = "COMPAT_METADATA_URL",
        default_value = "https://mabcd.metadata.data.api.platform.here.com/metadata/v1/catalogs",
        action
    )]
    pub metadata_url: Url,

    /// Root of the blob-store API hosting the compatibility and map content catalogs
    #[clap(
        long = "blobstore-url",
        env = "COMPAT_BLOBSTORE_URL",
        default_value = "https://mabcd.blob.data.api.platform.here.com/blobstore/v1/catalogs",
        action
    )]
    pub blobstore_url: Url,

    /// Root of the metadata API hosting the dependency catalog
    #[clap(
        long = "dependency-metadata-url",
        env = "COMPAT_DEPENDENCY_METADATA_URL",
        default_value = "https://sab.metadata.data.api.platform.here.com/metadata/v1/catalogs",
        action
    )]
    pub dependency_metadata_url: Url,

    /// Root of the blob-store API hosting the dependency catalog
    #[clap(
        long = "dependency-blobstore-url",
        env = "COMPAT_DEPENDENCY_BLOBSTORE_URL",
        default_value = "https://sab.blob.data.api.platform.here.com/blobstore/v1/catalogs",
        action
    )]
    pub dependency_blobstore_url: Url,

    /// HRN of the catalog publishing the compatibility partition
    #[clap(
        long = "compatibility-catalog",
        env = "COMPAT_CATALOG_HRN",
        default_value = DEFAULT_COMPATIBILITY_CATALOG_HRN,
        action
    )]
    pub compatibility_catalog_hrn: String,

    /// Layer of the compatibility catalog holding the partition
    #[clap(
        long = "compatibility-layer",
        env = "COMPAT_CATALOG_LAYER",
        default_value = DEFAULT_COMPATIBILITY_LAYER,
        action
    )]
    pub compatibility_layer: String,

    /// HRN of the map content catalog, used to resolve `latest`
    #[clap(
        long = "hmc-catalog",
        env = "COMPAT_HMC_CATALOG_HRN",
        default_value = DEFAULT_HMC_CATALOG_HRN,
        action
    )]
    pub hmc_catalog_hrn: String,

    /// HRN of the catalog whose versions depend on the map content catalog
    #[clap(
        long = "dependency-catalog",
        env = "COMPAT_DEPENDENCY_CATALOG_HRN",
        default_value = DEFAULT_DEPENDENCY_CATALOG_HRN,
        action
    )]
    pub dependency_catalog_hrn: String,
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults() {
        let config = CatalogConfig::parse_from(["catalog"]);
        assert_eq!(config.compatibility_catalog_hrn, DEFAULT_COMPATIBILITY_CATALOG_HRN);
        assert_eq!(config.compatibility_layer, "versions");
        assert_eq!(config.hmc_catalog_hrn, DEFAULT_HMC_CATALOG_HRN);
        assert_eq!(config.dependency_catalog_hrn, DEFAULT_DEPENDENCY_CATALOG_HRN);
        assert_eq!(
            config.dependency_metadata_url.host_str(),
            Some("sab.metadata.data.api.platform.here.com")
        );
    }

    #[test]
    fn overrides() {
        let config = CatalogConfig::parse_from([
            "catalog",
            "--metadata-url",
            "http://localhost:8080/metadata",
            "--compatibility-layer",
            "compat",
        ]);
        assert_eq!(config.metadata_url.as_str(), "http://localhost:8080/metadata");
        assert_eq!(config.compatibility_layer, "compat");
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(CatalogConfig::try_parse_from(["catalog", "--blobstore-url", "not a url"]).is_err());
    }
}
