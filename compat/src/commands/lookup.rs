use compat_query::VersionSelector;

use super::common::{self, CompatConfig};

#[derive(Debug, clap::Parser)]
pub(crate) struct Config {
    #[clap(flatten)]
    compat_config: CompatConfig,

    /// The map content catalog version to look up
    hmc_version: i64,

    /// Only report builds of this region, case-insensitive
    #[clap(short = 'r', long = "region")]
    region: Option<String>,
}

#[derive(Debug, clap::Parser)]
pub(crate) struct HmcConfig {
    #[clap(flatten)]
    compat_config: CompatConfig,

    /// The map content catalog version to look up, or `latest`
    #[clap(value_name = "VERSION")]
    catalog_version: VersionSelector,

    /// Only report builds of this region, case-insensitive
    #[clap(short = 'r', long = "region")]
    region: Option<String>,

    /// Only consider compatibility intervals of this catalog
    #[clap(long = "target-hrn")]
    target_hrn: Option<String>,
}

pub(crate) async fn command(config: Config) -> common::Result<()> {
    let service = config.compat_config.service()?;
    let response = service
        .lookup(config.hmc_version, config.region.as_deref())
        .await?;
    common::print_json(&response)
}

pub(crate) async fn hmc_command(config: HmcConfig) -> common::Result<()> {
    let service = config.compat_config.service()?;
    let response = service
        .hmc_lookup(
            config.catalog_version,
            config.region.as_deref(),
            config.target_hrn.as_deref(),
        )
        .await?;
    common::print_json(&response)
}
