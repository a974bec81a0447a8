use super::common::{self, CompatConfig};

#[derive(Debug, clap::Parser)]
pub(crate) struct Config {
    #[clap(flatten)]
    compat_config: CompatConfig,

    /// The dependency catalog version to translate
    dependent_version: i64,

    /// The catalog to translate the version into; defaults to the map content catalog
    #[clap(long = "target-hrn")]
    target_hrn: Option<String>,
}

pub(crate) async fn command(config: Config) -> common::Result<()> {
    let service = config.compat_config.service()?;
    let target_hrn = config
        .target_hrn
        .as_deref()
        .unwrap_or(&config.compat_config.catalogs.hmc_catalog_hrn);
    let response = service
        .chained_lookup(config.dependent_version, target_hrn)
        .await?;
    common::print_json(&response)
}
