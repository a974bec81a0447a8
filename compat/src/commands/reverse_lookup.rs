use super::common::{self, CompatConfig};

#[derive(Debug, clap::Parser)]
pub(crate) struct Config {
    #[clap(flatten)]
    compat_config: CompatConfig,

    /// The region build version (dvn) to look up, matched exactly
    dvn: String,

    /// Only report builds of this region, case-insensitive
    #[clap(short = 'r', long = "region")]
    region: Option<String>,

    /// Group the compatibility intervals by region
    #[clap(long = "grouped")]
    grouped: bool,

    /// Annotate every interval with the dependency catalog versions built from it
    #[clap(long = "with-dependent-versions", requires = "grouped")]
    with_dependent_versions: bool,
}

pub(crate) async fn command(config: Config) -> common::Result<()> {
    let service = config.compat_config.service()?;
    let region = config.region.as_deref();
    if config.grouped {
        let response = service
            .reverse_lookup_grouped(&config.dvn, region, config.with_dependent_versions)
            .await?;
        common::print_json(&response)
    } else {
        let response = service.reverse_lookup(&config.dvn, region).await?;
        common::print_json(&response)
    }
}
