//! Entrypoint of the compat binary

use compat_clap_blocks::logging::LoggingConfig;
use dotenvy::dotenv;
use tracing_subscriber::{Registry, fmt, prelude::*};

mod commands {
    pub(crate) mod chained_lookup;
    pub(crate) mod check_credentials;
    pub(crate) mod common;
    pub(crate) mod lookup;
    pub(crate) mod reverse_lookup;
}

enum ReturnCode {
    Failure = 1,
}

#[derive(Debug, clap::Parser)]
#[clap(
    name = "compat",
    version,
    about = "Catalog version compatibility lookups",
    long_about = r#"Catalog version compatibility lookups

Resolves which region builds are compatible with a map content catalog version, and the other
way around, from the compatibility partition published on the platform.

Examples:
    # Check that the credentials in ./credential.properties work
    compat check-credentials

    # Region builds compatible with map content version 4711 in North America
    compat lookup 4711 --region na

    # Region builds compatible with the latest map content version
    compat hmc-lookup latest

    # Everything compatible with the build 24W10, grouped by region
    compat reverse-lookup 24W10 --grouped

    # Run with full debug logging specified with LOG_FILTER
    LOG_FILTER=debug compat lookup 4711
"#
)]
struct Config {
    #[clap(flatten)]
    logging_config: LoggingConfig,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, clap::Parser)]
enum Command {
    /// Obtain a bearer token to confirm the credentials are valid
    CheckCredentials(commands::check_credentials::Config),

    /// Region builds compatible with a catalog version, across all catalog types
    Lookup(commands::lookup::Config),

    /// Region builds compatible with a map content catalog version, or `latest`
    HmcLookup(commands::lookup::HmcConfig),

    /// Compatibility intervals of a region build
    ReverseLookup(commands::reverse_lookup::Config),

    /// Region builds compatible with the map content version a dependency catalog version was
    /// built from
    ChainedLookup(commands::chained_lookup::Config),
}

fn main() -> Result<(), std::io::Error> {
    // load all environment variables from .env before doing anything
    load_dotenv();

    let config: Config = clap::Parser::parse();

    init_logs(&config.logging_config);

    let tokio_runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    tokio_runtime.block_on(async move {
        match config.command {
            None => println!("command required, -h/--help for help"),
            Some(Command::CheckCredentials(config)) => {
                if let Err(e) = commands::check_credentials::command(config).await {
                    eprintln!("Credentials check failed: {e}");
                    std::process::exit(ReturnCode::Failure as _)
                }
            }
            Some(Command::Lookup(config)) => {
                if let Err(e) = commands::lookup::command(config).await {
                    eprintln!("Lookup command failed: {e}");
                    std::process::exit(ReturnCode::Failure as _)
                }
            }
            Some(Command::HmcLookup(config)) => {
                if let Err(e) = commands::lookup::hmc_command(config).await {
                    eprintln!("HMC lookup command failed: {e}");
                    std::process::exit(ReturnCode::Failure as _)
                }
            }
            Some(Command::ReverseLookup(config)) => {
                if let Err(e) = commands::reverse_lookup::command(config).await {
                    eprintln!("Reverse lookup command failed: {e}");
                    std::process::exit(ReturnCode::Failure as _)
                }
            }
            Some(Command::ChainedLookup(config)) => {
                if let Err(e) = commands::chained_lookup::command(config).await {
                    eprintln!("Chained lookup command failed: {e}");
                    std::process::exit(ReturnCode::Failure as _)
                }
            }
        }
    });

    Ok(())
}

/// Source the .env file before initialising the Config struct - this sets
/// any envs in the file, which the Config struct then uses.
///
/// Precedence is given to existing env variables.
fn load_dotenv() {
    match dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            // Ignore this - a missing env file is not an error, defaults will
            // be applied when initialising the Config struct.
        }
        Err(e) => {
            eprintln!("FATAL Error loading config from: {e}");
            eprintln!("Aborting");
            std::process::exit(ReturnCode::Failure as _);
        }
    };
}

/// Install the log subscriber; logs go to stderr so that stdout only carries results
fn init_logs(config: &LoggingConfig) {
    let filter = match config.env_filter() {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("Initializing logs failed: invalid log filter: {e}");
            std::process::exit(ReturnCode::Failure as _);
        }
    };

    Registry::default()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Config::command().debug_assert();
    }

    #[test]
    fn hmc_lookup_accepts_latest() {
        let config = Config::try_parse_from(["compat", "hmc-lookup", "latest", "-r", "eu"]).unwrap();
        assert!(matches!(config.command, Some(Command::HmcLookup(_))));

        let err = Config::try_parse_from(["compat", "hmc-lookup", "newest"]).unwrap_err();
        assert!(err.to_string().contains("expected an integer or 'latest'"));
    }

    #[test]
    fn dependent_versions_require_grouping() {
        Config::try_parse_from(["compat", "reverse-lookup", "v1", "--with-dependent-versions"])
            .unwrap_err();
        Config::try_parse_from([
            "compat",
            "reverse-lookup",
            "v1",
            "--grouped",
            "--with-dependent-versions",
        ])
        .unwrap();
    }
}
