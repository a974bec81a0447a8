//! CLI config for log filtering.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, clap::Parser)]
pub struct LoggingConfig {
    /// Logs: filter directive
    ///
    /// Configures log severity level filter, by target.
    ///
    /// Simplest options: error, warn, info, debug, trace
    ///
    /// Levels for different modules can be specified. For example
    /// `debug,hyper=info` specifies debug logging for all modules
    /// except for the `hyper` module which will only display info
    /// level logging.
    ///
    /// Overridden by `-v`.
    #[clap(long = "log-filter", env = "LOG_FILTER", global = true, action)]
    pub log_filter: Option<String>,

    /// Logs: filter short-hand
    ///
    /// Convenient way to set log severity level filter.
    /// Overrides `--log-filter`.
    ///
    /// -v   'info'
    ///
    /// -vv  'debug,hyper=info,reqwest=info'
    ///
    /// -vvv 'trace,hyper=info,reqwest=info'
    #[clap(
        short = 'v',
        long = "verbose",
        global = true,
        action = clap::ArgAction::Count
    )]
    pub log_verbose_count: u8,
}

impl LoggingConfig {
    /// The effective filter directive
    pub fn filter_directive(&self) -> &str {
        match self.log_verbose_count {
            0 => self
                .log_filter
                .as_deref()
                .unwrap_or(DEFAULT_LOG_FILTER),
            1 => "info",
            2 => "debug,hyper=info,reqwest=info",
            _ => "trace,hyper=info,reqwest=info",
        }
    }

    pub fn env_filter(&self) -> Result<EnvFilter, tracing_subscriber::filter::ParseError> {
        EnvFilter::try_new(self.filter_directive())
    }
}
