use compat_clap_blocks::{credentials::CredentialsConfig, token::TokenConfig};
use serde::Serialize;
use tracing::info;

use super::common;

#[derive(Debug, clap::Parser)]
pub(crate) struct Config {
    #[clap(flatten)]
    credentials: CredentialsConfig,

    #[clap(flatten)]
    token: TokenConfig,
}

#[derive(Debug, Serialize)]
struct CredentialsStatus<'a> {
    token_endpoint: &'a str,
    client_id: &'a str,
    valid: bool,
}

pub(crate) async fn command(config: Config) -> common::Result<()> {
    let tokens = common::token_manager(&config.credentials, &config.token)?;
    tokens.validate().await?;

    let credentials = tokens.credentials();
    info!(client_id = credentials.client_id(), "credentials are valid");
    common::print_json(&CredentialsStatus {
        token_endpoint: credentials.token_endpoint().as_str(),
        client_id: credentials.client_id(),
        valid: true,
    })
}
