//! Credentials and bearer tokens for the upstream catalog platform
//!
//! The platform issues one OAuth2 client-credentials token per client, usable against every
//! catalog the client can read. This crate provides:
//!
//! * [`Credentials`], loaded once at startup from a properties file and/or explicit values,
//!   see [`PartialCredentials`],
//! * the [`TokenManager`], which owns the single shared token cell for the process, reusing the
//!   cached token until it expires and allowing callers to force a refresh after the token was
//!   rejected by a resource server,
//! * the OAuth 1.0 request signing used on the token request, in [`signing`],
//! * a [`TimeProvider`] abstraction so that token expiry can be driven from tests.
use std::path::PathBuf;

use reqwest::StatusCode;

mod credentials;
pub mod signing;
mod time;
mod token;

pub use credentials::{
    CLIENT_ID_KEY, CLIENT_SECRET_KEY, Credentials, PartialCredentials, TOKEN_ENDPOINT_KEY,
};
pub use time::{MockProvider, SystemProvider, TimeProvider};
pub use token::{
    BearerToken, DEFAULT_TOKEN_LIFETIME, EXPIRY_SAFETY_MARGIN, TokenManager, TokenPolicy,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing required credentials: {}", keys.join(", "))]
    MissingCredentials { keys: Vec<&'static str> },

    #[error("invalid token endpoint URL '{url}': {source}")]
    InvalidTokenEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to read credentials file {}: {source}", path.display())]
    ReadCredentialsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "invalid credentials: authentication failed (401 Unauthorized), \
        please check the access key id and secret"
    )]
    Authentication,

    #[error("failed to initialize the token request signature")]
    Signing,

    #[error("token request failed [{status}]: {body}")]
    TokenRequest { status: StatusCode, body: String },

    #[error("failed to send token request to {url}: {source}")]
    RequestSend {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to parse token response: {0}")]
    Json(#[source] reqwest::Error),

    #[error("failed to read token error response: {0}")]
    Text(#[source] reqwest::Error),
}

impl Error {
    /// Whether this error means the configured credentials can never work
    ///
    /// These are fatal at startup: retrying will not help.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials { .. }
                | Self::InvalidTokenEndpoint { .. }
                | Self::ReadCredentialsFile { .. }
                | Self::Authentication
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
