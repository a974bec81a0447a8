use std::{fmt::Debug, io::ErrorKind, path::Path};

use secrecy::{ExposeSecret, Secret};
use tracing::debug;
use url::Url;

use crate::{Error, Result};

/// Properties key holding the OAuth2 token endpoint URL
pub const TOKEN_ENDPOINT_KEY: &str = "here.token.endpoint.url";
/// Properties key holding the client (access key) id
pub const CLIENT_ID_KEY: &str = "here.access.key.id";
/// Properties key holding the client (access key) secret
pub const CLIENT_SECRET_KEY: &str = "here.access.key.secret";

/// The validated client credentials, immutable once loaded
pub struct Credentials {
    token_endpoint: Url,
    client_id: String,
    client_secret: Secret<String>,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token_endpoint", &self.token_endpoint.as_str())
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn new(
        token_endpoint: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self> {
        PartialCredentials {
            token_endpoint: Some(token_endpoint.to_string()),
            client_id: Some(client_id.into()),
            client_secret: Some(Secret::new(client_secret.into())),
        }
        .into_credentials()
    }

    pub fn token_endpoint(&self) -> &Url {
        &self.token_endpoint
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &Secret<String> {
        &self.client_secret
    }
}

/// Credential values gathered from one source, any of which may be absent
///
/// Sources are layered with [`PartialCredentials::or`] and validated once with
/// [`PartialCredentials::into_credentials`].
#[derive(Debug, Default)]
pub struct PartialCredentials {
    pub token_endpoint: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<Secret<String>>,
}

impl PartialCredentials {
    /// Parse `key=value` lines in the `credentials.properties` format
    ///
    /// Blank lines, `#` comments and unknown keys are ignored.
    pub fn from_properties(contents: &str) -> Self {
        let mut creds = Self::default();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().to_string();
            match key.trim() {
                TOKEN_ENDPOINT_KEY => creds.token_endpoint = Some(value),
                CLIENT_ID_KEY => creds.client_id = Some(value),
                CLIENT_SECRET_KEY => creds.client_secret = Some(Secret::new(value)),
                other => debug!(key = other, "ignoring unknown credentials property"),
            }
        }
        creds
    }

    /// Read a properties file; a file that does not exist yields no values
    pub fn from_properties_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(Self::from_properties(&contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no credentials file found");
                Ok(Self::default())
            }
            Err(source) => Err(Error::ReadCredentialsFile {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Fill any value missing from `self` with the one from `fallback`
    pub fn or(self, fallback: Self) -> Self {
        Self {
            token_endpoint: self.token_endpoint.or(fallback.token_endpoint),
            client_id: self.client_id.or(fallback.client_id),
            client_secret: self.client_secret.or(fallback.client_secret),
        }
    }

    /// Validate that every value is present and the endpoint is a URL
    pub fn into_credentials(self) -> Result<Credentials> {
        let token_endpoint = self.token_endpoint.filter(|v| !v.is_empty());
        let client_id = self.client_id.filter(|v| !v.is_empty());
        let client_secret = self.client_secret.filter(|v| !v.expose_secret().is_empty());

        let (Some(token_endpoint), Some(client_id), Some(client_secret)) =
            (token_endpoint.as_ref(), client_id.as_ref(), client_secret.as_ref())
        else {
            let keys = [
                (TOKEN_ENDPOINT_KEY, token_endpoint.is_none()),
                (CLIENT_ID_KEY, client_id.is_none()),
                (CLIENT_SECRET_KEY, client_secret.is_none()),
            ]
            .into_iter()
            .filter_map(|(key, missing)| missing.then_some(key))
            .collect();
            return Err(Error::MissingCredentials { keys });
        };

        let token_endpoint =
            Url::parse(token_endpoint).map_err(|source| Error::InvalidTokenEndpoint {
                url: token_endpoint.clone(),
                source,
            })?;

        Ok(Credentials {
            token_endpoint,
            client_id: client_id.clone(),
            client_secret: Secret::new(client_secret.expose_secret().clone()),
        })
    }
}
