//! CLI config for the platform client credentials.

use std::path::PathBuf;

use compat_auth::{Credentials, PartialCredentials};
use secrecy::Secret;

/// Where the client credentials come from
///
/// Values found in the credentials file take precedence over the ones given as flags or
/// environment variables. A missing file is not an error as long as every value is provided
/// some other way.
#[derive(Debug, clap::Parser)]
pub struct CredentialsConfig {
    /// Path of the `credentials.properties` file downloaded from the platform portal
    #[clap(
        long = "credentials-file",
        env = "COMPAT_CREDENTIALS_FILE",
        default_value = "credential.properties",
        action
    )]
    pub credentials_file: PathBuf,

    /// The OAuth2 token endpoint, `here.token.endpoint.url` in the credentials file
    #[clap(long = "token-endpoint", env = "HERE_TOKEN_URL", action)]
    pub token_endpoint: Option<String>,

    /// The access key id, `here.access.key.id` in the credentials file
    #[clap(long = "client-id", env = "HERE_CLIENT_ID", action)]
    pub client_id: Option<String>,

    /// The access key secret, `here.access.key.secret` in the credentials file
    #[clap(long = "client-secret", env = "HERE_CLIENT_SECRET", hide_env_values = true, action)]
    pub client_secret: Option<Secret<String>>,
}

impl CredentialsConfig {
    /// Load and validate the credentials
    pub fn load(&self) -> Result<Credentials, compat_auth::Error> {
        let from_file = PartialCredentials::from_properties_file(&self.credentials_file)?;
        from_file
            .or(PartialCredentials {
                token_endpoint: self.token_endpoint.clone(),
                client_id: self.client_id.clone(),
                client_secret: self.client_secret.clone(),
            })
            .into_credentials()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn file_values_win_over_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "here.access.key.id = from-file").unwrap();
        writeln!(file, "here.access.key.secret = file-secret").unwrap();

        let path = file.path().to_string_lossy().to_string();
        let config = CredentialsConfig::parse_from([
            "credentials",
            "--credentials-file",
            path.as_str(),
            "--token-endpoint",
            "https://account.example.com/oauth2/token",
            "--client-id",
            "from-flag",
        ]);
        let creds = config.load().unwrap();

        assert_eq!(
            creds.token_endpoint().as_str(),
            "https://account.example.com/oauth2/token"
        );
        assert_eq!(creds.client_id(), "from-file");
        assert_eq!(creds.client_secret().expose_secret(), "file-secret");
    }

    #[test]
    fn flags_alone_are_enough() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("credential.properties");
        let missing = missing.to_string_lossy().to_string();
        let config = CredentialsConfig::parse_from([
            "credentials",
            "--credentials-file",
            missing.as_str(),
            "--token-endpoint",
            "https://account.example.com/oauth2/token",
            "--client-id",
            "id",
            "--client-secret",
            "secret",
        ]);
        assert_eq!(config.load().unwrap().client_id(), "id");
    }

    #[test]
    fn missing_values_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("credential.properties");
        let missing = missing.to_string_lossy().to_string();
        let config = CredentialsConfig::parse_from([
            "credentials",
            "--credentials-file",
            missing.as_str(),
            "--client-id",
            "id",
        ]);
        let err = config.load().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "missing required credentials: here.token.endpoint.url, here.access.key.secret"
        );
    }
}
