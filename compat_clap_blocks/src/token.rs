//! CLI config for bearer token caching.

use std::time::Duration;

use compat_auth::TokenPolicy;

#[derive(Debug, Clone, Copy, clap::Parser)]
pub struct TokenConfig {
    /// Upper bound on how long an obtained bearer token is reused, e.g. `10s` or `15m`
    ///
    /// By default a token is reused until shortly before the expiry advertised by the token
    /// endpoint.
    #[clap(
        long = "token-max-age",
        env = "COMPAT_TOKEN_MAX_AGE",
        value_parser = humantime::parse_duration,
        action
    )]
    pub token_max_age: Option<Duration>,
}

impl TokenConfig {
    pub fn policy(&self) -> TokenPolicy {
        TokenPolicy {
            max_age: self.token_max_age,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_humantime() {
        let config = TokenConfig::parse_from(["token", "--token-max-age", "10s"]);
        assert_eq!(
            config.policy(),
            TokenPolicy::with_max_age(Duration::from_secs(10))
        );

        let config = TokenConfig::parse_from(["token", "--token-max-age", "1h 30m"]);
        assert_eq!(config.token_max_age, Some(Duration::from_secs(5400)));
    }

    #[test]
    fn bad_duration_is_rejected() {
        assert!(TokenConfig::try_parse_from(["token", "--token-max-age", "soon"]).is_err());
    }
}
