use std::{fmt::Debug, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use reqwest::{StatusCode, header::AUTHORIZATION};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    Credentials, Error, Result,
    signing::{self, TOKEN_REQUEST_FORM},
    time::{SystemProvider, TimeProvider},
};

/// Lifetime assumed when the token response does not advertise `expires_in`
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Subtracted from the advertised lifetime so a token is never used right at its expiry
///
/// Short-lived tokens lose at most a tenth of their lifetime instead.
pub const EXPIRY_SAFETY_MARGIN: Duration = Duration::from_secs(30);

/// How long an obtained token is reused before a new one is requested
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenPolicy {
    /// Upper bound on how long a token is cached, regardless of what the token endpoint
    /// advertises. `None` trusts the advertised lifetime.
    pub max_age: Option<Duration>,
}

impl TokenPolicy {
    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            max_age: Some(max_age),
        }
    }

    fn lifetime(&self, expires_in: Option<u64>) -> Duration {
        let advertised = expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let advertised = advertised.saturating_sub(EXPIRY_SAFETY_MARGIN.min(advertised / 10));
        match self.max_age {
            Some(max_age) => advertised.min(max_age),
            None => advertised,
        }
    }
}

/// An access token to send as `Authorization: Bearer <token>`
#[derive(Clone)]
pub struct BearerToken(Arc<Secret<String>>);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Arc::new(Secret::new(token.into())))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

impl PartialEq for BearerToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for BearerToken {}

#[derive(Debug)]
struct CachedToken {
    token: BearerToken,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Obtains and caches the process-wide bearer token
///
/// The cached token lives in a single cell behind an async mutex, which is held while checking
/// expiry and, when needed, for the duration of the token request itself. Concurrent callers
/// therefore wait for one in-flight refresh instead of each issuing their own.
#[derive(Debug)]
pub struct TokenManager {
    credentials: Credentials,
    policy: TokenPolicy,
    http_client: reqwest::Client,
    time_provider: Arc<dyn TimeProvider>,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenManager {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            policy: TokenPolicy::default(),
            http_client: reqwest::Client::new(),
            time_provider: Arc::new(SystemProvider::new()),
            cached: Mutex::new(None),
        }
    }

    pub fn with_policy(mut self, policy: TokenPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_time_provider(mut self, time_provider: Arc<dyn TimeProvider>) -> Self {
        self.time_provider = time_provider;
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Return a valid token, requesting a new one if none is cached or the cached one expired
    ///
    /// A `401` from the token endpoint is reported as [`Error::Authentication`] and is not
    /// retried; any other non-`200` is an [`Error::TokenRequest`] carrying the response body.
    pub async fn get_token(&self) -> Result<BearerToken> {
        let mut cached = self.cached.lock().await;
        let now = self.time_provider.now();
        if let Some(c) = cached.as_ref().filter(|c| now < c.expires_at) {
            debug!(expires_at = %c.expires_at, "reusing cached bearer token");
            return Ok(c.token.clone());
        }

        let (token, lifetime) = self.request_token(now).await?;
        let expires_at = chrono::Duration::from_std(lifetime)
            .ok()
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(now);
        info!(%expires_at, lifetime_secs = lifetime.as_secs(), "obtained new bearer token");
        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at,
        });
        Ok(token)
    }

    /// Drop the cached token so that the next [`get_token`](Self::get_token) goes to the
    /// network regardless of the recorded expiry
    pub async fn invalidate(&self) {
        if self.cached.lock().await.take().is_some() {
            warn!("bearer token invalidated");
        }
    }

    /// Drop the cached token only if it is still `rejected`
    ///
    /// Used after a resource server answered `401` for `rejected`: if another caller already
    /// replaced the token in the meantime, the newer token is kept. Returns whether the cached
    /// token was dropped.
    pub async fn invalidate_rejected(&self, rejected: &BearerToken) -> bool {
        let mut cached = self.cached.lock().await;
        if cached.as_ref().is_some_and(|c| &c.token == rejected) {
            *cached = None;
            warn!("bearer token rejected by upstream, invalidated");
            true
        } else {
            false
        }
    }

    /// Invalidate the cached token and obtain a new one
    pub async fn force_refresh(&self) -> Result<BearerToken> {
        self.invalidate().await;
        self.get_token().await
    }

    /// Confirm the credentials work by obtaining (or reusing) a token
    ///
    /// Meant to run once at startup so that bad credentials stop the process before it serves
    /// any request.
    pub async fn validate(&self) -> Result<()> {
        self.get_token().await.map(|_| ())
    }

    async fn request_token(&self, now: DateTime<Utc>) -> Result<(BearerToken, Duration)> {
        let url = self.credentials.token_endpoint();
        let authorization = signing::authorization_header(
            url,
            self.credentials.client_id(),
            self.credentials.client_secret().expose_secret(),
            now.timestamp(),
            &signing::nonce(),
        )?;

        let resp = self
            .http_client
            .post(url.clone())
            .header(AUTHORIZATION, authorization)
            .form(TOKEN_REQUEST_FORM)
            .send()
            .await
            .map_err(|source| Error::RequestSend {
                url: url.to_string(),
                source,
            })?;

        match resp.status() {
            StatusCode::OK => {
                let body: TokenResponse = resp.json().await.map_err(Error::Json)?;
                Ok((
                    BearerToken::new(body.access_token),
                    self.policy.lifetime(body.expires_in),
                ))
            }
            StatusCode::UNAUTHORIZED => Err(Error::Authentication),
            status => Err(Error::TokenRequest {
                status,
                body: resp.text().await.map_err(Error::Text)?,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server, ServerGuard};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::MockProvider;

    const TOKEN_PATH: &str = "/oauth2/token";

    fn start_time() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn manager(server: &ServerGuard, time_provider: Arc<MockProvider>) -> TokenManager {
        let creds = Credentials::new(
            &format!("{}{TOKEN_PATH}", server.url()),
            "client-id",
            "client-secret",
        )
        .unwrap();
        TokenManager::new(creds).with_time_provider(time_provider)
    }

    fn token_body(token: &str, expires_in: u64) -> String {
        format!(r#"{{"access_token":"{token}","token_type":"bearer","expires_in":{expires_in}}}"#)
    }

    #[test]
    fn lifetime_policy() {
        let policy = TokenPolicy::default();
        assert_eq!(policy.lifetime(Some(3600)), Duration::from_secs(3570));
        assert_eq!(policy.lifetime(None), Duration::from_secs(3570));
        // short-lived tokens keep most of their lifetime
        assert_eq!(policy.lifetime(Some(20)), Duration::from_secs(18));
        assert_eq!(policy.lifetime(Some(300)), Duration::from_secs(270));
        assert_eq!(policy.lifetime(Some(0)), Duration::ZERO);

        let policy = TokenPolicy::with_max_age(Duration::from_secs(10));
        assert_eq!(policy.lifetime(Some(86_399)), Duration::from_secs(10));
        assert_eq!(policy.lifetime(Some(5)), Duration::from_millis(4500));
    }

    #[test_log::test(tokio::test)]
    async fn token_is_cached_within_validity_window() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .match_header("authorization", Matcher::Regex("^OAuth .*oauth_signature=".into()))
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::UrlEncoded(
                "grant_type".into(),
                "client_credentials".into(),
            ))
            .with_status(200)
            .with_body(token_body("token-1", 3600))
            .expect(1)
            .create_async()
            .await;

        let time = Arc::new(MockProvider::new(start_time()));
        let tokens = manager(&server, Arc::clone(&time));

        let first = tokens.get_token().await.unwrap();
        time.inc(Duration::from_secs(60));
        let second = tokens.get_token().await.unwrap();

        assert_eq!(first.expose(), "token-1");
        assert_eq!(first, second);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn short_lived_token_is_reused() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_body(token_body("short", 20))
            .expect(1)
            .create_async()
            .await;

        let time = Arc::new(MockProvider::new(start_time()));
        let tokens = manager(&server, Arc::clone(&time));

        tokens.get_token().await.unwrap();
        time.inc(Duration::from_secs(15));
        tokens.get_token().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn expired_token_is_refreshed() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_body(token_body("token", 3600))
            .expect(2)
            .create_async()
            .await;

        let time = Arc::new(MockProvider::new(start_time()));
        let tokens = manager(&server, Arc::clone(&time))
            .with_policy(TokenPolicy::with_max_age(Duration::from_secs(10)));

        tokens.get_token().await.unwrap();
        time.inc(Duration::from_secs(9));
        tokens.get_token().await.unwrap();
        time.inc(Duration::from_secs(1));
        tokens.get_token().await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unauthorized_is_an_authentication_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(401)
            .with_body(r#"{"error":"invalid_client"}"#)
            .expect(1)
            .create_async()
            .await;

        let tokens = manager(&server, Arc::new(MockProvider::new(start_time())));
        let err = tokens.get_token().await.unwrap_err();
        assert!(matches!(err, Error::Authentication));
        assert!(err.is_fatal());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn other_failures_carry_the_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(503)
            .with_body("try later")
            .create_async()
            .await;

        let tokens = manager(&server, Arc::new(MockProvider::new(start_time())));
        match tokens.get_token().await.unwrap_err() {
            Error::TokenRequest { status, body } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "try later");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn force_refresh_ignores_expiry() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_body(token_body("token", 3600))
            .expect(2)
            .create_async()
            .await;

        let tokens = manager(&server, Arc::new(MockProvider::new(start_time())));
        tokens.validate().await.unwrap();
        tokens.force_refresh().await.unwrap();
        // still cached after the forced refresh
        tokens.get_token().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn only_the_rejected_token_is_invalidated() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_body(token_body("current", 3600))
            .expect(1)
            .create_async()
            .await;

        let tokens = manager(&server, Arc::new(MockProvider::new(start_time())));
        let current = tokens.get_token().await.unwrap();

        assert!(!tokens.invalidate_rejected(&BearerToken::new("older")).await);
        assert_eq!(tokens.get_token().await.unwrap(), current);
        mock.assert_async().await;

        assert!(tokens.invalidate_rejected(&current).await);
    }

    #[test]
    fn debug_does_not_leak_token() {
        assert_eq!(
            format!("{:?}", BearerToken::new("hunter2")),
            "BearerToken([REDACTED])"
        );
    }
}
