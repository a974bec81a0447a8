//! OAuth 1.0 `HMAC-SHA256` signing of the client-credentials token request
//!
//! The token endpoint authenticates the client by a signature over the request rather than by
//! sending the secret itself. The base string and header are pure functions of their inputs so
//! that callers supply the timestamp and nonce.
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use rand::{Rng, distributions::Alphanumeric};
use sha2::Sha256;
use url::Url;

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_METHOD: &str = "HMAC-SHA256";
pub const OAUTH_VERSION: &str = "1.0";

/// The form body sent with every token request; it is part of the signed parameters
pub const TOKEN_REQUEST_FORM: &[(&str, &str)] = &[("grant_type", "client_credentials")];

const NONCE_LEN: usize = 32;

/// Percent-encode per RFC 3986, leaving only unreserved characters intact
pub fn percent_encode(s: &str) -> String {
    urlencoding::encode(s).to_string()
}

/// Build the signature base string `METHOD&enc(url)&enc(sorted params)`
///
/// Any query or fragment on `url` is dropped; query parameters must be passed in `params`.
pub fn signature_base_string(method: &str, url: &Url, params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();
    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut base_url = url.clone();
    base_url.set_query(None);
    base_url.set_fragment(None);

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(base_url.as_str()),
        percent_encode(&param_string)
    )
}

/// Sign a base string with the client secret; there is no token secret in this flow
pub fn sign(base_string: &str, client_secret: &str) -> Result<String> {
    let key = format!("{}&", percent_encode(client_secret));
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).map_err(|_| Error::Signing)?;
    mac.update(base_string.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Produce the `Authorization` header value for a token request to `url`
pub fn authorization_header(
    url: &Url,
    client_id: &str,
    client_secret: &str,
    timestamp: i64,
    nonce: &str,
) -> Result<String> {
    let timestamp = timestamp.to_string();
    let oauth_params = [
        ("oauth_consumer_key", client_id),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", SIGNATURE_METHOD),
        ("oauth_timestamp", timestamp.as_str()),
        ("oauth_version", OAUTH_VERSION),
    ];

    let mut signed_params = oauth_params.to_vec();
    signed_params.extend_from_slice(TOKEN_REQUEST_FORM);
    let signature = sign(
        &signature_base_string("POST", url, &signed_params),
        client_secret,
    )?;

    let fields = oauth_params
        .into_iter()
        .chain(std::iter::once(("oauth_signature", signature.as_str())))
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(",");
    Ok(format!("OAuth {fields}"))
}

/// A random alphanumeric nonce
pub fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}
