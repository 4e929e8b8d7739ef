//! HMAC-SHA256 request signing for the WebSocket handshake URL.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use url::Url;

use crate::config::Credentials;

type HmacSha256 = Hmac<Sha256>;

/// RFC 1123 HTTP-date, always rendered in GMT.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

// ---------------------------------------------------------------------------
// SignError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SignError {
    #[error("HMAC initialisation failed: {0}")]
    Hmac(String),

    #[error("invalid endpoint {endpoint}: {reason}")]
    Endpoint { endpoint: String, reason: String },
}

// ---------------------------------------------------------------------------
// SignedEndpoint
// ---------------------------------------------------------------------------

/// A connection URL signed for one attempt.
///
/// Deliberately neither `Clone` nor `Default`: each attempt signs afresh.
#[derive(Debug)]
pub struct SignedEndpoint {
    url: Url,
    date: String,
}

impl SignedEndpoint {
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// The HTTP-date embedded in the signature.
    pub fn date(&self) -> &str {
        &self.date
    }
}

// ---------------------------------------------------------------------------
// sign_endpoint
// ---------------------------------------------------------------------------

/// Build the signed connection URL for `creds` at instant `now`.
///
/// ```text
/// canonical     = "host: {host}\ndate: {date}\n{method} {path} HTTP/1.1"
/// signature     = base64(HMAC-SHA256(canonical, api_secret))
/// authorization = base64('api_key="…", algorithm="hmac-sha256",
///                         headers="host date request-line", signature="…"')
/// url           = {scheme}://{host}{path}?authorization=…&date=…&host=…
/// ```
pub fn sign_endpoint(
    now: DateTime<Utc>,
    creds: &Credentials,
    method: &str,
) -> Result<SignedEndpoint, SignError> {
    let date = now.format(HTTP_DATE_FORMAT).to_string();

    let canonical = format!(
        "host: {}\ndate: {}\n{} {} HTTP/1.1",
        creds.host, date, method, creds.path
    );

    let mut mac = HmacSha256::new_from_slice(creds.api_secret.as_bytes())
        .map_err(|e| SignError::Hmac(e.to_string()))?;
    mac.update(canonical.as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());

    let authorization = format!(
        r#"api_key="{}", algorithm="hmac-sha256", headers="host date request-line", signature="{}""#,
        creds.api_key, signature
    );
    let authorization = BASE64.encode(authorization.as_bytes());

    let base = format!("{}://{}{}", creds.scheme, creds.host, creds.path);
    let mut url = Url::parse(&base).map_err(|e| SignError::Endpoint {
        endpoint: base.clone(),
        reason: e.to_string(),
    })?;
    url.query_pairs_mut()
        .append_pair("authorization", &authorization)
        .append_pair("date", &date)
        .append_pair("host", &creds.host);

    Ok(SignedEndpoint { url, date })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
