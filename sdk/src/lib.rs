//! Tenant-API client for Sitecore Personalize.
//!
//! Owns the HTTP calls, OAuth client-credentials token acquisition and
//! region endpoint selection. Constructing a [`Client`] performs no network
//! I/O — the bearer token is acquired lazily on the first API call and
//! cached until shortly before its reported expiry.

mod auth;
mod flows;

pub use flows::Flows;

use personalize_core::credentials::Credentials;
use personalize_core::region::Region;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

/// Sitecore Cloud login service used for client-credentials grants,
/// shared by all regions.
pub const AUTH_TOKEN_URL: &str = "https://auth.sitecorecloud.io/oauth/token";
pub const AUTH_AUDIENCE: &str = "https://api.sitecorecloud.io";

/// Tenant API base URL for a region.
pub fn api_base_url(region: Region) -> &'static str {
    match region {
        Region::Eu => "https://api-engage-eu.sitecorecloud.io",
        Region::Us => "https://api-engage-us.sitecorecloud.io",
        Region::Apj => "https://api-engage-ap.sitecorecloud.io",
    }
}

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("missing credentials: no {0} was provided")]
    MissingCredentials(&'static str),
    #[error("failed to reach {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to read API response body: {0}")]
    Response(#[source] reqwest::Error),
    #[error("token request was rejected ({status}): {message}")]
    Auth { status: u16, message: String },
    #[error("API call failed ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("failed to serialize request payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A configured tenant client. Owned exclusively by the request that
/// created it; holds the resolved region endpoint and the cached token.
pub struct Client {
    credentials: Credentials,
    base_url: String,
    http: reqwest::Client,
    token: Mutex<Option<auth::CachedToken>>,
}

impl Client {
    /// Build a client from resolved credentials. Fails closed when either
    /// opaque value is empty; no network call happens here.
    pub fn new(credentials: Credentials) -> Result<Self, SdkError> {
        if credentials.client_id.is_empty() {
            return Err(SdkError::MissingCredentials("client id"));
        }
        if credentials.client_secret.is_empty() {
            return Err(SdkError::MissingCredentials("client secret"));
        }
        let base_url = api_base_url(credentials.region).to_string();
        Ok(Self {
            credentials,
            base_url,
            http: reqwest::Client::new(),
            token: Mutex::new(None),
        })
    }

    pub fn region(&self) -> Region {
        self.credentials.region
    }

    /// The `Flows` resource: personalization experiences and experiments.
    pub fn flows(&self) -> Flows<'_> {
        Flows { client: self }
    }

    pub(crate) async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, SdkError> {
        let token = self.bearer_token().await?;
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.http.request(method.clone(), &url).bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!(method = %method, path, "tenant API call");
        let response = request.send().await.map_err(|source| SdkError::Connection {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(SdkError::Response)?;
        let body = parse_body(&bytes);

        if !status.is_success() {
            return Err(SdkError::Api {
                status: status.as_u16(),
                message: error_message(&body, status.as_u16()),
            });
        }
        Ok(body)
    }

    async fn bearer_token(&self) -> Result<String, SdkError> {
        let mut slot = self.token.lock().await;
        if let Some(cached) = slot.as_ref() {
            if !cached.is_expired(chrono::Utc::now()) {
                return Ok(cached.access_token.clone());
            }
        }
        let fresh = auth::acquire_token(&self.http, &self.credentials).await?;
        let token = fresh.access_token.clone();
        *slot = Some(fresh);
        Ok(token)
    }
}

fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Pull the most useful human-readable message out of a tenant error body.
fn error_message(body: &Value, status: u16) -> String {
    for key in ["message", "error_description", "error"] {
        if let Some(text) = body.get(key).and_then(Value::as_str) {
            if !text.is_empty() {
                return text.to_string();
            }
        }
    }
    if let Value::String(text) = body {
        if !text.is_empty() {
            return text.clone();
        }
    }
    format!("HTTP {status}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use personalize_core::credentials::Credentials;
    use serde_json::json;

    fn credentials(region: Region) -> Credentials {
        Credentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            region,
        }
    }

    #[test]
    fn region_selects_the_matching_endpoint() {
        assert_eq!(
            api_base_url(Region::Eu),
            "https://api-engage-eu.sitecorecloud.io"
        );
        assert_eq!(
            api_base_url(Region::Us),
            "https://api-engage-us.sitecorecloud.io"
        );
        assert_eq!(
            api_base_url(Region::Apj),
            "https://api-engage-ap.sitecorecloud.io"
        );
    }

    #[test]
    fn client_construction_fails_closed_on_empty_values() {
        let mut creds = credentials(Region::Eu);
        creds.client_id = String::new();
        assert!(matches!(
            Client::new(creds),
            Err(SdkError::MissingCredentials("client id"))
        ));

        let mut creds = credentials(Region::Eu);
        creds.client_secret = String::new();
        assert!(matches!(
            Client::new(creds),
            Err(SdkError::MissingCredentials("client secret"))
        ));
    }

    #[test]
    fn client_construction_is_network_free_and_region_aware() {
        let client = Client::new(credentials(Region::Apj)).unwrap();
        assert_eq!(client.region(), Region::Apj);
        assert_eq!(client.base_url, api_base_url(Region::Apj));
    }

    #[test]
    fn error_message_prefers_structured_fields() {
        let body = json!({ "message": "flow not found" });
        assert_eq!(error_message(&body, 404), "flow not found");

        let body = json!({ "error": "invalid_client" });
        assert_eq!(error_message(&body, 401), "invalid_client");

        assert_eq!(error_message(&Value::Null, 502), "HTTP 502");
        assert_eq!(
            error_message(&Value::String("gateway timeout".to_string()), 504),
            "gateway timeout"
        );
    }

    #[test]
    fn parse_body_falls_back_to_raw_text() {
        assert_eq!(parse_body(b""), Value::Null);
        assert_eq!(parse_body(b"{\"ok\":true}"), json!({ "ok": true }));
        assert_eq!(
            parse_body(b"upstream exploded"),
            Value::String("upstream exploded".to_string())
        );
    }
}
