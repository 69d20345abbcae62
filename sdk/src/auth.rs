//! OAuth client-credentials token acquisition against the Sitecore Cloud
//! login service.

use chrono::{DateTime, Duration, Utc};
use personalize_core::credentials::Credentials;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AUTH_AUDIENCE, AUTH_TOKEN_URL, SdkError};

/// Reacquire this long before the reported expiry so a token never dies
/// mid-request.
const EXPIRY_BUFFER_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub(crate) struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            access_token: response.access_token,
            expires_at: now + Duration::seconds(response.expires_in),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_BUFFER_SECS) >= self.expires_at
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

pub(crate) fn token_request_body(credentials: &Credentials) -> Value {
    json!({
        "client_id": credentials.client_id,
        "client_secret": credentials.client_secret,
        "grant_type": "client_credentials",
        "audience": AUTH_AUDIENCE,
    })
}

pub(crate) async fn acquire_token(
    http: &reqwest::Client,
    credentials: &Credentials,
) -> Result<CachedToken, SdkError> {
    tracing::debug!(region = %credentials.region, "acquiring tenant access token");
    let response = http
        .post(AUTH_TOKEN_URL)
        .json(&token_request_body(credentials))
        .send()
        .await
        .map_err(|source| SdkError::Connection {
            url: AUTH_TOKEN_URL.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(SdkError::Auth {
            status: status.as_u16(),
            message: if message.is_empty() {
                format!("HTTP {status}")
            } else {
                message
            },
        });
    }

    let token: TokenResponse = response.json().await.map_err(SdkError::Response)?;
    Ok(CachedToken::from_response(token, Utc::now()))
}
