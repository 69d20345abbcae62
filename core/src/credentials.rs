use thiserror::Error;

use crate::region::Region;

/// Header names the transports read tenant credentials from.
pub const CLIENT_ID_HEADER: &str = "x-sitecore-client-id";
pub const CLIENT_SECRET_HEADER: &str = "x-sitecore-client-secret";
pub const REGION_HEADER: &str = "x-sitecore-region";

/// Raw per-request credential extraction. Each field holds the trimmed
/// header (or props-bag) value; absent or empty input becomes `None`.
/// No validation happens here — that is `resolve`'s job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialParts {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub region: Option<String>,
}

impl CredentialParts {
    pub fn new(
        client_id: Option<String>,
        client_secret: Option<String>,
        region: Option<String>,
    ) -> Self {
        Self {
            client_id: clean(client_id),
            client_secret: clean(client_secret),
            region: clean(region),
        }
    }

    /// True when no credential value was carried at all.
    pub fn is_empty(&self) -> bool {
        self.client_id.is_none() && self.client_secret.is_none() && self.region.is_none()
    }

    /// Resolve into usable credentials.
    ///
    /// Fails closed: every field must be present and non-empty before a
    /// client may be constructed. The region value itself is then mapped
    /// onto the closed region set (unrecognized tokens default to EU).
    pub fn resolve(&self) -> Result<Credentials, CredentialsError> {
        let client_id = self
            .client_id
            .clone()
            .ok_or(CredentialsError::Missing("client id"))?;
        let client_secret = self
            .client_secret
            .clone()
            .ok_or(CredentialsError::Missing("client secret"))?;
        let region = self
            .region
            .as_deref()
            .ok_or(CredentialsError::Missing("region"))?;

        Ok(Credentials {
            client_id,
            client_secret,
            region: Region::from_header(Some(region)),
        })
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolved tenant credentials. Reconstructed on every request and dropped
/// with it — never persisted, never shared across requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub region: Region,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("missing credentials: no {0} was provided")]
    Missing(&'static str),
}
