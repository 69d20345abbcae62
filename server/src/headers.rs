//! Credential extraction and debug-safe rendering of inbound headers.

use axum::http::HeaderMap;
use personalize_core::credentials::{
    CLIENT_ID_HEADER, CLIENT_SECRET_HEADER, CredentialParts, REGION_HEADER,
};

/// Pull the three tenant credential headers out of a request. Absent or
/// empty headers become `None`; presence is only enforced later, at client
/// construction.
pub fn credential_parts(headers: &HeaderMap) -> CredentialParts {
    CredentialParts::new(
        header_value(headers, CLIENT_ID_HEADER),
        header_value(headers, CLIENT_SECRET_HEADER),
        header_value(headers, REGION_HEADER),
    )
}

fn header_value(headers: &HeaderMap, key: &str) -> Option<String> {
    headers
        .get(key)
        .and_then(|value| value.to_str().ok())
        .map(ToOwned::to_owned)
}

/// Render headers for debug logs. Any header whose name contains "secret"
/// or "token" is masked so credentials never reach the log stream.
pub fn redacted_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name = name.as_str().to_string();
            let lowered = name.to_ascii_lowercase();
            let rendered = if lowered.contains("secret") || lowered.contains("token") {
                "***".to_string()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            (name, rendered)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{credential_parts, redacted_headers};
    use axum::http::HeaderMap;

    fn headers(entries: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in entries {
            map.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                value.parse().unwrap(),
            );
        }
        map
    }

    #[test]
    fn extraction_reads_all_three_credential_headers() {
        let parts = credential_parts(&headers(&[
            ("x-sitecore-client-id", "id"),
            ("x-sitecore-client-secret", "secret"),
            ("x-sitecore-region", "US"),
        ]));
        assert_eq!(parts.client_id.as_deref(), Some("id"));
        assert_eq!(parts.client_secret.as_deref(), Some("secret"));
        assert_eq!(parts.region.as_deref(), Some("US"));
    }

    #[test]
    fn missing_or_empty_headers_extract_as_none() {
        let parts = credential_parts(&headers(&[("x-sitecore-client-id", "  ")]));
        assert!(parts.client_id.is_none());
        assert!(parts.client_secret.is_none());
        assert!(parts.region.is_none());
        assert!(parts.is_empty());
    }

    #[test]
    fn secret_and_token_headers_are_masked_in_logs() {
        let rendered = redacted_headers(&headers(&[
            ("x-sitecore-client-id", "id"),
            ("x-sitecore-client-secret", "hunter2"),
            ("x-access-token", "abc"),
            ("accept", "text/event-stream"),
        ]));
        let lookup = |name: &str| {
            rendered
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(lookup("x-sitecore-client-id"), Some("id"));
        assert_eq!(lookup("x-sitecore-client-secret"), Some("***"));
        assert_eq!(lookup("x-access-token"), Some("***"));
        assert_eq!(lookup("accept"), Some("text/event-stream"));
    }
}
