// API key check for the protected endpoints

use axum::http::HeaderMap;
use olivefly_core::ServiceConfig;

use crate::http::ApiError;

/// Header carrying the shared API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Constant-time string comparison to prevent timing attacks
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Check the `X-API-Key` header. An empty configured key disables the check.
pub fn authorize(config: &ServiceConfig, headers: &HeaderMap, endpoint: &str) -> Result<(), ApiError> {
    if !config.api_key_required() {
        return Ok(());
    }

    let supplied = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if constant_time_eq(supplied, &config.api_key) {
        AuditLogger::log_api_access(supplied, endpoint);
        Ok(())
    } else {
        let reason = if supplied.is_empty() {
            "missing API key"
        } else {
            "invalid API key"
        };
        AuditLogger::log_auth_failure(endpoint, reason);
        Err(ApiError::Unauthorized)
    }
}

/// Audit logger for security events (no sensitive data)
pub struct AuditLogger;

impl AuditLogger {
    pub fn log_auth_failure(endpoint: &str, reason: &str) {
        tracing::warn!("AUTH_FAILURE: endpoint={}, reason={}", endpoint, reason);
    }

    pub fn log_api_access(api_key: &str, endpoint: &str) {
        // Log only key prefix, never full key
        let prefix = api_key.get(..api_key.len().min(4)).unwrap_or("");
        tracing::debug!("API_ACCESS: key={}..., endpoint={}", prefix, endpoint);
    }

    pub fn log_notification(channel: &str, endpoint: &str) {
        tracing::info!("NOTIFY_SENT: channel={}, endpoint={}", channel, endpoint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config_with_key(key: &str) -> ServiceConfig {
        ServiceConfig {
            api_key: key.to_string(),
            ..ServiceConfig::default()
        }
    }

    fn headers_with_key(key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_str(key).unwrap());
        headers
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("secret", "secret"));
        assert!(!constant_time_eq("secret", "secreT"));
        assert!(!constant_time_eq("secret", "secret2"));
        assert!(constant_time_eq("", ""));
    }

    #[test]
    fn test_empty_key_disables_check() {
        let config = config_with_key("");
        assert!(authorize(&config, &HeaderMap::new(), "/api/detect").is_ok());
        assert!(authorize(&config, &headers_with_key("anything"), "/api/detect").is_ok());
    }

    #[test]
    fn test_key_must_match() {
        let config = config_with_key("s3cret");
        assert!(authorize(&config, &headers_with_key("s3cret"), "/api/detect").is_ok());
        assert!(matches!(
            authorize(&config, &headers_with_key("wrong"), "/api/detect"),
            Err(ApiError::Unauthorized)
        ));
        assert!(matches!(
            authorize(&config, &HeaderMap::new(), "/api/detect"),
            Err(ApiError::Unauthorized)
        ));
    }
}
