//! Generic HTTP helpers
//!
//! Sending, status classification and logging are shared here so the client module only has
//! to build the request and interpret the envelope.

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::utils::log_sanitizer::truncate_for_log;

/// HTTP tool function set
pub struct HttpUtils;

impl HttpUtils {
    /// Performs an HTTP request and returns response text
    ///
    /// # Arguments
    /// * `request_builder` - configured request constructor (URL, headers, body)
    /// * `operation` - remote procedure name (for logging and error context)
    /// * `method_name` - request method name (such as "GET", "POST", used for logs)
    ///
    /// # Returns
    /// * `Ok((status_code, response_text))` for any status not classified below
    /// * `Err(ApiError::InvalidCredentials)` - HTTP 401
    /// * `Err(ApiError::PermissionDenied)` - HTTP 403
    /// * `Err(ApiError::NetworkError)` - connection failure or HTTP 502/503/504
    /// * `Err(ApiError::Timeout)` - request timed out
    pub async fn execute_request(
        request_builder: RequestBuilder,
        operation: &str,
        method_name: &str,
    ) -> Result<(u16, String), ApiError> {
        log::debug!("[whm] {method_name} {operation}");

        let response = request_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout {
                    operation: operation.to_string(),
                    detail: e.to_string(),
                }
            } else {
                ApiError::NetworkError {
                    operation: operation.to_string(),
                    detail: e.to_string(),
                }
            }
        })?;

        let status_code = response.status().as_u16();
        log::debug!("[whm] {operation} Response Status: {status_code}");

        if status_code == 401 {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[whm] {operation}: API token refused (HTTP 401)");
            return Err(ApiError::InvalidCredentials {
                raw_message: non_empty(body),
            });
        }

        if status_code == 403 {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[whm] {operation}: permission denied (HTTP 403)");
            return Err(ApiError::PermissionDenied {
                operation: operation.to_string(),
                raw_message: non_empty(body),
            });
        }

        if matches!(status_code, 502..=504) {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[whm] {operation}: server error (HTTP {status_code})");
            return Err(ApiError::NetworkError {
                operation: operation.to_string(),
                detail: format!("HTTP {status_code}: {}", truncate_for_log(&body)),
            });
        }

        let response_text = response.text().await.map_err(|e| ApiError::NetworkError {
            operation: operation.to_string(),
            detail: format!("Failed to read response body: {e}"),
        })?;

        log::debug!(
            "[whm] {operation} Response Body: {}",
            truncate_for_log(&response_text)
        );

        Ok((status_code, response_text))
    }

    /// Parse JSON response
    ///
    /// # Returns
    /// * `Ok(T)` - successfully parsed
    /// * `Err(ApiError::ParseError)` - parsing failed
    pub fn parse_json<T>(response_text: &str, operation: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(response_text).map_err(|e| {
            log::error!("[whm] {operation} JSON parse failed: {e}");
            log::error!(
                "[whm] {operation} Raw response: {}",
                truncate_for_log(response_text)
            );
            ApiError::ParseError {
                operation: operation.to_string(),
                detail: e.to_string(),
            }
        })
    }
}

fn non_empty(body: String) -> Option<String> {
    if body.trim().is_empty() {
        None
    } else {
        Some(truncate_for_log(&body))
    }
}
