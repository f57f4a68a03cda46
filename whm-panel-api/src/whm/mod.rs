//! WHM JSON API v1 client

mod query;
mod types;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::http_client::HttpUtils;
use crate::traits::ApiExecutor;
use crate::types::{ApiRequest, ApiResponse};
use crate::utils::log_sanitizer::redact_token;

pub use query::{build_query, field_spec};
pub use types::reduce_list_data;
use types::WhmEnvelope;

/// 默认连接超时（秒）
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// 默认请求超时（秒）
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

fn default_username() -> String {
    "root".to_string()
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Connection settings for a WHM server.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Server root, e.g. `https://server.example.com:2087`.
    pub base_url: String,
    /// WHM API token.
    pub api_token: String,
    /// Account the token belongs to.
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Accept self-signed certificates (common on fresh installs).
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: api_token.into(),
            username: default_username(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            accept_invalid_certs: false,
        }
    }

    /// Check that the settings can produce a working client.
    pub fn validate(&self) -> ApiResult<()> {
        let base = self.base_url.trim();
        if !(base.starts_with("https://") || base.starts_with("http://")) {
            return Err(ApiError::InvalidRequest {
                param: "base_url".to_string(),
                detail: format!("expected an http(s) URL, got '{base}'"),
            });
        }
        if self.api_token.trim().is_empty() {
            return Err(ApiError::InvalidRequest {
                param: "api_token".to_string(),
                detail: "must not be empty".to_string(),
            });
        }
        if self.username.trim().is_empty() {
            return Err(ApiError::InvalidRequest {
                param: "username".to_string(),
                detail: "must not be empty".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ApiError::InvalidRequest {
                param: "request_timeout_secs".to_string(),
                detail: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Endpoint URL for an operation.
    pub fn endpoint(&self, operation: &str) -> String {
        format!(
            "{}/json-api/{}",
            self.base_url.trim().trim_end_matches('/'),
            urlencoding::encode(operation)
        )
    }

    fn authorization(&self) -> String {
        format!("whm {}:{}", self.username, self.api_token)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &redact_token(&self.api_token))
            .field("username", &self.username)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

/// 创建带超时配置的 HTTP Client
fn create_http_client(config: &ClientConfig) -> ApiResult<Client> {
    let builder = Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.request_timeout_secs));

    #[cfg(any(feature = "native-tls", feature = "rustls"))]
    let builder = builder.danger_accept_invalid_certs(config.accept_invalid_certs);

    builder.build().map_err(|e| ApiError::InvalidRequest {
        param: "http_client".to_string(),
        detail: e.to_string(),
    })
}

/// [`ApiExecutor`] backed by a live WHM server.
///
/// Every call is a form-encoded `POST` so large payloads (rule text) are not limited by URL
/// length.
pub struct WhmClient {
    client: Client,
    config: ClientConfig,
}

impl WhmClient {
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        config.validate()?;
        let client = create_http_client(&config)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl ApiExecutor for WhmClient {
    async fn execute(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        let operation = request.operation.as_str();
        if operation.is_empty() {
            return Err(ApiError::InvalidRequest {
                param: "operation".to_string(),
                detail: "must not be empty".to_string(),
            });
        }

        let url = self.config.endpoint(operation);
        let form = build_query(request);
        let builder = self
            .client
            .post(&url)
            .header("Authorization", self.config.authorization())
            .form(&form);

        let (status_code, body) = HttpUtils::execute_request(builder, operation, "POST").await?;
        if !(200..300).contains(&status_code) {
            return Err(ApiError::NetworkError {
                operation: operation.to_string(),
                detail: format!("HTTP {status_code}"),
            });
        }

        let envelope: WhmEnvelope = HttpUtils::parse_json(&body, operation)?;
        Ok(envelope.into_response())
    }
}
