use serde::{Deserialize, Serialize};

/// Unified error type for every call made through an [`ApiExecutor`](crate::ApiExecutor).
///
/// Each variant names the remote `operation` (e.g. `modsec_get_rules`) that produced it,
/// plus variant-specific context. All variants are serializable for structured error reporting.
///
/// # Transport vs. application errors
///
/// - [`NetworkError`](Self::NetworkError) and [`Timeout`](Self::Timeout) mean the backend
///   could not be reached. They are surfaced as-is; nothing in this workspace retries them.
/// - [`Rejected`](Self::Rejected) means the backend answered with `status = false`.
///   The `duplicate` flag is carried along because some callers treat it as a soft success.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum ApiError {
    /// A network-level error occurred (DNS resolution failure, connection refused, 5xx gateway).
    NetworkError {
        /// Operation that was being executed.
        operation: String,
        /// Error details.
        detail: String,
    },

    /// The HTTP request timed out.
    Timeout {
        /// Operation that was being executed.
        operation: String,
        /// Error details.
        detail: String,
    },

    /// The API token was refused (HTTP 401).
    InvalidCredentials {
        /// Original error message from the server, if available.
        raw_message: Option<String>,
    },

    /// The authenticated user lacks the ACL for the requested operation (HTTP 403).
    PermissionDenied {
        /// Operation that was being executed.
        operation: String,
        /// Original error message from the server, if available.
        raw_message: Option<String>,
    },

    /// The backend processed the call and reported failure (`metadata.result = 0`).
    Rejected {
        /// Operation that was rejected.
        operation: String,
        /// Human-readable reason supplied by the server.
        message: String,
        /// The server flagged the request as a duplicate of an already staged edit.
        #[serde(default)]
        duplicate: bool,
    },

    /// Failed to parse the server's response.
    ParseError {
        /// Operation that was being executed.
        operation: String,
        /// Details about the parse failure.
        detail: String,
    },

    /// The request could not be built (bad configuration or argument).
    InvalidRequest {
        /// Name of the offending parameter.
        param: String,
        /// Description of what's wrong.
        detail: String,
    },
}

impl ApiError {
    /// 是否为预期行为（用户输入、资源不存在等），用于日志分级。
    ///
    /// 返回 `true` 时应使用 `warn` 级别，`false` 时使用 `error` 级别。
    /// **新增变体时请同步更新此方法。**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials { .. }
                | Self::PermissionDenied { .. }
                | Self::Rejected { .. }
                | Self::InvalidRequest { .. }
        )
    }

    /// Whether the failure happened below the application layer.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::NetworkError { .. } | Self::Timeout { .. })
    }

    /// Whether the server reported the request as a duplicate edit.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Rejected { duplicate: true, .. })
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkError { operation, detail } => {
                write!(f, "[{operation}] Network error: {detail}")
            }
            Self::Timeout { operation, detail } => {
                write!(f, "[{operation}] Request timed out: {detail}")
            }
            Self::InvalidCredentials { raw_message } => {
                if let Some(msg) = raw_message {
                    write!(f, "Invalid API token: {msg}")
                } else {
                    write!(f, "Invalid API token")
                }
            }
            Self::PermissionDenied {
                operation,
                raw_message,
            } => {
                if let Some(msg) = raw_message {
                    write!(f, "[{operation}] Permission denied: {msg}")
                } else {
                    write!(f, "[{operation}] Permission denied")
                }
            }
            Self::Rejected {
                operation,
                message,
                duplicate,
            } => {
                if *duplicate {
                    write!(f, "[{operation}] Duplicate edit: {message}")
                } else {
                    write!(f, "[{operation}] {message}")
                }
            }
            Self::ParseError { operation, detail } => {
                write!(f, "[{operation}] Failed to parse response: {detail}")
            }
            Self::InvalidRequest { param, detail } => {
                write!(f, "Invalid request parameter '{param}': {detail}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Result alias used throughout this crate.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
