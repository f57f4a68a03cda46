//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

// Re-export library error type
pub use whm_panel_api::ApiError;

/// Core layer error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// Validation error (bad page size, empty vendor list, malformed config)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Rule lookup by id matched nothing
    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    /// Vendor lookup by id matched nothing
    #[error("Vendor not found: {0}")]
    VendorNotFound(String),

    /// Vendor lookup by id matched more than one vendor
    #[error("Vendor id {id} is not unique: {count} vendors matched")]
    VendorNotUnique { id: String, count: usize },

    /// Rule lookup by id matched more than one rule
    #[error("Rule id {id} is not unique: {count} rules matched")]
    RuleNotUnique { id: String, count: usize },

    /// One chunk of a chunked transfer failed; later chunks were not sent
    #[error("Chunk {page} of {total_pages} failed: {reason}")]
    ChunkTransferFailed {
        page: u32,
        total_pages: u32,
        reason: String,
        /// Underlying error, kept for `is_expected` classification
        #[serde(skip)]
        #[source]
        source: Option<ApiError>,
    },

    /// A reserved-name or username pattern does not compile
    #[error("Invalid pattern '{pattern}': {detail}")]
    InvalidPattern { pattern: String, detail: String },

    /// Storage layer error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A remote view has no source to fetch from
    #[error("Nothing to fetch: {0}")]
    NothingToFetch(String),

    /// API error (converting from library)
    #[error("{0}")]
    Api(#[from] ApiError),
}

impl CoreError {
    /// Whether it is expected behavior (user input, resource does not exist, etc.) is used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    /// **Please update this method simultaneously when new variants are added. **
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::ValidationError(_)
            | Self::RuleNotFound(_)
            | Self::RuleNotUnique { .. }
            | Self::VendorNotFound(_)
            | Self::VendorNotUnique { .. }
            | Self::NothingToFetch(_) => true,
            Self::ChunkTransferFailed { source, .. } => {
                source.as_ref().is_some_and(ApiError::is_expected)
            }
            Self::Api(e) => e.is_expected(),
            _ => false,
        }
    }

    /// Whether the remote side flagged the request as a duplicate edit.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        match self {
            Self::Api(e) => e.is_duplicate(),
            Self::ChunkTransferFailed {
                source: Some(e), ..
            } => e.is_duplicate(),
            _ => false,
        }
    }

    /// Log at `warn` or `error` depending on [`is_expected`](Self::is_expected).
    pub fn log(&self, context: &str) {
        if self.is_expected() {
            log::warn!("{context}: {self}");
        } else {
            log::error!("{context}: {self}");
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;
