//! Utility modules.

/// Body previews and token masking for logs.
pub mod log_sanitizer;
