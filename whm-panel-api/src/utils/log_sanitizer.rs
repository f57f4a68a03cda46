//! 日志脱敏
//!
//! WHM responses can carry whole ModSecurity configs (thousands of `SecRule` lines) and the
//! client holds a root API token. Bodies are cut down to a short preview before they reach a
//! log line or an error detail; tokens are masked wherever a config is printed.

/// Longest body preview, in bytes.
const BODY_PREVIEW_BYTES: usize = 256;

/// Token characters left readable, enough to tell two tokens apart.
const TOKEN_VISIBLE_PREFIX: usize = 4;

/// Preview of a response body for logs and error details.
///
/// A body over the preview size is cut at the last char boundary that fits and tagged with
/// its full length, so a config dump still says how big it was.
pub fn truncate_for_log(body: &str) -> String {
    if body.len() <= BODY_PREVIEW_BYTES {
        return body.to_string();
    }
    let cut = body
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|end| *end <= BODY_PREVIEW_BYTES)
        .last()
        .unwrap_or(0);
    format!(
        "{}... [truncated, total {} bytes]",
        &body[..cut],
        body.len()
    )
}

/// Mask the WHM API token. Short tokens are masked completely.
pub fn redact_token(token: &str) -> String {
    let count = token.chars().count();
    if count <= TOKEN_VISIBLE_PREFIX * 2 {
        return "*".repeat(count);
    }
    let prefix: String = token.chars().take(TOKEN_VISIBLE_PREFIX).collect();
    format!("{prefix}****[{count} chars]")
}
