use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

// ============ Request ============

/// Sort direction for list operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

impl SortDirection {
    /// The opposite direction.
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// Wire form (`asc` / `desc`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Parse the wire form; anything other than `desc` is ascending.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }
}

/// One sort rule of a list request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    /// Field to sort by.
    pub field: String,
    /// Direction.
    pub direction: SortDirection,
    /// Optional comparison method understood by the server (e.g. `numeric`, `lexicographic`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// One filter rule of a list request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    /// Field to filter on, `*` for any field.
    pub field: String,
    /// Comparator (`contains`, `eq`, `==`, `begins`, ...).
    pub comparator: String,
    /// Argument passed to the comparator.
    pub value: String,
}

/// Page-based pagination for list requests. Pages are 1-indexed.
///
/// # Default
///
/// The default is `page = 1, page_size = 10`, matching the WHM API default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagingSpec {
    /// Page number (1-indexed).
    pub page: u32,
    /// Number of items per page.
    pub page_size: u32,
}

impl Default for PagingSpec {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
        }
    }
}

impl PagingSpec {
    /// Create a paging spec.
    #[must_use]
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// 1-based index of the first record on this page.
    pub fn start_record(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size) + 1
    }
}

/// A single call to a named remote procedure.
///
/// Arguments are kept in a sorted map so that the encoded form is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequest {
    /// Remote procedure name, e.g. `modsec_get_rules`.
    pub operation: String,
    /// Named arguments.
    pub args: BTreeMap<String, String>,
    /// Sort rules, applied in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortSpec>,
    /// Filter rules, all must match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterSpec>,
    /// Optional pagination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging: Option<PagingSpec>,
}

impl ApiRequest {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Self::default()
        }
    }

    /// Builder form of [`set_arg`](Self::set_arg).
    #[must_use]
    pub fn arg(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.set_arg(name, value);
        self
    }

    /// Set (or replace) a named argument.
    pub fn set_arg(&mut self, name: impl Into<String>, value: impl ToString) {
        self.args.insert(name.into(), value.to_string());
    }

    /// Remove a named argument, returning its previous value.
    pub fn remove_arg(&mut self, name: &str) -> Option<String> {
        self.args.remove(name)
    }

    pub fn get_arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(String::as_str)
    }

    /// Whether a flag argument is present and set to `1`.
    pub fn has_flag(&self, name: &str) -> bool {
        self.get_arg(name) == Some("1")
    }

    #[must_use]
    pub fn filter(
        mut self,
        field: impl Into<String>,
        comparator: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        self.filters.push(FilterSpec {
            field: field.into(),
            comparator: comparator.into(),
            value: value.to_string(),
        });
        self
    }

    #[must_use]
    pub fn sort_by(
        mut self,
        field: impl Into<String>,
        direction: SortDirection,
        method: Option<String>,
    ) -> Self {
        self.sort.push(SortSpec {
            field: field.into(),
            direction,
            method,
        });
        self
    }

    #[must_use]
    pub fn paged(mut self, page: u32, page_size: u32) -> Self {
        self.set_paging(page, page_size);
        self
    }

    pub fn set_paging(&mut self, page: u32, page_size: u32) {
        self.paging = Some(PagingSpec::new(page, page_size));
    }
}

// ============ Response ============

/// Pagination metadata returned by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginateMeta {
    /// Total number of records across all pages.
    #[serde(default)]
    pub total_records: u64,
    /// Total number of pages.
    #[serde(default)]
    pub total_pages: u32,
    /// Page this response carries.
    #[serde(default)]
    pub current_page: u32,
    /// Page size the server used.
    #[serde(default)]
    pub page_size: u32,
}

/// Response metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    #[serde(default)]
    pub paginate: PaginateMeta,
}

/// Normalized response of a single call.
///
/// `status = false` is an application-level rejection: `error` carries the message and
/// `data` may carry operation-specific diagnostics such as a `duplicate` flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub meta: ResponseMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    /// Successful response carrying `data`.
    #[must_use]
    pub fn success(data: Value) -> Self {
        Self {
            status: true,
            data,
            meta: ResponseMeta::default(),
            error: None,
        }
    }

    /// Rejected response carrying `message`.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: false,
            data: Value::Null,
            meta: ResponseMeta::default(),
            error: Some(message.into()),
        }
    }

    /// Attach pagination metadata.
    #[must_use]
    pub fn with_paginate(mut self, total_records: u64, total_pages: u32) -> Self {
        self.meta.paginate.total_records = total_records;
        self.meta.paginate.total_pages = total_pages;
        self
    }

    /// Attach rejection diagnostics.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Whether `data.duplicate` is set (Perl-style boolean).
    pub fn is_duplicate(&self) -> bool {
        self.data.get("duplicate").is_some_and(parse_perl_boolean)
    }

    /// Convert a rejection into [`ApiError::Rejected`].
    pub fn into_result(self, operation: &str) -> ApiResult<Self> {
        if self.status {
            return Ok(self);
        }
        let duplicate = self.is_duplicate();
        Err(ApiError::Rejected {
            operation: operation.to_string(),
            message: self
                .error
                .unwrap_or_else(|| "The server did not provide a reason.".to_string()),
            duplicate,
        })
    }
}

/// `ceil(total / page_size)`, minimum 1.
pub fn total_pages_for(total: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 1;
    }
    let pages = total.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX).max(1)
}

// ============ Value helpers ============

/// Interpret a Perl-style boolean: `0`, `""`, `"0"`, `null` and `false` are false.
pub fn parse_perl_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Read an unsigned integer that may arrive as a number or a numeric string.
pub fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
