//! 列表视图状态类型

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::form_urlencoded;

use super::record::{value_to_text, ListItem};
use crate::config::ViewDefaults;
use crate::error::{CoreError, CoreResult};

pub use whm_panel_api::SortDirection;

/// Field name matching any field in a filter.
pub const ANY_FIELD: &str = "*";

/// How sort keys are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortType {
    /// Case-insensitive string comparison.
    Lexical,
    /// Numeric comparison; non-numeric values sort first.
    Numeric,
    /// Numeric when both sides are numbers, lexical otherwise.
    #[default]
    Natural,
}

impl SortType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::Numeric => "numeric",
            Self::Natural => "natural",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lexical" | "lexicographic" => Some(Self::Lexical),
            "numeric" => Some(Self::Numeric),
            "natural" | "auto" => Some(Self::Natural),
            _ => None,
        }
    }

    /// WHM `api.sort.{x}.method` value; natural leaves the choice to the server.
    pub fn api_method(self) -> Option<String> {
        match self {
            Self::Lexical => Some("lexicographic".to_string()),
            Self::Numeric => Some("numeric".to_string()),
            Self::Natural => None,
        }
    }

    /// Compare two optional field values. Missing values sort first.
    pub fn compare(self, a: Option<&Value>, b: Option<&Value>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => match self {
                Self::Lexical => compare_text(a, b),
                Self::Numeric => compare_numbers(as_number(a), as_number(b)),
                Self::Natural => match (as_number(a), as_number(b)) {
                    (Some(x), Some(y)) => x.total_cmp(&y),
                    _ => compare_text(a, b),
                },
            },
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn compare_numbers(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_text(a: &Value, b: &Value) -> Ordering {
    let a = value_to_text(a).unwrap_or_default().to_lowercase();
    let b = value_to_text(b).unwrap_or_default().to_lowercase();
    a.cmp(&b)
}

/// Filter comparison, case-insensitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterComparator {
    #[default]
    Contains,
    Eq,
    Begins,
    Ends,
}

impl FilterComparator {
    /// WHM `api.filter.{x}.type` value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Eq => "eq",
            Self::Begins => "begins",
            Self::Ends => "ends",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "contains" => Some(Self::Contains),
            "eq" | "==" => Some(Self::Eq),
            "begins" => Some(Self::Begins),
            "ends" => Some(Self::Ends),
            _ => None,
        }
    }

    /// `needle` must already be lowercase.
    fn test(self, haystack: &str, needle: &str) -> bool {
        let haystack = haystack.to_lowercase();
        match self {
            Self::Contains => haystack.contains(needle),
            Self::Eq => haystack == needle,
            Self::Begins => haystack.starts_with(needle),
            Self::Ends => haystack.ends_with(needle),
        }
    }
}

/// A single filter: `field` (or `*`) compared against `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDescriptor {
    pub field: String,
    pub comparator: FilterComparator,
    pub value: String,
}

impl FilterDescriptor {
    pub fn new(field: impl Into<String>, comparator: FilterComparator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            comparator,
            value: value.into(),
        }
    }

    /// `contains` over every field.
    pub fn any_field(value: impl Into<String>) -> Self {
        Self::new(ANY_FIELD, FilterComparator::Contains, value)
    }

    /// An empty value filters nothing.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn matches<T: ListItem>(&self, item: &T) -> bool {
        if self.is_empty() {
            return true;
        }
        let needle = self.value.to_lowercase();
        if self.field == ANY_FIELD {
            item.field_values()
                .iter()
                .filter_map(value_to_text)
                .any(|text| self.comparator.test(&text, &needle))
        } else {
            item.field(&self.field)
                .as_ref()
                .and_then(value_to_text)
                .is_some_and(|text| self.comparator.test(&text, &needle))
        }
    }
}

/// Sort, filter and page parameters of one list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub sort_field: Option<String>,
    pub sort_direction: SortDirection,
    pub sort_type: Option<SortType>,
    pub filter: Option<FilterDescriptor>,
    /// 1-based.
    pub page_number: u32,
    pub page_size: u32,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::from_defaults(&ViewDefaults::default())
    }
}

impl ViewState {
    pub fn from_defaults(defaults: &ViewDefaults) -> Self {
        Self {
            sort_field: None,
            sort_direction: SortDirection::Asc,
            sort_type: None,
            filter: None,
            page_number: 1,
            page_size: defaults.page_size.max(1),
        }
    }

    /// Builder: initial sort.
    #[must_use]
    pub fn sorted_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_field = Some(field.into());
        self.sort_direction = direction;
        self
    }

    /// The filter if it filters anything.
    pub fn active_filter(&self) -> Option<&FilterDescriptor> {
        self.filter.as_ref().filter(|f| !f.is_empty())
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.page_size == 0 {
            return Err(CoreError::ValidationError(
                "page size must be greater than zero".to_string(),
            ));
        }
        if self.page_number == 0 {
            return Err(CoreError::ValidationError(
                "page number must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// 0-based offset of the first row on the current page.
    pub fn offset(&self) -> usize {
        (self.page_number.max(1) as usize - 1) * self.page_size as usize
    }

    /// Serialize to the route parameters used by the WHM list pages.
    pub fn to_query_string(&self) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());
        out.append_pair("page", &self.page_number.to_string());
        out.append_pair("pageSize", &self.page_size.to_string());
        if let Some(field) = &self.sort_field {
            out.append_pair("sort", field);
            out.append_pair("dir", self.sort_direction.as_str());
        }
        if let Some(sort_type) = self.sort_type {
            out.append_pair("sortType", sort_type.as_str());
        }
        if let Some(filter) = self.active_filter() {
            out.append_pair("filterBy", &filter.field);
            out.append_pair("filterCompare", filter.comparator.as_str());
            out.append_pair("filterValue", &filter.value);
        }
        out.finish()
    }

    /// Restore from route parameters. Missing or malformed values fall back to `defaults`.
    pub fn from_query_string(query: &str, defaults: &Self) -> Self {
        let mut state = defaults.clone();
        let mut filter_by = None;
        let mut filter_compare = None;
        let mut filter_value = None;

        for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                "page" => {
                    if let Ok(n) = value.parse::<u32>() {
                        state.page_number = n.max(1);
                    }
                }
                "pageSize" => {
                    if let Ok(n) = value.parse::<u32>() {
                        if n > 0 {
                            state.page_size = n;
                        }
                    }
                }
                "sort" if !value.is_empty() => state.sort_field = Some(value.into_owned()),
                "dir" => state.sort_direction = SortDirection::parse(&value),
                "sortType" => state.sort_type = SortType::parse(&value),
                "filterBy" => filter_by = Some(value.into_owned()),
                "filterCompare" => filter_compare = FilterComparator::parse(&value),
                "filterValue" => filter_value = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(value) = filter_value.filter(|v| !v.is_empty()) {
            state.filter = Some(FilterDescriptor::new(
                filter_by.unwrap_or_else(|| ANY_FIELD.to_string()),
                filter_compare.unwrap_or_default(),
                value,
            ));
        }
        state
    }
}

/// One computed page plus what a pager needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slice<T> {
    pub items: Vec<T>,
    pub total_items: u64,
    pub total_pages: u32,
    pub page_number: u32,
    pub page_size: u32,
    /// 1-based row number of the first visible item, 0 when empty.
    pub start: u64,
    /// 1-based row number of the last visible item, 0 when empty.
    pub limit: u64,
}

impl<T> Slice<T> {
    pub fn new(items: Vec<T>, total_items: u64, page_number: u32, page_size: u32) -> Self {
        let total_pages = whm_panel_api::total_pages_for(total_items, page_size);
        let (start, limit) = display_range(items.len(), total_items, page_number, page_size);
        Self {
            items,
            total_items,
            total_pages,
            page_number,
            page_size,
            start,
            limit,
        }
    }

    /// Use the server's page count instead of the computed one.
    #[must_use]
    pub fn with_total_pages(mut self, total_pages: u32) -> Self {
        self.total_pages = total_pages.max(1);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for Slice<T> {
    fn default() -> Self {
        Self::new(Vec::new(), 0, 1, 1)
    }
}

/// `(start, limit)` for the "showing X-Y of Z" line.
pub fn display_range(visible: usize, total_items: u64, page_number: u32, page_size: u32) -> (u64, u64) {
    if visible == 0 || total_items == 0 {
        return (0, 0);
    }
    let start = u64::from(page_number.max(1) - 1) * u64::from(page_size) + 1;
    let limit = (start + visible as u64 - 1).min(total_items);
    (start, limit)
}
