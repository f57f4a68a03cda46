//! WHM API v1 query encoding
//!
//! Sort, filter and paging rules are flattened into `api.*` keys. Each rule gets a
//! field-spec label: `a`..`z`, then `za`..`zz`, `zza`.. and so on.

use crate::types::{ApiRequest, SortDirection};

/// API version sent with every call.
pub const API_VERSION: &str = "1";

/// Label for the `index`-th sort or filter rule.
pub fn field_spec(index: usize) -> String {
    const LETTERS: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";
    let mut label = "z".repeat(index / 26);
    label.push(char::from(LETTERS[index % 26]));
    label
}

/// Flatten a request into form key/value pairs.
pub fn build_query(request: &ApiRequest) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::with_capacity(request.args.len() + 8);
    pairs.push(("api.version".to_string(), API_VERSION.to_string()));

    for (name, value) in &request.args {
        pairs.push((name.clone(), value.clone()));
    }

    if !request.sort.is_empty() {
        pairs.push(("api.sort.enable".to_string(), "1".to_string()));
        for (i, sort) in request.sort.iter().enumerate() {
            let spec = field_spec(i);
            pairs.push((format!("api.sort.{spec}.field"), sort.field.clone()));
            let reverse = if sort.direction == SortDirection::Desc {
                "1"
            } else {
                "0"
            };
            pairs.push((format!("api.sort.{spec}.reverse"), reverse.to_string()));
            if let Some(method) = &sort.method {
                pairs.push((format!("api.sort.{spec}.method"), method.clone()));
            }
        }
    }

    if !request.filters.is_empty() {
        pairs.push(("api.filter.enable".to_string(), "1".to_string()));
        pairs.push(("api.filter.verbose".to_string(), "1".to_string()));
        for (i, filter) in request.filters.iter().enumerate() {
            let spec = field_spec(i);
            pairs.push((format!("api.filter.{spec}.field"), filter.field.clone()));
            pairs.push((format!("api.filter.{spec}.type"), filter.comparator.clone()));
            pairs.push((format!("api.filter.{spec}.arg0"), filter.value.clone()));
        }
    }

    if let Some(paging) = request.paging {
        pairs.push(("api.chunk.enable".to_string(), "1".to_string()));
        pairs.push(("api.chunk.verbose".to_string(), "1".to_string()));
        pairs.push((
            "api.chunk.start".to_string(),
            paging.start_record().to_string(),
        ));
        pairs.push(("api.chunk.size".to_string(), paging.page_size.to_string()));
    }

    pairs
}
