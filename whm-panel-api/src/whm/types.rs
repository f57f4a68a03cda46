//! WHM API v1 raw envelope

use serde::Deserialize;
use serde_json::Value;

use crate::types::{ApiResponse, PaginateMeta, ResponseMeta, parse_perl_boolean, value_as_u64};

/// Top-level JSON body of a v1 call.
#[derive(Debug, Deserialize)]
pub(crate) struct WhmEnvelope {
    #[serde(default)]
    pub metadata: WhmMetadata,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WhmMetadata {
    /// `1` on success. Arrives as a number or a string depending on the call.
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub chunk: Option<WhmChunk>,
}

/// Present when `api.chunk.verbose = 1`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct WhmChunk {
    #[serde(default)]
    pub records: Value,
    #[serde(default)]
    pub chunks: Value,
    #[serde(default)]
    pub current: Value,
    #[serde(default)]
    pub size: Value,
}

impl WhmChunk {
    fn to_paginate(&self) -> PaginateMeta {
        let as_u32 = |v: &Value| value_as_u64(v).and_then(|n| u32::try_from(n).ok());
        PaginateMeta {
            total_records: value_as_u64(&self.records).unwrap_or(0),
            total_pages: as_u32(&self.chunks).unwrap_or(0),
            current_page: as_u32(&self.current).unwrap_or(0),
            page_size: as_u32(&self.size).unwrap_or(0),
        }
    }
}

impl WhmEnvelope {
    /// Normalize into an [`ApiResponse`].
    pub fn into_response(self) -> ApiResponse {
        let status = parse_perl_boolean(&self.metadata.result);
        let paginate = self
            .metadata
            .chunk
            .as_ref()
            .map(WhmChunk::to_paginate)
            .unwrap_or_default();

        ApiResponse {
            status,
            data: if status {
                reduce_list_data(self.data)
            } else {
                self.data
            },
            meta: ResponseMeta { paginate },
            error: if status { None } else { self.metadata.reason },
        }
    }
}

/// List calls wrap their array in a single-key hash (`{"vendors": [...]}`); unwrap it.
pub fn reduce_list_data(data: Value) -> Value {
    match data {
        Value::Object(mut map) if map.len() == 1 => {
            let is_list = map.values().next().is_some_and(Value::is_array);
            if is_list {
                let key = map.keys().next().cloned().unwrap_or_default();
                map.remove(&key).unwrap_or(Value::Null)
            } else {
                Value::Object(map)
            }
        }
        other => other,
    }
}
