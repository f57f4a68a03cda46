//! 分块传输类型

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use whm_panel_api::ApiRequest;

use crate::error::{CoreError, CoreResult};

/// Position of a chunk within its set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChunkRole {
    First,
    Middle,
    Last,
    /// The only chunk: both first and last.
    Only,
}

impl ChunkRole {
    /// Role of chunk `index` in a set of `count`.
    pub fn for_position(index: usize, count: usize) -> Self {
        match (index == 0, index + 1 == count) {
            (true, true) => Self::Only,
            (true, false) => Self::First,
            (false, true) => Self::Last,
            (false, false) => Self::Middle,
        }
    }

    pub fn is_first(self) -> bool {
        matches!(self, Self::First | Self::Only)
    }

    pub fn is_last(self) -> bool {
        matches!(self, Self::Last | Self::Only)
    }
}

/// One bounded piece of a larger text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// 0-based position.
    pub index: usize,
    pub role: ChunkRole,
    /// Lines of this chunk joined with `\n`, without a separator at either end.
    pub text: String,
    pub line_count: usize,
}

impl Chunk {
    /// 1-based page number used in progress reports.
    pub fn page(&self) -> u32 {
        u32::try_from(self.index + 1).unwrap_or(u32::MAX)
    }
}

/// A text split at line boundaries into chunks of at most `max_lines` lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSet {
    chunks: Vec<Chunk>,
}

impl ChunkSet {
    /// Split `text` on `\n`. A trailing newline produces a trailing empty line, so
    /// [`reassemble`](Self::reassemble) gives back the exact input. Always yields at least
    /// one chunk.
    pub fn split(text: &str, max_lines: usize) -> CoreResult<Self> {
        if max_lines == 0 {
            return Err(CoreError::ValidationError(
                "chunk size must be at least one line".to_string(),
            ));
        }

        let lines: Vec<&str> = text.split('\n').collect();
        let groups: Vec<&[&str]> = lines.chunks(max_lines).collect();
        let count = groups.len();
        let chunks = groups
            .into_iter()
            .enumerate()
            .map(|(index, group)| Chunk {
                index,
                role: ChunkRole::for_position(index, count),
                text: group.join("\n"),
                line_count: group.len(),
            })
            .collect();

        Ok(Self { chunks })
    }

    /// Inverse of [`split`](Self::split).
    pub fn reassemble(&self) -> String {
        self.chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn total_pages(&self) -> u32 {
        u32::try_from(self.chunks.len()).unwrap_or(u32::MAX)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }
}

impl<'a> IntoIterator for &'a ChunkSet {
    type Item = &'a Chunk;
    type IntoIter = std::slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    Upload,
    Download,
}

/// Emitted once per acknowledged chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProgress {
    pub direction: TransferDirection,
    /// 1-based page just acknowledged.
    pub page: u32,
    pub total_pages: u32,
    /// Text of the page, downloads only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl TransferProgress {
    pub fn is_done(&self) -> bool {
        self.page >= self.total_pages
    }
}

/// How an upload ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum UploadOutcome {
    /// Every chunk was acknowledged.
    Completed { pages: u32, deployed: bool },
    /// The server reported the first chunk as an already staged edit.
    Duplicate { deployed: bool },
}

impl UploadOutcome {
    pub fn deployed(&self) -> bool {
        match self {
            Self::Completed { deployed, .. } | Self::Duplicate { deployed } => *deployed,
        }
    }
}

/// What to call for each upload chunk.
///
/// Chunk requests are `operation` + `args` + `{text_arg}=<chunk>`, with `init=1` on the first
/// chunk and `final=1` (plus `deploy=1` when requested) on the last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    pub operation: String,
    pub args: BTreeMap<String, String>,
    pub text_arg: String,
    pub max_lines: usize,
    /// Set when the upload should deploy. The last chunk then carries `deploy=1`; after a
    /// duplicate first chunk this request is sent instead.
    pub deploy: Option<ApiRequest>,
}

impl UploadPlan {
    pub fn new(operation: impl Into<String>, max_lines: usize) -> Self {
        Self {
            operation: operation.into(),
            args: BTreeMap::new(),
            text_arg: "text".to_string(),
            max_lines,
            deploy: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.args.insert(name.into(), value.to_string());
        self
    }

    /// Deploy once the text is staged, via `deploy_request` when the first chunk is a
    /// duplicate.
    #[must_use]
    pub fn deploy(mut self, deploy_request: ApiRequest) -> Self {
        self.deploy = Some(deploy_request);
        self
    }

    /// [`deploy`](Self::deploy) when `enabled`, otherwise the plan is left without one.
    #[must_use]
    pub fn deploy_if(self, enabled: bool, deploy_request: ApiRequest) -> Self {
        if enabled {
            self.deploy(deploy_request)
        } else {
            self
        }
    }

    pub fn deploys(&self) -> bool {
        self.deploy.is_some()
    }

    /// Request for one chunk.
    pub fn request_for(&self, chunk: &Chunk) -> ApiRequest {
        let mut request = ApiRequest::new(self.operation.clone());
        for (name, value) in &self.args {
            request.set_arg(name.clone(), value);
        }
        request.set_arg(self.text_arg.clone(), &chunk.text);
        if chunk.role.is_first() {
            request.set_arg("init", 1);
        }
        if chunk.role.is_last() {
            request.set_arg("final", 1);
            if self.deploys() {
                request.set_arg("deploy", 1);
            }
        }
        request
    }
}

/// A paged text download: `request` is re-sent with paging for pages `1..=total_pages`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    pub request: ApiRequest,
    pub page_size: u32,
}

impl DownloadPlan {
    pub fn new(request: ApiRequest, page_size: u32) -> Self {
        Self { request, page_size }
    }

    pub fn request_for(&self, page: u32) -> ApiRequest {
        let mut request = self.request.clone();
        request.set_paging(page, self.page_size);
        request
    }
}
