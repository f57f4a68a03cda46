//! Remote list source abstract Trait

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{Slice, ViewState};

/// A list whose sorting, filtering and paging happen on the server.
///
/// Implementations translate a [`ViewState`] into one backend call and return the page the
/// server produced. The view decides whether that page is still wanted.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    type Item: Send;

    /// Fetch the page described by `state`.
    async fn fetch_page(&self, state: &ViewState) -> CoreResult<Slice<Self::Item>>;
}
