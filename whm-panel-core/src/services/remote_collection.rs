//! 远程列表视图（服务端排序 / 过滤 / 分页）

use crate::error::{CoreError, CoreResult};
use crate::traits::{RemoteSource, ViewStateStore};
use crate::types::{FilterDescriptor, Slice, SortDirection, SortType, ViewState};

/// A fetch that has been issued but not yet applied.
///
/// Carries the state the page was requested for; the view only adopts that state when the
/// response arrives and is still the newest one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub sequence: u64,
    pub state: ViewState,
}

/// A view whose sorting, filtering and paging happen on the server.
///
/// Every state change issues a fetch. A failed fetch leaves the previous slice and state
/// untouched. Responses are sequence-numbered and only the newest issued request may update
/// the view; older responses are dropped when they arrive.
pub struct RemoteCollectionView<S: RemoteSource> {
    source: S,
    state: ViewState,
    slice: Slice<S::Item>,
    issued: u64,
    loaded: bool,
}

impl<S: RemoteSource> RemoteCollectionView<S> {
    /// Build an empty view. Call [`refresh`](Self::refresh) to load the first page.
    pub fn new(source: S, state: ViewState) -> CoreResult<Self> {
        state.validate()?;
        Ok(Self {
            source,
            state,
            slice: Slice::default(),
            issued: 0,
            loaded: false,
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Last applied page.
    pub fn current_slice(&self) -> &Slice<S::Item> {
        &self.slice
    }

    /// At least one fetch has been applied.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn display_range(&self) -> (u64, u64) {
        (self.slice.start, self.slice.limit)
    }

    // ===== Low-level fetch protocol =====

    /// Issue a fetch for `state`. Any ticket issued earlier becomes stale.
    pub fn begin_fetch(&mut self, state: ViewState) -> FetchTicket {
        self.issued += 1;
        FetchTicket {
            sequence: self.issued,
            state,
        }
    }

    /// Apply the outcome of a fetch.
    ///
    /// Returns `Ok(false)` when the ticket is stale (its outcome, success or failure, is
    /// ignored), `Ok(true)` when the page was applied, and the fetch error otherwise.
    pub fn complete(
        &mut self,
        ticket: FetchTicket,
        result: CoreResult<Slice<S::Item>>,
    ) -> CoreResult<bool> {
        if ticket.sequence != self.issued {
            log::debug!(
                "Dropping stale list response #{} (newest is #{})",
                ticket.sequence,
                self.issued
            );
            return Ok(false);
        }
        let slice = result?;
        self.state = ticket.state;
        self.slice = slice;
        self.loaded = true;
        Ok(true)
    }

    /// Whether `ticket` is still the newest issued fetch.
    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.sequence == self.issued
    }

    async fn fetch(&mut self, state: ViewState) -> CoreResult<bool> {
        let ticket = self.begin_fetch(state);
        let result = self.source.fetch_page(&ticket.state).await;
        if let Err(e) = &result {
            e.log("List fetch failed");
        }
        self.complete(ticket, result)
    }

    // ===== View state =====

    /// Re-fetch the current page.
    pub async fn refresh(&mut self) -> CoreResult<bool> {
        self.fetch(self.state.clone()).await
    }

    /// Replace the filter and fetch page 1.
    pub async fn set_filter(&mut self, filter: Option<FilterDescriptor>) -> CoreResult<bool> {
        let mut state = self.state.clone();
        state.filter = filter;
        state.page_number = 1;
        self.fetch(state).await
    }

    pub async fn set_sort(
        &mut self,
        field: impl Into<String>,
        direction: SortDirection,
        sort_type: Option<SortType>,
    ) -> CoreResult<bool> {
        let mut state = self.state.clone();
        state.sort_field = Some(field.into());
        state.sort_direction = direction;
        state.sort_type = sort_type;
        self.fetch(state).await
    }

    /// Fetch page `max(1, n)`. The server decides what lies past the last page.
    pub async fn select_page(&mut self, n: u32) -> CoreResult<bool> {
        let mut state = self.state.clone();
        state.page_number = n.max(1);
        self.fetch(state).await
    }

    /// Change the page size and fetch page 1.
    pub async fn set_page_size(&mut self, size: u32) -> CoreResult<bool> {
        if size == 0 {
            return Err(CoreError::ValidationError(
                "page size must be greater than zero".to_string(),
            ));
        }
        let mut state = self.state.clone();
        state.page_size = size;
        state.page_number = 1;
        self.fetch(state).await
    }

    /// Fetch with a whole new state, e.g. one restored from a query string.
    pub async fn apply_state(&mut self, state: ViewState) -> CoreResult<bool> {
        state.validate()?;
        self.fetch(state).await
    }

    // ===== Persistence =====

    pub async fn save_state(&self, store: &dyn ViewStateStore, key: &str) -> CoreResult<()> {
        store.save(key, &self.state).await
    }

    /// Restore the state saved under `key` and fetch it. Returns `false` when nothing was saved.
    pub async fn restore_state(
        &mut self,
        store: &dyn ViewStateStore,
        key: &str,
    ) -> CoreResult<bool> {
        match store.load(key).await? {
            Some(state) => self.apply_state(state).await,
            None => Ok(false),
        }
    }
}
