//! View state persistence abstract Trait

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::CoreResult;
use crate::types::ViewState;

/// View state store Trait
///
/// Keeps the sort/filter/page state of a list across reloads, indexed by a list name
/// (e.g. `"rules"`, `"vendors"`). Losing it only costs the user their place in the list.
#[async_trait]
pub trait ViewStateStore: Send + Sync {
    /// Load the saved state of a list
    ///
    /// # Arguments
    /// * `key` - List name
    async fn load(&self, key: &str) -> CoreResult<Option<ViewState>>;

    /// Save the state of a list
    ///
    /// # Arguments
    /// * `key` - List name
    /// * `state` - Current view state
    async fn save(&self, key: &str, state: &ViewState) -> CoreResult<()>;

    /// Forget the state of a list
    async fn remove(&self, key: &str) -> CoreResult<()>;
}

/// In-memory view state store
///
/// Default implementation, lives as long as the process.
#[derive(Clone, Default)]
pub struct InMemoryViewStateStore {
    states: Arc<RwLock<HashMap<String, ViewState>>>,
}

impl InMemoryViewStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ViewStateStore for InMemoryViewStateStore {
    async fn load(&self, key: &str) -> CoreResult<Option<ViewState>> {
        Ok(self.states.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, state: &ViewState) -> CoreResult<()> {
        self.states
            .write()
            .await
            .insert(key.to_string(), state.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> CoreResult<()> {
        self.states.write().await.remove(key);
        Ok(())
    }
}
