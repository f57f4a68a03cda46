//! Storage and data source abstraction trait definitions

mod remote_source;
mod view_state_store;

pub use remote_source::RemoteSource;
pub use view_state_store::{InMemoryViewStateStore, ViewStateStore};
