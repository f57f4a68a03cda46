//! WHM Panel Core Library
//!
//! Provides the platform-independent logic behind WHM list and bulk-edit pages, including:
//! - Paged / filtered collection views (client-side and server-side)
//! - Chunked bulk transfer of large text blobs
//! - Bulk account conflict resolution for transfers
//! - ModSecurity rule and vendor services
//!
//! All server access goes through the [`whm_panel_api::ApiExecutor`] trait, so the same
//! services run against a live WHM server or a scripted executor.

pub mod config;
pub mod error;
pub mod services;
pub mod traits;
pub mod types;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use config::PanelConfig;
pub use error::{CoreError, CoreResult};
pub use services::ServiceContext;
pub use traits::{InMemoryViewStateStore, RemoteSource, ViewStateStore};
