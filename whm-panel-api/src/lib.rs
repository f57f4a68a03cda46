//! # whm-panel-api
//!
//! Request/response boundary for the WHM JSON API v1.
//!
//! Everything above this crate talks to the server through the [`ApiExecutor`] trait:
//! one [`ApiRequest`] in (operation name, named arguments, optional sort/filter/paging),
//! one normalized [`ApiResponse`] out. [`WhmClient`] is the live implementation; tests
//! substitute scripted executors.
//!
//! ## Feature Flags
//!
//! - **`native-tls`** *(default)*: use the platform's native TLS implementation.
//! - **`rustls`**: use rustls.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use whm_panel_api::{ApiExecutor, ApiRequest, ClientConfig, WhmClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WhmClient::new(ClientConfig::new("https://server:2087", "TOKEN"))?;
//!
//!     let request = ApiRequest::new("modsec_get_vendors").arg("show_uninstalled", 1);
//!     let response = client.execute_checked(&request).await?;
//!     println!("{}", response.data);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! [`ApiExecutor::execute`] returns `Ok` with `status = false` when the server rejects a
//! call, and `Err` only for transport, authentication and parse failures.
//! [`ApiExecutor::execute_checked`] folds rejections into [`ApiError::Rejected`].
//! Nothing in this crate retries; see [`ApiError::is_transport`].

mod error;
mod http_client;
mod traits;
mod types;
mod utils;
mod whm;

pub use error::{ApiError, ApiResult};

pub use traits::ApiExecutor;

pub use types::{
    ApiRequest, ApiResponse, FilterSpec, PaginateMeta, PagingSpec,
    ResponseMeta, SortDirection, SortSpec, parse_perl_boolean, total_pages_for, value_as_u64,
};

pub use utils::log_sanitizer;

pub use whm::{ClientConfig, WhmClient, build_query, field_spec, reduce_list_data};
