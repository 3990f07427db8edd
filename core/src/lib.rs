//! Async API client for the Kirini keyboard community site.
//!
//! # Overview
//! `ApiClient` centralizes request assembly, bearer-token injection, JSON vs
//! text response negotiation and error normalization for the site's
//! endpoints. Resource services (`users()`, `boards()`, `keyboards()`, ...)
//! wrap it with fixed paths and parameter shapes.
//!
//! # Design
//! - The client is generic over a `Transport`; `ReqwestTransport` does the
//!   real I/O, tests substitute scripted transports.
//! - The token store is injected, not global. Session-lived (memory) and
//!   durable (file) storage are chosen by the caller.
//! - Every call resolves to exactly one of `ApiResponse` or `ApiError`.
//!   Local input checks on a few board methods come back as
//!   `Validated::Invalid` instead of an error.
//!
//! ```no_run
//! use kirini_client::{ApiClient, ClientConfig, Params, ReqwestTransport, TokenStore};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::new(
//!     ClientConfig::new("https://kirini.example"),
//!     TokenStore::in_memory(),
//!     ReqwestTransport::new()?,
//! );
//! client.users().login("kim@kirini.example", "secret").await?;
//! let page = client.boards().get_posts("free", &Params::new().with("page", 1)).await?;
//! println!("{} posts", page.posts.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod params;
pub mod response;
pub mod services;
pub mod token;
pub mod transport;

pub use client::{ApiClient, RequestOptions};
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, Validated, ValidationError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, MultipartForm, RequestBody};
pub use params::Params;
pub use response::{parse_response, ApiResponse};
pub use services::{map_board_type, BoardPage, PostPayload};
pub use token::{FileStorage, MemoryStorage, Storage, StorageError, StorageScope, TokenStore};
pub use transport::{ReqwestTransport, Transport, TransportError};
