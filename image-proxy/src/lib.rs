//! HTTP relay serving JPEG thumbnails of remote images.
//!
//! A `GET /` carrying a `RemoteUrl` header fetches that image, shrinks it
//! with [`thumbnail_pipeline`] on a dedicated worker pool and answers with
//! `image/jpeg`. See [`handler`] for the full header contract.

pub mod config;
pub mod error;
pub mod handler;
pub mod origin;
pub mod server;
pub mod worker;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use server::{create_router, start_server, AppState};
