//! A drink catalog served over HTTP
//!
//! Anyone may list the catalog. Reading recipes in full and changing the
//! catalog require a bearer token granting the matching permission, checked
//! by the guards of [`barista_axum`] against an identity provider's key set.
//!
//! ```no_run
//! use barista::{api, store::MemoryDrinkStore};
//! use barista_auth::{AuthConfig, AuthMiddleware};
//!
//! # async fn run() -> color_eyre::Result<()> {
//! let auth = AuthMiddleware::from_config(&AuthConfig::new("barista.eu.auth0.com", "coffee"))?;
//! let app = api::router(api::AppState::new(auth, MemoryDrinkStore::new()));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:5000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

pub mod api;
pub mod config;
mod error;
pub mod model;
pub mod store;

pub use error::ApiError;
