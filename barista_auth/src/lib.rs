//! Bearer token authorization for the barista service
//!
//! Requests carry an `Authorization: Bearer <token>` header holding an
//! RS256-signed JWT issued by an external identity provider. This crate
//! turns that header into verified [`Claims`], or into exactly one
//! [`AuthError`] describing why the request was refused.
//!
//! The pipeline has four stages:
//!
//! 1. [`middleware::extract_bearer`] pulls the token out of the headers.
//! 2. The [`Authority`] decomposes the token and asks a
//!    [`KeyResolver`](resolver::KeyResolver) for the signing key named in
//!    its header.
//! 3. The token's signature, expiry, audience and issuer are checked
//!    against the [`AuthConfig`].
//! 4. [`gate::check_permissions`] confirms the token grants the permission
//!    required by the operation.
//!
//! [`AuthMiddleware`] strings these together.
//!
//! ```no_run
//! use barista_auth::{AuthConfig, AuthMiddleware, Permission};
//! use http::HeaderMap;
//!
//! # async fn run(headers: HeaderMap) -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::new("barista.eu.auth0.com", "coffee");
//! let auth = AuthMiddleware::from_config(&config)?;
//!
//! let claims = auth
//!     .authorize(Some(&headers), &Permission::from_static("get:drinks-detail"))
//!     .await?;
//! # let _ = claims;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
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

mod authority;
mod claims;
mod config;
mod error;
pub mod gate;
pub mod middleware;
mod permission;
pub mod resolver;

pub use authority::{Authority, AuthorityError};
pub use claims::{Claims, HasPermissions};
pub use config::AuthConfig;
pub use error::{AuthError, ErrorCode};
pub use gate::{InsufficientPermissions, PermissionPolicy, Policy};
pub use middleware::{AuthMiddleware, Protected};
pub use permission::{InvalidPermission, Permission, PermissionRef, Permissions};
