//! Axum utilities that enforce barista permissions on bearer tokens
//!
//! Guards declared with [`permission_guard!`] or [`permission_guards!`] are
//! extractors. Each one pulls the [`AuthMiddleware`] out of the router
//! state, runs the whole bearer pipeline against the request headers and
//! hands the verified [`Claims`] to the handler. A refused request never
//! reaches the handler; it is answered with the JSON error envelope built
//! by [`AuthFailed`].
//!
//! # Full Example
//!
//! ```no_run
//! use axum::{extract::Path, routing::{delete, get}, Router};
//! use barista_auth::{AuthConfig, AuthMiddleware, HasPermissions};
//! use std::net::SocketAddr;
//!
//! mod permission {
//!     barista_axum::permission_guards! {
//!         pub permission DrinksDetail = "get:drinks-detail";
//!         pub permission DeleteDrinks = "delete:drinks";
//!         pub permission Editor = ["post:drinks patch:drinks" || "delete:drinks"];
//!     }
//! }
//!
//! async fn details(permission::DrinksDetail(claims): permission::DrinksDetail) -> String {
//!     format!("granted {:?}", claims.permissions())
//! }
//!
//! async fn remove(_: permission::DeleteDrinks, Path(id): Path<u64>) -> String {
//!     format!("removed {id}")
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfig::new("barista.eu.auth0.com", "coffee");
//!     let auth = AuthMiddleware::from_config(&config)?;
//!
//!     let router = Router::new()
//!         .route("/drinks-detail", get(details))
//!         .route("/drinks/:id", delete(remove))
//!         .with_state(auth);
//!
//!     let listener = tokio::net::TcpListener::bind(&SocketAddr::new([127, 0, 0, 1].into(), 5000))
//!         .await?;
//!     axum::serve(listener, router).await?;
//!
//!     Ok(())
//! }
//! ```

use std::{error::Error, fmt};

use axum_core::response::{IntoResponse, Response};
use barista_auth::{AuthError, ErrorCode, PermissionPolicy};
use http::{header, HeaderValue, StatusCode};

#[cfg(doc)]
use barista_auth::{AuthMiddleware, Claims};

mod macros;

/// Defines the permission policy for a given endpoint guard
pub trait EndpointPermissionPolicy {
    /// The permission policy to be enforced when this type is used as an
    /// endpoint guard
    fn permission_policy() -> &'static PermissionPolicy;
}

/// An error indicating that the request could not be authorized
///
/// Rendered as `{"success": false, "error": <status>, "message": <code>}`
/// with the status carried by the [`AuthError`]. `401` responses also carry
/// a `www-authenticate` challenge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthFailed(pub AuthError);

impl AuthFailed {
    /// The underlying authorization error
    #[must_use]
    pub fn error(&self) -> &AuthError {
        &self.0
    }
}

impl From<AuthError> for AuthFailed {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

impl fmt::Display for AuthFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Error for AuthFailed {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

impl IntoResponse for AuthFailed {
    fn into_response(self) -> Response {
        let status = self.0.status();
        let body = serde_json::json!({
            "success": false,
            "error": status.as_u16(),
            "message": self.0.code(),
        });

        let mut resp = (
            status,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )],
            body.to_string(),
        )
            .into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Some(challenge) = challenge(&self.0) {
                resp.headers_mut().insert(header::WWW_AUTHENTICATE, challenge);
            }
        }

        resp
    }
}

fn challenge(err: &AuthError) -> Option<HeaderValue> {
    let error = match err.code() {
        ErrorCode::Unauthorized => "insufficient_scope",
        _ => "invalid_token",
    };

    let value = if err.description().is_empty() {
        format!(r#"Bearer error="{error}""#)
    } else {
        format!(
            r#"Bearer error="{error}" error_description="{}""#,
            err.description().escape_default()
        )
    };

    HeaderValue::try_from(value).ok()
}

#[doc(hidden)]
pub mod __private {
    pub use async_trait::async_trait;
    pub use axum_core::extract::{FromRef, FromRequestParts};
    pub use barista_auth::{AuthMiddleware, Claims, PermissionPolicy};
    pub use http::request::Parts;
    pub use once_cell::sync::OnceCell;

    use crate::AuthFailed;

    pub async fn from_request<S>(
        req: &Parts,
        state: &S,
        policy: &'static PermissionPolicy,
    ) -> Result<Claims, AuthFailed>
    where
        AuthMiddleware: FromRef<S>,
    {
        let middleware = AuthMiddleware::from_ref(state);
        let headers = Some(&req.headers);

        let claims = if *policy == PermissionPolicy::allow_any() {
            middleware.authenticate(headers).await?
        } else {
            middleware.authorize_policy(headers, policy).await?
        };

        Ok(claims)
    }
}
