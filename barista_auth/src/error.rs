use std::{borrow::Cow, fmt};

use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Machine-readable reason for refusing a request
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorCode {
    /// The request carried no headers at all
    NoRequestHeader,
    /// The `Authorization` header is missing
    NoAuthInHeader,
    /// The `Authorization` header does not split into a scheme and a token
    TooManyParts,
    /// The `Authorization` scheme is not `Bearer`
    NoBearerTag,
    /// The token or its header could not be parsed, or no key matches it
    InvalidHeader,
    /// The token's `exp` claim is in the past
    TokenExpired,
    /// The token's audience or issuer is wrong, or a required claim is absent
    InvalidClaims,
    /// The token could not be verified
    InvalidToken,
    /// The token does not grant the required permission
    Unauthorized,
}

impl ErrorCode {
    /// The code as it appears on the wire
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoRequestHeader => "no_request_header",
            Self::NoAuthInHeader => "no_auth_in_header",
            Self::TooManyParts => "too_many_parts",
            Self::NoBearerTag => "no_bearer_tag",
            Self::InvalidHeader => "invalid_header",
            Self::TokenExpired => "token_expired",
            Self::InvalidClaims => "invalid_claims",
            Self::InvalidToken => "invalid_token",
            Self::Unauthorized => "unauthorized",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A refused request
///
/// Every stage of the authorization pipeline reports failure with one of
/// these. The status is the HTTP status the boundary should answer with.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{code}: {description}")]
#[must_use]
pub struct AuthError {
    code: ErrorCode,
    description: Cow<'static, str>,
    status: StatusCode,
}

impl AuthError {
    /// Constructs an error from its parts
    pub fn new(
        code: ErrorCode,
        description: impl Into<Cow<'static, str>>,
        status: StatusCode,
    ) -> Self {
        Self {
            code,
            description: description.into(),
            status,
        }
    }

    /// The machine-readable code
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The human-readable description
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The HTTP status to respond with
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub(crate) fn no_request_header() -> Self {
        Self::new(
            ErrorCode::NoRequestHeader,
            "There is no header on this request.",
            StatusCode::UNAUTHORIZED,
        )
    }

    pub(crate) fn no_auth_in_header() -> Self {
        Self::new(
            ErrorCode::NoAuthInHeader,
            "No authorization details in request header.",
            StatusCode::UNAUTHORIZED,
        )
    }

    pub(crate) fn too_many_parts() -> Self {
        Self::new(
            ErrorCode::TooManyParts,
            "Too many parts to Auth header.",
            StatusCode::UNAUTHORIZED,
        )
    }

    pub(crate) fn no_bearer_tag() -> Self {
        Self::new(
            ErrorCode::NoBearerTag,
            "Bearer tag not present or malformed.",
            StatusCode::UNAUTHORIZED,
        )
    }

    pub(crate) fn missing_key_id() -> Self {
        Self::new(
            ErrorCode::InvalidHeader,
            "Authorization malformed.",
            StatusCode::UNAUTHORIZED,
        )
    }

    pub(crate) fn unparseable_token() -> Self {
        Self::new(
            ErrorCode::InvalidHeader,
            "Unable to parse authentication token.",
            StatusCode::BAD_REQUEST,
        )
    }

    pub(crate) fn unknown_key() -> Self {
        Self::new(
            ErrorCode::InvalidHeader,
            "Unable to find the appropriate key.",
            StatusCode::BAD_REQUEST,
        )
    }

    pub(crate) fn token_expired() -> Self {
        Self::new(
            ErrorCode::TokenExpired,
            "Token is expired.",
            StatusCode::UNAUTHORIZED,
        )
    }

    pub(crate) fn incorrect_claims() -> Self {
        Self::new(
            ErrorCode::InvalidClaims,
            "Incorrect claims. Please, check the audience and issuer.",
            StatusCode::UNAUTHORIZED,
        )
    }

    pub(crate) fn key_set_unavailable() -> Self {
        Self::new(
            ErrorCode::InvalidToken,
            "Unable to verify token: key set unavailable.",
            StatusCode::UNAUTHORIZED,
        )
    }

    pub(crate) fn invalid_token() -> Self {
        Self::new(
            ErrorCode::InvalidToken,
            "Invalid token.",
            StatusCode::UNAUTHORIZED,
        )
    }

    pub(crate) fn permissions_missing() -> Self {
        Self::new(
            ErrorCode::InvalidClaims,
            "Permissions not included in JWT.",
            StatusCode::BAD_REQUEST,
        )
    }

    pub(crate) fn permission_denied() -> Self {
        Self::new(
            ErrorCode::Unauthorized,
            "Permission not in payload.",
            StatusCode::UNAUTHORIZED,
        )
    }
}
