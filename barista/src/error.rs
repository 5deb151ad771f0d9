use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    model::{DrinkId, InvalidDrink, Title},
    store::StoreError,
};

/// A catalog request that could not be served
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body was not the expected JSON document
    #[error("malformed request body")]
    MalformedBody(#[source] serde_json::Error),
    /// The request body changed nothing
    #[error("request body has nothing to change")]
    EmptyChanges,
    /// No drink has the given identifier
    #[error("drink {0} not found")]
    DrinkNotFound(DrinkId),
    /// No route matched the request
    #[error("no route for request")]
    NoRoute,
    /// The drink identifier is not usable
    #[error("drink identifier must be positive")]
    InvalidId,
    /// The drink breaks the catalog's limits
    #[error(transparent)]
    InvalidDrink(#[from] InvalidDrink),
    /// Another drink already has the title
    #[error("a drink titled {0:?} already exists")]
    DuplicateTitle(Title),
}

impl ApiError {
    /// The status to respond with
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedBody(_) | Self::EmptyChanges => StatusCode::BAD_REQUEST,
            Self::DrinkNotFound(_) | Self::NoRoute => StatusCode::NOT_FOUND,
            Self::InvalidId | Self::InvalidDrink(_) | Self::DuplicateTitle(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
    }

    /// The message placed in the error envelope
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self.status() {
            StatusCode::BAD_REQUEST => "bad request",
            StatusCode::NOT_FOUND => "resource not found",
            _ => "unprocessable",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::DrinkNotFound(id),
            StoreError::DuplicateTitle(title) => Self::DuplicateTitle(title),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: u16,
    message: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error: &dyn std::error::Error = &self;
        tracing::debug!(error, "request refused");

        let status = self.status();
        let body = ErrorEnvelope {
            success: false,
            error: status.as_u16(),
            message: self.message(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(ApiError::EmptyChanges.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::EmptyChanges.message(), "bad request");

        assert_eq!(ApiError::DrinkNotFound(DrinkId(4)).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::NoRoute.message(), "resource not found");

        let too_long = ApiError::from(InvalidDrink::TitleTooLong { len: 81 });
        assert_eq!(too_long.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(too_long.message(), "unprocessable");
        assert_eq!(ApiError::InvalidId.message(), "unprocessable");
    }

    #[test]
    fn store_errors_are_mapped() {
        assert!(matches!(
            ApiError::from(StoreError::NotFound(DrinkId(9))),
            ApiError::DrinkNotFound(DrinkId(9))
        ));
    }
}
