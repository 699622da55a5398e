//! HTTP mapping of domain errors and the extractors that reject with them.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::domain::DomainError;

impl DomainError {
    pub fn status(&self) -> StatusCode {
        match self {
            DomainError::NotFound | DomainError::MissingRelated(_) => StatusCode::NOT_FOUND,
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::Database(_) | DomainError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for DomainError {
    fn from(rejection: JsonRejection) -> Self {
        DomainError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for DomainError {
    fn from(_: PathRejection) -> Self {
        DomainError::NotFound
    }
}

/// `Json` whose rejection is a `{"detail"}` 400.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(DomainError))]
pub struct ApiJson<T>(pub T);

/// `Path` that answers 404 for ids that do not parse.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(DomainError))]
pub struct ApiPath<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(DomainError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            DomainError::MissingRelated("Prerequisite course not found".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DomainError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DomainError::Conflict("taken".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            DomainError::Database("down".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
