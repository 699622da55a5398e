//! Student document API handlers

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::error::{ApiJson, ApiPath};
use super::params;
use crate::domain::{
    DocumentFilter, DocumentInput, DocumentPatch, DomainError, Ordering, StudentDocument,
};
use crate::infrastructure::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

fn by_expiry() -> Vec<Ordering> {
    vec![Ordering {
        field: "expiry_date".to_string(),
        descending: false,
    }]
}

#[utoipa::path(
    get,
    path = "/api/v1/documents",
    params(
        ("document_type" = Option<String>, Query, description = "ID_CARD, BIRTH_CERTIFICATE or PASSPORT"),
        ("is_verified" = Option<bool>, Query, description = "Filter by verification"),
        ("student" = Option<Uuid>, Query, description = "Owning student id"),
        ("ordering" = Option<String>, Query, description = "issue_date, expiry_date, created_at or updated_at")
    ),
    responses((status = 200, description = "Documents, newest first", body = [StudentDocument]))
)]
pub async fn list_documents(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<StudentDocument>>, DomainError> {
    let filter = DocumentFilter {
        student: params::uuid(&params, "student")?,
        document_type: params::text(&params, "document_type"),
        is_verified: params::boolean(&params, "is_verified"),
        ordering: params::ordering(&params),
        ..Default::default()
    };
    Ok(Json(state.document_repo.find_all(filter).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/documents",
    request_body = DocumentInput,
    responses(
        (status = 201, description = "Document created", body = StudentDocument),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Student already has this document type")
    )
)]
pub async fn create_document(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<DocumentInput>,
) -> Result<impl IntoResponse, DomainError> {
    let document = state.document_repo.create(input).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, description = "Document", body = StudentDocument),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_document(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<StudentDocument>, DomainError> {
    state
        .document_repo
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or(DomainError::NotFound)
}

#[utoipa::path(
    put,
    path = "/api/v1/documents/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    request_body = DocumentInput,
    responses(
        (status = 200, description = "Document replaced", body = StudentDocument),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Student already has this document type")
    )
)]
pub async fn update_document(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<DocumentInput>,
) -> Result<Json<StudentDocument>, DomainError> {
    Ok(Json(state.document_repo.update(id, input.into()).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/documents/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    request_body(content = Object, description = "Any subset of the document fields"),
    responses(
        (status = 200, description = "Document updated", body = StudentDocument),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Student already has this document type")
    )
)]
pub async fn patch_document(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<DocumentPatch>,
) -> Result<Json<StudentDocument>, DomainError> {
    Ok(Json(state.document_repo.update(id, patch).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/documents/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_document(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, DomainError> {
    state.document_repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/documents/expiring",
    params(("days" = Option<i64>, Query, description = "Window in days, default 90")),
    responses(
        (status = 200, description = "Documents expiring within the window, soonest first", body = [StudentDocument]),
        (status = 400, description = "days is not an integer")
    )
)]
/// Not yet expired, expiring within `days` (default 90), soonest first
pub async fn expiring_documents(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<StudentDocument>>, DomainError> {
    let filter = DocumentFilter {
        expiring_within: Some(params::days(&params)?),
        ordering: by_expiry(),
        ..Default::default()
    };
    Ok(Json(state.document_repo.find_all(filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/documents/expired",
    responses((status = 200, description = "Expired documents", body = [StudentDocument]))
)]
pub async fn expired_documents(
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentDocument>>, DomainError> {
    let filter = DocumentFilter {
        expired_only: true,
        ordering: by_expiry(),
        ..Default::default()
    };
    Ok(Json(state.document_repo.find_all(filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/documents/unverified",
    responses((status = 200, description = "Documents awaiting verification", body = [StudentDocument]))
)]
pub async fn unverified_documents(
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentDocument>>, DomainError> {
    let filter = DocumentFilter {
        is_verified: Some(false),
        ..Default::default()
    };
    Ok(Json(state.document_repo.find_all(filter).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/documents/{id}/verify",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, description = "Document marked verified today", body = StudentDocument),
        (status = 404, description = "Not found")
    )
)]
pub async fn verify_document(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<VerifyRequest>>,
) -> Result<Json<StudentDocument>, DomainError> {
    let notes = body
        .and_then(|ApiJson(body)| body.notes)
        .unwrap_or_default();
    Ok(Json(state.document_repo.verify(id, notes).await?))
}
