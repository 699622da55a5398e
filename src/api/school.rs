//! School API handlers

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::error::{ApiJson, ApiPath};
use super::params;
use crate::domain::{DomainError, School, SchoolFilter, SchoolInput, SchoolPatch};
use crate::infrastructure::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/schools",
    params(
        ("search" = Option<String>, Query, description = "Matches name, address or email"),
        ("ordering" = Option<String>, Query, description = "name or -name")
    ),
    responses((status = 200, description = "Schools by name", body = [School]))
)]
pub async fn list_schools(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<School>>, DomainError> {
    let filter = SchoolFilter {
        search: params::text(&params, "search"),
        ordering: params::ordering(&params),
    };
    Ok(Json(state.school_repo.find_all(filter).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/schools",
    request_body = SchoolInput,
    responses(
        (status = 201, description = "School created", body = School),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_school(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<SchoolInput>,
) -> Result<impl IntoResponse, DomainError> {
    let school = state.school_repo.create(input).await?;
    Ok((StatusCode::CREATED, Json(school)))
}

#[utoipa::path(
    get,
    path = "/api/v1/schools/{id}",
    params(("id" = Uuid, Path, description = "School id")),
    responses(
        (status = 200, description = "School", body = School),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_school(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<School>, DomainError> {
    match state.school_repo.find_by_id(id).await? {
        Some(school) => Ok(Json(school)),
        None => Err(DomainError::NotFound),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/schools/{id}",
    params(("id" = Uuid, Path, description = "School id")),
    request_body = SchoolInput,
    responses(
        (status = 200, description = "School replaced", body = School),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_school(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<SchoolInput>,
) -> Result<Json<School>, DomainError> {
    Ok(Json(state.school_repo.update(id, input.into()).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/schools/{id}",
    params(("id" = Uuid, Path, description = "School id")),
    request_body(content = Object, description = "Any subset of the school fields"),
    responses(
        (status = 200, description = "School updated", body = School),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Not found")
    )
)]
pub async fn patch_school(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<SchoolPatch>,
) -> Result<Json<School>, DomainError> {
    Ok(Json(state.school_repo.update(id, patch).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/schools/{id}",
    params(("id" = Uuid, Path, description = "School id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_school(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, DomainError> {
    state.school_repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
