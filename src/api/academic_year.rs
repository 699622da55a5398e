//! Academic year API handlers

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use uuid::Uuid;

use super::error::{ApiJson, ApiPath};
use super::params;
use crate::domain::{
    AcademicYear, AcademicYearFilter, AcademicYearInput, AcademicYearPatch, CourseFilter,
    CourseSummary, DomainError,
};
use crate::infrastructure::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/academic-years",
    params(
        ("is_active" = Option<bool>, Query, description = "Filter by active flag"),
        ("ordering" = Option<String>, Query, description = "name, start_date or end_date; prefix with - to reverse")
    ),
    responses((status = 200, description = "Academic years, newest first", body = [AcademicYear]))
)]
pub async fn list_academic_years(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<AcademicYear>>, DomainError> {
    let filter = AcademicYearFilter {
        is_active: params::boolean(&params, "is_active"),
        ordering: params::ordering(&params),
    };
    Ok(Json(state.academic_year_repo.find_all(filter).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/academic-years",
    request_body = AcademicYearInput,
    responses(
        (status = 201, description = "Academic year created", body = AcademicYear),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_academic_year(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<AcademicYearInput>,
) -> Result<impl IntoResponse, DomainError> {
    let year = state.academic_year_repo.create(input).await?;
    Ok((StatusCode::CREATED, Json(year)))
}

#[utoipa::path(
    get,
    path = "/api/v1/academic-years/{id}",
    params(("id" = Uuid, Path, description = "Academic year id")),
    responses(
        (status = 200, description = "Academic year", body = AcademicYear),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_academic_year(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<AcademicYear>, DomainError> {
    state
        .academic_year_repo
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or(DomainError::NotFound)
}

#[utoipa::path(
    put,
    path = "/api/v1/academic-years/{id}",
    params(("id" = Uuid, Path, description = "Academic year id")),
    request_body = AcademicYearInput,
    responses(
        (status = 200, description = "Academic year replaced", body = AcademicYear),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_academic_year(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<AcademicYearInput>,
) -> Result<Json<AcademicYear>, DomainError> {
    let year = state.academic_year_repo.update(id, input.into()).await?;
    Ok(Json(year))
}

#[utoipa::path(
    patch,
    path = "/api/v1/academic-years/{id}",
    params(("id" = Uuid, Path, description = "Academic year id")),
    request_body(content = Object, description = "Any subset of the academic year fields"),
    responses(
        (status = 200, description = "Academic year updated", body = AcademicYear),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Not found")
    )
)]
pub async fn patch_academic_year(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<AcademicYearPatch>,
) -> Result<Json<AcademicYear>, DomainError> {
    let year = state.academic_year_repo.update(id, patch).await?;
    Ok(Json(year))
}

#[utoipa::path(
    delete,
    path = "/api/v1/academic-years/{id}",
    params(("id" = Uuid, Path, description = "Academic year id")),
    responses(
        (status = 204, description = "Deleted with its courses"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_academic_year(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, DomainError> {
    state.academic_year_repo.delete(id).await?;
    tracing::info!(%id, "Deleted academic year");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/academic-years/current",
    responses(
        (status = 200, description = "The active academic year", body = AcademicYear),
        (status = 404, description = "No active academic year")
    )
)]
pub async fn current_academic_year(
    State(state): State<AppState>,
) -> Result<Json<AcademicYear>, DomainError> {
    match state.academic_year_repo.find_current().await? {
        Some(year) => Ok(Json(year)),
        None => Err(DomainError::MissingRelated(
            "No active academic year found.".to_string(),
        )),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/academic-years/for_date",
    params(("date" = String, Query, description = "YYYY-MM-DD")),
    responses(
        (status = 200, description = "Years whose range contains the date", body = [AcademicYear]),
        (status = 400, description = "Missing or malformed date"),
        (status = 404, description = "No academic year covers the date")
    )
)]
pub async fn academic_years_for_date(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<AcademicYear>>, DomainError> {
    let Some(raw) = params::text(&params, "date") else {
        return Err(DomainError::Validation(
            "Date parameter is required (YYYY-MM-DD).".to_string(),
        ));
    };
    let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
        DomainError::Validation("Invalid date format. Use YYYY-MM-DD.".to_string())
    })?;

    let years = state.academic_year_repo.find_for_date(date).await?;
    if years.is_empty() {
        return Err(DomainError::MissingRelated(format!(
            "No academic year found for date {}.",
            raw
        )));
    }
    Ok(Json(years))
}

#[utoipa::path(
    get,
    path = "/api/v1/academic-years/{id}/courses",
    params(
        ("id" = Uuid, Path, description = "Academic year id"),
        ("is_active" = Option<bool>, Query, description = "Filter by active flag"),
        ("min_credits" = Option<i32>, Query, description = "Lower credit bound"),
        ("max_credits" = Option<i32>, Query, description = "Upper credit bound")
    ),
    responses(
        (status = 200, description = "Courses of the year", body = [CourseSummary]),
        (status = 404, description = "Not found")
    )
)]
pub async fn academic_year_courses(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<CourseSummary>>, DomainError> {
    if state.academic_year_repo.find_by_id(id).await?.is_none() {
        return Err(DomainError::NotFound);
    }

    let filter = CourseFilter {
        academic_year: Some(id),
        is_active: params::boolean(&params, "is_active"),
        min_credits: params::number(&params, "min_credits")?,
        max_credits: params::number(&params, "max_credits")?,
        ..Default::default()
    };
    Ok(Json(state.course_repo.find_all(filter).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/academic-years/{id}/activate",
    params(("id" = Uuid, Path, description = "Academic year id")),
    responses(
        (status = 200, description = "Now the only active year", body = AcademicYear),
        (status = 404, description = "Not found")
    )
)]
pub async fn activate_academic_year(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<AcademicYear>, DomainError> {
    Ok(Json(state.academic_year_repo.activate(id).await?))
}
