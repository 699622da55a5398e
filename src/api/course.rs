//! Course API handlers
//!
//! Listings use the summary form; a single course is returned with its
//! prerequisites and the courses that require it.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::ToSchema;
use uuid::Uuid;

use super::error::{ApiJson, ApiPath};
use super::params::{self, Params};
use crate::domain::{
    CourseDetail, CourseFilter, CourseInput, CoursePatch, CourseSummary, DomainError,
    PrerequisiteCourse,
};
use crate::infrastructure::AppState;

/// Body of add_prerequisite / remove_prerequisite
#[derive(Debug, Deserialize, ToSchema)]
pub struct PrerequisiteRequest {
    pub prerequisite_id: Option<Uuid>,
}

impl PrerequisiteRequest {
    fn id(&self) -> Result<Uuid, DomainError> {
        self.prerequisite_id
            .ok_or_else(|| DomainError::Validation("prerequisite_id is required".to_string()))
    }
}

/// Filters accepted by every course listing.
fn base_filter(params: &Params) -> Result<CourseFilter, DomainError> {
    Ok(CourseFilter {
        academic_year: params::uuid(params, "academic_year")?,
        is_active: params::boolean(params, "is_active"),
        ..Default::default()
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/courses",
    params(
        ("academic_year" = Option<Uuid>, Query, description = "Academic year id"),
        ("is_active" = Option<bool>, Query, description = "Filter by active flag"),
        ("credit_hours" = Option<i32>, Query, description = "Exact credit hours"),
        ("search" = Option<String>, Query, description = "Matches code, name or description"),
        ("ordering" = Option<String>, Query, description = "code, name, credit_hours or created_at")
    ),
    responses((status = 200, description = "Courses by code", body = [CourseSummary]))
)]
pub async fn list_courses(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<CourseSummary>>, DomainError> {
    let filter = CourseFilter {
        credit_hours: params::number(&params, "credit_hours")?,
        search: params::text(&params, "search"),
        ordering: params::ordering(&params),
        ..base_filter(&params)?
    };
    Ok(Json(state.course_repo.find_all(filter).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses",
    request_body = CourseInput,
    responses(
        (status = 201, description = "Course created", body = CourseDetail),
        (status = 400, description = "Invalid input or circular prerequisites"),
        (status = 409, description = "Code already taken")
    )
)]
pub async fn create_course(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CourseInput>,
) -> Result<impl IntoResponse, DomainError> {
    let course = state.course_repo.create(input).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course with prerequisites", body = CourseDetail),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_course(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<CourseDetail>, DomainError> {
    match state.course_repo.find_by_id(id).await? {
        Some(course) => Ok(Json(course)),
        None => Err(DomainError::NotFound),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = CourseInput,
    responses(
        (status = 200, description = "Course replaced; prerequisites kept when omitted", body = CourseDetail),
        (status = 400, description = "Invalid input or circular prerequisites"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Code already taken")
    )
)]
pub async fn update_course(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<CourseInput>,
) -> Result<Json<CourseDetail>, DomainError> {
    Ok(Json(state.course_repo.update(id, input.into()).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body(content = Object, description = "Any subset of the course fields"),
    responses(
        (status = 200, description = "Course updated", body = CourseDetail),
        (status = 400, description = "Invalid input or circular prerequisites"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Code already taken")
    )
)]
pub async fn patch_course(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<CoursePatch>,
) -> Result<Json<CourseDetail>, DomainError> {
    Ok(Json(state.course_repo.update(id, patch).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_course(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, DomainError> {
    state.course_repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}/prerequisites",
    params(
        ("id" = Uuid, Path, description = "Course id"),
        ("active_only" = Option<bool>, Query, description = "Only active courses")
    ),
    responses(
        (status = 200, description = "Direct prerequisites", body = [PrerequisiteCourse]),
        (status = 404, description = "Not found")
    )
)]
pub async fn course_prerequisites(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<PrerequisiteCourse>>, DomainError> {
    let active_only = params::flag(&params, "active_only");
    Ok(Json(state.course_repo.prerequisites(id, active_only).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}/required_for",
    params(
        ("id" = Uuid, Path, description = "Course id"),
        ("active_only" = Option<bool>, Query, description = "Only active courses")
    ),
    responses(
        (status = 200, description = "Courses that require this one", body = [PrerequisiteCourse]),
        (status = 404, description = "Not found")
    )
)]
pub async fn course_required_for(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<PrerequisiteCourse>>, DomainError> {
    let active_only = params::flag(&params, "active_only");
    Ok(Json(state.course_repo.required_for(id, active_only).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/advanced",
    params(
        ("academic_year" = Option<Uuid>, Query, description = "Academic year id"),
        ("is_active" = Option<bool>, Query, description = "Filter by active flag")
    ),
    responses((status = 200, description = "Courses above three credit hours", body = [CourseSummary]))
)]
/// Courses worth more than three credit hours
pub async fn advanced_courses(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<CourseSummary>>, DomainError> {
    let filter = CourseFilter {
        advanced_only: true,
        ..base_filter(&params)?
    };
    Ok(Json(state.course_repo.find_all(filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/without_prerequisites",
    params(
        ("academic_year" = Option<Uuid>, Query, description = "Academic year id"),
        ("is_active" = Option<bool>, Query, description = "Filter by active flag")
    ),
    responses((status = 200, description = "Entry-level courses", body = [CourseSummary]))
)]
pub async fn courses_without_prerequisites(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<CourseSummary>>, DomainError> {
    let filter = CourseFilter {
        without_prerequisites: true,
        ..base_filter(&params)?
    };
    Ok(Json(state.course_repo.find_all(filter).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/add_prerequisite",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = PrerequisiteRequest,
    responses(
        (status = 200, description = "Prerequisite added"),
        (status = 400, description = "Missing id, self reference or cycle"),
        (status = 404, description = "Course or prerequisite not found")
    )
)]
pub async fn add_prerequisite(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<PrerequisiteRequest>,
) -> Result<Json<Value>, DomainError> {
    let link = state.course_repo.add_prerequisite(id, body.id()?).await?;
    Ok(Json(json!({
        "detail": format!(
            "Added {} as a prerequisite for {}",
            link.prerequisite_code, link.course_code
        )
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/remove_prerequisite",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = PrerequisiteRequest,
    responses(
        (status = 200, description = "Prerequisite removed"),
        (status = 400, description = "Missing id or not a prerequisite"),
        (status = 404, description = "Course or prerequisite not found")
    )
)]
pub async fn remove_prerequisite(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<PrerequisiteRequest>,
) -> Result<Json<Value>, DomainError> {
    let link = state.course_repo.remove_prerequisite(id, body.id()?).await?;
    Ok(Json(json!({
        "detail": format!(
            "Removed {} as a prerequisite for {}",
            link.prerequisite_code, link.course_code
        )
    })))
}
