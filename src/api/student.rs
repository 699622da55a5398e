//! Student API handlers, including photo upload and document lookups

use std::collections::HashMap;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use utoipa::ToSchema;
use uuid::Uuid;

use super::error::{ApiJson, ApiPath};
use super::params;
use crate::domain::{
    DocumentFilter, DomainError, Student, StudentDocument, StudentFilter, StudentInput,
    StudentPatch,
};
use crate::infrastructure::media::MAX_PHOTO_BYTES;
use crate::infrastructure::AppState;

const PHOTO_FIELD: &str = "student_photo";

/// Multipart form accepted by upload_photo
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct PhotoUpload {
    #[schema(value_type = String, format = Binary)]
    student_photo: Vec<u8>,
}

#[utoipa::path(
    get,
    path = "/api/v1/students",
    params(
        ("gender" = Option<String>, Query, description = "MALE or FEMALE"),
        ("guardian_relationship" = Option<String>, Query, description = "Relationship code"),
        ("search" = Option<String>, Query, description = "Matches names, student number or email"),
        ("ordering" = Option<String>, Query, description = "last_name, first_name, student_number, date_of_birth, created_at or updated_at")
    ),
    responses((status = 200, description = "Students by last and first name", body = [Student]))
)]
pub async fn list_students(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Student>>, DomainError> {
    let filter = StudentFilter {
        gender: params::text(&params, "gender"),
        guardian_relationship: params::text(&params, "guardian_relationship"),
        search: params::text(&params, "search"),
        ordering: params::ordering(&params),
        ..Default::default()
    };
    Ok(Json(state.student_repo.find_all(filter).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/students",
    request_body = StudentInput,
    responses(
        (status = 201, description = "Student created", body = Student),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_student(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<StudentInput>,
) -> Result<impl IntoResponse, DomainError> {
    let student = state.student_repo.create(input).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

#[utoipa::path(
    get,
    path = "/api/v1/students/{id}",
    params(("id" = Uuid, Path, description = "Student id")),
    responses(
        (status = 200, description = "Student with documents", body = Student),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_student(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Student>, DomainError> {
    match state.student_repo.find_by_id(id).await? {
        Some(student) => Ok(Json(student)),
        None => Err(DomainError::NotFound),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/students/{id}",
    params(("id" = Uuid, Path, description = "Student id")),
    request_body = StudentInput,
    responses(
        (status = 200, description = "Student replaced", body = Student),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_student(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<StudentInput>,
) -> Result<Json<Student>, DomainError> {
    Ok(Json(state.student_repo.update(id, input.into()).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/students/{id}",
    params(("id" = Uuid, Path, description = "Student id")),
    request_body(content = Object, description = "Any subset of the student fields"),
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Not found")
    )
)]
pub async fn patch_student(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<StudentPatch>,
) -> Result<Json<Student>, DomainError> {
    Ok(Json(state.student_repo.update(id, patch).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/students/{id}",
    params(("id" = Uuid, Path, description = "Student id")),
    responses(
        (status = 204, description = "Deleted with documents and photo"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_student(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, DomainError> {
    if let Some(photo) = state.student_repo.delete(id).await? {
        if let Err(e) = state.media.remove(&photo).await {
            tracing::warn!(%id, "Failed to remove photo {}: {}", photo, e);
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/students/{id}/upload_photo",
    params(("id" = Uuid, Path, description = "Student id")),
    request_body(content = PhotoUpload, content_type = "multipart/form-data", description = "JPEG or PNG image"),
    responses(
        (status = 200, description = "Photo stored"),
        (status = 400, description = "Missing, oversized or non-image upload"),
        (status = 404, description = "Not found")
    )
)]
pub async fn upload_photo(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, DomainError> {
    if state.student_repo.find_by_id(id).await?.is_none() {
        return Err(DomainError::NotFound);
    }

    let mut multipart = multipart.map_err(|e| DomainError::Validation(e.body_text()))?;
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DomainError::Validation(e.body_text()))?
    {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| DomainError::Validation(e.body_text()))?;
        upload = Some((content_type, file_name, bytes));
        break;
    }

    let Some((content_type, file_name, bytes)) = upload else {
        return Err(DomainError::Validation(
            "No photo provided. Use 'student_photo' field to upload an image.".to_string(),
        ));
    };
    if !content_type.starts_with("image") {
        return Err(DomainError::Validation(
            "Uploaded file is not an image".to_string(),
        ));
    }
    if bytes.len() > MAX_PHOTO_BYTES {
        return Err(DomainError::Validation(
            "Image file too large ( > 5MB )".to_string(),
        ));
    }

    let stored = state
        .media
        .save_photo(&bytes, file_name.as_deref())
        .await
        .map_err(|e| DomainError::Internal(format!("Failed to store photo: {}", e)))?;

    let previous = match state.student_repo.set_photo(id, Some(stored.clone())).await {
        Ok(previous) => previous,
        Err(e) => {
            if let Err(cleanup) = state.media.remove(&stored).await {
                tracing::warn!("Failed to discard photo {}: {}", stored, cleanup);
            }
            return Err(e);
        }
    };
    if let Some(previous) = previous {
        if let Err(e) = state.media.remove(&previous).await {
            tracing::warn!(%id, "Failed to remove replaced photo {}: {}", previous, e);
        }
    }

    tracing::info!(%id, path = %stored, "Uploaded student photo");
    Ok(Json(json!({
        "message": "Photo uploaded successfully",
        "photo_url": state.media.url(&stored)
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/students/{id}/remove_photo",
    params(("id" = Uuid, Path, description = "Student id")),
    responses(
        (status = 200, description = "Photo removed"),
        (status = 404, description = "Student not found or has no photo")
    )
)]
pub async fn remove_photo(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Value>, DomainError> {
    let Some(student) = state.student_repo.find_by_id(id).await? else {
        return Err(DomainError::NotFound);
    };
    if student.student_photo.is_none() {
        return Err(DomainError::MissingRelated("No photo to remove".to_string()));
    }

    if let Some(previous) = state.student_repo.set_photo(id, None).await? {
        if let Err(e) = state.media.remove(&previous).await {
            tracing::warn!(%id, "Failed to remove photo {}: {}", previous, e);
        }
    }
    Ok(Json(json!({"message": "Photo removed successfully"})))
}

#[utoipa::path(
    get,
    path = "/api/v1/students/{id}/documents",
    params(("id" = Uuid, Path, description = "Student id")),
    responses(
        (status = 200, description = "Documents of the student", body = [StudentDocument]),
        (status = 404, description = "Not found")
    )
)]
pub async fn student_documents(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<StudentDocument>>, DomainError> {
    if state.student_repo.find_by_id(id).await?.is_none() {
        return Err(DomainError::NotFound);
    }
    let filter = DocumentFilter {
        student: Some(id),
        ..Default::default()
    };
    Ok(Json(state.document_repo.find_all(filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/students/search",
    params(("q" = String, Query, description = "Matches names, student number or email")),
    responses(
        (status = 200, description = "Matching students", body = [Student]),
        (status = 400, description = "Missing q")
    )
)]
pub async fn search_students(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Student>>, DomainError> {
    let Some(query) = params::text(&params, "q") else {
        return Err(DomainError::Validation(
            "Search query parameter \"q\" is required".to_string(),
        ));
    };
    let filter = StudentFilter {
        search: Some(query),
        ..Default::default()
    };
    Ok(Json(state.student_repo.find_all(filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/students/missing_documents",
    responses((status = 200, description = "Students without verified identification", body = [Student]))
)]
/// Students without any verified identification document
pub async fn students_missing_documents(
    State(state): State<AppState>,
) -> Result<Json<Vec<Student>>, DomainError> {
    let filter = StudentFilter {
        missing_identification: true,
        ..Default::default()
    };
    Ok(Json(state.student_repo.find_all(filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/students/expiring_documents",
    params(("days" = Option<i64>, Query, description = "Window in days, default 90")),
    responses(
        (status = 200, description = "Students with documents expiring soon", body = [Student]),
        (status = 400, description = "days is not an integer")
    )
)]
pub async fn students_with_expiring_documents(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Student>>, DomainError> {
    let filter = StudentFilter {
        documents_expiring_within: Some(params::days(&params)?),
        ..Default::default()
    };
    Ok(Json(state.student_repo.find_all(filter).await?))
}
