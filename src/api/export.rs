use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
};

use super::error::ApiPath;
use crate::domain::DomainError;
use crate::infrastructure::export::{export_csv, CsvResource};
use crate::infrastructure::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/export/{resource}",
    params(("resource" = String, Path, description = "schools, academic-years, courses, students or documents")),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv"),
        (status = 404, description = "Unknown resource")
    )
)]
pub async fn export_resource(
    State(state): State<AppState>,
    ApiPath(resource): ApiPath<String>,
) -> Result<impl IntoResponse, DomainError> {
    let resource = CsvResource::from_slug(&resource).ok_or(DomainError::NotFound)?;
    let body = export_csv(&state, resource).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    let disposition = format!("attachment; filename=\"{}\"", resource.file_name());
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok((StatusCode::OK, headers, body))
}
