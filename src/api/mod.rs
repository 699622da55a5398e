pub mod academic_year;
pub mod course;
pub mod document;
pub mod error;
pub mod export;
pub mod health;
pub mod params;
pub mod school;
pub mod student;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::infrastructure::media::MAX_PHOTO_BYTES;
use crate::infrastructure::AppState;

/// Routes below `/api`. Versioned resources live under `/v1`.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .nest("/v1", v1_router())
        .with_state(state)
}

fn v1_router() -> Router<AppState> {
    Router::new()
        // Academic years
        .route(
            "/academic-years",
            get(academic_year::list_academic_years).post(academic_year::create_academic_year),
        )
        .route(
            "/academic-years/current",
            get(academic_year::current_academic_year),
        )
        .route(
            "/academic-years/for_date",
            get(academic_year::academic_years_for_date),
        )
        .route(
            "/academic-years/:id",
            get(academic_year::get_academic_year)
                .put(academic_year::update_academic_year)
                .patch(academic_year::patch_academic_year)
                .delete(academic_year::delete_academic_year),
        )
        .route(
            "/academic-years/:id/courses",
            get(academic_year::academic_year_courses),
        )
        .route(
            "/academic-years/:id/activate",
            post(academic_year::activate_academic_year),
        )
        // Schools
        .route(
            "/schools",
            get(school::list_schools).post(school::create_school),
        )
        .route(
            "/schools/:id",
            get(school::get_school)
                .put(school::update_school)
                .patch(school::patch_school)
                .delete(school::delete_school),
        )
        // Courses
        .route(
            "/courses",
            get(course::list_courses).post(course::create_course),
        )
        .route("/courses/advanced", get(course::advanced_courses))
        .route(
            "/courses/without_prerequisites",
            get(course::courses_without_prerequisites),
        )
        .route(
            "/courses/:id",
            get(course::get_course)
                .put(course::update_course)
                .patch(course::patch_course)
                .delete(course::delete_course),
        )
        .route(
            "/courses/:id/prerequisites",
            get(course::course_prerequisites),
        )
        .route("/courses/:id/required_for", get(course::course_required_for))
        .route(
            "/courses/:id/add_prerequisite",
            post(course::add_prerequisite),
        )
        .route(
            "/courses/:id/remove_prerequisite",
            post(course::remove_prerequisite),
        )
        // Students
        .route(
            "/students",
            get(student::list_students).post(student::create_student),
        )
        .route("/students/search", get(student::search_students))
        .route(
            "/students/missing_documents",
            get(student::students_missing_documents),
        )
        .route(
            "/students/expiring_documents",
            get(student::students_with_expiring_documents),
        )
        .route(
            "/students/:id",
            get(student::get_student)
                .put(student::update_student)
                .patch(student::patch_student)
                .delete(student::delete_student),
        )
        .route(
            "/students/:id/upload_photo",
            post(student::upload_photo).layer(DefaultBodyLimit::max(2 * MAX_PHOTO_BYTES)),
        )
        .route(
            "/students/:id/remove_photo",
            axum::routing::delete(student::remove_photo),
        )
        .route("/students/:id/documents", get(student::student_documents))
        // Documents
        .route(
            "/documents",
            get(document::list_documents).post(document::create_document),
        )
        .route("/documents/expiring", get(document::expiring_documents))
        .route("/documents/expired", get(document::expired_documents))
        .route("/documents/unverified", get(document::unverified_documents))
        .route(
            "/documents/:id",
            get(document::get_document)
                .put(document::update_document)
                .patch(document::patch_document)
                .delete(document::delete_document),
        )
        .route("/documents/:id/verify", post(document::verify_document))
        // Export
        .route("/export/:resource", get(export::export_resource))
}
