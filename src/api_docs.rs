use crate::api;
use crate::domain;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::academic_year::list_academic_years,
        api::academic_year::create_academic_year,
        api::academic_year::get_academic_year,
        api::academic_year::update_academic_year,
        api::academic_year::patch_academic_year,
        api::academic_year::delete_academic_year,
        api::academic_year::current_academic_year,
        api::academic_year::academic_years_for_date,
        api::academic_year::academic_year_courses,
        api::academic_year::activate_academic_year,
        api::school::list_schools,
        api::school::create_school,
        api::school::get_school,
        api::school::update_school,
        api::school::patch_school,
        api::school::delete_school,
        api::course::list_courses,
        api::course::create_course,
        api::course::get_course,
        api::course::update_course,
        api::course::patch_course,
        api::course::delete_course,
        api::course::course_prerequisites,
        api::course::course_required_for,
        api::course::advanced_courses,
        api::course::courses_without_prerequisites,
        api::course::add_prerequisite,
        api::course::remove_prerequisite,
        api::student::list_students,
        api::student::create_student,
        api::student::get_student,
        api::student::update_student,
        api::student::patch_student,
        api::student::delete_student,
        api::student::upload_photo,
        api::student::remove_photo,
        api::student::student_documents,
        api::student::search_students,
        api::student::students_missing_documents,
        api::student::students_with_expiring_documents,
        api::document::list_documents,
        api::document::create_document,
        api::document::get_document,
        api::document::update_document,
        api::document::patch_document,
        api::document::delete_document,
        api::document::expiring_documents,
        api::document::expired_documents,
        api::document::unverified_documents,
        api::document::verify_document,
        api::export::export_resource,
    ),
    components(
        schemas(
            domain::AcademicYear,
            domain::AcademicYearInput,
            domain::School,
            domain::SchoolInput,
            domain::CourseSummary,
            domain::CourseDetail,
            domain::CourseInput,
            domain::PrerequisiteCourse,
            domain::Student,
            domain::StudentInput,
            domain::StudentDocument,
            domain::DocumentInput,
            api::course::PrerequisiteRequest,
            api::student::PhotoUpload,
        )
    ),
    tags(
        (name = "school-registry", description = "School Registry API")
    )
)]
pub struct ApiDoc;
