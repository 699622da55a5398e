pub mod academic_year;
pub mod course;
pub mod course_prerequisite;
pub mod schema_migration;
pub mod school;
pub mod student;
pub mod student_document;
