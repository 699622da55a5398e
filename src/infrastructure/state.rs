//! Application state containing repositories and shared resources

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use super::media::MediaStore;
use crate::domain::{
    AcademicYearRepository, CourseRepository, DocumentRepository, SchoolRepository,
    StudentRepository,
};
use crate::infrastructure::{
    SeaOrmAcademicYearRepository, SeaOrmCourseRepository, SeaOrmDocumentRepository,
    SeaOrmSchoolRepository, SeaOrmStudentRepository,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    pub academic_year_repo: Arc<dyn AcademicYearRepository>,
    pub school_repo: Arc<dyn SchoolRepository>,
    pub course_repo: Arc<dyn CourseRepository>,
    pub student_repo: Arc<dyn StudentRepository>,
    pub document_repo: Arc<dyn DocumentRepository>,
    /// Where uploaded photos are written
    pub media: MediaStore,
}

impl AppState {
    /// Create a new AppState with all repositories initialized
    pub fn new(db: DatabaseConnection, media: MediaStore) -> Self {
        Self {
            academic_year_repo: Arc::new(SeaOrmAcademicYearRepository::new(db.clone())),
            school_repo: Arc::new(SeaOrmSchoolRepository::new(db.clone())),
            course_repo: Arc::new(SeaOrmCourseRepository::new(db.clone())),
            student_repo: Arc::new(SeaOrmStudentRepository::new(db.clone())),
            document_repo: Arc::new(SeaOrmDocumentRepository::new(db.clone())),
            media,
            db,
        }
    }

    /// Raw connection, for health checks and CSV transfer
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}
