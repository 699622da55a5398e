//! CSV export of every resource, shared by the HTTP endpoint and the CLI.
//!
//! Every file carries the natural keys `import` matches on, so an export can
//! be loaded back into another database.

use std::collections::HashMap;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    AcademicYearFilter, CourseDetail, CourseFilter, DocumentFilter, DomainError, SchoolFilter,
    Student, StudentDocument, StudentFilter,
};
use crate::infrastructure::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CsvResource {
    Schools,
    AcademicYears,
    Courses,
    Students,
    Documents,
}

impl CsvResource {
    /// Path segment and file stem, e.g. `academic-years`.
    pub fn slug(&self) -> &'static str {
        match self {
            CsvResource::Schools => "schools",
            CsvResource::AcademicYears => "academic-years",
            CsvResource::Courses => "courses",
            CsvResource::Students => "students",
            CsvResource::Documents => "documents",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::value_variants()
            .iter()
            .copied()
            .find(|r| r.slug() == slug)
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}_{}.csv",
            self.slug().replace('-', "_"),
            chrono::Utc::now().format("%Y-%m-%d")
        )
    }
}

/// Separator between the codes in a course's `prerequisites` column.
pub const LIST_SEPARATOR: &str = "; ";

/// Courses with the year by name and prerequisites by code.
#[derive(Serialize)]
struct CourseRow {
    id: Uuid,
    code: String,
    name: String,
    description: Option<String>,
    credit_hours: i32,
    academic_year: String,
    is_active: bool,
    prerequisites: String,
    is_advanced_course: bool,
    created_at: String,
}

impl From<CourseDetail> for CourseRow {
    fn from(c: CourseDetail) -> Self {
        let prerequisites = c
            .prerequisites
            .iter()
            .map(|p| p.code.as_str())
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR);
        Self {
            id: c.id,
            code: c.code,
            name: c.name,
            description: c.description,
            credit_hours: c.credit_hours,
            academic_year: c.academic_year_name,
            is_active: c.is_active,
            prerequisites,
            is_advanced_course: c.is_advanced_course,
            created_at: c.created_at,
        }
    }
}

/// Students flattened to scalar columns; documents are summarised.
#[derive(Serialize)]
struct StudentRow {
    id: Uuid,
    student_number: String,
    first_name: String,
    middle_name: Option<String>,
    last_name: String,
    full_name: String,
    gender: Option<String>,
    date_of_birth: Option<NaiveDate>,
    age: i32,
    phone_number: Option<String>,
    email_address: Option<String>,
    student_address: Option<String>,
    father_name: Option<String>,
    father_phone_number: Option<String>,
    father_email_address: Option<String>,
    mother_name: Option<String>,
    mother_phone_number: Option<String>,
    mother_email_address: Option<String>,
    guardian_name: Option<String>,
    guardian_phone_number: Option<String>,
    guardian_email_address: Option<String>,
    guardian_address: Option<String>,
    guardian_relationship: Option<String>,
    other_guardian_relationship: Option<String>,
    primary_contact_name: Option<String>,
    primary_contact_phone: Option<String>,
    primary_contact_email: Option<String>,
    has_valid_identification: bool,
    document_numbers: String,
    created_at: String,
}

impl From<Student> for StudentRow {
    fn from(s: Student) -> Self {
        let document_numbers = s
            .documents
            .iter()
            .map(|d| format!("{}: {}", d.document_type, d.document_number))
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            id: s.id,
            student_number: s.student_number,
            first_name: s.first_name,
            middle_name: s.middle_name,
            last_name: s.last_name,
            full_name: s.full_name,
            gender: s.gender,
            date_of_birth: s.date_of_birth,
            age: s.age,
            phone_number: s.phone_number,
            email_address: s.email_address,
            student_address: s.student_address,
            father_name: s.father_name,
            father_phone_number: s.father_phone_number,
            father_email_address: s.father_email_address,
            mother_name: s.mother_name,
            mother_phone_number: s.mother_phone_number,
            mother_email_address: s.mother_email_address,
            guardian_name: s.guardian_name,
            guardian_phone_number: s.guardian_phone_number,
            guardian_email_address: s.guardian_email_address,
            guardian_address: s.guardian_address,
            guardian_relationship: s.guardian_relationship,
            other_guardian_relationship: s.other_guardian_relationship,
            primary_contact_name: s.primary_contact_name,
            primary_contact_phone: s.primary_contact_phone,
            primary_contact_email: s.primary_contact_email,
            has_valid_identification: s.has_valid_identification,
            document_numbers,
            created_at: s.created_at,
        }
    }
}

/// Documents with their owner's student number alongside the id.
#[derive(Serialize)]
struct DocumentRow {
    id: Uuid,
    student: Uuid,
    student_number: String,
    document_type: String,
    document_number: String,
    issue_date: Option<NaiveDate>,
    expiry_date: Option<NaiveDate>,
    issuing_authority: Option<String>,
    document_file: Option<String>,
    is_verified: bool,
    verification_date: Option<NaiveDate>,
    verification_notes: Option<String>,
    days_until_expiry: Option<i64>,
    is_expired: bool,
    created_at: String,
}

impl DocumentRow {
    fn new(d: StudentDocument, student_number: String) -> Self {
        Self {
            id: d.id,
            student: d.student,
            student_number,
            document_type: d.document_type,
            document_number: d.document_number,
            issue_date: d.issue_date,
            expiry_date: d.expiry_date,
            issuing_authority: d.issuing_authority,
            document_file: d.document_file,
            is_verified: d.is_verified,
            verification_date: d.verification_date,
            verification_notes: d.verification_notes,
            days_until_expiry: d.days_until_expiry,
            is_expired: d.is_expired,
            created_at: d.created_at,
        }
    }
}

fn to_csv<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<Vec<u8>, DomainError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| DomainError::Internal(format!("CSV export failed: {}", e)))?;
    }
    writer
        .into_inner()
        .map_err(|e| DomainError::Internal(format!("CSV export failed: {}", e)))
}

pub async fn export_csv(state: &AppState, resource: CsvResource) -> Result<Vec<u8>, DomainError> {
    let bytes = match resource {
        CsvResource::Schools => {
            to_csv(state.school_repo.find_all(SchoolFilter::default()).await?)?
        }
        CsvResource::AcademicYears => to_csv(
            state
                .academic_year_repo
                .find_all(AcademicYearFilter::default())
                .await?,
        )?,
        CsvResource::Courses => {
            let mut rows = Vec::new();
            for summary in state.course_repo.find_all(CourseFilter::default()).await? {
                if let Some(detail) = state.course_repo.find_by_id(summary.id).await? {
                    rows.push(CourseRow::from(detail));
                }
            }
            to_csv(rows)?
        }
        CsvResource::Students => to_csv(
            state
                .student_repo
                .find_all(StudentFilter::default())
                .await?
                .into_iter()
                .map(StudentRow::from),
        )?,
        CsvResource::Documents => {
            let numbers: HashMap<Uuid, String> = state
                .student_repo
                .find_all(StudentFilter::default())
                .await?
                .into_iter()
                .map(|s| (s.id, s.student_number))
                .collect();
            let rows = state
                .document_repo
                .find_all(DocumentFilter::default())
                .await?
                .into_iter()
                .map(|d| {
                    let number = numbers.get(&d.student).cloned().unwrap_or_default();
                    DocumentRow::new(d, number)
                });
            to_csv(rows)?
        }
    };
    tracing::debug!(resource = resource.slug(), bytes = bytes.len(), "Exported CSV");
    Ok(bytes)
}
