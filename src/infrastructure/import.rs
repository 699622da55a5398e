//! CSV import, the reverse of [`export`](super::export).
//!
//! Rows are matched on their natural key and inserted when new, updated
//! otherwise:
//!
//! | resource       | key                              |
//! |----------------|----------------------------------|
//! | schools        | `name`                           |
//! | academic-years | `name`                           |
//! | courses        | `code`                           |
//! | students       | `student_number`                 |
//! | documents      | `student_number`, `document_type` |
//!
//! A file is applied in one transaction. The first bad row aborts it and
//! nothing is written.

use chrono::NaiveDate;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use super::export::{CsvResource, LIST_SEPARATOR};
use super::repositories::{
    academic_year_repository, course_repository, document_repository, school_repository,
    student_repository,
};
use crate::domain::{
    AcademicYearInput, CoursePatch, DocumentInput, DomainError, SchoolInput, StudentInput,
};
use crate::models::{academic_year, course, student};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
}

impl ImportReport {
    fn record(&mut self, created: bool) {
        if created {
            self.created += 1;
        } else {
            self.updated += 1;
        }
    }
}

/// Course row; the year is named and prerequisites are listed by code.
#[derive(Deserialize)]
struct CourseRecord {
    code: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    credit_hours: i32,
    academic_year: String,
    #[serde(default = "default_true")]
    is_active: bool,
    #[serde(default)]
    prerequisites: String,
}

/// Document row; the owner is found by student number.
#[derive(Deserialize)]
struct DocumentRecord {
    student_number: String,
    document_type: String,
    document_number: String,
    #[serde(default)]
    issue_date: Option<NaiveDate>,
    #[serde(default)]
    expiry_date: Option<NaiveDate>,
    #[serde(default)]
    issuing_authority: Option<String>,
    #[serde(default)]
    document_file: Option<String>,
    #[serde(default)]
    is_verified: bool,
    #[serde(default)]
    verification_date: Option<NaiveDate>,
    #[serde(default)]
    verification_notes: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Line number of the `index`th record, counting the header as line 1.
fn line_of(index: usize) -> usize {
    index + 2
}

fn at_row(row: usize, e: impl std::fmt::Display) -> DomainError {
    DomainError::Validation(format!("row {}: {}", row, e))
}

fn records<T: DeserializeOwned>(data: &[u8]) -> Result<Vec<(usize, T)>, DomainError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data)
        .deserialize()
        .enumerate()
        .map(|(i, record)| {
            let row = line_of(i);
            record.map(|r| (row, r)).map_err(|e| at_row(row, e))
        })
        .collect()
}

/// Load one CSV file into the database.
pub async fn import_csv(
    db: &DatabaseConnection,
    resource: CsvResource,
    data: &[u8],
) -> Result<ImportReport, DomainError> {
    let txn = db.begin().await?;

    let report = match resource {
        CsvResource::Schools => {
            let mut report = ImportReport::default();
            for (row, input) in records::<SchoolInput>(data)? {
                let created = school_repository::upsert_by_name(&txn, input)
                    .await
                    .map_err(|e| at_row(row, e))?;
                report.record(created);
            }
            report
        }
        CsvResource::AcademicYears => {
            let mut report = ImportReport::default();
            for (row, input) in records::<AcademicYearInput>(data)? {
                let created = academic_year_repository::upsert_by_name(&txn, input)
                    .await
                    .map_err(|e| at_row(row, e))?;
                report.record(created);
            }
            report
        }
        CsvResource::Courses => import_courses(&txn, data).await?,
        CsvResource::Students => {
            let mut report = ImportReport::default();
            for (row, input) in records::<StudentInput>(data)? {
                let (_, created) = student_repository::upsert_by_number(&txn, input)
                    .await
                    .map_err(|e| at_row(row, e))?;
                report.record(created);
            }
            report
        }
        CsvResource::Documents => import_documents(&txn, data).await?,
    };

    txn.commit().await?;
    tracing::info!(
        resource = resource.slug(),
        created = report.created,
        updated = report.updated,
        "Imported CSV"
    );
    Ok(report)
}

async fn import_courses<C: ConnectionTrait>(
    db: &C,
    data: &[u8],
) -> Result<ImportReport, DomainError> {
    let mut report = ImportReport::default();
    let mut linked: Vec<(usize, Uuid, String)> = Vec::new();

    for (row, record) in records::<CourseRecord>(data)? {
        let year = academic_year::Entity::find()
            .filter(academic_year::Column::Name.eq(record.academic_year.as_str()))
            .one(db)
            .await?
            .ok_or_else(|| {
                at_row(
                    row,
                    format!("academic_year: no academic year named \"{}\"", record.academic_year),
                )
            })?;
        let patch = CoursePatch {
            code: Some(record.code),
            name: Some(record.name),
            description: Some(record.description),
            credit_hours: Some(record.credit_hours),
            academic_year: Some(year.id),
            is_active: Some(record.is_active),
            prerequisites: None,
        };
        let (id, created) = course_repository::upsert_by_code(db, &patch)
            .await
            .map_err(|e| at_row(row, e))?;
        report.record(created);
        linked.push((row, id, record.prerequisites));
    }

    // Edges are replaced only once every course in the file exists. Clearing
    // them all first keeps a reordered graph from looking cyclic midway.
    for (row, id, _) in &linked {
        course_repository::set_prerequisites(db, *id, Vec::new())
            .await
            .map_err(|e| at_row(*row, e))?;
    }
    for (row, id, codes) in linked {
        let mut prerequisites = Vec::new();
        for code in codes
            .split(LIST_SEPARATOR.trim())
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            let prerequisite = course::Entity::find()
                .filter(course::Column::Code.eq(code))
                .one(db)
                .await?
                .ok_or_else(|| {
                    at_row(row, format!("prerequisites: no course with code \"{}\"", code))
                })?;
            prerequisites.push(prerequisite.id);
        }
        course_repository::set_prerequisites(db, id, prerequisites)
            .await
            .map_err(|e| at_row(row, e))?;
    }
    Ok(report)
}

async fn import_documents<C: ConnectionTrait>(
    db: &C,
    data: &[u8],
) -> Result<ImportReport, DomainError> {
    let mut report = ImportReport::default();
    for (row, record) in records::<DocumentRecord>(data)? {
        let owner = student::Entity::find()
            .filter(student::Column::StudentNumber.eq(record.student_number.as_str()))
            .one(db)
            .await?
            .ok_or_else(|| {
                at_row(
                    row,
                    format!("student_number: no student numbered \"{}\"", record.student_number),
                )
            })?;
        let input = DocumentInput {
            student: owner.id,
            document_type: record.document_type,
            document_number: record.document_number,
            issue_date: record.issue_date,
            expiry_date: record.expiry_date,
            issuing_authority: record.issuing_authority,
            document_file: record.document_file,
            is_verified: record.is_verified,
            verification_date: record.verification_date,
            verification_notes: record.verification_notes,
        };
        let created = document_repository::upsert_by_type(db, input)
            .await
            .map_err(|e| at_row(row, e))?;
        report.record(created);
    }
    Ok(report)
}
