//! SeaORM implementation of DocumentRepository

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order,
    QueryFilter, Set,
};
use uuid::Uuid;

use super::{clean, sorted};
use crate::domain::choices::{self, DocumentType};
use crate::domain::{
    now_timestamp, today, validation, DocumentFilter, DocumentInput, DocumentPatch,
    DocumentRepository, DomainError, StudentDocument,
};
use crate::models::student;
use crate::models::student_document::{ActiveModel, Column, Entity as DocumentEntity, Model};

const ORDERING: &[(&str, Column)] = &[
    ("issue_date", Column::IssueDate),
    ("expiry_date", Column::ExpiryDate),
    ("created_at", Column::CreatedAt),
    ("updated_at", Column::UpdatedAt),
];

const MAX_WINDOW_DAYS: i64 = 36_500;

/// SeaORM-based implementation of DocumentRepository
pub struct SeaOrmDocumentRepository {
    db: DatabaseConnection,
}

impl SeaOrmDocumentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_model(&self, id: Uuid) -> Result<Model, DomainError> {
        DocumentEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)
    }
}

async fn validate<C: ConnectionTrait>(db: &C, d: &Model) -> Result<(), DomainError> {
    if d.document_type.is_empty() {
        return Err(DomainError::Validation(
            "document_type: This field may not be blank.".to_string(),
        ));
    }
    validation::required("document_number", &d.document_number)?;
    validation::max_len("document_number", &d.document_number, 100)?;
    if let Some(authority) = &d.issuing_authority {
        validation::max_len("issuing_authority", authority, 255)?;
    }
    if let Some(file) = &d.document_file {
        validation::max_len("document_file", file, 255)?;
    }

    let owner = student::Entity::find_by_id(d.student_id).one(db).await?;
    if owner.is_none() {
        return Err(DomainError::Validation(format!(
            "student: Invalid pk \"{}\" - object does not exist.",
            d.student_id
        )));
    }

    let duplicate = DocumentEntity::find()
        .filter(Column::StudentId.eq(d.student_id))
        .filter(Column::DocumentType.eq(d.document_type.as_str()))
        .filter(Column::Id.ne(d.id))
        .one(db)
        .await?;
    if duplicate.is_some() {
        return Err(DomainError::Conflict(
            "The fields student, document_type must make a unique set.".to_string(),
        ));
    }
    Ok(())
}

fn blank(student: Uuid) -> Model {
    let now = now_timestamp();
    Model {
        id: Uuid::new_v4(),
        student_id: student,
        document_type: String::new(),
        document_number: String::new(),
        issue_date: None,
        expiry_date: None,
        issuing_authority: None,
        document_file: None,
        is_verified: false,
        verification_date: None,
        verification_notes: None,
        created_at: now.clone(),
        updated_at: now,
    }
}

/// Insert the document or replace the student's document of the same type.
///
/// Returns `true` when a row was created.
pub(crate) async fn upsert_by_type<C: ConnectionTrait>(
    db: &C,
    input: DocumentInput,
) -> Result<bool, DomainError> {
    let draft = apply(blank(input.student), input.into())?;
    let existing = DocumentEntity::find()
        .filter(Column::StudentId.eq(draft.student_id))
        .filter(Column::DocumentType.eq(draft.document_type.as_str()))
        .one(db)
        .await?;
    let created = existing.is_none();
    let document = match existing {
        Some(current) => Model {
            id: current.id,
            created_at: current.created_at,
            ..draft
        },
        None => draft,
    };
    validate(db, &document).await?;

    if created {
        into_active(document).insert(db).await?;
    } else {
        into_active(document).update(db).await?;
    }
    Ok(created)
}

/// Last expiry date that still counts as "expiring within `days`".
pub(crate) fn expiry_horizon(today: NaiveDate, days: i64) -> NaiveDate {
    today + Duration::days(days.clamp(0, MAX_WINDOW_DAYS))
}

/// Document as exposed by the API, with expiry derived from `today`.
pub(crate) fn to_view(d: Model, today: NaiveDate) -> StudentDocument {
    StudentDocument {
        document_type_display: DocumentType::label_of(Some(&d.document_type)).map(str::to_string),
        days_until_expiry: d.days_until_expiry(today),
        is_expired: d.is_expired(today),
        id: d.id,
        student: d.student_id,
        document_type: d.document_type,
        document_number: d.document_number,
        issue_date: d.issue_date,
        expiry_date: d.expiry_date,
        issuing_authority: d.issuing_authority,
        document_file: d.document_file,
        is_verified: d.is_verified,
        verification_date: d.verification_date,
        verification_notes: d.verification_notes,
        created_at: d.created_at,
        updated_at: d.updated_at,
    }
}

fn apply(mut d: Model, patch: DocumentPatch) -> Result<Model, DomainError> {
    if let Some(student) = patch.student {
        d.student_id = student;
    }
    if let Some(kind) = patch.document_type {
        d.document_type = choices::normalize(Some(kind), DocumentType::parse, DocumentType::as_str)?
            .unwrap_or_default();
    }
    if let Some(number) = patch.document_number {
        d.document_number = number.trim().to_string();
    }
    if let Some(issued) = patch.issue_date {
        d.issue_date = issued;
    }
    if let Some(expiry) = patch.expiry_date {
        d.expiry_date = expiry;
    }
    if let Some(authority) = patch.issuing_authority {
        d.issuing_authority = clean(authority);
    }
    if let Some(file) = patch.document_file {
        d.document_file = clean(file);
    }
    if let Some(verified) = patch.is_verified {
        d.is_verified = verified;
    }
    if let Some(date) = patch.verification_date {
        d.verification_date = date;
    }
    if let Some(notes) = patch.verification_notes {
        d.verification_notes = clean(notes);
    }
    Ok(d)
}

fn into_active(d: Model) -> ActiveModel {
    ActiveModel {
        id: Set(d.id),
        student_id: Set(d.student_id),
        document_type: Set(d.document_type),
        document_number: Set(d.document_number),
        issue_date: Set(d.issue_date),
        expiry_date: Set(d.expiry_date),
        issuing_authority: Set(d.issuing_authority),
        document_file: Set(d.document_file),
        is_verified: Set(d.is_verified),
        verification_date: Set(d.verification_date),
        verification_notes: Set(d.verification_notes),
        created_at: Set(d.created_at),
        updated_at: Set(d.updated_at),
    }
}

#[async_trait]
impl DocumentRepository for SeaOrmDocumentRepository {
    async fn find_all(&self, filter: DocumentFilter) -> Result<Vec<StudentDocument>, DomainError> {
        let today = today();
        let mut query = DocumentEntity::find();
        if let Some(student) = filter.student {
            query = query.filter(Column::StudentId.eq(student));
        }
        if let Some(kind) = filter.document_type {
            if let Some(kind) = DocumentType::parse(&kind)? {
                query = query.filter(Column::DocumentType.eq(kind.as_str()));
            }
        }
        if let Some(verified) = filter.is_verified {
            query = query.filter(Column::IsVerified.eq(verified));
        }
        if let Some(days) = filter.expiring_within {
            query = query
                .filter(Column::ExpiryDate.gte(today))
                .filter(Column::ExpiryDate.lte(expiry_horizon(today, days)));
        }
        if filter.expired_only {
            query = query.filter(Column::ExpiryDate.lt(today));
        }
        let query = sorted(
            query,
            &filter.ordering,
            ORDERING,
            &[(Column::CreatedAt, Order::Desc)],
        );

        let documents = query.all(&self.db).await?;
        Ok(documents.into_iter().map(|d| to_view(d, today)).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<StudentDocument>, DomainError> {
        let document = DocumentEntity::find_by_id(id).one(&self.db).await?;
        Ok(document.map(|d| to_view(d, today())))
    }

    async fn create(&self, input: DocumentInput) -> Result<StudentDocument, DomainError> {
        let document = apply(blank(input.student), input.into())?;
        validate(&self.db, &document).await?;

        let saved = into_active(document).insert(&self.db).await?;
        tracing::debug!(id = %saved.id, student = %saved.student_id, kind = %saved.document_type, "Created document");
        Ok(to_view(saved, today()))
    }

    async fn update(
        &self,
        id: Uuid,
        patch: DocumentPatch,
    ) -> Result<StudentDocument, DomainError> {
        let existing = self.find_model(id).await?;
        let mut document = apply(existing, patch)?;
        document.updated_at = now_timestamp();
        validate(&self.db, &document).await?;

        let saved = into_active(document).update(&self.db).await?;
        Ok(to_view(saved, today()))
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let result = DocumentEntity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound);
        }

        Ok(())
    }

    async fn verify(&self, id: Uuid, notes: String) -> Result<StudentDocument, DomainError> {
        let existing = self.find_model(id).await?;
        let today = today();

        let mut document: ActiveModel = existing.into();
        document.is_verified = Set(true);
        document.verification_date = Set(Some(today));
        document.verification_notes = Set(clean(Some(notes)));
        document.updated_at = Set(now_timestamp());

        let saved = document.update(&self.db).await?;
        tracing::info!(id = %saved.id, "Verified document");
        Ok(to_view(saved, today))
    }
}
