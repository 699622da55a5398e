//! SeaORM implementation of StudentRepository

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::sea_query::{Condition, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::document_repository::{expiry_horizon, to_view as document_view};
use super::{clean, icontains, sorted};
use crate::domain::choices::{self, DocumentType, Gender, GuardianRelationship};
use crate::domain::{
    now_timestamp, today, validation, DomainError, Student, StudentDocument, StudentFilter,
    StudentInput, StudentPatch, StudentRepository, MEDIA_URL,
};
use crate::models::student::{ActiveModel, Column, Entity as StudentEntity, Model};
use crate::models::student_document;

const ORDERING: &[(&str, Column)] = &[
    ("last_name", Column::LastName),
    ("first_name", Column::FirstName),
    ("student_number", Column::StudentNumber),
    ("date_of_birth", Column::DateOfBirth),
    ("created_at", Column::CreatedAt),
    ("updated_at", Column::UpdatedAt),
];

const SEARCH_COLUMNS: [Column; 7] = [
    Column::FirstName,
    Column::LastName,
    Column::StudentNumber,
    Column::EmailAddress,
    Column::FatherName,
    Column::MotherName,
    Column::GuardianName,
];

/// SeaORM-based implementation of StudentRepository
pub struct SeaOrmStudentRepository {
    db: DatabaseConnection,
}

impl SeaOrmStudentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_model(&self, id: Uuid) -> Result<Model, DomainError> {
        StudentEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)
    }

    async fn views(&self, students: Vec<Model>) -> Result<Vec<Student>, DomainError> {
        if students.is_empty() {
            return Ok(Vec::new());
        }

        let today = today();
        let mut documents: HashMap<Uuid, Vec<StudentDocument>> = HashMap::new();
        let rows = student_document::Entity::find()
            .filter(
                student_document::Column::StudentId
                    .is_in(students.iter().map(|s| s.id).collect::<Vec<_>>()),
            )
            .order_by_asc(student_document::Column::CreatedAt)
            .all(&self.db)
            .await?;
        for row in rows {
            documents
                .entry(row.student_id)
                .or_default()
                .push(document_view(row, today));
        }

        Ok(students
            .into_iter()
            .map(|s| {
                let docs = documents.remove(&s.id).unwrap_or_default();
                to_view(s, docs, today)
            })
            .collect())
    }

    async fn view(&self, student: Model) -> Result<Student, DomainError> {
        let mut views = self.views(vec![student]).await?;
        views.pop().ok_or(DomainError::NotFound)
    }
}

/// First verified document, by identification priority.
fn primary_document(documents: &[StudentDocument]) -> Option<StudentDocument> {
    DocumentType::PRIMARY_PRIORITY.iter().find_map(|kind| {
        documents
            .iter()
            .find(|d| d.is_verified && d.document_type == kind.as_str())
            .cloned()
    })
}

fn to_view(s: Model, documents: Vec<StudentDocument>, today: NaiveDate) -> Student {
    Student {
        full_name: s.full_name(),
        age: s.age(today),
        gender_display: Gender::label_of(s.gender.as_deref()).map(str::to_string),
        guardian_relationship_display: GuardianRelationship::label_of(
            s.guardian_relationship.as_deref(),
        )
        .map(str::to_string),
        primary_contact_name: s.primary_contact_name(),
        primary_contact_phone: s.primary_contact_phone_number(),
        primary_contact_email: s.primary_contact_email_address(),
        has_valid_identification: documents.iter().any(|d| d.is_verified),
        primary_document: primary_document(&documents),
        student_photo: s
            .student_photo
            .as_ref()
            .map(|path| format!("{}{}", MEDIA_URL, path)),
        id: s.id,
        student_number: s.student_number,
        first_name: s.first_name,
        middle_name: s.middle_name,
        last_name: s.last_name,
        gender: s.gender,
        date_of_birth: s.date_of_birth,
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
        documents,
        created_at: s.created_at,
        updated_at: s.updated_at,
    }
}

fn blank() -> Model {
    let now = now_timestamp();
    Model {
        id: Uuid::new_v4(),
        student_number: String::new(),
        first_name: String::new(),
        middle_name: None,
        last_name: String::new(),
        gender: None,
        date_of_birth: None,
        phone_number: None,
        email_address: None,
        student_photo: None,
        student_address: None,
        father_name: None,
        father_phone_number: None,
        father_email_address: None,
        mother_name: None,
        mother_phone_number: None,
        mother_email_address: None,
        guardian_name: None,
        guardian_phone_number: None,
        guardian_email_address: None,
        guardian_address: None,
        guardian_relationship: None,
        other_guardian_relationship: None,
        created_at: now.clone(),
        updated_at: now,
    }
}

/// Insert the student or update the one with the same student number.
///
/// Returns the student id and whether a row was created.
pub(crate) async fn upsert_by_number<C: ConnectionTrait>(
    db: &C,
    input: StudentInput,
) -> Result<(Uuid, bool), DomainError> {
    let existing = StudentEntity::find()
        .filter(Column::StudentNumber.eq(input.student_number.trim()))
        .one(db)
        .await?;
    let created = existing.is_none();
    let mut student = apply(existing.unwrap_or_else(blank), input.into())?;
    student.updated_at = now_timestamp();

    let id = student.id;
    if created {
        into_active(student).insert(db).await?;
    } else {
        into_active(student).update(db).await?;
    }
    Ok((id, created))
}

fn apply(mut s: Model, patch: StudentPatch) -> Result<Model, DomainError> {
    if let Some(number) = patch.student_number {
        s.student_number = number.trim().to_string();
    }
    if let Some(first) = patch.first_name {
        s.first_name = first.trim().to_string();
    }
    if let Some(middle) = patch.middle_name {
        s.middle_name = clean(middle);
    }
    if let Some(last) = patch.last_name {
        s.last_name = last.trim().to_string();
    }
    if let Some(gender) = patch.gender {
        s.gender = choices::normalize(gender, Gender::parse, Gender::as_str)?;
    }
    if let Some(born) = patch.date_of_birth {
        s.date_of_birth = born;
    }
    if let Some(relationship) = patch.guardian_relationship {
        s.guardian_relationship = choices::normalize(
            relationship,
            GuardianRelationship::parse,
            GuardianRelationship::as_str,
        )?;
    }

    let texts = [
        (&mut s.phone_number, patch.phone_number),
        (&mut s.email_address, patch.email_address),
        (&mut s.student_address, patch.student_address),
        (&mut s.father_name, patch.father_name),
        (&mut s.father_phone_number, patch.father_phone_number),
        (&mut s.father_email_address, patch.father_email_address),
        (&mut s.mother_name, patch.mother_name),
        (&mut s.mother_phone_number, patch.mother_phone_number),
        (&mut s.mother_email_address, patch.mother_email_address),
        (&mut s.guardian_name, patch.guardian_name),
        (&mut s.guardian_phone_number, patch.guardian_phone_number),
        (&mut s.guardian_email_address, patch.guardian_email_address),
        (&mut s.guardian_address, patch.guardian_address),
        (
            &mut s.other_guardian_relationship,
            patch.other_guardian_relationship,
        ),
    ];
    for (field, value) in texts {
        if let Some(value) = value {
            *field = clean(value);
        }
    }

    validate(&s)?;
    Ok(s)
}

fn validate(s: &Model) -> Result<(), DomainError> {
    validation::required("student_number", &s.student_number)?;
    validation::max_len("student_number", &s.student_number, 50)?;
    validation::required("first_name", &s.first_name)?;
    validation::max_len("first_name", &s.first_name, 100)?;
    validation::required("last_name", &s.last_name)?;
    validation::max_len("last_name", &s.last_name, 100)?;

    let limits = [
        ("middle_name", &s.middle_name, 100),
        ("phone_number", &s.phone_number, 20),
        ("father_name", &s.father_name, 200),
        ("father_phone_number", &s.father_phone_number, 20),
        ("mother_name", &s.mother_name, 200),
        ("mother_phone_number", &s.mother_phone_number, 20),
        ("guardian_name", &s.guardian_name, 200),
        ("guardian_phone_number", &s.guardian_phone_number, 20),
        ("other_guardian_relationship", &s.other_guardian_relationship, 100),
    ];
    for (field, value, max) in limits {
        if let Some(value) = value {
            validation::max_len(field, value, max)?;
        }
    }

    validation::optional_email("email_address", s.email_address.as_deref())?;
    validation::optional_email("father_email_address", s.father_email_address.as_deref())?;
    validation::optional_email("mother_email_address", s.mother_email_address.as_deref())?;
    validation::optional_email(
        "guardian_email_address",
        s.guardian_email_address.as_deref(),
    )?;
    Ok(())
}

fn into_active(s: Model) -> ActiveModel {
    ActiveModel {
        id: Set(s.id),
        student_number: Set(s.student_number),
        first_name: Set(s.first_name),
        middle_name: Set(s.middle_name),
        last_name: Set(s.last_name),
        gender: Set(s.gender),
        date_of_birth: Set(s.date_of_birth),
        phone_number: Set(s.phone_number),
        email_address: Set(s.email_address),
        student_photo: Set(s.student_photo),
        student_address: Set(s.student_address),
        father_name: Set(s.father_name),
        father_phone_number: Set(s.father_phone_number),
        father_email_address: Set(s.father_email_address),
        mother_name: Set(s.mother_name),
        mother_phone_number: Set(s.mother_phone_number),
        mother_email_address: Set(s.mother_email_address),
        guardian_name: Set(s.guardian_name),
        guardian_phone_number: Set(s.guardian_phone_number),
        guardian_email_address: Set(s.guardian_email_address),
        guardian_address: Set(s.guardian_address),
        guardian_relationship: Set(s.guardian_relationship),
        other_guardian_relationship: Set(s.other_guardian_relationship),
        created_at: Set(s.created_at),
        updated_at: Set(s.updated_at),
    }
}

#[async_trait]
impl StudentRepository for SeaOrmStudentRepository {
    async fn find_all(&self, filter: StudentFilter) -> Result<Vec<Student>, DomainError> {
        let mut query = StudentEntity::find();
        if let Some(gender) = filter.gender {
            if let Some(gender) = Gender::parse(&gender)? {
                query = query.filter(Column::Gender.eq(gender.as_str()));
            }
        }
        if let Some(relationship) = filter.guardian_relationship {
            if let Some(relationship) = GuardianRelationship::parse(&relationship)? {
                query = query.filter(Column::GuardianRelationship.eq(relationship.as_str()));
            }
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let condition = SEARCH_COLUMNS
                .iter()
                .fold(Condition::any(), |cond, column| cond.add(icontains(*column, term)));
            query = query.filter(condition);
        }
        if filter.missing_identification {
            query = query.filter(
                Column::Id.not_in_subquery(
                    Query::select()
                        .column(student_document::Column::StudentId)
                        .from(student_document::Entity)
                        .and_where(student_document::Column::IsVerified.eq(true))
                        .to_owned(),
                ),
            );
        }
        if let Some(days) = filter.documents_expiring_within {
            let today = today();
            query = query.filter(
                Column::Id.in_subquery(
                    Query::select()
                        .column(student_document::Column::StudentId)
                        .from(student_document::Entity)
                        .and_where(student_document::Column::ExpiryDate.gte(today))
                        .and_where(
                            student_document::Column::ExpiryDate
                                .lte(expiry_horizon(today, days)),
                        )
                        .to_owned(),
                ),
            );
        }
        let query = sorted(
            query,
            &filter.ordering,
            ORDERING,
            &[(Column::LastName, Order::Asc), (Column::FirstName, Order::Asc)],
        );

        let students = query.all(&self.db).await?;
        self.views(students).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Student>, DomainError> {
        match StudentEntity::find_by_id(id).one(&self.db).await? {
            Some(s) => Ok(Some(self.view(s).await?)),
            None => Ok(None),
        }
    }

    async fn create(&self, input: StudentInput) -> Result<Student, DomainError> {
        let student = apply(blank(), input.into())?;

        let saved = into_active(student).insert(&self.db).await?;
        tracing::debug!(id = %saved.id, number = %saved.student_number, "Created student");
        self.view(saved).await
    }

    async fn update(&self, id: Uuid, patch: StudentPatch) -> Result<Student, DomainError> {
        let existing = self.find_model(id).await?;
        let mut student = apply(existing, patch)?;
        student.updated_at = now_timestamp();

        let saved = into_active(student).update(&self.db).await?;
        self.view(saved).await
    }

    async fn delete(&self, id: Uuid) -> Result<Option<String>, DomainError> {
        let existing = self.find_model(id).await?;
        StudentEntity::delete_by_id(id).exec(&self.db).await?;
        Ok(existing.student_photo)
    }

    async fn set_photo(
        &self,
        id: Uuid,
        photo: Option<String>,
    ) -> Result<Option<String>, DomainError> {
        let existing = self.find_model(id).await?;
        let previous = existing.student_photo.clone();

        let mut student: ActiveModel = existing.into();
        student.student_photo = Set(photo);
        student.updated_at = Set(now_timestamp());
        student.update(&self.db).await?;

        Ok(previous)
    }
}
