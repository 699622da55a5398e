//! Versioned schema migrations.
//!
//! Every migration runs at most once per database: applied versions are
//! recorded in `schema_migrations`, and a run applies all pending versions in
//! a single transaction.

use std::collections::HashSet;

use sea_orm::sea_query::{ColumnDef, ForeignKey, ForeignKeyAction, Index, Table};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait, QueryOrder, Set,
    Statement, TransactionTrait,
};

use crate::models::{
    academic_year, course, course_prerequisite, schema_migration, school, student,
    student_document,
};

/// Lock key serialising concurrent migrators on PostgreSQL.
const ADVISORY_LOCK_KEY: i64 = 0x5343_484f_4f4c;

pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub up: fn(DbBackend) -> Vec<Statement>,
}

#[derive(Debug, Default)]
pub struct MigrationReport {
    /// Versions applied by this run, in order
    pub applied: Vec<(i64, &'static str)>,
    /// Versions that were already present
    pub skipped: usize,
}

pub fn migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            name: "create_academic_tables",
            up: create_academic_tables,
        },
        Migration {
            version: 2,
            name: "create_student_tables",
            up: create_student_tables,
        },
        Migration {
            version: 3,
            name: "add_lookup_indexes",
            up: add_lookup_indexes,
        },
    ]
}

pub async fn run_migrations(db: &DatabaseConnection) -> Result<MigrationReport, DbErr> {
    apply(db, migrations()).await
}

/// Apply the pending members of `set`, all or nothing.
pub async fn apply(db: &DatabaseConnection, set: Vec<Migration>) -> Result<MigrationReport, DbErr> {
    let backend = db.get_database_backend();
    let txn = db.begin().await?;

    if backend == DbBackend::Postgres {
        txn.execute(Statement::from_string(
            backend,
            format!("SELECT pg_advisory_xact_lock({})", ADVISORY_LOCK_KEY),
        ))
        .await?;
    }

    txn.execute(
        backend.build(
            Table::create()
                .table(schema_migration::Entity)
                .if_not_exists()
                .col(
                    ColumnDef::new(schema_migration::Column::Version)
                        .big_integer()
                        .not_null()
                        .primary_key(),
                )
                .col(ColumnDef::new(schema_migration::Column::Name).string().not_null())
                .col(
                    ColumnDef::new(schema_migration::Column::AppliedAt)
                        .string()
                        .not_null(),
                ),
        ),
    )
    .await?;

    let applied: HashSet<i64> = schema_migration::Entity::find()
        .order_by_asc(schema_migration::Column::Version)
        .all(&txn)
        .await?
        .into_iter()
        .map(|m| m.version)
        .collect();

    let mut report = MigrationReport::default();
    for migration in set {
        if applied.contains(&migration.version) {
            report.skipped += 1;
            continue;
        }

        tracing::debug!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        for statement in (migration.up)(backend) {
            txn.execute(statement).await?;
        }

        schema_migration::Entity::insert(schema_migration::ActiveModel {
            version: Set(migration.version),
            name: Set(migration.name.to_string()),
            applied_at: Set(chrono::Utc::now().to_rfc3339()),
        })
        .exec_without_returning(&txn)
        .await?;

        report.applied.push((migration.version, migration.name));
    }

    txn.commit().await?;
    Ok(report)
}

/// Versions recorded as applied, ascending.
pub async fn applied_versions(db: &DatabaseConnection) -> Result<Vec<i64>, DbErr> {
    Ok(schema_migration::Entity::find()
        .order_by_asc(schema_migration::Column::Version)
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.version)
        .collect())
}

fn create_academic_tables(backend: DbBackend) -> Vec<Statement> {
    vec![
        backend.build(
            Table::create()
                .table(academic_year::Entity)
                .col(
                    ColumnDef::new(academic_year::Column::Id)
                        .uuid()
                        .not_null()
                        .primary_key(),
                )
                .col(
                    ColumnDef::new(academic_year::Column::Name)
                        .string_len(100)
                        .not_null(),
                )
                .col(ColumnDef::new(academic_year::Column::StartDate).date().not_null())
                .col(ColumnDef::new(academic_year::Column::EndDate).date().not_null())
                .col(
                    ColumnDef::new(academic_year::Column::IsActive)
                        .boolean()
                        .not_null()
                        .default(false),
                ),
        ),
        backend.build(
            Table::create()
                .table(school::Entity)
                .col(ColumnDef::new(school::Column::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(school::Column::Name).string_len(100).not_null())
                .col(ColumnDef::new(school::Column::Address).text().not_null())
                .col(
                    ColumnDef::new(school::Column::PhoneNumber)
                        .string_len(20)
                        .not_null(),
                )
                .col(
                    ColumnDef::new(school::Column::EmailAddress)
                        .string_len(254)
                        .not_null(),
                )
                .col(ColumnDef::new(school::Column::WebsiteUrl).string_len(200).null()),
        ),
        backend.build(
            Table::create()
                .table(course::Entity)
                .col(ColumnDef::new(course::Column::Id).uuid().not_null().primary_key())
                .col(
                    ColumnDef::new(course::Column::Code)
                        .string_len(20)
                        .not_null()
                        .unique_key(),
                )
                .col(ColumnDef::new(course::Column::Name).string_len(255).not_null())
                .col(ColumnDef::new(course::Column::Description).text().null())
                .col(
                    ColumnDef::new(course::Column::CreditHours)
                        .integer()
                        .not_null()
                        .default(3),
                )
                .col(ColumnDef::new(course::Column::AcademicYearId).uuid().not_null())
                .col(
                    ColumnDef::new(course::Column::IsActive)
                        .boolean()
                        .not_null()
                        .default(true),
                )
                .col(ColumnDef::new(course::Column::CreatedAt).string().not_null())
                .col(ColumnDef::new(course::Column::UpdatedAt).string().not_null())
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_courses_academic_year")
                        .from(course::Entity, course::Column::AcademicYearId)
                        .to(academic_year::Entity, academic_year::Column::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                        .on_update(ForeignKeyAction::NoAction),
                ),
        ),
        backend.build(
            Index::create()
                .name("uq_courses_code_academic_year")
                .table(course::Entity)
                .col(course::Column::Code)
                .col(course::Column::AcademicYearId)
                .unique(),
        ),
        backend.build(
            Table::create()
                .table(course_prerequisite::Entity)
                .col(
                    ColumnDef::new(course_prerequisite::Column::CourseId)
                        .uuid()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(course_prerequisite::Column::PrerequisiteId)
                        .uuid()
                        .not_null(),
                )
                .primary_key(
                    Index::create()
                        .col(course_prerequisite::Column::CourseId)
                        .col(course_prerequisite::Column::PrerequisiteId),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_course_prerequisites_course")
                        .from(
                            course_prerequisite::Entity,
                            course_prerequisite::Column::CourseId,
                        )
                        .to(course::Entity, course::Column::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_course_prerequisites_prerequisite")
                        .from(
                            course_prerequisite::Entity,
                            course_prerequisite::Column::PrerequisiteId,
                        )
                        .to(course::Entity, course::Column::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                ),
        ),
    ]
}

fn create_student_tables(backend: DbBackend) -> Vec<Statement> {
    let optional_string = |column: student::Column, len: u32| {
        ColumnDef::new(column).string_len(len).null().to_owned()
    };

    vec![
        backend.build(
            Table::create()
                .table(student::Entity)
                .col(ColumnDef::new(student::Column::Id).uuid().not_null().primary_key())
                .col(
                    ColumnDef::new(student::Column::StudentNumber)
                        .string_len(50)
                        .not_null(),
                )
                .col(
                    ColumnDef::new(student::Column::FirstName)
                        .string_len(100)
                        .not_null(),
                )
                .col(&mut optional_string(student::Column::MiddleName, 100))
                .col(
                    ColumnDef::new(student::Column::LastName)
                        .string_len(100)
                        .not_null(),
                )
                .col(&mut optional_string(student::Column::Gender, 10))
                .col(ColumnDef::new(student::Column::DateOfBirth).date().null())
                .col(&mut optional_string(student::Column::PhoneNumber, 20))
                .col(&mut optional_string(student::Column::EmailAddress, 254))
                .col(&mut optional_string(student::Column::StudentPhoto, 255))
                .col(ColumnDef::new(student::Column::StudentAddress).text().null())
                .col(&mut optional_string(student::Column::FatherName, 200))
                .col(&mut optional_string(student::Column::FatherPhoneNumber, 20))
                .col(&mut optional_string(student::Column::FatherEmailAddress, 254))
                .col(&mut optional_string(student::Column::MotherName, 200))
                .col(&mut optional_string(student::Column::MotherPhoneNumber, 20))
                .col(&mut optional_string(student::Column::MotherEmailAddress, 254))
                .col(&mut optional_string(student::Column::GuardianName, 200))
                .col(&mut optional_string(student::Column::GuardianPhoneNumber, 20))
                .col(&mut optional_string(student::Column::GuardianEmailAddress, 254))
                .col(ColumnDef::new(student::Column::GuardianAddress).text().null())
                .col(&mut optional_string(student::Column::GuardianRelationship, 20))
                .col(&mut optional_string(
                    student::Column::OtherGuardianRelationship,
                    100,
                ))
                .col(ColumnDef::new(student::Column::CreatedAt).string().not_null())
                .col(ColumnDef::new(student::Column::UpdatedAt).string().not_null()),
        ),
        backend.build(
            Table::create()
                .table(student_document::Entity)
                .col(
                    ColumnDef::new(student_document::Column::Id)
                        .uuid()
                        .not_null()
                        .primary_key(),
                )
                .col(ColumnDef::new(student_document::Column::StudentId).uuid().not_null())
                .col(
                    ColumnDef::new(student_document::Column::DocumentType)
                        .string_len(20)
                        .not_null(),
                )
                .col(
                    ColumnDef::new(student_document::Column::DocumentNumber)
                        .string_len(100)
                        .not_null(),
                )
                .col(ColumnDef::new(student_document::Column::IssueDate).date().null())
                .col(ColumnDef::new(student_document::Column::ExpiryDate).date().null())
                .col(
                    ColumnDef::new(student_document::Column::IssuingAuthority)
                        .string_len(255)
                        .null(),
                )
                .col(
                    ColumnDef::new(student_document::Column::DocumentFile)
                        .string_len(255)
                        .null(),
                )
                .col(
                    ColumnDef::new(student_document::Column::IsVerified)
                        .boolean()
                        .not_null()
                        .default(false),
                )
                .col(
                    ColumnDef::new(student_document::Column::VerificationDate)
                        .date()
                        .null(),
                )
                .col(
                    ColumnDef::new(student_document::Column::VerificationNotes)
                        .text()
                        .null(),
                )
                .col(
                    ColumnDef::new(student_document::Column::CreatedAt)
                        .string()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(student_document::Column::UpdatedAt)
                        .string()
                        .not_null(),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_student_documents_student")
                        .from(student_document::Entity, student_document::Column::StudentId)
                        .to(student::Entity, student::Column::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                ),
        ),
        backend.build(
            Index::create()
                .name("uq_student_documents_student_type")
                .table(student_document::Entity)
                .col(student_document::Column::StudentId)
                .col(student_document::Column::DocumentType)
                .unique(),
        ),
    ]
}

fn add_lookup_indexes(backend: DbBackend) -> Vec<Statement> {
    vec![
        backend.build(
            Index::create()
                .name("idx_students_name")
                .table(student::Entity)
                .col(student::Column::LastName)
                .col(student::Column::FirstName),
        ),
        backend.build(
            Index::create()
                .name("idx_student_documents_expiry")
                .table(student_document::Entity)
                .col(student_document::Column::ExpiryDate),
        ),
        backend.build(
            Index::create()
                .name("idx_courses_academic_year")
                .table(course::Entity)
                .col(course::Column::AcademicYearId),
        ),
    ]
}
