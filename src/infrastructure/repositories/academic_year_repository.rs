//! SeaORM implementation of AcademicYearRepository

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use super::sorted;
use crate::domain::{
    today, validation, AcademicYear, AcademicYearFilter, AcademicYearInput, AcademicYearPatch,
    AcademicYearRepository, DomainError,
};
use crate::models::academic_year::{ActiveModel, Column, Entity as AcademicYearEntity, Model};
use crate::models::course;

const ORDERING: &[(&str, Column)] = &[
    ("name", Column::Name),
    ("start_date", Column::StartDate),
    ("end_date", Column::EndDate),
];

/// SeaORM-based implementation of AcademicYearRepository
pub struct SeaOrmAcademicYearRepository {
    db: DatabaseConnection,
}

impl SeaOrmAcademicYearRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn views(&self, years: Vec<Model>) -> Result<Vec<AcademicYear>, DomainError> {
        let counts = course_counts(&self.db, years.iter().map(|y| y.id).collect()).await?;
        let today = today();
        Ok(years
            .into_iter()
            .map(|y| {
                let count = counts.get(&y.id).copied().unwrap_or(0);
                to_view(y, count, today)
            })
            .collect())
    }

    async fn view(&self, year: Model) -> Result<AcademicYear, DomainError> {
        let mut views = self.views(vec![year]).await?;
        views.pop().ok_or(DomainError::NotFound)
    }
}

async fn course_counts<C: ConnectionTrait>(
    db: &C,
    years: Vec<Uuid>,
) -> Result<HashMap<Uuid, u64>, DomainError> {
    if years.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<Uuid> = course::Entity::find()
        .select_only()
        .column(course::Column::AcademicYearId)
        .filter(course::Column::AcademicYearId.is_in(years))
        .into_tuple()
        .all(db)
        .await?;

    let mut counts = HashMap::new();
    for year in rows {
        *counts.entry(year).or_insert(0) += 1;
    }
    Ok(counts)
}

fn to_view(y: Model, courses_count: u64, today: NaiveDate) -> AcademicYear {
    AcademicYear {
        duration_in_days: y.duration_in_days(),
        is_current: y.is_current_year(today),
        id: y.id,
        name: y.name,
        start_date: y.start_date,
        end_date: y.end_date,
        is_active: y.is_active,
        courses_count,
    }
}

fn apply(mut y: Model, patch: AcademicYearPatch) -> Result<Model, DomainError> {
    if let Some(name) = patch.name {
        y.name = name.trim().to_string();
    }
    if let Some(start) = patch.start_date {
        y.start_date = start;
    }
    if let Some(end) = patch.end_date {
        y.end_date = end;
    }
    if let Some(active) = patch.is_active {
        y.is_active = active;
    }

    validation::required("name", &y.name)?;
    validation::max_len("name", &y.name, 100)?;
    validation::date_range(y.start_date, y.end_date)?;
    Ok(y)
}

fn blank(input: &AcademicYearInput) -> Model {
    Model {
        id: Uuid::new_v4(),
        name: String::new(),
        start_date: input.start_date,
        end_date: input.end_date,
        is_active: false,
    }
}

/// Insert the year or update the one with the same name.
///
/// Returns `true` when a row was created.
pub(crate) async fn upsert_by_name<C: ConnectionTrait>(
    db: &C,
    input: AcademicYearInput,
) -> Result<bool, DomainError> {
    let existing = AcademicYearEntity::find()
        .filter(Column::Name.eq(input.name.trim()))
        .one(db)
        .await?;
    let created = existing.is_none();
    let base = existing.unwrap_or_else(|| blank(&input));
    let year = apply(base, input.into())?;

    if created {
        into_active(year).insert(db).await?;
    } else {
        into_active(year).update(db).await?;
    }
    Ok(created)
}

fn into_active(y: Model) -> ActiveModel {
    ActiveModel {
        id: Set(y.id),
        name: Set(y.name),
        start_date: Set(y.start_date),
        end_date: Set(y.end_date),
        is_active: Set(y.is_active),
    }
}

#[async_trait]
impl AcademicYearRepository for SeaOrmAcademicYearRepository {
    async fn find_all(&self, filter: AcademicYearFilter) -> Result<Vec<AcademicYear>, DomainError> {
        let mut query = AcademicYearEntity::find();
        if let Some(active) = filter.is_active {
            query = query.filter(Column::IsActive.eq(active));
        }
        let query = sorted(
            query,
            &filter.ordering,
            ORDERING,
            &[(Column::StartDate, Order::Desc)],
        );

        let years = query.all(&self.db).await?;
        self.views(years).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AcademicYear>, DomainError> {
        match AcademicYearEntity::find_by_id(id).one(&self.db).await? {
            Some(y) => Ok(Some(self.view(y).await?)),
            None => Ok(None),
        }
    }

    async fn create(&self, input: AcademicYearInput) -> Result<AcademicYear, DomainError> {
        let year = apply(blank(&input), input.into())?;

        let saved = into_active(year).insert(&self.db).await?;
        tracing::debug!(id = %saved.id, name = %saved.name, "Created academic year");
        self.view(saved).await
    }

    async fn update(
        &self,
        id: Uuid,
        patch: AcademicYearPatch,
    ) -> Result<AcademicYear, DomainError> {
        let existing = AcademicYearEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)?;
        let year = apply(existing, patch)?;

        let saved = into_active(year).update(&self.db).await?;
        self.view(saved).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let result = AcademicYearEntity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound);
        }

        Ok(())
    }

    async fn find_current(&self) -> Result<Option<AcademicYear>, DomainError> {
        let current = AcademicYearEntity::find()
            .filter(Column::IsActive.eq(true))
            .order_by_desc(Column::StartDate)
            .one(&self.db)
            .await?;
        match current {
            Some(y) => Ok(Some(self.view(y).await?)),
            None => Ok(None),
        }
    }

    async fn find_for_date(&self, date: NaiveDate) -> Result<Vec<AcademicYear>, DomainError> {
        let years = AcademicYearEntity::find()
            .filter(Column::StartDate.lte(date))
            .filter(Column::EndDate.gte(date))
            .order_by_desc(Column::StartDate)
            .all(&self.db)
            .await?;
        self.views(years).await
    }

    async fn activate(&self, id: Uuid) -> Result<AcademicYear, DomainError> {
        let txn = self.db.begin().await?;

        let Some(year) = AcademicYearEntity::find_by_id(id).one(&txn).await? else {
            return Err(DomainError::NotFound);
        };

        AcademicYearEntity::update_many()
            .col_expr(Column::IsActive, Expr::value(false))
            .filter(Column::Id.ne(id))
            .exec(&txn)
            .await?;

        let mut active: ActiveModel = year.into();
        active.is_active = Set(true);
        let year = active.update(&txn).await?;

        txn.commit().await?;
        tracing::info!(id = %year.id, name = %year.name, "Activated academic year");
        self.view(year).await
    }
}
