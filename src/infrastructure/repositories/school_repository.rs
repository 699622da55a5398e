//! SeaORM implementation of SchoolRepository

use async_trait::async_trait;
use sea_orm::sea_query::Condition;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order,
    QueryFilter, Set,
};
use uuid::Uuid;

use super::{clean, icontains, sorted};
use crate::domain::{
    validation, DomainError, School, SchoolFilter, SchoolInput, SchoolPatch, SchoolRepository,
};
use crate::models::school::{ActiveModel, Column, Entity as SchoolEntity, Model};

/// SeaORM-based implementation of SchoolRepository
pub struct SeaOrmSchoolRepository {
    db: DatabaseConnection,
}

impl SeaOrmSchoolRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn blank() -> Model {
    Model {
        id: Uuid::new_v4(),
        name: String::new(),
        address: String::new(),
        phone_number: String::new(),
        email_address: String::new(),
        website_url: None,
    }
}

/// Insert the school or update the one with the same name.
///
/// Returns `true` when a row was created.
pub(crate) async fn upsert_by_name<C: ConnectionTrait>(
    db: &C,
    input: SchoolInput,
) -> Result<bool, DomainError> {
    let existing = SchoolEntity::find()
        .filter(Column::Name.eq(input.name.trim()))
        .one(db)
        .await?;
    let created = existing.is_none();
    let school = apply(existing.unwrap_or_else(blank), input.into())?;

    if created {
        into_active(school).insert(db).await?;
    } else {
        into_active(school).update(db).await?;
    }
    Ok(created)
}

fn to_view(s: Model) -> School {
    School {
        id: s.id,
        name: s.name,
        address: s.address,
        phone_number: s.phone_number,
        email_address: s.email_address,
        website_url: s.website_url,
    }
}

fn apply(mut s: Model, patch: SchoolPatch) -> Result<Model, DomainError> {
    if let Some(name) = patch.name {
        s.name = name.trim().to_string();
    }
    if let Some(address) = patch.address {
        s.address = address.trim().to_string();
    }
    if let Some(phone) = patch.phone_number {
        s.phone_number = phone.trim().to_string();
    }
    if let Some(email) = patch.email_address {
        s.email_address = email.trim().to_string();
    }
    if let Some(website) = patch.website_url {
        s.website_url = clean(website);
    }

    validation::required("name", &s.name)?;
    validation::max_len("name", &s.name, 100)?;
    validation::required("address", &s.address)?;
    validation::required("phone_number", &s.phone_number)?;
    validation::max_len("phone_number", &s.phone_number, 20)?;
    validation::email("email_address", &s.email_address)?;
    validation::max_len("email_address", &s.email_address, 254)?;
    if let Some(website) = &s.website_url {
        validation::website_url("website_url", website)?;
        validation::max_len("website_url", website, 200)?;
    }
    Ok(s)
}

fn into_active(s: Model) -> ActiveModel {
    ActiveModel {
        id: Set(s.id),
        name: Set(s.name),
        address: Set(s.address),
        phone_number: Set(s.phone_number),
        email_address: Set(s.email_address),
        website_url: Set(s.website_url),
    }
}

#[async_trait]
impl SchoolRepository for SeaOrmSchoolRepository {
    async fn find_all(&self, filter: SchoolFilter) -> Result<Vec<School>, DomainError> {
        let mut query = SchoolEntity::find();
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(icontains(Column::Name, term))
                    .add(icontains(Column::Address, term))
                    .add(icontains(Column::EmailAddress, term)),
            );
        }
        let query = sorted(
            query,
            &filter.ordering,
            &[("name", Column::Name)],
            &[(Column::Name, Order::Asc)],
        );

        let schools = query.all(&self.db).await?;
        Ok(schools.into_iter().map(to_view).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<School>, DomainError> {
        let school = SchoolEntity::find_by_id(id).one(&self.db).await?;
        Ok(school.map(to_view))
    }

    async fn create(&self, input: SchoolInput) -> Result<School, DomainError> {
        let school = apply(blank(), input.into())?;

        let saved = into_active(school).insert(&self.db).await?;
        tracing::debug!(id = %saved.id, name = %saved.name, "Created school");
        Ok(to_view(saved))
    }

    async fn update(&self, id: Uuid, patch: SchoolPatch) -> Result<School, DomainError> {
        let existing = SchoolEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)?;
        let school = apply(existing, patch)?;

        let saved = into_active(school).update(&self.db).await?;
        Ok(to_view(saved))
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let result = SchoolEntity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound);
        }

        Ok(())
    }
}
