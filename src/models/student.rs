use chrono::{Datelike, NaiveDate};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::choices::GuardianRelationship;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub student_number: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    /// `MALE` or `FEMALE`, see [`crate::domain::choices::Gender`].
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub email_address: Option<String>,
    /// Path relative to the media root, e.g. `student_photos/<uuid>.jpg`.
    pub student_photo: Option<String>,
    pub student_address: Option<String>,

    pub father_name: Option<String>,
    pub father_phone_number: Option<String>,
    pub father_email_address: Option<String>,

    pub mother_name: Option<String>,
    pub mother_phone_number: Option<String>,
    pub mother_email_address: Option<String>,

    pub guardian_name: Option<String>,
    pub guardian_phone_number: Option<String>,
    pub guardian_email_address: Option<String>,
    pub guardian_address: Option<String>,
    pub guardian_relationship: Option<String>,
    pub other_guardian_relationship: Option<String>,

    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::student_document::Entity")]
    Document,
}

impl Related<super::student_document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Document.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref().filter(|m| !m.trim().is_empty()) {
            Some(middle) => format!("{} {} {}", self.first_name, middle, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }

    /// Completed years at `today`; 0 when the birth date is unknown or in the future.
    pub fn age(&self, today: NaiveDate) -> i32 {
        let Some(born) = self.date_of_birth else {
            return 0;
        };
        let mut years = today.year() - born.year();
        if (today.month(), today.day()) < (born.month(), born.day()) {
            years -= 1;
        }
        years.max(0)
    }

    fn relationship(&self) -> Option<GuardianRelationship> {
        self.guardian_relationship
            .as_deref()
            .and_then(|r| GuardianRelationship::parse(r).ok().flatten())
    }

    pub fn primary_contact_name(&self) -> Option<String> {
        match self.relationship() {
            Some(GuardianRelationship::Other) => self.other_guardian_relationship.clone(),
            _ => self.guardian_name.clone(),
        }
    }

    pub fn primary_contact_phone_number(&self) -> Option<String> {
        match self.relationship() {
            Some(GuardianRelationship::Father) => self.father_phone_number.clone(),
            Some(GuardianRelationship::Mother) => self.mother_phone_number.clone(),
            _ => self.guardian_phone_number.clone(),
        }
    }

    pub fn primary_contact_email_address(&self) -> Option<String> {
        match self.relationship() {
            Some(GuardianRelationship::Father) => self.father_email_address.clone(),
            Some(GuardianRelationship::Mother) => self.mother_email_address.clone(),
            _ => self.guardian_email_address.clone(),
        }
    }
}
