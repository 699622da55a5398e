use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student_documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub student_id: Uuid,
    /// `ID_CARD`, `BIRTH_CERTIFICATE` or `PASSPORT`.
    pub document_type: String,
    pub document_number: String,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub issuing_authority: Option<String>,
    pub document_file: Option<String>,
    pub is_verified: bool,
    pub verification_date: Option<NaiveDate>,
    pub verification_notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Student,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| today > expiry)
    }

    /// `None` without an expiry date, `Some(0)` once expired.
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        let expiry = self.expiry_date?;
        if self.is_expired(today) {
            return Some(0);
        }
        Some((expiry - today).num_days())
    }
}
