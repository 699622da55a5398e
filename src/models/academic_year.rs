use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "academic_years")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::course::Entity")]
    Course,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_date_in_range(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// An inactive year is never current, even when `today` falls inside it.
    pub fn is_current_year(&self, today: NaiveDate) -> bool {
        self.is_active && self.is_date_in_range(today)
    }

    /// Inclusive of both boundary days.
    pub fn duration_in_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}
