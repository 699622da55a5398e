use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Courses above this many credit hours count as advanced.
pub const ADVANCED_CREDIT_THRESHOLD: i32 = 3;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub credit_hours: i32,
    pub academic_year_id: Uuid,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::academic_year::Entity",
        from = "Column::AcademicYearId",
        to = "super::academic_year::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    AcademicYear,
}

impl Related<super::academic_year::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AcademicYear.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_advanced_course(&self) -> bool {
        self.credit_hours > ADVANCED_CREDIT_THRESHOLD
    }
}
