//! Repository implementations using SeaORM

pub mod academic_year_repository;
pub mod course_repository;
pub mod document_repository;
pub mod school_repository;
pub mod student_repository;

pub use academic_year_repository::SeaOrmAcademicYearRepository;
pub use course_repository::SeaOrmCourseRepository;
pub use document_repository::SeaOrmDocumentRepository;
pub use school_repository::SeaOrmSchoolRepository;
pub use student_repository::SeaOrmStudentRepository;

use sea_orm::sea_query::{Expr, Func, Iden, LikeExpr, SimpleExpr};
use sea_orm::{ColumnTrait, EntityTrait, Order, QueryOrder, Select};

use crate::domain::Ordering;

const LIKE_ESCAPE: char = '\\';

/// Case-insensitive substring match on a single column.
///
/// `%` and `_` in the needle match themselves.
pub(crate) fn icontains<C>(column: C, needle: &str) -> SimpleExpr
where
    C: Iden + 'static,
{
    let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
    Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape(LIKE_ESCAPE))
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Apply the requested ordering, keeping only whitelisted fields.
///
/// Falls back to `default` when nothing usable was requested.
pub(crate) fn sorted<E, C>(
    mut query: Select<E>,
    requested: &[Ordering],
    allowed: &[(&str, C)],
    default: &[(C, Order)],
) -> Select<E>
where
    E: EntityTrait,
    C: ColumnTrait + Copy,
{
    let mut keys: Vec<(C, Order)> = requested
        .iter()
        .filter_map(|o| {
            allowed.iter().find(|(name, _)| *name == o.field).map(|(_, column)| {
                let order = if o.descending { Order::Desc } else { Order::Asc };
                (*column, order)
            })
        })
        .collect();
    if keys.is_empty() {
        keys = default.to_vec();
    }
    for (column, order) in keys {
        query = query.order_by(column, order);
    }
    query
}

/// Trim and turn blank optional text into `None`.
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
