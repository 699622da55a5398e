//! SeaORM implementation of CourseRepository
//!
//! Prerequisites live in the `course_prerequisites` join table. Every write
//! that touches it checks the whole graph first so it stays acyclic; the
//! check and the write share one transaction, serialised on PostgreSQL by an
//! advisory lock.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sea_orm::sea_query::{Condition, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    Order, QueryFilter, QueryOrder, Set, Statement, TransactionTrait,
};
use uuid::Uuid;

use super::{clean, icontains, sorted};
use crate::domain::prerequisites::PrerequisiteGraph;
use crate::domain::{
    now_timestamp, validation, CourseDetail, CourseFilter, CourseInput, CoursePatch,
    CourseRepository, CourseSummary, DomainError, PrerequisiteCourse, PrerequisiteLink,
};
use crate::models::course::{
    ActiveModel, Column, Entity as CourseEntity, Model, ADVANCED_CREDIT_THRESHOLD,
};
use crate::models::{academic_year, course_prerequisite};

/// Lock key serialising writers of the prerequisite graph on PostgreSQL.
const GRAPH_LOCK_KEY: i64 = 0x4352_5345_4752;

const ORDERING: &[(&str, Column)] = &[
    ("code", Column::Code),
    ("name", Column::Name),
    ("credit_hours", Column::CreditHours),
    ("created_at", Column::CreatedAt),
];

/// SeaORM-based implementation of CourseRepository
pub struct SeaOrmCourseRepository {
    db: DatabaseConnection,
}

impl SeaOrmCourseRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_model(&self, id: Uuid) -> Result<Model, DomainError> {
        CourseEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)
    }

    async fn detail(&self, c: Model) -> Result<CourseDetail, DomainError> {
        let year_name = academic_year::Entity::find_by_id(c.academic_year_id)
            .one(&self.db)
            .await?
            .map(|y| y.name)
            .unwrap_or_default();
        let prerequisites = linked_courses(&self.db, c.id, Direction::Prerequisites, false).await?;
        let required_for = linked_courses(&self.db, c.id, Direction::RequiredFor, false).await?;

        Ok(CourseDetail {
            has_prerequisites: !prerequisites.is_empty(),
            prerequisite_count: prerequisites.len() as u64,
            is_advanced_course: c.is_advanced_course(),
            id: c.id,
            code: c.code,
            name: c.name,
            description: c.description,
            credit_hours: c.credit_hours,
            academic_year: c.academic_year_id,
            academic_year_name: year_name,
            is_active: c.is_active,
            prerequisites,
            required_for,
            created_at: c.created_at,
            updated_at: c.updated_at,
        })
    }

    async fn summaries(&self, courses: Vec<Model>) -> Result<Vec<CourseSummary>, DomainError> {
        if courses.is_empty() {
            return Ok(Vec::new());
        }

        let year_ids: HashSet<Uuid> = courses.iter().map(|c| c.academic_year_id).collect();
        let year_names: HashMap<Uuid, String> = academic_year::Entity::find()
            .filter(academic_year::Column::Id.is_in(year_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|y| (y.id, y.name))
            .collect();

        let mut prerequisite_counts: HashMap<Uuid, u64> = HashMap::new();
        let edges = course_prerequisite::Entity::find()
            .filter(
                course_prerequisite::Column::CourseId
                    .is_in(courses.iter().map(|c| c.id).collect::<Vec<_>>()),
            )
            .all(&self.db)
            .await?;
        for edge in edges {
            *prerequisite_counts.entry(edge.course_id).or_insert(0) += 1;
        }

        Ok(courses
            .into_iter()
            .map(|c| {
                let count = prerequisite_counts.get(&c.id).copied().unwrap_or(0);
                CourseSummary {
                    is_advanced_course: c.is_advanced_course(),
                    academic_year_name: year_names
                        .get(&c.academic_year_id)
                        .cloned()
                        .unwrap_or_default(),
                    id: c.id,
                    code: c.code,
                    name: c.name,
                    credit_hours: c.credit_hours,
                    academic_year: c.academic_year_id,
                    is_active: c.is_active,
                    prerequisite_count: count,
                    has_prerequisites: count > 0,
                    created_at: c.created_at,
                }
            })
            .collect())
    }

    /// Insert or update the course row and, when given, replace its prerequisites.
    async fn save(
        &self,
        course: Model,
        insert: bool,
        prerequisites: Option<Vec<Uuid>>,
    ) -> Result<Model, DomainError> {
        let txn = self.db.begin().await?;

        validate(&txn, &course).await?;
        if let Some(prerequisites) = &prerequisites {
            lock_graph(&txn).await?;
            validate_prerequisites(&txn, course.id, prerequisites).await?;
        }

        let saved = if insert {
            into_active(course).insert(&txn).await?
        } else {
            into_active(course).update(&txn).await?
        };

        if let Some(prerequisites) = prerequisites {
            replace_edges(&txn, saved.id, prerequisites).await?;
        }

        txn.commit().await?;
        Ok(saved)
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Prerequisites,
    RequiredFor,
}

/// Courses on the other end of `id`'s prerequisite edges, ordered by code.
async fn linked_courses<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    direction: Direction,
    active_only: bool,
) -> Result<Vec<PrerequisiteCourse>, DomainError> {
    let (from, to) = match direction {
        Direction::Prerequisites => (
            course_prerequisite::Column::CourseId,
            course_prerequisite::Column::PrerequisiteId,
        ),
        Direction::RequiredFor => (
            course_prerequisite::Column::PrerequisiteId,
            course_prerequisite::Column::CourseId,
        ),
    };

    let mut query = CourseEntity::find().filter(
        Column::Id.in_subquery(
            Query::select()
                .column(to)
                .from(course_prerequisite::Entity)
                .and_where(from.eq(id))
                .to_owned(),
        ),
    );
    if active_only {
        query = query.filter(Column::IsActive.eq(true));
    }

    let courses = query.order_by_asc(Column::Code).all(db).await?;
    Ok(courses
        .into_iter()
        .map(|c| PrerequisiteCourse {
            id: c.id,
            code: c.code,
            name: c.name,
            credit_hours: c.credit_hours,
            is_active: c.is_active,
        })
        .collect())
}

/// Field rules plus the checks that need the database.
async fn validate<C: ConnectionTrait>(db: &C, c: &Model) -> Result<(), DomainError> {
    validation::required("code", &c.code)?;
    validation::max_len("code", &c.code, 20)?;
    validation::required("name", &c.name)?;
    validation::max_len("name", &c.name, 255)?;
    validation::credit_hours(c.credit_hours)?;

    let year = academic_year::Entity::find_by_id(c.academic_year_id)
        .one(db)
        .await?;
    if year.is_none() {
        return Err(DomainError::Validation(format!(
            "academic_year: Invalid pk \"{}\" - object does not exist.",
            c.academic_year_id
        )));
    }

    let taken = CourseEntity::find()
        .filter(Column::Code.eq(c.code.as_str()))
        .filter(Column::Id.ne(c.id))
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(DomainError::Conflict(
            "code: course with this code already exists.".to_string(),
        ));
    }
    Ok(())
}

fn blank(credit_hours: i32, academic_year: Uuid, is_active: bool) -> Model {
    let now = now_timestamp();
    Model {
        id: Uuid::new_v4(),
        code: String::new(),
        name: String::new(),
        description: None,
        credit_hours,
        academic_year_id: academic_year,
        is_active,
        created_at: now.clone(),
        updated_at: now,
    }
}

/// Insert the course or update the one with the same code, leaving its
/// prerequisites alone.
///
/// Returns the course id and whether a row was created.
pub(crate) async fn upsert_by_code<C: ConnectionTrait>(
    db: &C,
    patch: &CoursePatch,
) -> Result<(Uuid, bool), DomainError> {
    let code = patch.code.as_deref().map(str::trim).unwrap_or_default();
    let existing = CourseEntity::find()
        .filter(Column::Code.eq(code))
        .one(db)
        .await?;
    let created = existing.is_none();
    let base = existing.unwrap_or_else(|| {
        blank(
            patch.credit_hours.unwrap_or_default(),
            patch.academic_year.unwrap_or_default(),
            patch.is_active.unwrap_or(true),
        )
    });
    let mut course = apply(base, patch);
    course.updated_at = now_timestamp();
    validate(db, &course).await?;

    let id = course.id;
    if created {
        into_active(course).insert(db).await?;
    } else {
        into_active(course).update(db).await?;
    }
    Ok((id, created))
}

/// Replace the prerequisites of `course` after checking the graph stays acyclic.
pub(crate) async fn set_prerequisites<C: ConnectionTrait>(
    db: &C,
    course: Uuid,
    prerequisites: Vec<Uuid>,
) -> Result<(), DomainError> {
    lock_graph(db).await?;
    validate_prerequisites(db, course, &prerequisites).await?;
    replace_edges(db, course, prerequisites).await
}

async fn lock_graph<C: ConnectionTrait>(db: &C) -> Result<(), DomainError> {
    let backend = db.get_database_backend();
    if backend == DbBackend::Postgres {
        db.execute(Statement::from_string(
            backend,
            format!("SELECT pg_advisory_xact_lock({})", GRAPH_LOCK_KEY),
        ))
        .await?;
    }
    Ok(())
}

/// Both ends of a prerequisite edge.
async fn link<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    prerequisite_id: Uuid,
) -> Result<(Model, Model), DomainError> {
    let course = CourseEntity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;
    let prerequisite = CourseEntity::find_by_id(prerequisite_id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::MissingRelated("Prerequisite course not found".to_string()))?;
    Ok((course, prerequisite))
}

/// Check a full prerequisite set for `course` against the stored graph.
async fn validate_prerequisites<C: ConnectionTrait>(
    db: &C,
    course: Uuid,
    prerequisites: &[Uuid],
) -> Result<(), DomainError> {
    let unique: HashSet<Uuid> = prerequisites.iter().copied().collect();
    let found = CourseEntity::find()
        .filter(Column::Id.is_in(unique.iter().copied().collect::<Vec<_>>()))
        .all(db)
        .await?;
    if found.len() != unique.len() {
        let known: HashSet<Uuid> = found.iter().map(|c| c.id).collect();
        if let Some(missing) = unique.iter().find(|id| !known.contains(id)) {
            return Err(DomainError::Validation(format!(
                "prerequisites: Invalid pk \"{}\" - object does not exist.",
                missing
            )));
        }
    }

    let graph = load_graph(db).await?;
    if let Err(offending) = graph.check_replacement(course, prerequisites) {
        let message = if offending == course {
            "A course cannot be a prerequisite for itself".to_string()
        } else {
            let code = found
                .iter()
                .find(|c| c.id == offending)
                .map(|c| c.code.clone())
                .unwrap_or_else(|| offending.to_string());
            format!("Circular reference detected with course {}", code)
        };
        return Err(DomainError::Validation(message));
    }
    Ok(())
}

async fn load_graph<C: ConnectionTrait>(db: &C) -> Result<PrerequisiteGraph, DomainError> {
    let edges = course_prerequisite::Entity::find().all(db).await?;
    Ok(PrerequisiteGraph::from_edges(
        edges.into_iter().map(|e| (e.course_id, e.prerequisite_id)),
    ))
}

async fn replace_edges<C: ConnectionTrait>(
    db: &C,
    course: Uuid,
    prerequisites: Vec<Uuid>,
) -> Result<(), DomainError> {
    course_prerequisite::Entity::delete_many()
        .filter(course_prerequisite::Column::CourseId.eq(course))
        .exec(db)
        .await?;

    let mut seen = HashSet::new();
    let rows: Vec<course_prerequisite::ActiveModel> = prerequisites
        .into_iter()
        .filter(|p| seen.insert(*p))
        .map(|p| course_prerequisite::ActiveModel {
            course_id: Set(course),
            prerequisite_id: Set(p),
        })
        .collect();
    if rows.is_empty() {
        return Ok(());
    }

    course_prerequisite::Entity::insert_many(rows)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

fn apply(mut c: Model, patch: &CoursePatch) -> Model {
    if let Some(code) = &patch.code {
        c.code = code.trim().to_string();
    }
    if let Some(name) = &patch.name {
        c.name = name.trim().to_string();
    }
    if let Some(description) = &patch.description {
        c.description = clean(description.clone());
    }
    if let Some(hours) = patch.credit_hours {
        c.credit_hours = hours;
    }
    if let Some(year) = patch.academic_year {
        c.academic_year_id = year;
    }
    if let Some(active) = patch.is_active {
        c.is_active = active;
    }
    c
}

fn into_active(c: Model) -> ActiveModel {
    ActiveModel {
        id: Set(c.id),
        code: Set(c.code),
        name: Set(c.name),
        description: Set(c.description),
        credit_hours: Set(c.credit_hours),
        academic_year_id: Set(c.academic_year_id),
        is_active: Set(c.is_active),
        created_at: Set(c.created_at),
        updated_at: Set(c.updated_at),
    }
}

#[async_trait]
impl CourseRepository for SeaOrmCourseRepository {
    async fn find_all(&self, filter: CourseFilter) -> Result<Vec<CourseSummary>, DomainError> {
        let mut query = CourseEntity::find();
        if let Some(year) = filter.academic_year {
            query = query.filter(Column::AcademicYearId.eq(year));
        }
        if let Some(active) = filter.is_active {
            query = query.filter(Column::IsActive.eq(active));
        }
        if let Some(hours) = filter.credit_hours {
            query = query.filter(Column::CreditHours.eq(hours));
        }
        if let Some(min) = filter.min_credits {
            query = query.filter(Column::CreditHours.gte(min));
        }
        if let Some(max) = filter.max_credits {
            query = query.filter(Column::CreditHours.lte(max));
        }
        if filter.advanced_only {
            query = query.filter(Column::CreditHours.gt(ADVANCED_CREDIT_THRESHOLD));
        }
        if filter.without_prerequisites {
            query = query.filter(
                Column::Id.not_in_subquery(
                    Query::select()
                        .column(course_prerequisite::Column::CourseId)
                        .from(course_prerequisite::Entity)
                        .to_owned(),
                ),
            );
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(icontains(Column::Code, term))
                    .add(icontains(Column::Name, term))
                    .add(icontains(Column::Description, term)),
            );
        }
        let query = sorted(query, &filter.ordering, ORDERING, &[(Column::Code, Order::Asc)]);

        let courses = query.all(&self.db).await?;
        self.summaries(courses).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CourseDetail>, DomainError> {
        match CourseEntity::find_by_id(id).one(&self.db).await? {
            Some(c) => Ok(Some(self.detail(c).await?)),
            None => Ok(None),
        }
    }

    async fn create(&self, input: CourseInput) -> Result<CourseDetail, DomainError> {
        let base = blank(input.credit_hours, input.academic_year, input.is_active);
        let patch = CoursePatch::from(input);
        let course = apply(base, &patch);

        let prerequisites = patch.prerequisites.unwrap_or_default();

        let saved = self.save(course, true, Some(prerequisites)).await?;
        tracing::debug!(id = %saved.id, code = %saved.code, "Created course");
        self.detail(saved).await
    }

    async fn update(&self, id: Uuid, patch: CoursePatch) -> Result<CourseDetail, DomainError> {
        let existing = self.find_model(id).await?;
        let mut course = apply(existing, &patch);
        course.updated_at = now_timestamp();

        let saved = self.save(course, false, patch.prerequisites).await?;
        self.detail(saved).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let result = CourseEntity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound);
        }

        Ok(())
    }

    async fn prerequisites(
        &self,
        id: Uuid,
        active_only: bool,
    ) -> Result<Vec<PrerequisiteCourse>, DomainError> {
        self.find_model(id).await?;
        linked_courses(&self.db, id, Direction::Prerequisites, active_only).await
    }

    async fn required_for(
        &self,
        id: Uuid,
        active_only: bool,
    ) -> Result<Vec<PrerequisiteCourse>, DomainError> {
        self.find_model(id).await?;
        linked_courses(&self.db, id, Direction::RequiredFor, active_only).await
    }

    async fn add_prerequisite(
        &self,
        id: Uuid,
        prerequisite_id: Uuid,
    ) -> Result<PrerequisiteLink, DomainError> {
        let txn = self.db.begin().await?;
        lock_graph(&txn).await?;
        let (course, prerequisite) = link(&txn, id, prerequisite_id).await?;

        let exists = course_prerequisite::Entity::find_by_id((course.id, prerequisite.id))
            .one(&txn)
            .await?
            .is_some();
        if !exists {
            load_graph(&txn).await?.check_new_edge(course.id, prerequisite.id)?;
            course_prerequisite::Entity::insert(course_prerequisite::ActiveModel {
                course_id: Set(course.id),
                prerequisite_id: Set(prerequisite.id),
            })
            .exec_without_returning(&txn)
            .await?;
            tracing::debug!(course = %course.code, prerequisite = %prerequisite.code, "Added prerequisite");
        }
        txn.commit().await?;

        Ok(PrerequisiteLink {
            course_code: course.code,
            prerequisite_code: prerequisite.code,
        })
    }

    async fn remove_prerequisite(
        &self,
        id: Uuid,
        prerequisite_id: Uuid,
    ) -> Result<PrerequisiteLink, DomainError> {
        let (course, prerequisite) = link(&self.db, id, prerequisite_id).await?;

        let result = course_prerequisite::Entity::delete_by_id((course.id, prerequisite.id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(DomainError::Validation(format!(
                "{} is not a prerequisite for {}",
                prerequisite.code, course.code
            )));
        }

        Ok(PrerequisiteLink {
            course_code: course.code,
            prerequisite_code: prerequisite.code,
        })
    }
}
