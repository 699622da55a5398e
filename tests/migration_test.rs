use school_registry::db;
use school_registry::infrastructure::migrations::{
    apply, applied_versions, migrations, run_migrations, Migration,
};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};

async fn fresh_db() -> DatabaseConnection {
    db::connect("sqlite::memory:")
        .await
        .expect("Failed to connect")
}

async fn table_exists(db: &DatabaseConnection, name: &str) -> bool {
    let row = db
        .query_one(Statement::from_sql_and_values(
            db.get_database_backend(),
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
            [name.into()],
        ))
        .await
        .expect("Failed to query sqlite_master");
    row.is_some()
}

/// Creates a table, then fails on malformed SQL.
fn half_done(backend: DbBackend) -> Vec<Statement> {
    vec![
        Statement::from_string(backend, "CREATE TABLE half_done (id INTEGER PRIMARY KEY)"),
        Statement::from_string(backend, "CREATE TABLE broken ("),
    ]
}

fn with_broken_tail() -> Vec<Migration> {
    let mut set = migrations();
    set.push(Migration {
        version: 99,
        name: "half_done",
        up: half_done,
    });
    set
}

#[tokio::test]
async fn versions_are_unique_and_ascending() {
    let versions: Vec<i64> = migrations().iter().map(|m| m.version).collect();
    let mut sorted = versions.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(versions, sorted);
}

#[tokio::test]
async fn first_run_applies_every_migration() {
    let db = fresh_db().await;

    let report = run_migrations(&db).await.expect("Migration failed");
    assert_eq!(report.applied.len(), migrations().len());
    assert_eq!(report.skipped, 0);

    for table in [
        "schema_migrations",
        "academic_years",
        "schools",
        "courses",
        "course_prerequisites",
        "students",
        "student_documents",
    ] {
        assert!(table_exists(&db, table).await, "missing table {}", table);
    }
}

#[tokio::test]
async fn second_run_is_a_no_op() {
    let db = fresh_db().await;

    run_migrations(&db).await.expect("First run failed");
    let before = applied_versions(&db).await.unwrap();

    let report = run_migrations(&db).await.expect("Second run failed");
    assert!(report.applied.is_empty());
    assert_eq!(report.skipped, migrations().len());

    let after = applied_versions(&db).await.unwrap();
    assert_eq!(before, after);
    assert_eq!(after, vec![1, 2, 3]);
}

#[tokio::test]
async fn init_db_leaves_schema_current() {
    let db = db::init_db("sqlite::memory:").await.expect("init_db failed");
    let versions = applied_versions(&db).await.unwrap();
    assert_eq!(versions.len(), migrations().len());
}

#[tokio::test]
async fn failing_migration_commits_nothing() {
    let db = fresh_db().await;
    run_migrations(&db).await.expect("First run failed");

    apply(&db, with_broken_tail())
        .await
        .expect_err("malformed SQL must fail");

    assert_eq!(applied_versions(&db).await.unwrap(), vec![1, 2, 3]);
    assert!(!table_exists(&db, "half_done").await);
}

#[tokio::test]
async fn failing_first_run_leaves_database_empty() {
    let db = fresh_db().await;

    apply(&db, with_broken_tail())
        .await
        .expect_err("malformed SQL must fail");

    for table in ["schema_migrations", "academic_years", "students", "half_done"] {
        assert!(!table_exists(&db, table).await, "{} was committed", table);
    }

    // a clean run afterwards still applies everything
    let report = run_migrations(&db).await.expect("Retry failed");
    assert_eq!(report.applied.len(), migrations().len());
}
