use std::path::Path;

use school_registry::db;
use school_registry::domain::*;
use school_registry::infrastructure::export::{export_csv, CsvResource};
use school_registry::infrastructure::import::{import_csv, ImportReport};
use school_registry::infrastructure::media::MediaStore;
use school_registry::infrastructure::seed::seed_demo_data;
use school_registry::infrastructure::AppState;

/// Order in which resources must be loaded so their references resolve.
const LOAD_ORDER: [CsvResource; 5] = [
    CsvResource::Schools,
    CsvResource::AcademicYears,
    CsvResource::Courses,
    CsvResource::Students,
    CsvResource::Documents,
];

async fn setup_state(media: &Path) -> AppState {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init test db");
    AppState::new(db, MediaStore::new(media))
}

async fn export_all(state: &AppState) -> Vec<(CsvResource, Vec<u8>)> {
    let mut files = Vec::new();
    for resource in LOAD_ORDER {
        files.push((resource, export_csv(state, resource).await.unwrap()));
    }
    files
}

async fn import_all(state: &AppState, files: &[(CsvResource, Vec<u8>)]) -> ImportReport {
    let mut total = ImportReport::default();
    for (resource, data) in files {
        let report = import_csv(state.db(), *resource, data).await.unwrap();
        total.created += report.created;
        total.updated += report.updated;
    }
    total
}

#[tokio::test]
async fn export_then_import_into_fresh_database() {
    let media = tempfile::tempdir().unwrap();
    let source = setup_state(media.path()).await;
    assert!(seed_demo_data(&source).await.unwrap());
    let files = export_all(&source).await;

    let target = setup_state(media.path()).await;
    let report = import_all(&target, &files).await;
    // 1 school, 1 year, 3 courses, 2 students, 1 document
    assert_eq!(report, ImportReport { created: 8, updated: 0 });

    let schools = target.school_repo.find_all(SchoolFilter::default()).await.unwrap();
    assert_eq!(schools.len(), 1);
    assert_eq!(schools[0].website_url.as_deref(), Some("https://escola-central.example"));

    let current = target.academic_year_repo.find_current().await.unwrap().unwrap();
    assert_eq!(current.courses_count, 3);

    let courses = target.course_repo.find_all(CourseFilter::default()).await.unwrap();
    let codes: Vec<&str> = courses.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["MAT101", "MAT201", "MAT301"]);
    let mat201 = target
        .course_repo
        .find_by_id(courses[1].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mat201.credit_hours, 4);
    assert_eq!(mat201.prerequisites.len(), 1);
    assert_eq!(mat201.prerequisites[0].code, "MAT101");
    assert_eq!(mat201.required_for[0].code, "MAT301");

    let students = target.student_repo.find_all(StudentFilter::default()).await.unwrap();
    assert_eq!(students.len(), 2);
    let ana = students
        .iter()
        .find(|s| s.student_number == "2024-0001")
        .unwrap();
    assert_eq!(ana.gender.as_deref(), Some("FEMALE"));
    assert_eq!(ana.mother_name.as_deref(), Some("Luísa Machava"));
    assert_eq!(ana.guardian_relationship.as_deref(), Some("MOTHER"));
    assert_eq!(ana.documents.len(), 1);
    assert_eq!(ana.documents[0].document_number, "BC-778812");
    assert!(ana.documents[0].is_verified);
    assert!(ana.has_valid_identification);

    // Loading the same files again only updates.
    let again = import_all(&target, &files).await;
    assert_eq!(again, ImportReport { created: 0, updated: 8 });
    let courses = target.course_repo.find_all(CourseFilter::default()).await.unwrap();
    assert_eq!(courses.len(), 3);
}

#[tokio::test]
async fn import_updates_rows_matched_by_natural_key() {
    let media = tempfile::tempdir().unwrap();
    let state = setup_state(media.path()).await;
    assert!(seed_demo_data(&state).await.unwrap());

    let data = "student_number,first_name,last_name,gender,phone_number\n\
                2024-0002,Tomás,Cossa,male,+258 84 111 2222\n\
                2024-0003,Inês,Mondlane,female,\n";
    let report = import_csv(state.db(), CsvResource::Students, data.as_bytes())
        .await
        .unwrap();
    assert_eq!(report, ImportReport { created: 1, updated: 1 });

    let students = state.student_repo.find_all(StudentFilter::default()).await.unwrap();
    assert_eq!(students.len(), 3);
    let tomas = students
        .iter()
        .find(|s| s.student_number == "2024-0002")
        .unwrap();
    assert_eq!(tomas.phone_number.as_deref(), Some("+258 84 111 2222"));
    assert_eq!(tomas.gender.as_deref(), Some("MALE"));
    let ines = students
        .iter()
        .find(|s| s.student_number == "2024-0003")
        .unwrap();
    assert_eq!(ines.phone_number, None);
}

#[tokio::test]
async fn invalid_row_rolls_back_the_whole_file() {
    let media = tempfile::tempdir().unwrap();
    let state = setup_state(media.path()).await;

    let data = "student_number,first_name,last_name\n\
                2024-0101,Ana,Machava\n\
                2024-0102,Tomás,Cossa\n\
                2024-0103,,Mondlane\n";
    let err = import_csv(state.db(), CsvResource::Students, data.as_bytes())
        .await
        .unwrap_err();
    match err {
        DomainError::Validation(msg) => {
            assert!(msg.starts_with("row 4:"), "{}", msg);
            assert!(msg.contains("first_name"), "{}", msg);
        }
        other => panic!("expected a validation error, got {:?}", other),
    }

    let students = state.student_repo.find_all(StudentFilter::default()).await.unwrap();
    assert!(students.is_empty());
}

#[tokio::test]
async fn unknown_references_are_rejected() {
    let media = tempfile::tempdir().unwrap();
    let state = setup_state(media.path()).await;
    assert!(seed_demo_data(&state).await.unwrap());
    let year = state
        .academic_year_repo
        .find_current()
        .await
        .unwrap()
        .unwrap()
        .name;

    let courses = format!(
        "code,name,credit_hours,academic_year,prerequisites\n\
         BIO101,Biologia,3,{},\n\
         BIO201,Biologia II,4,{},BIO101; CHE101\n",
        year, year
    );
    let err = import_csv(state.db(), CsvResource::Courses, courses.as_bytes())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("row 3: prerequisites"), "{}", err);
    let all = state.course_repo.find_all(CourseFilter::default()).await.unwrap();
    assert_eq!(all.len(), 3);

    let courses = "code,name,credit_hours,academic_year\nBIO101,Biologia,3,1999/2000\n";
    let err = import_csv(state.db(), CsvResource::Courses, courses.as_bytes())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("row 2: academic_year"), "{}", err);

    let documents = "student_number,document_type,document_number\n2099-0001,PASSPORT,P-1\n";
    let err = import_csv(state.db(), CsvResource::Documents, documents.as_bytes())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("row 2: student_number"), "{}", err);
}

#[tokio::test]
async fn course_import_can_reverse_an_edge() {
    let media = tempfile::tempdir().unwrap();
    let state = setup_state(media.path()).await;
    assert!(seed_demo_data(&state).await.unwrap());
    let year = state.academic_year_repo.find_current().await.unwrap().unwrap();

    // MAT201 currently requires MAT101; the file turns that around.
    let data = format!(
        "code,name,credit_hours,academic_year,prerequisites\n\
         MAT201,Matemática II,4,{name},\n\
         MAT101,Matemática I,3,{name},MAT201\n",
        name = year.name
    );
    let report = import_csv(state.db(), CsvResource::Courses, data.as_bytes())
        .await
        .unwrap();
    assert_eq!(report, ImportReport { created: 0, updated: 2 });

    let courses = state.course_repo.find_all(CourseFilter::default()).await.unwrap();
    let mat101 = courses.iter().find(|c| c.code == "MAT101").unwrap();
    let prerequisites = state.course_repo.prerequisites(mat101.id, false).await.unwrap();
    assert_eq!(prerequisites.len(), 1);
    assert_eq!(prerequisites[0].code, "MAT201");

    // A cycle inside the file is refused and nothing changes.
    let cyclic = format!(
        "code,name,credit_hours,academic_year,prerequisites\n\
         MAT201,Matemática II,4,{name},MAT101\n\
         MAT101,Matemática I,3,{name},MAT201\n",
        name = year.name
    );
    let err = import_csv(state.db(), CsvResource::Courses, cyclic.as_bytes())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Circular reference"), "{}", err);
    let prerequisites = state.course_repo.prerequisites(mat101.id, false).await.unwrap();
    assert_eq!(prerequisites[0].code, "MAT201");
}
