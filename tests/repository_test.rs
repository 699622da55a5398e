use chrono::{Duration, NaiveDate};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use school_registry::db;
use school_registry::domain::*;
use school_registry::infrastructure::media::MediaStore;
use school_registry::infrastructure::seed::seed_demo_data;
use school_registry::infrastructure::{
    AppState, SeaOrmAcademicYearRepository, SeaOrmCourseRepository, SeaOrmDocumentRepository,
    SeaOrmSchoolRepository, SeaOrmStudentRepository,
};

async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init test db")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn year_input(name: &str, start: NaiveDate, end: NaiveDate, active: bool) -> AcademicYearInput {
    AcademicYearInput {
        name: name.to_string(),
        start_date: start,
        end_date: end,
        is_active: active,
    }
}

fn course_input(code: &str, credit_hours: i32, year: Uuid, prerequisites: Vec<Uuid>) -> CourseInput {
    CourseInput {
        code: code.to_string(),
        name: format!("Course {}", code),
        description: None,
        credit_hours,
        academic_year: year,
        is_active: true,
        prerequisites: Some(prerequisites),
    }
}

fn student_input(number: &str, first: &str, last: &str) -> StudentInput {
    StudentInput {
        student_number: number.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        ..Default::default()
    }
}

fn document_input(student: Uuid, kind: &str, expiry: Option<NaiveDate>) -> DocumentInput {
    DocumentInput {
        student,
        document_type: kind.to_string(),
        document_number: format!("{}-001", kind),
        issue_date: None,
        expiry_date: expiry,
        issuing_authority: None,
        document_file: None,
        is_verified: false,
        verification_date: None,
        verification_notes: None,
    }
}

async fn create_year(db: &DatabaseConnection) -> AcademicYear {
    SeaOrmAcademicYearRepository::new(db.clone())
        .create(year_input("2025/2026", date(2025, 9, 1), date(2026, 7, 31), false))
        .await
        .expect("Failed to create academic year")
}

// ---------------------------------------------------------------------------
// Academic years
// ---------------------------------------------------------------------------

#[tokio::test]
async fn academic_year_rejects_inverted_dates() {
    let db = setup_test_db().await;
    let repo = SeaOrmAcademicYearRepository::new(db);

    let err = repo
        .create(year_input("Broken", date(2025, 9, 1), date(2025, 8, 1), false))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(ref m) if m == "End date must be after start date"));

    // single-day years are allowed
    let year = repo
        .create(year_input("One day", date(2025, 9, 1), date(2025, 9, 1), false))
        .await
        .unwrap();
    assert_eq!(year.duration_in_days, 1);
}

#[tokio::test]
async fn activate_leaves_exactly_one_active_year() {
    let db = setup_test_db().await;
    let repo = SeaOrmAcademicYearRepository::new(db);

    let first = repo
        .create(year_input("2024/2025", date(2024, 9, 1), date(2025, 7, 31), true))
        .await
        .unwrap();
    let second = repo
        .create(year_input("2025/2026", date(2025, 9, 1), date(2026, 7, 31), true))
        .await
        .unwrap();

    // both flagged: the later start wins
    let current = repo.find_current().await.unwrap().unwrap();
    assert_eq!(current.id, second.id);

    let activated = repo.activate(first.id).await.unwrap();
    assert!(activated.is_active);

    let active = repo
        .find_all(AcademicYearFilter {
            is_active: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, first.id);
    assert_eq!(repo.find_current().await.unwrap().unwrap().id, first.id);

    assert!(matches!(
        repo.activate(Uuid::new_v4()).await,
        Err(DomainError::NotFound)
    ));
}

#[tokio::test]
async fn current_is_none_without_active_years() {
    let db = setup_test_db().await;
    let repo = SeaOrmAcademicYearRepository::new(db.clone());
    create_year(&db).await;

    assert!(repo.find_current().await.unwrap().is_none());
}

#[tokio::test]
async fn for_date_includes_both_boundaries() {
    let db = setup_test_db().await;
    let repo = SeaOrmAcademicYearRepository::new(db);
    let year = repo
        .create(year_input("2025/2026", date(2025, 9, 1), date(2026, 7, 31), false))
        .await
        .unwrap();

    for day in [date(2025, 9, 1), date(2026, 1, 15), date(2026, 7, 31)] {
        let found = repo.find_for_date(day).await.unwrap();
        assert_eq!(found.len(), 1, "expected a year on {}", day);
        assert_eq!(found[0].id, year.id);
    }
    assert!(repo.find_for_date(date(2026, 8, 1)).await.unwrap().is_empty());
}

#[tokio::test]
async fn academic_year_default_order_is_newest_first() {
    let db = setup_test_db().await;
    let repo = SeaOrmAcademicYearRepository::new(db);
    for (name, start) in [("A", 2023), ("C", 2025), ("B", 2024)] {
        repo.create(year_input(name, date(start, 9, 1), date(start + 1, 7, 31), false))
            .await
            .unwrap();
    }

    let names: Vec<String> = repo
        .find_all(AcademicYearFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|y| y.name)
        .collect();
    assert_eq!(names, vec!["C", "B", "A"]);

    let by_name: Vec<String> = repo
        .find_all(AcademicYearFilter {
            ordering: Ordering::parse_list("name"),
            ..Default::default()
        })
        .await
        .unwrap()
        .into_iter()
        .map(|y| y.name)
        .collect();
    assert_eq!(by_name, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn deleting_a_year_removes_its_courses() {
    let db = setup_test_db().await;
    let years = SeaOrmAcademicYearRepository::new(db.clone());
    let courses = SeaOrmCourseRepository::new(db.clone());
    let year = create_year(&db).await;

    let course = courses
        .create(course_input("MAT101", 3, year.id, vec![]))
        .await
        .unwrap();
    assert_eq!(years.find_by_id(year.id).await.unwrap().unwrap().courses_count, 1);

    years.delete(year.id).await.unwrap();
    assert!(courses.find_by_id(course.id).await.unwrap().is_none());
    assert!(matches!(years.delete(year.id).await, Err(DomainError::NotFound)));
}

// ---------------------------------------------------------------------------
// Schools
// ---------------------------------------------------------------------------

#[tokio::test]
async fn school_validation_and_search() {
    let db = setup_test_db().await;
    let repo = SeaOrmSchoolRepository::new(db);

    let input = SchoolInput {
        name: "North High".to_string(),
        address: "1 Main Street".to_string(),
        phone_number: "+258 84 000 0000".to_string(),
        email_address: "office@north.edu".to_string(),
        website_url: Some("https://north.edu".to_string()),
    };
    let school = repo.create(input.clone()).await.unwrap();

    let bad_email = repo
        .create(SchoolInput {
            email_address: "not-an-email".to_string(),
            ..input.clone()
        })
        .await
        .unwrap_err();
    assert!(matches!(bad_email, DomainError::Validation(ref m) if m.starts_with("email_address")));

    let bad_url = repo
        .create(SchoolInput {
            website_url: Some("north.edu".to_string()),
            ..input.clone()
        })
        .await
        .unwrap_err();
    assert!(matches!(bad_url, DomainError::Validation(ref m) if m.starts_with("website_url")));

    let found = repo
        .find_all(SchoolFilter {
            search: Some("NORTH".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, school.id);

    for wildcard in ["%", "_"] {
        let found = repo
            .find_all(SchoolFilter {
                search: Some(wildcard.to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(found.is_empty(), "{} matched {:?}", wildcard, found);
    }

    let cleared = repo
        .update(
            school.id,
            SchoolPatch {
                website_url: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.website_url, None);
    assert_eq!(cleared.name, "North High");
}

// ---------------------------------------------------------------------------
// Courses and prerequisites
// ---------------------------------------------------------------------------

#[tokio::test]
async fn course_field_rules() {
    let db = setup_test_db().await;
    let repo = SeaOrmCourseRepository::new(db.clone());
    let year = create_year(&db).await;

    let err = repo
        .create(course_input("MAT101", 0, year.id, vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(ref m) if m == "Credit hours must be between 1 and 12"));

    let err = repo
        .create(course_input("MAT101", 3, Uuid::new_v4(), vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(ref m) if m.starts_with("academic_year")));

    repo.create(course_input("MAT101", 3, year.id, vec![]))
        .await
        .unwrap();
    let err = repo
        .create(course_input("MAT101", 4, year.id, vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));
}

#[tokio::test]
async fn course_derived_fields() {
    let db = setup_test_db().await;
    let repo = SeaOrmCourseRepository::new(db.clone());
    let year = create_year(&db).await;

    let basic = repo
        .create(course_input("MAT101", 3, year.id, vec![]))
        .await
        .unwrap();
    let advanced = repo
        .create(course_input("MAT301", 4, year.id, vec![basic.id]))
        .await
        .unwrap();

    assert!(!basic.is_advanced_course);
    assert!(advanced.is_advanced_course);
    assert!(advanced.has_prerequisites);
    assert_eq!(advanced.prerequisite_count, 1);
    assert_eq!(advanced.academic_year_name, "2025/2026");
    assert_eq!(advanced.prerequisites[0].code, "MAT101");

    let basic = repo.find_by_id(basic.id).await.unwrap().unwrap();
    assert_eq!(basic.required_for.len(), 1);
    assert_eq!(basic.required_for[0].code, "MAT301");

    let only_advanced = repo
        .find_all(CourseFilter {
            advanced_only: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(only_advanced.len(), 1);
    assert_eq!(only_advanced[0].code, "MAT301");

    let roots = repo
        .find_all(CourseFilter {
            without_prerequisites: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].code, "MAT101");
}

#[tokio::test]
async fn prerequisite_cycles_are_rejected() {
    let db = setup_test_db().await;
    let repo = SeaOrmCourseRepository::new(db.clone());
    let year = create_year(&db).await;

    let a = repo.create(course_input("A100", 3, year.id, vec![])).await.unwrap();
    let b = repo
        .create(course_input("B200", 3, year.id, vec![a.id]))
        .await
        .unwrap();
    let c = repo
        .create(course_input("C300", 3, year.id, vec![b.id]))
        .await
        .unwrap();

    // A -> C would close A <- B <- C
    let err = repo.add_prerequisite(a.id, c.id).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(ref m) if m.contains("circular")));

    let err = repo
        .update(
            a.id,
            CoursePatch {
                prerequisites: Some(vec![c.id]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(
        matches!(err, DomainError::Validation(ref m) if m == "Circular reference detected with course C300")
    );

    let err = repo.add_prerequisite(a.id, a.id).await.unwrap_err();
    assert!(
        matches!(err, DomainError::Validation(ref m) if m == "A course cannot be a prerequisite for itself")
    );

    // nothing was written
    let a = repo.find_by_id(a.id).await.unwrap().unwrap();
    assert!(a.prerequisites.is_empty());
}

#[tokio::test]
async fn add_and_remove_prerequisite() {
    let db = setup_test_db().await;
    let repo = SeaOrmCourseRepository::new(db.clone());
    let year = create_year(&db).await;

    let a = repo.create(course_input("A100", 3, year.id, vec![])).await.unwrap();
    let b = repo.create(course_input("B200", 3, year.id, vec![])).await.unwrap();

    let link = repo.add_prerequisite(b.id, a.id).await.unwrap();
    assert_eq!(link.course_code, "B200");
    assert_eq!(link.prerequisite_code, "A100");

    // adding twice keeps a single edge
    repo.add_prerequisite(b.id, a.id).await.unwrap();
    assert_eq!(repo.prerequisites(b.id, false).await.unwrap().len(), 1);

    let err = repo.add_prerequisite(b.id, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, DomainError::MissingRelated(ref m) if m == "Prerequisite course not found"));

    repo.remove_prerequisite(b.id, a.id).await.unwrap();
    assert!(repo.prerequisites(b.id, false).await.unwrap().is_empty());

    let err = repo.remove_prerequisite(b.id, a.id).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(ref m) if m == "A100 is not a prerequisite for B200"));
}

#[tokio::test]
async fn concurrent_opposite_edges_leave_graph_acyclic() {
    let db = setup_test_db().await;
    let repo = SeaOrmCourseRepository::new(db.clone());
    let year = create_year(&db).await;

    let a = repo.create(course_input("A100", 3, year.id, vec![])).await.unwrap();
    let b = repo.create(course_input("B200", 3, year.id, vec![])).await.unwrap();

    let (forward, backward) = tokio::join!(
        repo.add_prerequisite(a.id, b.id),
        repo.add_prerequisite(b.id, a.id)
    );
    assert_eq!(forward.is_ok() as u8 + backward.is_ok() as u8, 1);
    let rejected = forward.err().or(backward.err()).unwrap();
    assert!(matches!(rejected, DomainError::Validation(ref m) if m.contains("circular")));

    let edges = repo.prerequisites(a.id, false).await.unwrap().len()
        + repo.prerequisites(b.id, false).await.unwrap().len();
    assert_eq!(edges, 1);
}

#[tokio::test]
async fn update_without_prerequisites_keeps_them() {
    let db = setup_test_db().await;
    let repo = SeaOrmCourseRepository::new(db.clone());
    let year = create_year(&db).await;

    let a = repo.create(course_input("A100", 3, year.id, vec![])).await.unwrap();
    let b = repo.create(course_input("B200", 3, year.id, vec![])).await.unwrap();
    repo.add_prerequisite(b.id, a.id).await.unwrap();

    let replacement = CourseInput {
        name: "Renamed".to_string(),
        prerequisites: None,
        ..course_input("B200", 4, year.id, vec![])
    };
    let updated = repo.update(b.id, replacement.into()).await.unwrap();
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.credit_hours, 4);
    assert_eq!(updated.prerequisite_count, 1);
}

#[tokio::test]
async fn deleting_a_course_drops_its_edges() {
    let db = setup_test_db().await;
    let repo = SeaOrmCourseRepository::new(db.clone());
    let year = create_year(&db).await;

    let a = repo.create(course_input("A100", 3, year.id, vec![])).await.unwrap();
    let b = repo
        .create(course_input("B200", 3, year.id, vec![a.id]))
        .await
        .unwrap();

    repo.delete(a.id).await.unwrap();
    let b = repo.find_by_id(b.id).await.unwrap().unwrap();
    assert!(!b.has_prerequisites);
}

#[tokio::test]
async fn active_only_hides_inactive_prerequisites() {
    let db = setup_test_db().await;
    let repo = SeaOrmCourseRepository::new(db.clone());
    let year = create_year(&db).await;

    let mut retired = course_input("OLD100", 3, year.id, vec![]);
    retired.is_active = false;
    let retired = repo.create(retired).await.unwrap();
    let current = repo.create(course_input("NEW100", 3, year.id, vec![])).await.unwrap();
    let target = repo
        .create(course_input("T200", 3, year.id, vec![retired.id, current.id]))
        .await
        .unwrap();

    assert_eq!(repo.prerequisites(target.id, false).await.unwrap().len(), 2);
    let active = repo.prerequisites(target.id, true).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].code, "NEW100");
}

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

#[tokio::test]
async fn student_choices_are_normalized() {
    let db = setup_test_db().await;
    let repo = SeaOrmStudentRepository::new(db);

    let student = repo
        .create(StudentInput {
            gender: Some("female".to_string()),
            middle_name: Some("Maria".to_string()),
            guardian_relationship: Some("mother".to_string()),
            mother_phone_number: Some("+258 82 111 1111".to_string()),
            guardian_name: Some("Ana".to_string()),
            ..student_input("S-001", "Joana", "Silva")
        })
        .await
        .unwrap();

    assert_eq!(student.gender.as_deref(), Some("FEMALE"));
    assert_eq!(student.gender_display.as_deref(), Some("Feminino"));
    assert_eq!(student.guardian_relationship.as_deref(), Some("MOTHER"));
    assert_eq!(student.full_name, "Joana Maria Silva");
    assert_eq!(student.primary_contact_name.as_deref(), Some("Ana"));
    assert_eq!(student.primary_contact_phone.as_deref(), Some("+258 82 111 1111"));
    assert_eq!(student.age, 0);
    assert!(!student.has_valid_identification);

    let err = repo
        .create(StudentInput {
            gender: Some("unknown".to_string()),
            ..student_input("S-002", "Rui", "Costa")
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn student_patch_clears_optional_fields() {
    let db = setup_test_db().await;
    let repo = SeaOrmStudentRepository::new(db);

    let student = repo
        .create(StudentInput {
            email_address: Some("joana@example.org".to_string()),
            ..student_input("S-001", "Joana", "Silva")
        })
        .await
        .unwrap();

    let updated = repo
        .update(
            student.id,
            StudentPatch {
                email_address: Some(None),
                first_name: Some("  Joana ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.email_address, None);
    assert_eq!(updated.first_name, "Joana");

    let err = repo
        .update(
            student.id,
            StudentPatch {
                last_name: Some(String::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(ref m) if m.starts_with("last_name")));
}

#[tokio::test]
async fn student_filters() {
    let db = setup_test_db().await;
    let students = SeaOrmStudentRepository::new(db.clone());
    let documents = SeaOrmDocumentRepository::new(db.clone());
    let today = today();

    let identified = students
        .create(StudentInput {
            gender: Some("MALE".to_string()),
            ..student_input("S-001", "Carlos", "Almeida")
        })
        .await
        .unwrap();
    let missing = students
        .create(StudentInput {
            gender: Some("FEMALE".to_string()),
            father_name: Some("Paulo Zimba".to_string()),
            ..student_input("S-002", "Beatriz", "Zimba")
        })
        .await
        .unwrap();

    let mut passport = document_input(identified.id, "PASSPORT", Some(today + Duration::days(10)));
    passport.is_verified = true;
    documents.create(passport).await.unwrap();
    documents
        .create(document_input(missing.id, "ID_CARD", Some(today + Duration::days(200))))
        .await
        .unwrap();

    let all = students.find_all(StudentFilter::default()).await.unwrap();
    let order: Vec<&str> = all.iter().map(|s| s.last_name.as_str()).collect();
    assert_eq!(order, vec!["Almeida", "Zimba"]);

    let males = students
        .find_all(StudentFilter {
            gender: Some("male".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(males.len(), 1);
    assert_eq!(males[0].id, identified.id);

    let by_father = students
        .find_all(StudentFilter {
            search: Some("paulo".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_father.len(), 1);
    assert_eq!(by_father[0].id, missing.id);

    let without_id = students
        .find_all(StudentFilter {
            missing_identification: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(without_id.len(), 1);
    assert_eq!(without_id[0].id, missing.id);

    let expiring = students
        .find_all(StudentFilter {
            documents_expiring_within: Some(30),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(expiring.len(), 1);
    assert_eq!(expiring[0].id, identified.id);

    let student = students.find_by_id(identified.id).await.unwrap().unwrap();
    assert!(student.has_valid_identification);
    assert_eq!(student.documents.len(), 1);
    assert_eq!(
        student.primary_document.map(|d| d.document_type).as_deref(),
        Some("PASSPORT")
    );
}

#[tokio::test]
async fn primary_document_prefers_passport() {
    let db = setup_test_db().await;
    let students = SeaOrmStudentRepository::new(db.clone());
    let documents = SeaOrmDocumentRepository::new(db.clone());

    let student = students
        .create(student_input("S-001", "Carlos", "Almeida"))
        .await
        .unwrap();
    for kind in ["BIRTH_CERTIFICATE", "ID_CARD", "PASSPORT"] {
        let doc = documents
            .create(document_input(student.id, kind, None))
            .await
            .unwrap();
        if kind != "PASSPORT" {
            documents.verify(doc.id, String::new()).await.unwrap();
        }
    }

    // the passport is not verified, so the ID card wins
    let student = students.find_by_id(student.id).await.unwrap().unwrap();
    assert_eq!(
        student.primary_document.map(|d| d.document_type).as_deref(),
        Some("ID_CARD")
    );
}

#[tokio::test]
async fn deleting_a_student_returns_photo_and_drops_documents() {
    let db = setup_test_db().await;
    let students = SeaOrmStudentRepository::new(db.clone());
    let documents = SeaOrmDocumentRepository::new(db.clone());

    let student = students
        .create(student_input("S-001", "Carlos", "Almeida"))
        .await
        .unwrap();
    let doc = documents
        .create(document_input(student.id, "ID_CARD", None))
        .await
        .unwrap();

    let previous = students
        .set_photo(student.id, Some("student_photos/a.png".to_string()))
        .await
        .unwrap();
    assert_eq!(previous, None);
    let with_photo = students.find_by_id(student.id).await.unwrap().unwrap();
    assert_eq!(
        with_photo.student_photo.as_deref(),
        Some("/media/student_photos/a.png")
    );

    let photo = students.delete(student.id).await.unwrap();
    assert_eq!(photo.as_deref(), Some("student_photos/a.png"));
    assert!(documents.find_by_id(doc.id).await.unwrap().is_none());
    assert!(matches!(students.delete(student.id).await, Err(DomainError::NotFound)));
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_document_per_type_and_student() {
    let db = setup_test_db().await;
    let students = SeaOrmStudentRepository::new(db.clone());
    let documents = SeaOrmDocumentRepository::new(db.clone());

    let student = students
        .create(student_input("S-001", "Carlos", "Almeida"))
        .await
        .unwrap();
    let doc = documents
        .create(document_input(student.id, "passport", None))
        .await
        .unwrap();
    assert_eq!(doc.document_type, "PASSPORT");
    assert_eq!(doc.document_type_display.as_deref(), Some("Passport"));

    let err = documents
        .create(document_input(student.id, "PASSPORT", None))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    let err = documents
        .create(document_input(Uuid::new_v4(), "PASSPORT", None))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(ref m) if m.starts_with("student")));

    let err = documents
        .create(document_input(student.id, "DRIVING_LICENCE", None))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn expiry_windows() {
    let db = setup_test_db().await;
    let students = SeaOrmStudentRepository::new(db.clone());
    let documents = SeaOrmDocumentRepository::new(db.clone());
    let today = today();

    let student = students
        .create(student_input("S-001", "Carlos", "Almeida"))
        .await
        .unwrap();
    let expired = documents
        .create(document_input(student.id, "PASSPORT", Some(today - Duration::days(1))))
        .await
        .unwrap();
    let due_today = documents
        .create(document_input(student.id, "ID_CARD", Some(today)))
        .await
        .unwrap();
    let later = documents
        .create(document_input(
            student.id,
            "BIRTH_CERTIFICATE",
            Some(today + Duration::days(120)),
        ))
        .await
        .unwrap();

    assert!(expired.is_expired);
    assert_eq!(expired.days_until_expiry, Some(0));
    assert!(!due_today.is_expired);
    assert_eq!(due_today.days_until_expiry, Some(0));
    assert_eq!(later.days_until_expiry, Some(120));

    let expiring = documents
        .find_all(DocumentFilter {
            expiring_within: Some(90),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(expiring.len(), 1);
    assert_eq!(expiring[0].id, due_today.id);

    let wide = documents
        .find_all(DocumentFilter {
            expiring_within: Some(i64::MAX),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(wide.len(), 2);

    let gone = documents
        .find_all(DocumentFilter {
            expired_only: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(gone.len(), 1);
    assert_eq!(gone[0].id, expired.id);
}

#[tokio::test]
async fn verify_stamps_today_and_replaces_notes() {
    let db = setup_test_db().await;
    let students = SeaOrmStudentRepository::new(db.clone());
    let documents = SeaOrmDocumentRepository::new(db.clone());

    let student = students
        .create(student_input("S-001", "Carlos", "Almeida"))
        .await
        .unwrap();
    let doc = documents
        .create(document_input(student.id, "ID_CARD", None))
        .await
        .unwrap();
    assert!(!doc.is_verified);

    let verified = documents
        .verify(doc.id, "Checked at the front desk".to_string())
        .await
        .unwrap();
    assert!(verified.is_verified);
    assert_eq!(verified.verification_date, Some(today()));
    assert_eq!(
        verified.verification_notes.as_deref(),
        Some("Checked at the front desk")
    );

    let again = documents.verify(doc.id, String::new()).await.unwrap();
    assert_eq!(again.verification_notes, None);

    let unverified = documents
        .find_all(DocumentFilter {
            is_verified: Some(false),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(unverified.is_empty());

    assert!(matches!(
        documents.verify(Uuid::new_v4(), String::new()).await,
        Err(DomainError::NotFound)
    ));
}

// ---------------------------------------------------------------------------
// Demo data
// ---------------------------------------------------------------------------

#[tokio::test]
async fn demo_seed_runs_once() {
    let db = setup_test_db().await;
    let media = tempfile::tempdir().unwrap();
    let state = AppState::new(db, MediaStore::new(media.path()));

    assert!(seed_demo_data(&state).await.unwrap());
    assert!(!seed_demo_data(&state).await.unwrap());

    let current = state.academic_year_repo.find_current().await.unwrap().unwrap();
    assert_eq!(current.courses_count, 3);

    let courses = state.course_repo.find_all(CourseFilter::default()).await.unwrap();
    let chained: Vec<u64> = courses.iter().map(|c| c.prerequisite_count).collect();
    assert_eq!(chained, vec![0, 1, 1]);

    let identified = state
        .student_repo
        .find_all(StudentFilter {
            missing_identification: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(identified.len(), 1);
    assert_eq!(identified[0].first_name, "Tomás");
}
