//! Demo data for local development (`SEED_DEMO=1`).

use chrono::{Datelike, NaiveDate};

use crate::domain::{
    today, AcademicYearFilter, AcademicYearInput, CourseInput, DocumentInput, DomainError,
    SchoolInput, StudentInput,
};
use crate::infrastructure::AppState;

fn date(y: i32, m: u32, d: u32) -> Result<NaiveDate, DomainError> {
    NaiveDate::from_ymd_opt(y, m, d)
        .ok_or_else(|| DomainError::Internal(format!("invalid seed date {}-{}-{}", y, m, d)))
}

/// Insert a small school, one active year with a prerequisite chain and two
/// students. Returns `false` without touching anything when any academic
/// year already exists.
pub async fn seed_demo_data(state: &AppState) -> Result<bool, DomainError> {
    let existing = state
        .academic_year_repo
        .find_all(AcademicYearFilter::default())
        .await?;
    if !existing.is_empty() {
        return Ok(false);
    }

    state
        .school_repo
        .create(SchoolInput {
            name: "Escola Primária Central".to_string(),
            address: "Avenida 25 de Setembro, 1200".to_string(),
            phone_number: "+258 21 000 000".to_string(),
            email_address: "secretaria@escola-central.example".to_string(),
            website_url: Some("https://escola-central.example".to_string()),
        })
        .await?;

    let year = today().year();
    let academic_year = state
        .academic_year_repo
        .create(AcademicYearInput {
            name: format!("{}/{}", year, year + 1),
            start_date: date(year, 1, 1)?,
            end_date: date(year, 12, 31)?,
            is_active: false,
        })
        .await?;
    state.academic_year_repo.activate(academic_year.id).await?;

    let mut previous = None;
    for (code, name, hours) in [
        ("MAT101", "Matemática I", 3),
        ("MAT201", "Matemática II", 4),
        ("MAT301", "Cálculo", 5),
    ] {
        let course = state
            .course_repo
            .create(CourseInput {
                code: code.to_string(),
                name: name.to_string(),
                description: None,
                credit_hours: hours,
                academic_year: academic_year.id,
                is_active: true,
                prerequisites: Some(previous.into_iter().collect()),
            })
            .await?;
        previous = Some(course.id);
    }

    let ana = state
        .student_repo
        .create(StudentInput {
            student_number: "2024-0001".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Machava".to_string(),
            gender: Some("FEMALE".to_string()),
            date_of_birth: Some(date(year - 10, 3, 14)?),
            mother_name: Some("Luísa Machava".to_string()),
            mother_phone_number: Some("+258 84 000 0001".to_string()),
            guardian_relationship: Some("MOTHER".to_string()),
            ..Default::default()
        })
        .await?;
    state
        .student_repo
        .create(StudentInput {
            student_number: "2024-0002".to_string(),
            first_name: "Tomás".to_string(),
            last_name: "Cossa".to_string(),
            gender: Some("MALE".to_string()),
            guardian_name: Some("Rosa Cossa".to_string()),
            guardian_relationship: Some("AUNT".to_string()),
            ..Default::default()
        })
        .await?;

    state
        .document_repo
        .create(DocumentInput {
            student: ana.id,
            document_type: "BIRTH_CERTIFICATE".to_string(),
            document_number: "BC-778812".to_string(),
            issue_date: Some(date(year - 10, 4, 2)?),
            expiry_date: None,
            issuing_authority: Some("Conservatória do Registo Civil".to_string()),
            document_file: None,
            is_verified: true,
            verification_date: Some(today()),
            verification_notes: None,
        })
        .await?;

    Ok(true)
}
