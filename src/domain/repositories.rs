//! Repository trait definitions
//!
//! These traits define the contract for data access.
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::DomainError;

/// Keeps an explicit `null` distinct from an absent field in partial updates.
///
/// Use together with `#[serde(default)]`: absent stays `None`, `null` becomes
/// `Some(None)`.
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

/// One requested sort key, e.g. `-start_date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub field: String,
    pub descending: bool,
}

impl Ordering {
    /// Parse a comma separated `ordering` parameter. Blank entries are skipped.
    pub fn parse_list(raw: &str) -> Vec<Ordering> {
        raw.split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty() && *f != "-")
            .map(|f| match f.strip_prefix('-') {
                Some(field) => Ordering {
                    field: field.to_string(),
                    descending: true,
                },
                None => Ordering {
                    field: f.to_string(),
                    descending: false,
                },
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Academic years
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AcademicYear {
    pub id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub duration_in_days: i64,
    pub is_current: bool,
    pub courses_count: u64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AcademicYearInput {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcademicYearPatch {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

impl From<AcademicYearInput> for AcademicYearPatch {
    fn from(input: AcademicYearInput) -> Self {
        Self {
            name: Some(input.name),
            start_date: Some(input.start_date),
            end_date: Some(input.end_date),
            is_active: Some(input.is_active),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct AcademicYearFilter {
    pub is_active: Option<bool>,
    pub ordering: Vec<Ordering>,
}

#[async_trait]
pub trait AcademicYearRepository: Send + Sync {
    /// Default order is newest start date first
    async fn find_all(&self, filter: AcademicYearFilter) -> Result<Vec<AcademicYear>, DomainError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AcademicYear>, DomainError>;

    async fn create(&self, input: AcademicYearInput) -> Result<AcademicYear, DomainError>;

    async fn update(&self, id: Uuid, patch: AcademicYearPatch)
    -> Result<AcademicYear, DomainError>;

    async fn delete(&self, id: Uuid) -> Result<(), DomainError>;

    /// The active year; when several are flagged, the one starting last
    async fn find_current(&self) -> Result<Option<AcademicYear>, DomainError>;

    /// Every year whose range contains `date`
    async fn find_for_date(&self, date: NaiveDate) -> Result<Vec<AcademicYear>, DomainError>;

    /// Make `id` the only active year
    async fn activate(&self, id: Uuid) -> Result<AcademicYear, DomainError>;
}

// ---------------------------------------------------------------------------
// Schools
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct School {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub phone_number: String,
    pub email_address: String,
    pub website_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SchoolInput {
    pub name: String,
    pub address: String,
    pub phone_number: String,
    pub email_address: String,
    #[serde(default)]
    pub website_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchoolPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub email_address: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub website_url: Option<Option<String>>,
}

impl From<SchoolInput> for SchoolPatch {
    fn from(input: SchoolInput) -> Self {
        Self {
            name: Some(input.name),
            address: Some(input.address),
            phone_number: Some(input.phone_number),
            email_address: Some(input.email_address),
            website_url: Some(input.website_url),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct SchoolFilter {
    pub search: Option<String>,
    pub ordering: Vec<Ordering>,
}

#[async_trait]
pub trait SchoolRepository: Send + Sync {
    async fn find_all(&self, filter: SchoolFilter) -> Result<Vec<School>, DomainError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<School>, DomainError>;

    async fn create(&self, input: SchoolInput) -> Result<School, DomainError>;

    async fn update(&self, id: Uuid, patch: SchoolPatch) -> Result<School, DomainError>;

    async fn delete(&self, id: Uuid) -> Result<(), DomainError>;
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

/// Course as shown in listings
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CourseSummary {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub credit_hours: i32,
    pub academic_year: Uuid,
    pub academic_year_name: String,
    pub is_active: bool,
    pub prerequisite_count: u64,
    pub has_prerequisites: bool,
    pub is_advanced_course: bool,
    pub created_at: String,
}

/// Compact course reference used for prerequisite lists
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PrerequisiteCourse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub credit_hours: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CourseDetail {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub credit_hours: i32,
    pub academic_year: Uuid,
    pub academic_year_name: String,
    pub is_active: bool,
    pub prerequisites: Vec<PrerequisiteCourse>,
    pub required_for: Vec<PrerequisiteCourse>,
    pub has_prerequisites: bool,
    pub prerequisite_count: u64,
    pub is_advanced_course: bool,
    pub created_at: String,
    pub updated_at: String,
}

fn default_credit_hours() -> i32 {
    3
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CourseInput {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_credit_hours")]
    pub credit_hours: i32,
    pub academic_year: Uuid,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Left out on update, the current prerequisites are kept
    #[serde(default)]
    pub prerequisites: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoursePatch {
    pub code: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub credit_hours: Option<i32>,
    pub academic_year: Option<Uuid>,
    pub is_active: Option<bool>,
    pub prerequisites: Option<Vec<Uuid>>,
}

impl From<CourseInput> for CoursePatch {
    fn from(input: CourseInput) -> Self {
        Self {
            code: Some(input.code),
            name: Some(input.name),
            description: Some(input.description),
            credit_hours: Some(input.credit_hours),
            academic_year: Some(input.academic_year),
            is_active: Some(input.is_active),
            prerequisites: input.prerequisites,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct CourseFilter {
    pub academic_year: Option<Uuid>,
    pub is_active: Option<bool>,
    pub credit_hours: Option<i32>,
    pub min_credits: Option<i32>,
    pub max_credits: Option<i32>,
    /// Only courses above the advanced credit threshold
    pub advanced_only: bool,
    /// Only courses with no prerequisites
    pub without_prerequisites: bool,
    pub search: Option<String>,
    pub ordering: Vec<Ordering>,
}

/// Codes of the two ends of a prerequisite edge, for confirmation messages
#[derive(Debug, Clone)]
pub struct PrerequisiteLink {
    pub course_code: String,
    pub prerequisite_code: String,
}

#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Default order is by code
    async fn find_all(&self, filter: CourseFilter) -> Result<Vec<CourseSummary>, DomainError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CourseDetail>, DomainError>;

    async fn create(&self, input: CourseInput) -> Result<CourseDetail, DomainError>;

    /// Replaces the prerequisite set when `patch.prerequisites` is given
    async fn update(&self, id: Uuid, patch: CoursePatch) -> Result<CourseDetail, DomainError>;

    async fn delete(&self, id: Uuid) -> Result<(), DomainError>;

    async fn prerequisites(
        &self,
        id: Uuid,
        active_only: bool,
    ) -> Result<Vec<PrerequisiteCourse>, DomainError>;

    /// Courses that list `id` as a prerequisite
    async fn required_for(
        &self,
        id: Uuid,
        active_only: bool,
    ) -> Result<Vec<PrerequisiteCourse>, DomainError>;

    async fn add_prerequisite(
        &self,
        id: Uuid,
        prerequisite_id: Uuid,
    ) -> Result<PrerequisiteLink, DomainError>;

    async fn remove_prerequisite(
        &self,
        id: Uuid,
        prerequisite_id: Uuid,
    ) -> Result<PrerequisiteLink, DomainError>;
}

// ---------------------------------------------------------------------------
// Students and their documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentDocument {
    pub id: Uuid,
    pub student: Uuid,
    pub document_type: String,
    pub document_type_display: Option<String>,
    pub document_number: String,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub issuing_authority: Option<String>,
    pub document_file: Option<String>,
    pub is_verified: bool,
    pub verification_date: Option<NaiveDate>,
    pub verification_notes: Option<String>,
    pub days_until_expiry: Option<i64>,
    pub is_expired: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Student {
    pub id: Uuid,
    pub student_number: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub full_name: String,
    pub gender: Option<String>,
    pub gender_display: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub age: i32,
    pub phone_number: Option<String>,
    pub email_address: Option<String>,
    /// Public URL of the photo
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
    pub guardian_relationship_display: Option<String>,
    pub other_guardian_relationship: Option<String>,
    pub primary_contact_name: Option<String>,
    pub primary_contact_phone: Option<String>,
    pub primary_contact_email: Option<String>,
    pub has_valid_identification: bool,
    pub primary_document: Option<StudentDocument>,
    pub documents: Vec<StudentDocument>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct StudentInput {
    pub student_number: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub email_address: Option<String>,
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
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentPatch {
    pub student_number: Option<String>,
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub middle_name: Option<Option<String>>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub gender: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub date_of_birth: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub email_address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub student_address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub father_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub father_phone_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub father_email_address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub mother_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub mother_phone_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub mother_email_address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub guardian_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub guardian_phone_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub guardian_email_address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub guardian_address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub guardian_relationship: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub other_guardian_relationship: Option<Option<String>>,
}

impl From<StudentInput> for StudentPatch {
    fn from(input: StudentInput) -> Self {
        Self {
            student_number: Some(input.student_number),
            first_name: Some(input.first_name),
            middle_name: Some(input.middle_name),
            last_name: Some(input.last_name),
            gender: Some(input.gender),
            date_of_birth: Some(input.date_of_birth),
            phone_number: Some(input.phone_number),
            email_address: Some(input.email_address),
            student_address: Some(input.student_address),
            father_name: Some(input.father_name),
            father_phone_number: Some(input.father_phone_number),
            father_email_address: Some(input.father_email_address),
            mother_name: Some(input.mother_name),
            mother_phone_number: Some(input.mother_phone_number),
            mother_email_address: Some(input.mother_email_address),
            guardian_name: Some(input.guardian_name),
            guardian_phone_number: Some(input.guardian_phone_number),
            guardian_email_address: Some(input.guardian_email_address),
            guardian_address: Some(input.guardian_address),
            guardian_relationship: Some(input.guardian_relationship),
            other_guardian_relationship: Some(input.other_guardian_relationship),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct StudentFilter {
    pub gender: Option<String>,
    pub guardian_relationship: Option<String>,
    pub search: Option<String>,
    /// Only students without any verified document
    pub missing_identification: bool,
    /// Only students with a document expiring within this many days
    pub documents_expiring_within: Option<i64>,
    pub ordering: Vec<Ordering>,
}

#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Default order is last name, then first name
    async fn find_all(&self, filter: StudentFilter) -> Result<Vec<Student>, DomainError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Student>, DomainError>;

    async fn create(&self, input: StudentInput) -> Result<Student, DomainError>;

    async fn update(&self, id: Uuid, patch: StudentPatch) -> Result<Student, DomainError>;

    /// Returns the stored photo path, if any, so the caller can remove the file
    async fn delete(&self, id: Uuid) -> Result<Option<String>, DomainError>;

    /// Store a new media path (or clear it) and return the previous one
    async fn set_photo(
        &self,
        id: Uuid,
        photo: Option<String>,
    ) -> Result<Option<String>, DomainError>;
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DocumentInput {
    pub student: Uuid,
    pub document_type: String,
    pub document_number: String,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub issuing_authority: Option<String>,
    #[serde(default)]
    pub document_file: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub verification_date: Option<NaiveDate>,
    #[serde(default)]
    pub verification_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentPatch {
    pub student: Option<Uuid>,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub issue_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub expiry_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub issuing_authority: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub document_file: Option<Option<String>>,
    pub is_verified: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub verification_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub verification_notes: Option<Option<String>>,
}

impl From<DocumentInput> for DocumentPatch {
    fn from(input: DocumentInput) -> Self {
        Self {
            student: Some(input.student),
            document_type: Some(input.document_type),
            document_number: Some(input.document_number),
            issue_date: Some(input.issue_date),
            expiry_date: Some(input.expiry_date),
            issuing_authority: Some(input.issuing_authority),
            document_file: Some(input.document_file),
            is_verified: Some(input.is_verified),
            verification_date: Some(input.verification_date),
            verification_notes: Some(input.verification_notes),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct DocumentFilter {
    pub student: Option<Uuid>,
    pub document_type: Option<String>,
    pub is_verified: Option<bool>,
    /// Not yet expired and expiring within this many days
    pub expiring_within: Option<i64>,
    pub expired_only: bool,
    pub ordering: Vec<Ordering>,
}

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Default order is newest first
    async fn find_all(&self, filter: DocumentFilter) -> Result<Vec<StudentDocument>, DomainError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<StudentDocument>, DomainError>;

    async fn create(&self, input: DocumentInput) -> Result<StudentDocument, DomainError>;

    async fn update(&self, id: Uuid, patch: DocumentPatch)
    -> Result<StudentDocument, DomainError>;

    async fn delete(&self, id: Uuid) -> Result<(), DomainError>;

    /// Mark verified as of today, replacing the verification notes
    async fn verify(&self, id: Uuid, notes: String) -> Result<StudentDocument, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_parses_direction_and_lists() {
        let keys = Ordering::parse_list("-start_date, name,,-");
        assert_eq!(
            keys,
            vec![
                Ordering {
                    field: "start_date".to_string(),
                    descending: true
                },
                Ordering {
                    field: "name".to_string(),
                    descending: false
                },
            ]
        );
    }

    #[test]
    fn patch_distinguishes_null_from_absent() {
        let patch: SchoolPatch = serde_json::from_str(r#"{"website_url": null}"#).unwrap();
        assert_eq!(patch.website_url, Some(None));

        let patch: SchoolPatch = serde_json::from_str(r#"{"name": "North"}"#).unwrap();
        assert_eq!(patch.website_url, None);
        assert_eq!(patch.name.as_deref(), Some("North"));
    }

    #[test]
    fn course_input_defaults() {
        let input: CourseInput = serde_json::from_str(&format!(
            r#"{{"code": "MAT101", "name": "Algebra", "academic_year": "{}"}}"#,
            Uuid::nil()
        ))
        .unwrap();
        assert_eq!(input.credit_hours, 3);
        assert!(input.is_active);
        assert_eq!(input.prerequisites, None);
        assert_eq!(CoursePatch::from(input).prerequisites, None);
    }
}
