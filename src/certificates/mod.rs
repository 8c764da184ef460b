//! # Certificates Module
//!
//! Completion certificates: issuing, listing, public verification, PDF
//! download and administrative revocation. HTML pages live in [`handlers`].

pub mod handlers;
pub mod pdf;
pub mod qr;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::config::CertificateSettings;
use crate::core::urls::ApiUrls;
use crate::learn::{active_lessons, completed_lesson_ids, error_json};
use crate::learn::progress::{completed_count, is_course_complete};
use crate::shared::error::{AppError, AppResult};
use crate::shared::models::{Certificate, Course, Enrollment};
use crate::shared::schema::{certificates, courses, enrollments, users};
use crate::shared::state::AppState;
use crate::shared::utils::{like_pattern, DbPool};

use self::pdf::CertificateDocument;

pub const INVALID_CERTIFICATE: &str = "Invalid Certificate ID";

/// Gets the enrollment's certificate, creating it on first call. The flag is
/// `true` when this call created it.
pub fn issue_certificate(
    conn: &mut PgConnection,
    enrollment_id: Uuid,
) -> QueryResult<(Certificate, bool)> {
    let inserted = diesel::insert_into(certificates::table)
        .values(&Certificate {
            id: Uuid::new_v4(),
            enrollment_id,
            verification_code: Uuid::new_v4(),
            issued_at: Utc::now(),
            revoked: false,
            revoked_at: None,
            downloaded: false,
        })
        .on_conflict(certificates::enrollment_id)
        .do_nothing()
        .execute(conn)?;

    let certificate = certificates::table
        .filter(certificates::enrollment_id.eq(enrollment_id))
        .first(conn)?;
    Ok((certificate, inserted > 0))
}

// ============================================================================
// TYPES
// ============================================================================

/// Certificate joined with the enrollment, course and student it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateRecord {
    pub certificate: Certificate,
    pub enrollment: Enrollment,
    pub course: Course,
    pub username: String,
    pub display_name: Option<String>,
}

impl CertificateRecord {
    /// Enrollment name, else the account's display name, else the username.
    pub fn student_name(&self) -> String {
        [Some(self.enrollment.full_name.as_str()), self.display_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|n| !n.is_empty())
            .unwrap_or(&self.username)
            .to_string()
    }

    pub fn document(&self, settings: &CertificateSettings) -> CertificateDocument {
        CertificateDocument {
            student_name: self.student_name(),
            course_title: self.course.title.clone(),
            verification_code: self.certificate.verification_code,
            issued_at: self.certificate.issued_at,
            verify_url: settings.verification_url(&self.certificate.verification_code),
            issuer_name: settings.issuer_name.clone(),
            issuer_tagline: settings.issuer_tagline.clone(),
            signatory: settings.signatory.clone(),
        }
    }
}

type RecordRow = (Certificate, Enrollment, Course, String, Option<String>);

impl From<RecordRow> for CertificateRecord {
    fn from((certificate, enrollment, course, username, display_name): RecordRow) -> Self {
        Self {
            certificate,
            enrollment,
            course,
            username,
            display_name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Valid,
    Revoked,
    Invalid,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Revoked => "revoked",
            Self::Invalid => "invalid",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Verification {
    pub status: VerificationStatus,
    pub message: Option<String>,
    pub student_name: Option<String>,
    pub course_name: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub verification_code: Option<Uuid>,
}

impl Verification {
    pub fn invalid() -> Self {
        Self {
            status: VerificationStatus::Invalid,
            message: Some(INVALID_CERTIFICATE.to_string()),
            student_name: None,
            course_name: None,
            issued_at: None,
            verification_code: None,
        }
    }

    fn from_record(record: &CertificateRecord) -> Self {
        let status = if record.certificate.revoked {
            VerificationStatus::Revoked
        } else {
            VerificationStatus::Valid
        };
        Self {
            status,
            message: None,
            student_name: Some(record.student_name()),
            course_name: Some(record.course.title.clone()),
            issued_at: Some(record.certificate.issued_at),
            verification_code: Some(record.certificate.verification_code),
        }
    }
}

/// What the "certificate for course" page should show.
#[derive(Debug, Clone)]
pub enum CourseCertificate {
    NotEnrolled,
    NotIssued,
    Revoked(Box<CertificateRecord>),
    Issued(Box<CertificateRecord>),
}

#[derive(Debug, Clone)]
pub enum Download {
    Incomplete,
    Revoked,
    Ready { certificate_id: Uuid, pdf: Vec<u8> },
}

#[derive(Debug, Clone)]
pub struct CertificateDetail {
    pub record: CertificateRecord,
    pub completed_lessons: usize,
    pub total_lessons: usize,
}

impl CertificateDetail {
    pub fn is_completed(&self) -> bool {
        self.completed_lessons == self.total_lessons
    }
}

/// Filters of the certificate administration page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminFilters {
    pub q: Option<String>,
    pub course: Option<String>,
    pub downloaded: Option<String>,
    pub revoked: Option<String>,
}

fn tri_state(raw: Option<&str>) -> Option<bool> {
    match raw.map(str::trim) {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

impl AdminFilters {
    pub fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    pub fn course_id(&self) -> Option<Uuid> {
        self.course.as_deref().and_then(|c| c.trim().parse().ok())
    }

    pub fn downloaded(&self) -> Option<bool> {
        tri_state(self.downloaded.as_deref())
    }

    pub fn revoked(&self) -> Option<bool> {
        tri_state(self.revoked.as_deref())
    }
}

// ============================================================================
// CERTIFICATE ENGINE
// ============================================================================

pub struct CertificateEngine {
    db: DbPool,
}

macro_rules! record_query {
    () => {
        certificates::table
            .inner_join(
                enrollments::table
                    .inner_join(courses::table)
                    .inner_join(users::table),
            )
            .select((
                certificates::all_columns,
                enrollments::all_columns,
                courses::all_columns,
                users::username,
                users::display_name,
            ))
    };
}

impl CertificateEngine {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// The user's certificates, newest first.
    pub async fn my_certificates(&self, user_id: Uuid) -> AppResult<Vec<CertificateRecord>> {
        let mut conn = self.db.get()?;
        let rows: Vec<RecordRow> = record_query!()
            .filter(enrollments::user_id.eq(user_id))
            .order(certificates::issued_at.desc())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(CertificateRecord::from).collect())
    }

    fn owned_record(
        conn: &mut PgConnection,
        user_id: Uuid,
        certificate_id: Uuid,
    ) -> AppResult<CertificateRecord> {
        let row: Option<RecordRow> = record_query!()
            .filter(certificates::id.eq(certificate_id))
            .filter(enrollments::user_id.eq(user_id))
            .first(conn)
            .optional()?;
        row.map(CertificateRecord::from)
            .ok_or_else(|| AppError::not_found("Certificate not found"))
    }

    pub async fn certificate_detail(
        &self,
        user_id: Uuid,
        certificate_id: Uuid,
    ) -> AppResult<CertificateDetail> {
        let mut conn = self.db.get()?;
        let record = Self::owned_record(&mut conn, user_id, certificate_id)?;

        let lessons = active_lessons(&mut conn, record.course.id)?;
        let completed = completed_lesson_ids(&mut conn, record.enrollment.id)?;

        Ok(CertificateDetail {
            completed_lessons: completed_count(&lessons, &completed),
            total_lessons: lessons.len(),
            record,
        })
    }

    pub async fn certificate_for_course(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> AppResult<CourseCertificate> {
        let mut conn = self.db.get()?;

        let enrolled: i64 = enrollments::table
            .filter(enrollments::user_id.eq(user_id))
            .filter(enrollments::course_id.eq(course_id))
            .count()
            .get_result(&mut conn)?;
        if enrolled == 0 {
            return Ok(CourseCertificate::NotEnrolled);
        }

        let row: Option<RecordRow> = record_query!()
            .filter(enrollments::user_id.eq(user_id))
            .filter(enrollments::course_id.eq(course_id))
            .first(&mut conn)
            .optional()?;

        Ok(match row.map(CertificateRecord::from) {
            None => CourseCertificate::NotIssued,
            Some(record) if record.certificate.revoked => {
                CourseCertificate::Revoked(Box::new(record))
            }
            Some(record) => CourseCertificate::Issued(Box::new(record)),
        })
    }

    /// Renders the PDF once the course is still complete and the certificate
    /// is not revoked, then records the download.
    pub async fn download(
        &self,
        user_id: Uuid,
        certificate_id: Uuid,
        settings: &CertificateSettings,
    ) -> AppResult<Download> {
        let mut conn = self.db.get()?;
        let record = Self::owned_record(&mut conn, user_id, certificate_id)?;

        let lessons = active_lessons(&mut conn, record.course.id)?;
        let completed = completed_lesson_ids(&mut conn, record.enrollment.id)?;
        if !is_course_complete(&lessons, &completed) {
            return Ok(Download::Incomplete);
        }
        if record.certificate.revoked {
            return Ok(Download::Revoked);
        }

        let pdf = record.document(settings).render()?;

        if !record.certificate.downloaded {
            diesel::update(certificates::table.find(certificate_id))
                .set(certificates::downloaded.eq(true))
                .execute(&mut conn)?;
        }

        Ok(Download::Ready {
            certificate_id,
            pdf,
        })
    }

    /// Public lookup by verification code; malformed codes are simply invalid.
    pub async fn verify(&self, code: &str) -> AppResult<Verification> {
        let Ok(code) = Uuid::parse_str(code.trim()) else {
            return Ok(Verification::invalid());
        };

        let mut conn = self.db.get()?;
        let row: Option<RecordRow> = record_query!()
            .filter(certificates::verification_code.eq(code))
            .first(&mut conn)
            .optional()?;

        Ok(row
            .map(CertificateRecord::from)
            .map(|record| Verification::from_record(&record))
            .unwrap_or_else(Verification::invalid))
    }

    pub async fn admin_list(&self, filters: &AdminFilters) -> AppResult<Vec<CertificateRecord>> {
        let mut conn = self.db.get()?;

        let mut query = record_query!()
            .order(certificates::issued_at.desc())
            .into_boxed();

        if let Some(term) = filters.search() {
            let pattern = like_pattern(term);
            query = query.filter(
                enrollments::full_name
                    .ilike(pattern.clone())
                    .or(users::username.ilike(pattern)),
            );
        }
        if let Some(course_id) = filters.course_id() {
            query = query.filter(enrollments::course_id.eq(course_id));
        }
        if let Some(downloaded) = filters.downloaded() {
            query = query.filter(certificates::downloaded.eq(downloaded));
        }
        if let Some(revoked) = filters.revoked() {
            query = query.filter(certificates::revoked.eq(revoked));
        }

        let rows: Vec<RecordRow> = query.load(&mut conn)?;
        Ok(rows.into_iter().map(CertificateRecord::from).collect())
    }

    pub async fn all_courses(&self) -> AppResult<Vec<Course>> {
        let mut conn = self.db.get()?;
        Ok(courses::table.order(courses::title.asc()).load(&mut conn)?)
    }

    /// Revokes or reinstates a certificate.
    pub async fn set_revoked(&self, certificate_id: Uuid, revoked: bool) -> AppResult<Certificate> {
        let mut conn = self.db.get()?;
        let revoked_at = revoked.then(Utc::now);

        let certificate: Certificate = diesel::update(certificates::table.find(certificate_id))
            .set((
                certificates::revoked.eq(revoked),
                certificates::revoked_at.eq(revoked_at),
            ))
            .get_result(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("Certificate not found"))?;

        log::info!(
            "Certificate {} {}",
            certificate.verification_code,
            if revoked { "revoked" } else { "reissued" }
        );
        Ok(certificate)
    }
}

// ============================================================================
// HTTP HANDLERS
// ============================================================================

/// Verify a certificate by its code
pub async fn verify_certificate_api(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    let engine = CertificateEngine::new(state.conn.clone());

    match engine.verify(&code).await {
        Ok(verification) => Json(serde_json::json!({
            "success": true,
            "data": verification
        }))
        .into_response(),
        Err(e) => error_json(e),
    }
}

/// Configure certificate routes
pub fn configure_certificate_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(ApiUrls::CERTIFICATE_VERIFY, get(verify_certificate_api))
        .merge(handlers::configure_certificate_ui_routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::enums::Category;

    fn record(full_name: &str, display_name: Option<&str>, revoked: bool) -> CertificateRecord {
        let course = Course {
            id: Uuid::new_v4(),
            title: "Rust Basics".to_string(),
            description: String::new(),
            category: Category::Other,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            course_id: course.id,
            full_name: full_name.to_string(),
            phone_number: "123".to_string(),
            enrolled_at: Utc::now(),
        };
        CertificateRecord {
            certificate: Certificate {
                id: Uuid::new_v4(),
                enrollment_id: enrollment.id,
                verification_code: Uuid::new_v4(),
                issued_at: Utc::now(),
                revoked,
                revoked_at: None,
                downloaded: false,
            },
            enrollment,
            course,
            username: "student1".to_string(),
            display_name: display_name.map(str::to_string),
        }
    }

    #[test]
    fn test_student_name_precedence() {
        assert_eq!(record("Ada L.", Some("Ada"), false).student_name(), "Ada L.");
        assert_eq!(record(" ", Some("Ada"), false).student_name(), "Ada");
        assert_eq!(record("", None, false).student_name(), "student1");
    }

    #[test]
    fn test_verification_status() {
        let valid = Verification::from_record(&record("Ada", None, false));
        assert_eq!(valid.status, VerificationStatus::Valid);
        assert_eq!(valid.course_name.as_deref(), Some("Rust Basics"));

        let revoked = Verification::from_record(&record("Ada", None, true));
        assert_eq!(revoked.status, VerificationStatus::Revoked);
        assert_eq!(revoked.student_name.as_deref(), Some("Ada"));

        let invalid = Verification::invalid();
        assert_eq!(invalid.status.as_str(), "invalid");
        assert_eq!(invalid.message.as_deref(), Some(INVALID_CERTIFICATE));
    }

    #[test]
    fn test_admin_filters() {
        let filters = AdminFilters {
            q: Some("  ".to_string()),
            course: Some("not-a-uuid".to_string()),
            downloaded: Some("true".to_string()),
            revoked: Some("maybe".to_string()),
        };
        assert_eq!(filters.search(), None);
        assert_eq!(filters.course_id(), None);
        assert_eq!(filters.downloaded(), Some(true));
        assert_eq!(filters.revoked(), None);
    }

    #[test]
    fn test_document_uses_verification_url() {
        let settings = CertificateSettings::default();
        let rec = record("Ada", None, false);
        let doc = rec.document(&settings);
        assert!(doc
            .verify_url
            .ends_with(&format!("/certificates/verify/{}", rec.certificate.verification_code)));
        assert_eq!(doc.student_name, "Ada");
    }
}
