//! Certificate pages: verification, personal certificates, downloads and the
//! administration dashboard.

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_cookies::Cookies;
use uuid::Uuid;

use super::qr::render_png;
use super::{
    AdminFilters, CertificateDetail, CertificateEngine, CertificateRecord, CourseCertificate,
    Download, Verification, VerificationStatus,
};
use crate::core::urls::{course_url, url_for, PageUrls};
use crate::shared::error::{AppError, AppResult};
use crate::shared::state::AppState;
use crate::web::auth::{AdminUser, AuthenticatedUser};
use crate::web::{filters, flash, PageContext, SelectOption};

const QR_SIZE: u32 = 240;
const EMPTY_CODE: &str = "Please enter a certificate ID";

// ============================================================================
// VIEW ROWS
// ============================================================================

#[derive(Debug, Clone)]
pub struct CertificateRow {
    pub id: String,
    pub student_name: String,
    pub username: String,
    pub course_title: String,
    pub course_url: String,
    pub code: String,
    pub issued_at: String,
    pub revoked: bool,
    pub downloaded: bool,
    pub detail_url: String,
    pub download_url: String,
    pub verify_url: String,
    pub qr_url: String,
    pub revoke_url: String,
    pub reissue_url: String,
}

impl From<&CertificateRecord> for CertificateRow {
    fn from(r: &CertificateRecord) -> Self {
        let id = r.certificate.id.to_string();
        let code = r.certificate.verification_code.to_string();
        Self {
            student_name: r.student_name(),
            username: r.username.clone(),
            course_title: r.course.title.clone(),
            course_url: course_url(&r.course.id),
            issued_at: r.certificate.issued_at.format("%B %d, %Y").to_string(),
            revoked: r.certificate.revoked,
            downloaded: r.certificate.downloaded,
            detail_url: url_for(PageUrls::CERTIFICATE_DETAIL, &[("certificate_id", &id)]),
            download_url: url_for(PageUrls::CERTIFICATE_DOWNLOAD, &[("certificate_id", &id)]),
            verify_url: url_for(PageUrls::CERTIFICATE_VERIFY, &[("code", &code)]),
            qr_url: url_for(PageUrls::CERTIFICATE_QR, &[("code", &code)]),
            revoke_url: url_for(PageUrls::CERTIFICATE_REVOKE, &[("certificate_id", &id)]),
            reissue_url: url_for(PageUrls::CERTIFICATE_REISSUE, &[("certificate_id", &id)]),
            code,
            id,
        }
    }
}

/// Verification outcome prepared for the result page.
#[derive(Debug, Clone)]
pub struct VerificationView {
    pub status: String,
    pub is_valid: bool,
    pub is_revoked: bool,
    pub message: String,
    pub student_name: String,
    pub course_name: String,
    pub issued_at: String,
    pub code: String,
}

impl From<Verification> for VerificationView {
    fn from(v: Verification) -> Self {
        Self {
            status: v.status.as_str().to_string(),
            is_valid: v.status == VerificationStatus::Valid,
            is_revoked: v.status == VerificationStatus::Revoked,
            message: v.message.unwrap_or_default(),
            student_name: v.student_name.unwrap_or_default(),
            course_name: v.course_name.unwrap_or_default(),
            issued_at: v
                .issued_at
                .map(|d| d.format("%B %d, %Y").to_string())
                .unwrap_or_default(),
            code: v
                .verification_code
                .map(|c| c.to_string())
                .unwrap_or_default(),
        }
    }
}

fn tri_state_options(selected: Option<bool>) -> Vec<SelectOption> {
    vec![
        SelectOption::new("", "Any", selected.is_none()),
        SelectOption::new("true", "Yes", selected == Some(true)),
        SelectOption::new("false", "No", selected == Some(false)),
    ]
}

// ============================================================================
// TEMPLATES
// ============================================================================

#[derive(Template)]
#[template(path = "certificates/verify_form.html")]
pub struct VerifyFormTemplate {
    pub ctx: PageContext,
    pub code: String,
    pub error: String,
}

#[derive(Template)]
#[template(path = "certificates/verify_result.html")]
pub struct VerifyResultTemplate {
    pub ctx: PageContext,
    pub result: VerificationView,
}

#[derive(Template)]
#[template(path = "certificates/my_certificates.html")]
pub struct MyCertificatesTemplate {
    pub ctx: PageContext,
    pub certificates: Vec<CertificateRow>,
}

#[derive(Template)]
#[template(path = "certificates/detail.html")]
pub struct CertificateDetailTemplate {
    pub ctx: PageContext,
    pub certificate: CertificateRow,
    pub completed_lessons: usize,
    pub total_lessons: usize,
    pub is_completed: bool,
}

#[derive(Template)]
#[template(path = "certificates/revoked.html")]
pub struct RevokedTemplate {
    pub ctx: PageContext,
    pub certificate: CertificateRow,
}

#[derive(Template)]
#[template(path = "certificates/admin_dashboard.html")]
pub struct AdminDashboardTemplate {
    pub ctx: PageContext,
    pub certificates: Vec<CertificateRow>,
    pub courses: Vec<SelectOption>,
    pub downloaded: Vec<SelectOption>,
    pub revoked: Vec<SelectOption>,
    pub q: String,
}

// ============================================================================
// VERIFICATION (public)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct VerifyForm {
    #[serde(default)]
    pub certificate_id: String,
}

pub async fn verify_form_page(ctx: PageContext) -> impl IntoResponse {
    VerifyFormTemplate {
        ctx,
        code: String::new(),
        error: String::new(),
    }
}

pub async fn verify_form_submit(
    State(state): State<Arc<AppState>>,
    ctx: PageContext,
    Form(form): Form<VerifyForm>,
) -> AppResult<Response> {
    let code = form.certificate_id.trim();
    if code.is_empty() {
        return Ok(VerifyFormTemplate {
            ctx,
            code: String::new(),
            error: EMPTY_CODE.to_string(),
        }
        .into_response());
    }

    let engine = CertificateEngine::new(state.conn.clone());
    let verification = engine.verify(code).await?;
    Ok(VerifyResultTemplate {
        ctx,
        result: verification.into(),
    }
    .into_response())
}

pub async fn verify_page(
    State(state): State<Arc<AppState>>,
    ctx: PageContext,
    Path(code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let engine = CertificateEngine::new(state.conn.clone());
    let verification = engine.verify(&code).await?;
    Ok(VerifyResultTemplate {
        ctx,
        result: verification.into(),
    })
}

/// PNG QR code pointing at the public verification page.
pub async fn qr_code_png(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> AppResult<Response> {
    let code: Uuid = code
        .trim()
        .parse()
        .map_err(|_| AppError::not_found(super::INVALID_CERTIFICATE))?;
    let url = state.config.certificates.verification_url(&code);
    let png = render_png(&url, QR_SIZE)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        png,
    )
        .into_response())
}

// ============================================================================
// STUDENT PAGES
// ============================================================================

pub async fn my_certificates_page(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ctx: PageContext,
) -> AppResult<impl IntoResponse> {
    let engine = CertificateEngine::new(state.conn.clone());
    let records = engine.my_certificates(user.id).await?;

    Ok(MyCertificatesTemplate {
        ctx,
        certificates: records.iter().map(CertificateRow::from).collect(),
    })
}

pub async fn certificate_detail_page(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ctx: PageContext,
    Path(certificate_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let engine = CertificateEngine::new(state.conn.clone());
    let detail: CertificateDetail = engine.certificate_detail(user.id, certificate_id).await?;

    Ok(CertificateDetailTemplate {
        ctx,
        certificate: CertificateRow::from(&detail.record),
        completed_lessons: detail.completed_lessons,
        total_lessons: detail.total_lessons,
        is_completed: detail.is_completed(),
    })
}

pub async fn certificate_for_course_page(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ctx: PageContext,
    cookies: Cookies,
    Path(course_id): Path<Uuid>,
) -> AppResult<Response> {
    if user.is_admin() {
        return Ok(Redirect::to(PageUrls::HOME).into_response());
    }

    let engine = CertificateEngine::new(state.conn.clone());
    match engine.certificate_for_course(user.id, course_id).await? {
        CourseCertificate::NotEnrolled => Err(AppError::forbidden("Not enrolled")),
        CourseCertificate::NotIssued => {
            flash::push(
                &cookies,
                flash::Level::Info,
                "Complete all lessons to earn this certificate.",
            );
            Ok(Redirect::to(PageUrls::STUDENT_DASHBOARD).into_response())
        }
        CourseCertificate::Revoked(record) => Ok(RevokedTemplate {
            ctx,
            certificate: CertificateRow::from(record.as_ref()),
        }
        .into_response()),
        CourseCertificate::Issued(record) => {
            let id = record.certificate.id.to_string();
            Ok(Redirect::to(&url_for(
                PageUrls::CERTIFICATE_DETAIL,
                &[("certificate_id", &id)],
            ))
            .into_response())
        }
    }
}

pub async fn download_certificate(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    cookies: Cookies,
    Path(certificate_id): Path<Uuid>,
) -> AppResult<Response> {
    let engine = CertificateEngine::new(state.conn.clone());

    match engine
        .download(user.id, certificate_id, &state.config.certificates)
        .await?
    {
        Download::Incomplete => {
            flash::warning(&cookies, "Complete all lessons to download your certificate.");
            Ok(Redirect::to(PageUrls::STUDENT_DASHBOARD).into_response())
        }
        Download::Revoked => {
            flash::error(&cookies, "This certificate has been revoked.");
            Ok(Redirect::to(PageUrls::MY_CERTIFICATES).into_response())
        }
        Download::Ready {
            certificate_id,
            pdf,
        } => {
            let disposition = format!("attachment; filename=\"certificate_{}.pdf\"", certificate_id);
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                pdf,
            )
                .into_response())
        }
    }
}

// ============================================================================
// ADMINISTRATION
// ============================================================================

pub async fn admin_dashboard_page(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    ctx: PageContext,
    Query(filters): Query<AdminFilters>,
) -> AppResult<impl IntoResponse> {
    let engine = CertificateEngine::new(state.conn.clone());
    let records = engine.admin_list(&filters).await?;
    let courses = engine.all_courses().await?;

    let selected_course = filters.course_id();
    let mut course_options = vec![SelectOption::new("", "All courses", selected_course.is_none())];
    course_options.extend(courses.iter().map(|c| {
        SelectOption::new(c.id.to_string(), c.title.clone(), Some(c.id) == selected_course)
    }));

    Ok(AdminDashboardTemplate {
        ctx,
        certificates: records.iter().map(CertificateRow::from).collect(),
        courses: course_options,
        downloaded: tri_state_options(filters.downloaded()),
        revoked: tri_state_options(filters.revoked()),
        q: filters.search().unwrap_or_default().to_string(),
    })
}

async fn set_revoked(
    state: &AppState,
    cookies: &Cookies,
    certificate_id: Uuid,
    revoked: bool,
) -> AppResult<Response> {
    let engine = CertificateEngine::new(state.conn.clone());
    let certificate = engine.set_revoked(certificate_id, revoked).await?;

    let verb = if revoked { "revoked" } else { "reissued" };
    flash::success(
        cookies,
        format!("Certificate {} {}.", certificate.verification_code, verb),
    );
    Ok(Redirect::to(PageUrls::CERTIFICATE_ADMIN).into_response())
}

pub async fn revoke_certificate(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    cookies: Cookies,
    Path(certificate_id): Path<Uuid>,
) -> AppResult<Response> {
    set_revoked(&state, &cookies, certificate_id, true).await
}

pub async fn reissue_certificate(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    cookies: Cookies,
    Path(certificate_id): Path<Uuid>,
) -> AppResult<Response> {
    set_revoked(&state, &cookies, certificate_id, false).await
}

pub fn configure_certificate_ui_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            PageUrls::CERTIFICATE_VERIFY_FORM,
            get(verify_form_page).post(verify_form_submit),
        )
        .route(PageUrls::CERTIFICATE_VERIFY, get(verify_page))
        .route(PageUrls::CERTIFICATE_QR, get(qr_code_png))
        .route(PageUrls::MY_CERTIFICATES, get(my_certificates_page))
        .route(PageUrls::CERTIFICATE_DETAIL, get(certificate_detail_page))
        .route(PageUrls::CERTIFICATE_FOR_COURSE, get(certificate_for_course_page))
        .route(PageUrls::CERTIFICATE_DOWNLOAD, get(download_certificate))
        .route(PageUrls::CERTIFICATE_ADMIN, get(admin_dashboard_page))
        .route(PageUrls::CERTIFICATE_REVOKE, post(revoke_certificate))
        .route(PageUrls::CERTIFICATE_REISSUE, post(reissue_certificate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_verification_view_for_invalid_code() {
        let view = VerificationView::from(Verification::invalid());
        assert_eq!(view.status, "invalid");
        assert!(!view.is_valid && !view.is_revoked);
        assert_eq!(view.message, "Invalid Certificate ID");
        assert!(view.student_name.is_empty());
    }

    #[test]
    fn test_verification_view_formats_date() {
        let verification = Verification {
            status: VerificationStatus::Revoked,
            message: None,
            student_name: Some("Ada".to_string()),
            course_name: Some("Rust Basics".to_string()),
            issued_at: Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 0).single(),
            verification_code: Some(Uuid::nil()),
        };
        let view = VerificationView::from(verification);
        assert!(view.is_revoked);
        assert_eq!(view.issued_at, "March 05, 2026");
        assert_eq!(view.code, Uuid::nil().to_string());
    }

    #[test]
    fn test_tri_state_options() {
        let options = tri_state_options(Some(false));
        let selected: Vec<_> = options.iter().filter(|o| o.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].value, "false");
        assert!(tri_state_options(None)[0].selected);
    }
}
