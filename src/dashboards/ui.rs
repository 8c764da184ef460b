//! Administrator dashboard pages.

use askama::Template;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;

use super::types::*;
use super::DashboardEngine;
use crate::core::urls::{course_url, PageUrls};
use crate::shared::enums::Role;
use crate::shared::error::AppResult;
use crate::shared::models::User;
use crate::shared::state::AppState;
use crate::web::auth::AdminUser;
use crate::web::{filters, PageContext};

// ============================================================================
// VIEW ROWS
// ============================================================================

#[derive(Debug, Clone)]
pub struct CourseStatRow {
    pub title: String,
    pub url: String,
    pub category_label: String,
    pub teacher_name: String,
    pub students: i64,
    pub lessons: i64,
    pub completed_progress: i64,
    pub created_at: String,
}

impl From<CourseStat> for CourseStatRow {
    fn from(s: CourseStat) -> Self {
        Self {
            url: course_url(&s.course.id),
            category_label: s.course.category.label().to_string(),
            created_at: s.course.created_at.to_rfc3339(),
            title: s.course.title,
            teacher_name: s.teacher_name,
            students: s.students,
            lessons: s.lessons,
            completed_progress: s.completed_progress,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserRow {
    pub username: String,
    pub name: String,
    pub email: String,
    pub role_label: String,
    pub is_active: bool,
    pub date_joined: String,
    pub enrollments: i64,
    pub certificates: i64,
    pub courses: i64,
    pub students: i64,
}

impl UserRow {
    fn new(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            name: user.full_name().to_string(),
            email: user.email.clone().unwrap_or_default(),
            role_label: user.role.label().to_string(),
            is_active: user.is_active,
            date_joined: user.date_joined.to_rfc3339(),
            enrollments: 0,
            certificates: 0,
            courses: 0,
            students: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrollmentRow {
    pub username: String,
    pub full_name: String,
    pub phone_number: String,
    pub course_title: String,
    pub course_url: String,
    pub enrolled_at: String,
}

impl From<EnrollmentListing> for EnrollmentRow {
    fn from(e: EnrollmentListing) -> Self {
        Self {
            course_url: course_url(&e.enrollment.course_id),
            enrolled_at: e.enrollment.enrolled_at.to_rfc3339(),
            full_name: e.enrollment.full_name,
            phone_number: e.enrollment.phone_number,
            course_title: e.course_title,
            username: e.username,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CertificateRow {
    pub student_name: String,
    pub course_title: String,
    pub code: String,
    pub issued_at: String,
    pub revoked: bool,
}

#[derive(Debug, Clone)]
pub struct RoleTab {
    pub label: String,
    pub url: String,
    pub active: bool,
}

fn role_tabs(current: Option<Role>) -> Vec<RoleTab> {
    let mut tabs = vec![RoleTab {
        label: "All".to_string(),
        url: PageUrls::ADMIN_USERS.to_string(),
        active: current.is_none(),
    }];
    tabs.extend(Role::ALL.iter().map(|role| RoleTab {
        label: role.label().to_string(),
        url: format!("{}?role={}", PageUrls::ADMIN_USERS, role.as_str()),
        active: current == Some(*role),
    }));
    tabs
}

// ============================================================================
// TEMPLATES
// ============================================================================

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
pub struct AdminDashboardTemplate {
    pub ctx: PageContext,
    pub totals: PlatformTotals,
    pub courses: Vec<CourseStatRow>,
    pub students: Vec<UserRow>,
    pub teachers: Vec<UserRow>,
    pub recent_enrollments: Vec<EnrollmentRow>,
    pub recent_certificates: Vec<CertificateRow>,
}

#[derive(Template)]
#[template(path = "admin/users.html")]
pub struct AdminUsersTemplate {
    pub ctx: PageContext,
    pub users: Vec<UserRow>,
    pub tabs: Vec<RoleTab>,
    pub total: i64,
    pub students: i64,
    pub teachers: i64,
}

#[derive(Template)]
#[template(path = "admin/courses.html")]
pub struct AdminCoursesTemplate {
    pub ctx: PageContext,
    pub courses: Vec<CourseStatRow>,
}

#[derive(Template)]
#[template(path = "admin/enrollments.html")]
pub struct AdminEnrollmentsTemplate {
    pub ctx: PageContext,
    pub enrollments: Vec<EnrollmentRow>,
}

// ============================================================================
// PAGE HANDLERS
// ============================================================================

pub async fn admin_dashboard_page(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    ctx: PageContext,
) -> AppResult<impl IntoResponse> {
    let engine = DashboardEngine::new(state.conn.clone());
    let stats = engine.stats().await?;

    Ok(AdminDashboardTemplate {
        ctx,
        totals: stats.totals,
        courses: stats.top_courses.into_iter().map(CourseStatRow::from).collect(),
        students: stats
            .top_students
            .iter()
            .map(|s| UserRow {
                enrollments: s.enrollments,
                certificates: s.certificates,
                ..UserRow::new(&s.user)
            })
            .collect(),
        teachers: stats
            .teachers
            .iter()
            .map(|t| UserRow {
                courses: t.courses,
                students: t.students,
                ..UserRow::new(&t.user)
            })
            .collect(),
        recent_enrollments: stats
            .recent_enrollments
            .into_iter()
            .map(EnrollmentRow::from)
            .collect(),
        recent_certificates: stats
            .recent_certificates
            .into_iter()
            .map(|c| CertificateRow {
                code: c.verification_code.to_string(),
                issued_at: c.issued_at.to_rfc3339(),
                revoked: c.revoked,
                student_name: c.student_name,
                course_title: c.course_title,
            })
            .collect(),
    })
}

pub async fn admin_users_page(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    ctx: PageContext,
    Query(filters): Query<UserFilters>,
) -> AppResult<impl IntoResponse> {
    let engine = DashboardEngine::new(state.conn.clone());
    let listing = engine.users(filters.role()).await?;

    Ok(AdminUsersTemplate {
        ctx,
        users: listing.users.iter().map(UserRow::new).collect(),
        tabs: role_tabs(listing.role),
        total: listing.total,
        students: listing.students,
        teachers: listing.teachers,
    })
}

pub async fn admin_courses_page(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    ctx: PageContext,
) -> AppResult<impl IntoResponse> {
    let engine = DashboardEngine::new(state.conn.clone());
    let courses = engine.courses().await?;

    Ok(AdminCoursesTemplate {
        ctx,
        courses: courses.into_iter().map(CourseStatRow::from).collect(),
    })
}

pub async fn admin_enrollments_page(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    ctx: PageContext,
) -> AppResult<impl IntoResponse> {
    let engine = DashboardEngine::new(state.conn.clone());
    let enrollments = engine.enrollments().await?;

    Ok(AdminEnrollmentsTemplate {
        ctx,
        enrollments: enrollments.into_iter().map(EnrollmentRow::from).collect(),
    })
}

pub fn configure_dashboards_ui_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(PageUrls::ADMIN_DASHBOARD, get(admin_dashboard_page))
        .route(PageUrls::ADMIN_USERS, get(admin_users_page))
        .route(PageUrls::ADMIN_COURSES, get(admin_courses_page))
        .route(PageUrls::ADMIN_ENROLLMENTS, get(admin_enrollments_page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_tabs_mark_current() {
        let tabs = role_tabs(Some(Role::Teacher));
        assert_eq!(tabs.len(), Role::ALL.len() + 1);
        let active: Vec<_> = tabs.iter().filter(|t| t.active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].url, "/admin/users?role=teacher");
        assert!(role_tabs(None)[0].active);
    }
}
