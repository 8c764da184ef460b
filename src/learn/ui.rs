//! Server-rendered learn pages.

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use std::sync::Arc;
use tower_cookies::Cookies;
use uuid::Uuid;

use super::progress::LessonState;
use super::types::*;
use super::{ensure_can_edit, LearnEngine, ALREADY_ENROLLED};
use crate::core::urls::{course_url, enroll_url, lesson_url, url_for, PageUrls};
use crate::shared::enums::{Category, Difficulty};
use crate::shared::error::{AppError, AppResult};
use crate::shared::models::{Certificate, Lesson};
use crate::shared::state::AppState;
use crate::web::auth::{AuthenticatedUser, TeacherUser};
use crate::web::{filters, flash, PageContext, SelectOption};

// ============================================================================
// VIEW ROWS
// ============================================================================

#[derive(Debug, Clone)]
pub struct CourseCard {
    pub url: String,
    pub title: String,
    pub description: String,
    pub category_label: String,
    pub teacher_name: String,
    pub lesson_count: i64,
    pub enrollment_count: i64,
}

impl From<CourseSummary> for CourseCard {
    fn from(s: CourseSummary) -> Self {
        Self {
            url: course_url(&s.course.id),
            title: s.course.title,
            description: s.course.description,
            category_label: s.course.category.label().to_string(),
            teacher_name: s.teacher_name,
            lesson_count: s.lesson_count,
            enrollment_count: s.enrollment_count,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LessonRow {
    pub position: usize,
    pub title: String,
    pub url: String,
    pub complete_url: String,
    pub difficulty_label: String,
    pub state: String,
    pub is_completed: bool,
    pub is_next: bool,
    pub is_locked: bool,
}

impl LessonRow {
    fn new(position: usize, lesson: &Lesson, state: LessonState) -> Self {
        Self {
            position,
            title: lesson.title.clone(),
            url: lesson_url(&lesson.course_id, &lesson.id),
            complete_url: complete_url(&lesson.id),
            difficulty_label: lesson.difficulty.label().to_string(),
            state: state.as_str().to_string(),
            is_completed: state == LessonState::Completed,
            is_next: state == LessonState::Next,
            is_locked: state == LessonState::Locked,
        }
    }
}

/// Certificate links shown next to a course.
#[derive(Debug, Clone, Default)]
pub struct CertificateLinks {
    pub present: bool,
    pub revoked: bool,
    pub detail_url: String,
    pub download_url: String,
}

impl CertificateLinks {
    fn from_certificate(certificate: Option<&Certificate>) -> Self {
        match certificate {
            Some(c) => {
                let id = c.id.to_string();
                Self {
                    present: true,
                    revoked: c.revoked,
                    detail_url: url_for(PageUrls::CERTIFICATE_DETAIL, &[("certificate_id", &id)]),
                    download_url: url_for(
                        PageUrls::CERTIFICATE_DOWNLOAD,
                        &[("certificate_id", &id)],
                    ),
                }
            }
            None => Self::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressRow {
    pub course_title: String,
    pub course_url: String,
    pub category_label: String,
    pub percent: u8,
    pub completed: usize,
    pub total: usize,
    pub has_next: bool,
    pub next_title: String,
    pub next_url: String,
    pub lessons: Vec<LessonRow>,
    pub certificate: CertificateLinks,
}

impl From<&CourseProgress> for ProgressRow {
    fn from(p: &CourseProgress) -> Self {
        Self {
            course_title: p.course.title.clone(),
            course_url: course_url(&p.course.id),
            category_label: p.course.category.label().to_string(),
            percent: p.percent,
            completed: p.completed,
            total: p.total,
            has_next: p.next_lesson.is_some(),
            next_title: p
                .next_lesson
                .as_ref()
                .map(|l| l.title.clone())
                .unwrap_or_default(),
            next_url: p
                .next_lesson
                .as_ref()
                .map(|l| lesson_url(&l.course_id, &l.id))
                .unwrap_or_default(),
            lessons: p
                .lessons
                .iter()
                .enumerate()
                .map(|(i, e)| LessonRow::new(i + 1, &e.lesson, e.state))
                .collect(),
            certificate: CertificateLinks::from_certificate(p.certificate.as_ref()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TeacherLessonRow {
    pub title: String,
    pub lesson_order: i32,
    pub difficulty_label: String,
    pub is_active: bool,
    pub toggle_url: String,
    pub toggle_label: String,
}

#[derive(Debug, Clone)]
pub struct TeacherCourseRow {
    pub title: String,
    pub url: String,
    pub category_label: String,
    pub active_lessons: usize,
    pub enrollment_count: i64,
    pub new_lesson_url: String,
    pub lessons: Vec<TeacherLessonRow>,
}

impl From<TeacherCourse> for TeacherCourseRow {
    fn from(t: TeacherCourse) -> Self {
        Self {
            active_lessons: t.active_lessons(),
            title: t.course.title.clone(),
            url: course_url(&t.course.id),
            category_label: t.course.category.label().to_string(),
            enrollment_count: t.enrollment_count,
            new_lesson_url: url_for(
                PageUrls::TEACHER_NEW_LESSON,
                &[("course_id", &t.course.id.to_string())],
            ),
            lessons: t
                .lessons
                .iter()
                .map(|l| TeacherLessonRow {
                    title: l.title.clone(),
                    lesson_order: l.lesson_order,
                    difficulty_label: l.difficulty.label().to_string(),
                    is_active: l.is_active,
                    toggle_url: url_for(
                        PageUrls::TEACHER_TOGGLE_LESSON,
                        &[("lesson_id", &l.id.to_string())],
                    ),
                    toggle_label: if l.is_active { "Hide" } else { "Restore" }.to_string(),
                })
                .collect(),
        }
    }
}

fn complete_url(lesson_id: &Uuid) -> String {
    url_for(PageUrls::LESSON_COMPLETE, &[("lesson_id", &lesson_id.to_string())])
}

pub fn category_options(selected: Option<Category>) -> Vec<SelectOption> {
    Category::ALL
        .iter()
        .map(|c| SelectOption::new(c.as_str(), c.label(), Some(*c) == selected))
        .collect()
}

fn difficulty_options(selected: Option<Difficulty>) -> Vec<SelectOption> {
    Difficulty::ALL
        .iter()
        .map(|d| SelectOption::new(d.as_str(), d.label(), Some(*d) == selected))
        .collect()
}

// ============================================================================
// TEMPLATES
// ============================================================================

#[derive(Template)]
#[template(path = "courses/list.html")]
pub struct CourseListTemplate {
    pub ctx: PageContext,
    pub courses: Vec<CourseCard>,
    pub categories: Vec<SelectOption>,
    pub q: String,
}

#[derive(Template)]
#[template(path = "courses/detail.html")]
pub struct CourseDetailTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub description: String,
    pub progress: ProgressRow,
}

#[derive(Template)]
#[template(path = "courses/enroll.html")]
pub struct EnrollTemplate {
    pub ctx: PageContext,
    pub course_title: String,
    pub action: String,
    pub full_name: String,
    pub phone_number: String,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "courses/lesson.html")]
pub struct LessonTemplate {
    pub ctx: PageContext,
    pub course_title: String,
    pub course_url: String,
    pub title: String,
    pub content: String,
    pub video_url: String,
    pub difficulty_label: String,
    pub is_completed: bool,
    pub complete_url: String,
}

#[derive(Template)]
#[template(path = "courses/not_enrolled.html")]
pub struct NotEnrolledTemplate {
    pub ctx: PageContext,
    pub course_title: String,
    pub enroll_url: String,
}

#[derive(Template)]
#[template(path = "courses/student_dashboard.html")]
pub struct StudentDashboardTemplate {
    pub ctx: PageContext,
    pub rows: Vec<ProgressRow>,
}

#[derive(Template)]
#[template(path = "teacher/dashboard.html")]
pub struct TeacherDashboardTemplate {
    pub ctx: PageContext,
    pub courses: Vec<TeacherCourseRow>,
}

#[derive(Template)]
#[template(path = "teacher/course_form.html")]
pub struct CourseFormTemplate {
    pub ctx: PageContext,
    pub errors: Vec<String>,
    pub title: String,
    pub description: String,
    pub categories: Vec<SelectOption>,
}

#[derive(Template)]
#[template(path = "teacher/lesson_form.html")]
pub struct LessonFormTemplate {
    pub ctx: PageContext,
    pub course_title: String,
    pub action: String,
    pub errors: Vec<String>,
    pub title: String,
    pub content: String,
    pub video_url: String,
    pub lesson_order: String,
    pub categories: Vec<SelectOption>,
    pub difficulties: Vec<SelectOption>,
}

// ============================================================================
// PAGE HANDLERS
// ============================================================================

pub async fn course_list_page(
    State(state): State<Arc<AppState>>,
    ctx: PageContext,
    Query(filters): Query<CourseFilters>,
) -> AppResult<impl IntoResponse> {
    let engine = LearnEngine::new(state.conn.clone());
    let courses = engine.list_courses(&filters).await?;

    Ok(CourseListTemplate {
        ctx,
        courses: courses.into_iter().map(CourseCard::from).collect(),
        categories: category_options(filters.category()),
        q: filters.search().unwrap_or_default().to_string(),
    })
}

pub async fn course_detail_page(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ctx: PageContext,
    cookies: Cookies,
    Path(course_id): Path<Uuid>,
) -> AppResult<Response> {
    let engine = LearnEngine::new(state.conn.clone());

    let Some(progress) = engine.course_detail(user.id, course_id).await? else {
        flash::push(
            &cookies,
            flash::Level::Info,
            "Please enroll in this course to access its lessons.",
        );
        return Ok(Redirect::to(&enroll_url(&course_id)).into_response());
    };

    Ok(CourseDetailTemplate {
        ctx,
        title: progress.course.title.clone(),
        description: progress.course.description.clone(),
        progress: ProgressRow::from(&progress),
    }
    .into_response())
}

pub async fn enroll_page(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ctx: PageContext,
    cookies: Cookies,
    Path(course_id): Path<Uuid>,
) -> AppResult<Response> {
    let engine = LearnEngine::new(state.conn.clone());
    let course = engine.get_course(course_id).await?;

    if engine.find_enrollment(user.id, course_id).await?.is_some() {
        flash::push(&cookies, flash::Level::Info, ALREADY_ENROLLED);
        return Ok(Redirect::to(&course_url(&course_id)).into_response());
    }

    Ok(EnrollTemplate {
        ctx,
        course_title: course.title,
        action: enroll_url(&course_id),
        full_name: user.name,
        phone_number: String::new(),
        errors: Vec::new(),
    }
    .into_response())
}

pub async fn enroll_submit(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ctx: PageContext,
    cookies: Cookies,
    Path(course_id): Path<Uuid>,
    Form(form): Form<EnrollRequest>,
) -> AppResult<Response> {
    let engine = LearnEngine::new(state.conn.clone());

    match engine.enroll(user.id, &user.name, course_id, &form).await {
        Ok(_) => {
            let course = engine.get_course(course_id).await?;
            flash::success(
                &cookies,
                format!("You have successfully enrolled in {}.", course.title),
            );
            Ok(Redirect::to(&course_url(&course_id)).into_response())
        }
        Err(AppError::Conflict(msg)) => {
            flash::push(&cookies, flash::Level::Info, msg);
            Ok(Redirect::to(&course_url(&course_id)).into_response())
        }
        Err(AppError::Validation(_)) => {
            let course = engine.get_course(course_id).await?;
            Ok(EnrollTemplate {
                ctx,
                course_title: course.title,
                action: enroll_url(&course_id),
                errors: form.validate(&user.name),
                full_name: form.full_name,
                phone_number: form.phone_number,
            }
            .into_response())
        }
        Err(e) => Err(e),
    }
}

pub async fn lesson_detail_page(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ctx: PageContext,
    cookies: Cookies,
    Path((course_id, lesson_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Response> {
    let engine = LearnEngine::new(state.conn.clone());

    match engine.lesson_detail(user.id, course_id, lesson_id).await? {
        LessonAccess::Open(page) => {
            let page = *page;
            Ok(LessonTemplate {
                ctx,
                course_title: page.course.title,
                course_url: course_url(&course_id),
                complete_url: complete_url(&page.lesson.id),
                title: page.lesson.title,
                content: page.lesson.content.unwrap_or_default(),
                video_url: page.lesson.video_url.unwrap_or_default(),
                difficulty_label: page.lesson.difficulty.label().to_string(),
                is_completed: page.progress.completed,
            }
            .into_response())
        }
        LessonAccess::Locked(_) => {
            flash::warning(&cookies, "Complete the previous lessons to unlock this one.");
            Ok(Redirect::to(&course_url(&course_id)).into_response())
        }
        LessonAccess::NotEnrolled(course) => Ok(NotEnrolledTemplate {
            ctx,
            course_title: course.title,
            enroll_url: enroll_url(&course_id),
        }
        .into_response()),
    }
}

pub async fn complete_lesson_submit(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    cookies: Cookies,
    Path(lesson_id): Path<Uuid>,
) -> AppResult<Response> {
    let engine = LearnEngine::new(state.conn.clone());
    let outcome = engine.complete_lesson(user.id, lesson_id).await?;

    if outcome.certificate_issued {
        flash::success(
            &cookies,
            "Congratulations! You completed the course and earned a certificate.",
        );
    } else if outcome.newly_completed {
        flash::success(&cookies, "Lesson marked as completed.");
    }

    Ok(Redirect::to(&course_url(&outcome.course_id)).into_response())
}

pub async fn student_dashboard_page(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ctx: PageContext,
) -> AppResult<impl IntoResponse> {
    let engine = LearnEngine::new(state.conn.clone());
    let progress = engine.student_dashboard(user.id).await?;

    Ok(StudentDashboardTemplate {
        ctx,
        rows: progress.iter().map(ProgressRow::from).collect(),
    })
}

// ----- Teaching Tools -----

pub async fn teacher_dashboard_page(
    State(state): State<Arc<AppState>>,
    TeacherUser(user): TeacherUser,
    ctx: PageContext,
) -> AppResult<impl IntoResponse> {
    let engine = LearnEngine::new(state.conn.clone());
    let courses = engine.teacher_dashboard(&user).await?;

    Ok(TeacherDashboardTemplate {
        ctx,
        courses: courses.into_iter().map(TeacherCourseRow::from).collect(),
    })
}

pub async fn new_course_page(TeacherUser(_): TeacherUser, ctx: PageContext) -> impl IntoResponse {
    CourseFormTemplate {
        ctx,
        errors: Vec::new(),
        title: String::new(),
        description: String::new(),
        categories: category_options(None),
    }
}

pub async fn new_course_submit(
    State(state): State<Arc<AppState>>,
    TeacherUser(user): TeacherUser,
    ctx: PageContext,
    cookies: Cookies,
    Form(form): Form<CreateCourseRequest>,
) -> AppResult<Response> {
    let engine = LearnEngine::new(state.conn.clone());

    match engine.create_course(&user, &form).await {
        Ok(course) => {
            flash::success(&cookies, format!("Course \"{}\" created.", course.title));
            Ok(Redirect::to(PageUrls::TEACHER_DASHBOARD).into_response())
        }
        Err(AppError::Validation(_)) => Ok(CourseFormTemplate {
            ctx,
            errors: form.validate(),
            categories: category_options(form.category()),
            title: form.title,
            description: form.description,
        }
        .into_response()),
        Err(e) => Err(e),
    }
}

pub async fn new_lesson_page(
    State(state): State<Arc<AppState>>,
    TeacherUser(user): TeacherUser,
    ctx: PageContext,
    Path(course_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let engine = LearnEngine::new(state.conn.clone());
    let course = engine.get_course(course_id).await?;
    ensure_can_edit(&user, &course)?;

    Ok(LessonFormTemplate {
        ctx,
        action: url_for(PageUrls::TEACHER_NEW_LESSON, &[("course_id", &course_id.to_string())]),
        categories: category_options(Some(course.category)),
        course_title: course.title,
        errors: Vec::new(),
        title: String::new(),
        content: String::new(),
        video_url: String::new(),
        lesson_order: String::new(),
        difficulties: difficulty_options(None),
    })
}

pub async fn new_lesson_submit(
    State(state): State<Arc<AppState>>,
    TeacherUser(user): TeacherUser,
    ctx: PageContext,
    cookies: Cookies,
    Path(course_id): Path<Uuid>,
    Form(form): Form<CreateLessonRequest>,
) -> AppResult<Response> {
    let engine = LearnEngine::new(state.conn.clone());

    match engine.add_lesson(&user, course_id, &form).await {
        Ok(lesson) => {
            flash::success(&cookies, format!("Lesson \"{}\" added.", lesson.title));
            Ok(Redirect::to(PageUrls::TEACHER_DASHBOARD).into_response())
        }
        Err(AppError::Validation(_)) => {
            let course = engine.get_course(course_id).await?;
            Ok(LessonFormTemplate {
                ctx,
                action: url_for(
                    PageUrls::TEACHER_NEW_LESSON,
                    &[("course_id", &course_id.to_string())],
                ),
                course_title: course.title,
                errors: form.validate(),
                categories: category_options(form.category()),
                difficulties: difficulty_options(form.difficulty()),
                title: form.title,
                content: form.content,
                video_url: form.video_url,
                lesson_order: form.lesson_order,
            }
            .into_response())
        }
        Err(e) => Err(e),
    }
}

pub async fn toggle_lesson_submit(
    State(state): State<Arc<AppState>>,
    TeacherUser(user): TeacherUser,
    cookies: Cookies,
    Path(lesson_id): Path<Uuid>,
) -> AppResult<Response> {
    let engine = LearnEngine::new(state.conn.clone());
    let lesson = engine.toggle_lesson_active(&user, lesson_id).await?;

    let verb = if lesson.is_active { "restored" } else { "hidden" };
    flash::success(&cookies, format!("Lesson \"{}\" {}.", lesson.title, verb));
    Ok(Redirect::to(PageUrls::TEACHER_DASHBOARD).into_response())
}

pub fn configure_learn_ui_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(PageUrls::HOME, get(course_list_page))
        .route(PageUrls::COURSE_DETAIL, get(course_detail_page))
        .route(PageUrls::COURSE_ENROLL, get(enroll_page).post(enroll_submit))
        .route(PageUrls::LESSON_DETAIL, get(lesson_detail_page))
        .route(PageUrls::LESSON_COMPLETE, post(complete_lesson_submit))
        .route(PageUrls::STUDENT_DASHBOARD, get(student_dashboard_page))
        .route(PageUrls::TEACHER_DASHBOARD, get(teacher_dashboard_page))
        .route(
            PageUrls::TEACHER_NEW_COURSE,
            get(new_course_page).post(new_course_submit),
        )
        .route(
            PageUrls::TEACHER_NEW_LESSON,
            get(new_lesson_page).post(new_lesson_submit),
        )
        .route(PageUrls::TEACHER_TOGGLE_LESSON, post(toggle_lesson_submit))
}
