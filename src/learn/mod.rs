//! # Learn Module
//!
//! Courses, lessons, enrollment and sequential progress:
//! - public course catalogue with category and text filters
//! - enrollment (one per user and course)
//! - lessons unlock one at a time in course order
//! - completing the last active lesson issues the course certificate
//! - teacher tools for authoring courses and lessons
//!
//! HTML pages live in [`ui`]; this file holds the engine and the JSON API.

pub mod progress;
pub mod types;
pub mod ui;

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::Utc;
use diesel::dsl::count_star;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::certificates::issue_certificate;
use crate::core::urls::ApiUrls;
use crate::shared::error::{AppError, AppResult};
use crate::shared::models::{Certificate, Course, Enrollment, Lesson, Progress};
use crate::shared::schema::progress as lesson_progress;
use crate::shared::schema::{certificates, courses, enrollments, lessons, users};
use crate::shared::state::AppState;
use crate::shared::utils::{like_pattern, DbPool};
use crate::web::auth::AuthenticatedUser;
use crate::web::error::status_for;

use self::progress::{
    completed_count, completion_percent, is_course_complete, lesson_state, next_lesson,
    ordered_active, LessonState,
};
use self::types::*;

pub const ALREADY_ENROLLED: &str = "You are already enrolled in this course.";
pub const LESSON_LOCKED: &str = "You cannot complete this lesson yet.";

// ============================================================================
// LEARN ENGINE
// ============================================================================

/// Main Learn engine that handles course, enrollment and progress operations
pub struct LearnEngine {
    db: DbPool,
}

impl LearnEngine {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    // ----- Course Operations -----

    pub async fn list_courses(&self, filters: &CourseFilters) -> AppResult<Vec<CourseSummary>> {
        let mut conn = self.db.get()?;

        let mut query = courses::table
            .inner_join(users::table)
            .select((courses::all_columns, users::username, users::display_name))
            .order((courses::category.asc(), courses::title.asc()))
            .into_boxed();

        if let Some(category) = filters.category() {
            query = query.filter(courses::category.eq(category));
        }
        if let Some(term) = filters.search() {
            let pattern = like_pattern(term);
            query = query.filter(
                courses::title
                    .ilike(pattern.clone())
                    .or(courses::description.ilike(pattern)),
            );
        }

        let rows: Vec<(Course, String, Option<String>)> = query.load(&mut conn)?;

        let lesson_counts = active_lesson_counts(&mut conn)?;
        let enrollment_counts: HashMap<Uuid, i64> = enrollments::table
            .group_by(enrollments::course_id)
            .select((enrollments::course_id, count_star()))
            .load::<(Uuid, i64)>(&mut conn)?
            .into_iter()
            .collect();

        Ok(rows
            .into_iter()
            .map(|(course, username, display_name)| CourseSummary {
                lesson_count: lesson_counts.get(&course.id).copied().unwrap_or(0),
                enrollment_count: enrollment_counts.get(&course.id).copied().unwrap_or(0),
                teacher_name: display_name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or(username),
                course,
            })
            .collect())
    }

    pub async fn get_course(&self, course_id: Uuid) -> AppResult<Course> {
        let mut conn = self.db.get()?;
        load_course(&mut conn, course_id)
    }

    pub async fn find_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> AppResult<Option<Enrollment>> {
        let mut conn = self.db.get()?;
        find_enrollment(&mut conn, user_id, course_id)
    }

    /// Ordered lessons with their state, or `None` when the user is not enrolled.
    pub async fn course_detail(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> AppResult<Option<CourseProgress>> {
        let mut conn = self.db.get()?;
        let course = load_course(&mut conn, course_id)?;

        let Some(enrollment) = find_enrollment(&mut conn, user_id, course_id)? else {
            return Ok(None);
        };

        let course_lessons: Vec<Lesson> = lessons::table
            .filter(lessons::course_id.eq(course_id))
            .load(&mut conn)?;
        let completed = completed_lesson_ids(&mut conn, enrollment.id)?;
        let certificate: Option<Certificate> = certificates::table
            .filter(certificates::enrollment_id.eq(enrollment.id))
            .first(&mut conn)
            .optional()?;

        Ok(Some(summarize(
            enrollment,
            course,
            course_lessons,
            &completed,
            certificate,
        )))
    }

    // ----- Enrollment -----

    pub async fn enroll(
        &self,
        user_id: Uuid,
        fallback_name: &str,
        course_id: Uuid,
        req: &EnrollRequest,
    ) -> AppResult<Enrollment> {
        let mut conn = self.db.get()?;
        load_course(&mut conn, course_id)?;

        if find_enrollment(&mut conn, user_id, course_id)?.is_some() {
            return Err(AppError::Conflict(ALREADY_ENROLLED.to_string()));
        }

        let errors = req.validate(fallback_name);
        if !errors.is_empty() {
            return Err(AppError::Validation(errors.join(" ")));
        }

        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            full_name: req.resolved_name(fallback_name),
            phone_number: req.phone_number.trim().to_string(),
            enrolled_at: Utc::now(),
        };

        diesel::insert_into(enrollments::table)
            .values(&enrollment)
            .execute(&mut conn)
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict(_) => AppError::Conflict(ALREADY_ENROLLED.to_string()),
                other => other,
            })?;

        log::info!("User {} enrolled in course {}", user_id, course_id);
        Ok(enrollment)
    }

    // ----- Lesson Progress -----

    /// Opens a lesson page, recording an unfinished progress row on first visit.
    pub async fn lesson_detail(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        lesson_id: Uuid,
    ) -> AppResult<LessonAccess> {
        let mut conn = self.db.get()?;
        let course = load_course(&mut conn, course_id)?;

        let lesson: Lesson = lessons::table
            .filter(lessons::id.eq(lesson_id))
            .filter(lessons::course_id.eq(course_id))
            .filter(lessons::is_active.eq(true))
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("Lesson not found"))?;

        let Some(enrollment) = find_enrollment(&mut conn, user_id, course_id)? else {
            return Ok(LessonAccess::NotEnrolled(course));
        };

        let ordered = ordered_active(
            lessons::table
                .filter(lessons::course_id.eq(course_id))
                .load(&mut conn)?,
        );
        let completed = completed_lesson_ids(&mut conn, enrollment.id)?;

        let state = lesson_state(&ordered, &completed, lesson_id)
            .ok_or_else(|| AppError::not_found("Lesson not found"))?;
        if !state.is_open() {
            return Ok(LessonAccess::Locked(course));
        }

        diesel::insert_into(lesson_progress::table)
            .values(&Progress {
                id: Uuid::new_v4(),
                enrollment_id: enrollment.id,
                lesson_id,
                completed: false,
                completed_at: None,
            })
            .on_conflict((lesson_progress::enrollment_id, lesson_progress::lesson_id))
            .do_nothing()
            .execute(&mut conn)?;

        let row: Progress = lesson_progress::table
            .filter(lesson_progress::enrollment_id.eq(enrollment.id))
            .filter(lesson_progress::lesson_id.eq(lesson_id))
            .first(&mut conn)?;

        Ok(LessonAccess::Open(Box::new(LessonPage {
            course,
            lesson,
            progress: row,
            state,
        })))
    }

    /// Marks the next lesson complete and issues the certificate when it was
    /// the last one, all in one transaction.
    pub async fn complete_lesson(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> AppResult<CompletionOutcome> {
        let mut conn = self.db.get()?;

        conn.transaction::<_, AppError, _>(|conn| {
            let lesson: Lesson = lessons::table
                .find(lesson_id)
                .first(conn)
                .optional()?
                .ok_or_else(|| AppError::not_found("Lesson not found"))?;

            let enrollment = find_enrollment(conn, user_id, lesson.course_id)?
                .ok_or_else(|| AppError::not_found("Enrollment not found"))?;

            let ordered = ordered_active(
                lessons::table
                    .filter(lessons::course_id.eq(lesson.course_id))
                    .load(conn)?,
            );
            let mut completed = completed_lesson_ids(conn, enrollment.id)?;

            match lesson_state(&ordered, &completed, lesson_id) {
                None => return Err(AppError::not_found("Lesson not found")),
                Some(LessonState::Locked) => return Err(AppError::forbidden(LESSON_LOCKED)),
                Some(LessonState::Completed) => {
                    let (certificate, certificate_issued) =
                        current_certificate(conn, enrollment.id, &ordered, &completed)?;
                    return Ok(CompletionOutcome {
                        course_id: lesson.course_id,
                        newly_completed: false,
                        certificate,
                        certificate_issued,
                    });
                }
                Some(LessonState::Next) => {}
            }

            let now = Utc::now();
            diesel::insert_into(lesson_progress::table)
                .values(&Progress {
                    id: Uuid::new_v4(),
                    enrollment_id: enrollment.id,
                    lesson_id,
                    completed: true,
                    completed_at: Some(now),
                })
                .on_conflict((lesson_progress::enrollment_id, lesson_progress::lesson_id))
                .do_update()
                .set((
                    lesson_progress::completed.eq(true),
                    lesson_progress::completed_at.eq(Some(now)),
                ))
                .execute(conn)?;
            completed.insert(lesson_id);

            let (certificate, certificate_issued) =
                current_certificate(conn, enrollment.id, &ordered, &completed)?;
            Ok(CompletionOutcome {
                course_id: lesson.course_id,
                newly_completed: true,
                certificate,
                certificate_issued,
            })
        })
    }

    /// Every enrollment of the user, newest first.
    pub async fn student_dashboard(&self, user_id: Uuid) -> AppResult<Vec<CourseProgress>> {
        let mut conn = self.db.get()?;

        let rows: Vec<(Enrollment, Course)> = enrollments::table
            .inner_join(courses::table)
            .filter(enrollments::user_id.eq(user_id))
            .order(enrollments::enrolled_at.desc())
            .select((enrollments::all_columns, courses::all_columns))
            .load(&mut conn)?;

        let course_ids: Vec<Uuid> = rows.iter().map(|(_, c)| c.id).collect();
        let enrollment_ids: Vec<Uuid> = rows.iter().map(|(e, _)| e.id).collect();

        let mut lessons_by_course: HashMap<Uuid, Vec<Lesson>> = HashMap::new();
        for lesson in lessons::table
            .filter(lessons::course_id.eq_any(&course_ids))
            .load::<Lesson>(&mut conn)?
        {
            lessons_by_course
                .entry(lesson.course_id)
                .or_default()
                .push(lesson);
        }

        let mut completed_by_enrollment: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
        for (enrollment_id, lesson_id) in lesson_progress::table
            .filter(lesson_progress::enrollment_id.eq_any(&enrollment_ids))
            .filter(lesson_progress::completed.eq(true))
            .select((lesson_progress::enrollment_id, lesson_progress::lesson_id))
            .load::<(Uuid, Uuid)>(&mut conn)?
        {
            completed_by_enrollment
                .entry(enrollment_id)
                .or_default()
                .insert(lesson_id);
        }

        let mut certificates_by_enrollment: HashMap<Uuid, Certificate> = certificates::table
            .filter(certificates::enrollment_id.eq_any(&enrollment_ids))
            .load::<Certificate>(&mut conn)?
            .into_iter()
            .map(|c| (c.enrollment_id, c))
            .collect();

        let empty = HashSet::new();
        Ok(rows
            .into_iter()
            .map(|(enrollment, course)| {
                let course_lessons = lessons_by_course.remove(&course.id).unwrap_or_default();
                let completed = completed_by_enrollment.get(&enrollment.id).unwrap_or(&empty);
                let certificate = certificates_by_enrollment.remove(&enrollment.id);
                summarize(enrollment, course, course_lessons, completed, certificate)
            })
            .collect())
    }

    // ----- Teaching Tools -----

    /// Courses the user authored; administrators see every course.
    pub async fn teacher_dashboard(
        &self,
        user: &AuthenticatedUser,
    ) -> AppResult<Vec<TeacherCourse>> {
        let mut conn = self.db.get()?;

        let mut query = courses::table
            .order(courses::created_at.desc())
            .into_boxed();
        if !user.is_admin() {
            query = query.filter(courses::created_by.eq(user.id));
        }
        let owned: Vec<Course> = query.load(&mut conn)?;
        let ids: Vec<Uuid> = owned.iter().map(|c| c.id).collect();

        let mut lessons_by_course: HashMap<Uuid, Vec<Lesson>> = HashMap::new();
        for lesson in lessons::table
            .filter(lessons::course_id.eq_any(&ids))
            .order((
                lessons::lesson_order.asc(),
                lessons::created_at.asc(),
                lessons::id.asc(),
            ))
            .load::<Lesson>(&mut conn)?
        {
            lessons_by_course
                .entry(lesson.course_id)
                .or_default()
                .push(lesson);
        }

        let enrollment_counts: HashMap<Uuid, i64> = enrollments::table
            .filter(enrollments::course_id.eq_any(&ids))
            .group_by(enrollments::course_id)
            .select((enrollments::course_id, count_star()))
            .load::<(Uuid, i64)>(&mut conn)?
            .into_iter()
            .collect();

        Ok(owned
            .into_iter()
            .map(|course| TeacherCourse {
                lessons: lessons_by_course.remove(&course.id).unwrap_or_default(),
                enrollment_count: enrollment_counts.get(&course.id).copied().unwrap_or(0),
                course,
            })
            .collect())
    }

    pub async fn create_course(
        &self,
        owner: &AuthenticatedUser,
        req: &CreateCourseRequest,
    ) -> AppResult<Course> {
        let errors = req.validate();
        if !errors.is_empty() {
            return Err(AppError::Validation(errors.join(" ")));
        }

        let course = Course {
            id: Uuid::new_v4(),
            title: req.title.trim().to_string(),
            description: req.description.trim().to_string(),
            category: req.category().unwrap_or_default(),
            created_by: owner.id,
            created_at: Utc::now(),
        };

        let mut conn = self.db.get()?;
        diesel::insert_into(courses::table)
            .values(&course)
            .execute(&mut conn)?;

        log::info!("{} created course '{}'", owner.username, course.title);
        Ok(course)
    }

    /// Adds a lesson, appended after the last one unless an order is given.
    pub async fn add_lesson(
        &self,
        actor: &AuthenticatedUser,
        course_id: Uuid,
        req: &CreateLessonRequest,
    ) -> AppResult<Lesson> {
        let mut conn = self.db.get()?;
        let course = load_course(&mut conn, course_id)?;
        ensure_can_edit(actor, &course)?;

        let errors = req.validate();
        if !errors.is_empty() {
            return Err(AppError::Validation(errors.join(" ")));
        }

        let lesson_order = match req.lesson_order().map_err(AppError::Validation)? {
            Some(order) => order,
            None => {
                let last: Option<i32> = lessons::table
                    .filter(lessons::course_id.eq(course_id))
                    .select(diesel::dsl::max(lessons::lesson_order))
                    .first(&mut conn)?;
                last.map_or(1, |n| n.saturating_add(1))
            }
        };

        let lesson = Lesson {
            id: Uuid::new_v4(),
            course_id,
            title: req.title.trim().to_string(),
            content: Some(req.content.trim().to_string()).filter(|c| !c.is_empty()),
            video_url: Some(req.video_url.trim().to_string()).filter(|u| !u.is_empty()),
            category: req.category().unwrap_or_default(),
            difficulty: req.difficulty().unwrap_or_default(),
            lesson_order,
            is_active: true,
            created_at: Utc::now(),
        };

        diesel::insert_into(lessons::table)
            .values(&lesson)
            .execute(&mut conn)?;

        Ok(lesson)
    }

    /// Soft-deletes an active lesson or restores an inactive one.
    pub async fn toggle_lesson_active(
        &self,
        actor: &AuthenticatedUser,
        lesson_id: Uuid,
    ) -> AppResult<Lesson> {
        let mut conn = self.db.get()?;

        let lesson: Lesson = lessons::table
            .find(lesson_id)
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("Lesson not found"))?;
        let course = load_course(&mut conn, lesson.course_id)?;
        ensure_can_edit(actor, &course)?;

        let (updated, issued) = conn.transaction::<_, AppError, _>(|conn| {
            let updated: Lesson = diesel::update(lessons::table.find(lesson_id))
                .set(lessons::is_active.eq(!lesson.is_active))
                .get_result(conn)?;
            let issued = sync_course_certificates(conn, course.id)?;
            Ok((updated, issued))
        })?;

        log::info!(
            "{} set lesson {} active={} ({} certificates issued)",
            actor.username,
            lesson_id,
            updated.is_active,
            issued
        );
        Ok(updated)
    }
}

// ----- Query Helpers -----

fn load_course(conn: &mut PgConnection, course_id: Uuid) -> AppResult<Course> {
    courses::table
        .find(course_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found("Course not found"))
}

fn find_enrollment(
    conn: &mut PgConnection,
    user_id: Uuid,
    course_id: Uuid,
) -> AppResult<Option<Enrollment>> {
    Ok(enrollments::table
        .filter(enrollments::user_id.eq(user_id))
        .filter(enrollments::course_id.eq(course_id))
        .first(conn)
        .optional()?)
}

/// Issues the certificate once every active lesson is complete, otherwise
/// returns the one already on file. The flag is true for a new certificate.
fn current_certificate(
    conn: &mut PgConnection,
    enrollment_id: Uuid,
    ordered: &[Lesson],
    completed: &HashSet<Uuid>,
) -> AppResult<(Option<Certificate>, bool)> {
    if !is_course_complete(ordered, completed) {
        let existing = certificates::table
            .filter(certificates::enrollment_id.eq(enrollment_id))
            .first(conn)
            .optional()?;
        return Ok((existing, false));
    }

    let (certificate, created) = issue_certificate(conn, enrollment_id)?;
    if created {
        log::info!(
            "Issued certificate {} for enrollment {}",
            certificate.verification_code,
            enrollment_id
        );
    }
    Ok((Some(certificate), created))
}

/// Re-checks every enrollment of a course after its lesson set changed.
/// Returns how many certificates were newly issued.
fn sync_course_certificates(conn: &mut PgConnection, course_id: Uuid) -> AppResult<usize> {
    let ordered = active_lessons(conn, course_id)?;
    if ordered.is_empty() {
        return Ok(0);
    }

    let enrollment_ids: Vec<Uuid> = enrollments::table
        .filter(enrollments::course_id.eq(course_id))
        .select(enrollments::id)
        .load(conn)?;

    let mut completed_by_enrollment: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
    for (enrollment_id, lesson_id) in lesson_progress::table
        .filter(lesson_progress::enrollment_id.eq_any(&enrollment_ids))
        .filter(lesson_progress::completed.eq(true))
        .select((lesson_progress::enrollment_id, lesson_progress::lesson_id))
        .load::<(Uuid, Uuid)>(conn)?
    {
        completed_by_enrollment
            .entry(enrollment_id)
            .or_default()
            .insert(lesson_id);
    }

    let mut issued = 0;
    for (enrollment_id, completed) in &completed_by_enrollment {
        if current_certificate(conn, *enrollment_id, &ordered, completed)?.1 {
            issued += 1;
        }
    }
    Ok(issued)
}

/// Ids of lessons the enrollment has completed.
pub(crate) fn completed_lesson_ids(
    conn: &mut PgConnection,
    enrollment_id: Uuid,
) -> QueryResult<HashSet<Uuid>> {
    Ok(lesson_progress::table
        .filter(lesson_progress::enrollment_id.eq(enrollment_id))
        .filter(lesson_progress::completed.eq(true))
        .select(lesson_progress::lesson_id)
        .load::<Uuid>(conn)?
        .into_iter()
        .collect())
}

pub(crate) fn active_lessons(conn: &mut PgConnection, course_id: Uuid) -> QueryResult<Vec<Lesson>> {
    Ok(ordered_active(
        lessons::table
            .filter(lessons::course_id.eq(course_id))
            .load(conn)?,
    ))
}

fn active_lesson_counts(conn: &mut PgConnection) -> QueryResult<HashMap<Uuid, i64>> {
    Ok(lessons::table
        .filter(lessons::is_active.eq(true))
        .group_by(lessons::course_id)
        .select((lessons::course_id, count_star()))
        .load::<(Uuid, i64)>(conn)?
        .into_iter()
        .collect())
}

pub(crate) fn ensure_can_edit(actor: &AuthenticatedUser, course: &Course) -> AppResult<()> {
    if actor.is_admin() || course.created_by == actor.id {
        Ok(())
    } else {
        Err(AppError::forbidden("You can only edit your own courses."))
    }
}

/// Builds the progress view for one enrollment from its raw rows.
pub fn summarize(
    enrollment: Enrollment,
    course: Course,
    course_lessons: Vec<Lesson>,
    completed: &HashSet<Uuid>,
    certificate: Option<Certificate>,
) -> CourseProgress {
    let ordered = ordered_active(course_lessons);
    let done = completed_count(&ordered, completed);
    let total = ordered.len();
    let next = next_lesson(&ordered, completed).cloned();

    let entries = ordered
        .iter()
        .map(|lesson| LessonEntry {
            state: lesson_state(&ordered, completed, lesson.id).unwrap_or(LessonState::Locked),
            lesson: lesson.clone(),
        })
        .collect();

    CourseProgress {
        enrollment,
        course,
        lessons: entries,
        completed: done,
        total,
        percent: completion_percent(done, total),
        next_lesson: next,
        certificate,
    }
}

// ============================================================================
// HTTP HANDLERS
// ============================================================================

/// List all courses with optional filters
pub async fn list_courses_api(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<CourseFilters>,
) -> impl IntoResponse {
    let engine = LearnEngine::new(state.conn.clone());

    match engine.list_courses(&filters).await {
        Ok(courses) => Json(serde_json::json!({
            "success": true,
            "data": courses
        }))
        .into_response(),
        Err(e) => error_json(e),
    }
}

/// Progress of the current user across their enrollments
pub async fn progress_api(
    State(state): State<Arc<AppState>>,
    user: Result<AuthenticatedUser, AppError>,
) -> impl IntoResponse {
    let user = match user {
        Ok(user) => user,
        Err(e) => return error_json(e),
    };
    let engine = LearnEngine::new(state.conn.clone());

    match engine.student_dashboard(user.id).await {
        Ok(report) => Json(serde_json::json!({
            "success": true,
            "data": report
        }))
        .into_response(),
        Err(e) => error_json(e),
    }
}

pub(crate) fn error_json(e: AppError) -> axum::response::Response {
    if e.is_server_error() {
        log::error!("API request failed: {}", e);
    }
    (
        status_for(&e),
        Json(serde_json::json!({
            "success": false,
            "error": e.public_message()
        })),
    )
        .into_response()
}

// ============================================================================
// ROUTES
// ============================================================================

/// Configure learn module routes
pub fn configure_learn_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(ApiUrls::COURSES, get(list_courses_api))
        .route(ApiUrls::PROGRESS, get(progress_api))
        .merge(ui::configure_learn_ui_routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::enums::{Category, Difficulty, Role};

    fn course() -> Course {
        Course {
            id: Uuid::new_v4(),
            title: "Rust Basics".to_string(),
            description: String::new(),
            category: Category::WebDevelopment,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    fn lesson(course: &Course, order: i32, active: bool) -> Lesson {
        Lesson {
            id: Uuid::new_v4(),
            course_id: course.id,
            title: format!("Lesson {order}"),
            content: None,
            video_url: None,
            category: Category::Other,
            difficulty: Difficulty::Beginner,
            lesson_order: order,
            is_active: active,
            created_at: Utc::now(),
        }
    }

    fn enrollment(course: &Course) -> Enrollment {
        Enrollment {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            course_id: course.id,
            full_name: "Ada".to_string(),
            phone_number: "123".to_string(),
            enrolled_at: Utc::now(),
        }
    }

    #[test]
    fn test_summarize_ignores_inactive_lessons() {
        let c = course();
        let first = lesson(&c, 1, true);
        let hidden = lesson(&c, 2, false);
        let last = lesson(&c, 3, true);
        let completed: HashSet<Uuid> = [first.id, hidden.id].into_iter().collect();

        let summary = summarize(
            enrollment(&c),
            c.clone(),
            vec![last.clone(), hidden, first.clone()],
            &completed,
            None,
        );

        assert_eq!(summary.total, 2);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.percent, 50);
        assert_eq!(summary.next_lesson.as_ref().map(|l| l.id), Some(last.id));
        let states: Vec<LessonState> = summary.lessons.iter().map(|e| e.state).collect();
        assert_eq!(states, vec![LessonState::Completed, LessonState::Next]);
        assert!(!summary.is_complete());
    }

    #[test]
    fn test_summarize_first_lesson_is_next_when_nothing_done() {
        let c = course();
        let lessons = vec![lesson(&c, 1, true), lesson(&c, 2, true)];
        let first_id = lessons[0].id;
        let summary = summarize(enrollment(&c), c, lessons, &HashSet::new(), None);
        assert_eq!(summary.percent, 0);
        assert_eq!(summary.next_lesson.map(|l| l.id), Some(first_id));
    }

    #[test]
    fn test_only_owner_or_admin_can_edit() {
        let c = course();
        let mut actor = AuthenticatedUser {
            id: Uuid::new_v4(),
            username: "teacher2".to_string(),
            name: "teacher2".to_string(),
            role: Role::Teacher,
        };
        assert!(ensure_can_edit(&actor, &c).is_err());

        actor.id = c.created_by;
        assert!(ensure_can_edit(&actor, &c).is_ok());

        actor.id = Uuid::new_v4();
        actor.role = Role::Admin;
        assert!(ensure_can_edit(&actor, &c).is_ok());
    }
}
