//! # Dashboards Module
//!
//! Administrator views over the whole platform: headline statistics and the
//! user, course and enrollment lists. Queries run on the blocking pool.

pub mod types;
pub mod ui;

use axum::Router;
use diesel::dsl::count_star;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::enums::Role;
use crate::shared::error::{AppError, AppResult};
use crate::shared::models::{Certificate, Course, Enrollment, User};
use crate::shared::schema::{certificates, courses, enrollments, lessons, progress, users};
use crate::shared::state::AppState;
use crate::shared::utils::DbPool;

pub use types::*;

pub struct DashboardEngine {
    db: DbPool,
}

impl DashboardEngine {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    async fn with_conn<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> AppResult<T> + Send + 'static,
    {
        let pool = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Dashboard task failed: {}", e)))?
    }

    pub async fn stats(&self) -> AppResult<AdminStats> {
        self.with_conn(|conn| {
            let totals = platform_totals(conn)?;

            let enrollment_counts = enrollments_per_course(conn)?;
            let lesson_counts = lessons_per_course(conn)?;
            let completed_counts: HashMap<Uuid, i64> = progress::table
                .inner_join(enrollments::table)
                .filter(progress::completed.eq(true))
                .group_by(enrollments::course_id)
                .select((enrollments::course_id, count_star()))
                .load::<(Uuid, i64)>(conn)?
                .into_iter()
                .collect();

            let top_courses = top_by(
                courses_with_teachers(conn)?
                    .into_iter()
                    .map(|(course, teacher_name)| CourseStat {
                        students: count_of(&enrollment_counts, &course.id),
                        lessons: count_of(&lesson_counts, &course.id),
                        completed_progress: count_of(&completed_counts, &course.id),
                        teacher_name,
                        course,
                    })
                    .collect(),
                TOP_LIMIT,
                |c| c.students,
            );

            let per_student: HashMap<Uuid, i64> = enrollments::table
                .group_by(enrollments::user_id)
                .select((enrollments::user_id, count_star()))
                .load::<(Uuid, i64)>(conn)?
                .into_iter()
                .collect();
            let certificates_per_student: HashMap<Uuid, i64> = certificates::table
                .inner_join(enrollments::table)
                .group_by(enrollments::user_id)
                .select((enrollments::user_id, count_star()))
                .load::<(Uuid, i64)>(conn)?
                .into_iter()
                .collect();
            let top_students = top_by(
                users_with_role(conn, Role::Student)?
                    .into_iter()
                    .map(|user| StudentStat {
                        enrollments: count_of(&per_student, &user.id),
                        certificates: count_of(&certificates_per_student, &user.id),
                        user,
                    })
                    .collect(),
                TOP_LIMIT,
                |s| s.enrollments,
            );

            let courses_per_teacher: HashMap<Uuid, i64> = courses::table
                .group_by(courses::created_by)
                .select((courses::created_by, count_star()))
                .load::<(Uuid, i64)>(conn)?
                .into_iter()
                .collect();
            let students_per_teacher: HashMap<Uuid, i64> = enrollments::table
                .inner_join(courses::table)
                .group_by(courses::created_by)
                .select((courses::created_by, count_star()))
                .load::<(Uuid, i64)>(conn)?
                .into_iter()
                .collect();
            let teachers = top_by(
                users_with_role(conn, Role::Teacher)?
                    .into_iter()
                    .map(|user| TeacherStat {
                        courses: count_of(&courses_per_teacher, &user.id),
                        students: count_of(&students_per_teacher, &user.id),
                        user,
                    })
                    .collect(),
                usize::MAX,
                |t| t.courses,
            );

            let recent_enrollments = enrollment_listing(conn, Some(RECENT_LIMIT))?;

            let recent_certificates = certificates::table
                .inner_join(
                    enrollments::table
                        .inner_join(courses::table)
                        .inner_join(users::table),
                )
                .order(certificates::issued_at.desc())
                .limit(RECENT_LIMIT)
                .select((
                    certificates::all_columns,
                    enrollments::full_name,
                    courses::title,
                    users::username,
                ))
                .load::<(Certificate, String, String, String)>(conn)?
                .into_iter()
                .map(|(certificate, full_name, course_title, username)| RecentCertificate {
                    verification_code: certificate.verification_code,
                    issued_at: certificate.issued_at,
                    revoked: certificate.revoked,
                    course_title,
                    student_name: if full_name.trim().is_empty() {
                        username
                    } else {
                        full_name
                    },
                })
                .collect();

            Ok(AdminStats {
                totals,
                top_courses,
                top_students,
                teachers,
                recent_enrollments,
                recent_certificates,
            })
        })
        .await
    }

    /// Users newest first, optionally restricted to one role.
    pub async fn users(&self, role: Option<Role>) -> AppResult<UserListing> {
        self.with_conn(move |conn| {
            let mut query = users::table
                .order(users::date_joined.desc())
                .into_boxed();
            if let Some(role) = role {
                query = query.filter(users::role.eq(role));
            }
            let listed: Vec<User> = query.load(conn)?;
            let totals = platform_totals(conn)?;

            Ok(UserListing {
                users: listed,
                total: totals.users,
                students: totals.students,
                teachers: totals.teachers,
                role,
            })
        })
        .await
    }

    /// Courses newest first with student and lesson counts.
    pub async fn courses(&self) -> AppResult<Vec<CourseStat>> {
        self.with_conn(|conn| {
            let enrollment_counts = enrollments_per_course(conn)?;
            let lesson_counts = lessons_per_course(conn)?;

            Ok(courses_with_teachers(conn)?
                .into_iter()
                .map(|(course, teacher_name)| CourseStat {
                    students: count_of(&enrollment_counts, &course.id),
                    lessons: count_of(&lesson_counts, &course.id),
                    completed_progress: 0,
                    teacher_name,
                    course,
                })
                .collect())
        })
        .await
    }

    pub async fn enrollments(&self) -> AppResult<Vec<EnrollmentListing>> {
        self.with_conn(|conn| Ok(enrollment_listing(conn, None)?))
            .await
    }
}

fn platform_totals(conn: &mut PgConnection) -> QueryResult<PlatformTotals> {
    Ok(PlatformTotals {
        users: users::table.count().get_result(conn)?,
        students: users::table
            .filter(users::role.eq(Role::Student))
            .count()
            .get_result(conn)?,
        teachers: users::table
            .filter(users::role.eq(Role::Teacher))
            .count()
            .get_result(conn)?,
        courses: courses::table.count().get_result(conn)?,
        enrollments: enrollments::table.count().get_result(conn)?,
        certificates: certificates::table.count().get_result(conn)?,
    })
}

fn enrollments_per_course(conn: &mut PgConnection) -> QueryResult<HashMap<Uuid, i64>> {
    Ok(enrollments::table
        .group_by(enrollments::course_id)
        .select((enrollments::course_id, count_star()))
        .load::<(Uuid, i64)>(conn)?
        .into_iter()
        .collect())
}

fn lessons_per_course(conn: &mut PgConnection) -> QueryResult<HashMap<Uuid, i64>> {
    Ok(lessons::table
        .group_by(lessons::course_id)
        .select((lessons::course_id, count_star()))
        .load::<(Uuid, i64)>(conn)?
        .into_iter()
        .collect())
}

/// Every course newest first, paired with its author's name.
fn courses_with_teachers(conn: &mut PgConnection) -> QueryResult<Vec<(Course, String)>> {
    Ok(courses::table
        .inner_join(users::table)
        .order(courses::created_at.desc())
        .select((courses::all_columns, users::username, users::display_name))
        .load::<(Course, String, Option<String>)>(conn)?
        .into_iter()
        .map(|(course, username, display_name)| {
            let name = display_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(username);
            (course, name)
        })
        .collect())
}

fn users_with_role(conn: &mut PgConnection, role: Role) -> QueryResult<Vec<User>> {
    users::table
        .filter(users::role.eq(role))
        .order(users::date_joined.desc())
        .load(conn)
}

fn enrollment_listing(
    conn: &mut PgConnection,
    limit: Option<i64>,
) -> QueryResult<Vec<EnrollmentListing>> {
    let mut query = enrollments::table
        .inner_join(courses::table)
        .inner_join(users::table)
        .order(enrollments::enrolled_at.desc())
        .select((enrollments::all_columns, courses::title, users::username))
        .into_boxed();
    if let Some(limit) = limit {
        query = query.limit(limit);
    }

    Ok(query
        .load::<(Enrollment, String, String)>(conn)?
        .into_iter()
        .map(|(enrollment, course_title, username)| EnrollmentListing {
            enrollment,
            course_title,
            username,
        })
        .collect())
}

pub fn configure_dashboards_routes() -> Router<Arc<AppState>> {
    ui::configure_dashboards_ui_routes()
}
