use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::shared::enums::Role;
use crate::shared::models::{Course, Enrollment, User};

pub const TOP_LIMIT: usize = 10;
pub const RECENT_LIMIT: i64 = 5;

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlatformTotals {
    pub users: i64,
    pub students: i64,
    pub teachers: i64,
    pub courses: i64,
    pub enrollments: i64,
    pub certificates: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseStat {
    pub course: Course,
    pub teacher_name: String,
    pub students: i64,
    pub lessons: i64,
    pub completed_progress: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentStat {
    pub user: User,
    pub enrollments: i64,
    pub certificates: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeacherStat {
    pub user: User,
    pub courses: i64,
    pub students: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentListing {
    pub enrollment: Enrollment,
    pub course_title: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentCertificate {
    pub verification_code: Uuid,
    pub issued_at: DateTime<Utc>,
    pub revoked: bool,
    pub course_title: String,
    pub student_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub totals: PlatformTotals,
    pub top_courses: Vec<CourseStat>,
    pub top_students: Vec<StudentStat>,
    pub teachers: Vec<TeacherStat>,
    pub recent_enrollments: Vec<EnrollmentListing>,
    pub recent_certificates: Vec<RecentCertificate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilters {
    pub role: Option<String>,
}

impl UserFilters {
    /// Unknown or blank roles mean no filter.
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserListing {
    pub users: Vec<User>,
    pub total: i64,
    pub students: i64,
    pub teachers: i64,
    pub role: Option<Role>,
}

/// Looks up a per-key count, absent keys counting zero.
pub fn count_of(counts: &HashMap<Uuid, i64>, id: &Uuid) -> i64 {
    counts.get(id).copied().unwrap_or(0)
}

/// Keeps the `limit` items with the highest key. Ties keep their input order.
pub fn top_by<T>(mut items: Vec<T>, limit: usize, key: impl Fn(&T) -> i64) -> Vec<T> {
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
    items.truncate(limit);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_by_keeps_highest_stable() {
        let items = vec![("a", 1), ("b", 5), ("c", 5), ("d", 0), ("e", 3)];
        let top = top_by(items, 3, |(_, n)| *n);
        assert_eq!(top, vec![("b", 5), ("c", 5), ("e", 3)]);
    }

    #[test]
    fn test_count_of_defaults_to_zero() {
        let id = Uuid::new_v4();
        let mut counts = HashMap::new();
        assert_eq!(count_of(&counts, &id), 0);
        counts.insert(id, 4);
        assert_eq!(count_of(&counts, &id), 4);
    }

    #[test]
    fn test_user_filter_role() {
        let filters = UserFilters {
            role: Some("teacher".to_string()),
        };
        assert_eq!(filters.role(), Some(Role::Teacher));
        assert_eq!(UserFilters { role: Some(String::new()) }.role(), None);
        assert_eq!(UserFilters::default().role(), None);
    }
}
