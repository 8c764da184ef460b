//! Row types for every table in [`crate::core::shared::schema`].

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Category, Difficulty, Role};
use super::schema::{certificates, courses, enrollments, lessons, progress, users};

pub use super::schema;

// ----- Accounts -----

#[derive(Debug, Clone, Serialize, Queryable, Identifiable, Insertable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Display name when set, otherwise the username.
    pub fn full_name(&self) -> &str {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.username)
    }
}

// ----- Courses -----

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable)]
#[diesel(table_name = courses)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable)]
#[diesel(table_name = lessons)]
pub struct Lesson {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub category: Category,
    pub difficulty: Difficulty,
    pub lesson_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// ----- Enrollment & progress -----

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable)]
#[diesel(table_name = enrollments)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub full_name: String,
    pub phone_number: String,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable)]
#[diesel(table_name = progress)]
pub struct Progress {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub lesson_id: Uuid,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

// ----- Certificates -----

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable)]
#[diesel(table_name = certificates)]
pub struct Certificate {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub verification_code: Uuid,
    pub issued_at: DateTime<Utc>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub downloaded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(display_name: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            username: "student1".to_string(),
            email: None,
            display_name: display_name.map(str::to_string),
            password_hash: String::new(),
            role: Role::Student,
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn test_full_name_falls_back_to_username() {
        assert_eq!(user(None).full_name(), "student1");
        assert_eq!(user(Some("   ")).full_name(), "student1");
        assert_eq!(user(Some(" Ada Lovelace ")).full_name(), "Ada Lovelace");
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let mut u = user(None);
        u.password_hash = "$argon2id$secret".to_string();
        let json = serde_json::to_string(&u).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(json.contains("\"role\":\"student\""));
    }
}
