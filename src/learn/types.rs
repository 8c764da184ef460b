//! Request and view types for the learn module.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::progress::LessonState;
use crate::security::validation::{
    validate_length, validate_phone, validate_required, validate_url, ValidationResult,
};
use crate::shared::enums::{Category, Difficulty};
use crate::shared::models::{Certificate, Course, Enrollment, Lesson, Progress};

pub const PHONE_MAX_LEN: usize = 15;
pub const TITLE_MAX_LEN: usize = 255;
pub const FULL_NAME_MAX_LEN: usize = 255;

// ============================================================================
// REQUESTS
// ============================================================================

// ----- Query Filters -----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseFilters {
    pub category: Option<String>,
    pub q: Option<String>,
}

impl CourseFilters {
    /// Category filter, ignored when blank or unknown.
    pub fn category(&self) -> Option<Category> {
        self.category.as_deref().and_then(|c| c.parse().ok())
    }

    pub fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

// ----- Enrollment -----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrollRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone_number: String,
}

impl EnrollRequest {
    /// Problems with the form; `fallback_name` stands in for a blank full name.
    pub fn validate(&self, fallback_name: &str) -> Vec<String> {
        let mut result = ValidationResult::new();
        let phone = self.phone_number.trim();

        result.check(
            validate_required(phone, "Phone number")
                .and_then(|_| validate_length(phone, "Phone number", PHONE_MAX_LEN))
                .and_then(|_| validate_phone(phone)),
        );
        result.check(validate_length(
            &self.resolved_name(fallback_name),
            "Full name",
            FULL_NAME_MAX_LEN,
        ));

        result.to_error_messages()
    }

    /// Name to print on the certificate: the form value, else `fallback`.
    pub fn resolved_name(&self, fallback: &str) -> String {
        let name = self.full_name.trim();
        if name.is_empty() {
            fallback.trim().to_string()
        } else {
            name.to_string()
        }
    }
}

// ----- Course Authoring -----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

impl CreateCourseRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut result = ValidationResult::new();
        result.check(
            validate_required(&self.title, "Title")
                .and_then(|_| validate_length(&self.title, "Title", TITLE_MAX_LEN)),
        );
        let mut errors = result.to_error_messages();
        if self.category().is_none() {
            errors.push("Select a valid category.".to_string());
        }
        errors
    }

    pub fn category(&self) -> Option<Category> {
        parse_or_default(&self.category)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateLessonRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub difficulty: String,
    /// Blank appends the lesson after the current last one.
    #[serde(default)]
    pub lesson_order: String,
}

impl CreateLessonRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut result = ValidationResult::new();
        result.check(
            validate_required(&self.title, "Title")
                .and_then(|_| validate_length(&self.title, "Title", TITLE_MAX_LEN)),
        );
        if !self.video_url.trim().is_empty() {
            result.check(validate_url(&self.video_url));
        }

        let mut errors = result.to_error_messages();
        if self.category().is_none() {
            errors.push("Select a valid category.".to_string());
        }
        if self.difficulty().is_none() {
            errors.push("Select a valid difficulty.".to_string());
        }
        if self.lesson_order().is_err() {
            errors.push("Order must be a whole number of zero or more.".to_string());
        }
        errors
    }

    pub fn category(&self) -> Option<Category> {
        parse_or_default(&self.category)
    }

    pub fn difficulty(&self) -> Option<Difficulty> {
        parse_or_default(&self.difficulty)
    }

    /// Explicit position, `Ok(None)` when left blank.
    pub fn lesson_order(&self) -> Result<Option<i32>, String> {
        let raw = self.lesson_order.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        match raw.parse::<i32>() {
            Ok(n) if n >= 0 => Ok(Some(n)),
            _ => Err(format!("invalid lesson order '{raw}'")),
        }
    }
}

fn parse_or_default<T: std::str::FromStr + Default>(raw: &str) -> Option<T> {
    if raw.trim().is_empty() {
        Some(T::default())
    } else {
        raw.parse().ok()
    }
}

// ============================================================================
// VIEWS
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CourseSummary {
    pub course: Course,
    pub teacher_name: String,
    pub lesson_count: i64,
    pub enrollment_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonEntry {
    pub lesson: Lesson,
    pub state: LessonState,
}

/// One enrollment with its position in the course.
#[derive(Debug, Clone, Serialize)]
pub struct CourseProgress {
    pub enrollment: Enrollment,
    pub course: Course,
    pub lessons: Vec<LessonEntry>,
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
    pub next_lesson: Option<Lesson>,
    pub certificate: Option<Certificate>,
}

impl CourseProgress {
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonPage {
    pub course: Course,
    pub lesson: Lesson,
    pub progress: Progress,
    pub state: LessonState,
}

#[derive(Debug, Clone)]
pub enum LessonAccess {
    Open(Box<LessonPage>),
    Locked(Course),
    NotEnrolled(Course),
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub course_id: Uuid,
    pub newly_completed: bool,
    pub certificate: Option<Certificate>,
    pub certificate_issued: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeacherCourse {
    pub course: Course,
    pub lessons: Vec<Lesson>,
    pub enrollment_count: i64,
}

impl TeacherCourse {
    pub fn active_lessons(&self) -> usize {
        self.lessons.iter().filter(|l| l.is_active).count()
    }
}
