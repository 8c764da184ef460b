//! Sequential unlock rules over a course's ordered, active lessons.
//!
//! Everything here is pure: callers load the lessons and the set of completed
//! lesson ids, these functions decide what the learner may open next.

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use crate::shared::models::Lesson;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonState {
    Completed,
    Next,
    Locked,
}

impl LessonState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Next => "next",
            Self::Locked => "locked",
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Locked)
    }
}

/// Active lessons in course order: `(lesson_order, created_at, id)`.
pub fn ordered_active(mut lessons: Vec<Lesson>) -> Vec<Lesson> {
    lessons.retain(|l| l.is_active);
    lessons.sort_by(|a, b| {
        a.lesson_order
            .cmp(&b.lesson_order)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
    lessons
}

/// First lesson not yet completed; `None` once every lesson is done.
pub fn next_lesson<'a>(lessons: &'a [Lesson], completed: &HashSet<Uuid>) -> Option<&'a Lesson> {
    lessons.iter().find(|l| !completed.contains(&l.id))
}

/// State of `lesson_id` within `lessons`, `None` when it is not one of them.
pub fn lesson_state(
    lessons: &[Lesson],
    completed: &HashSet<Uuid>,
    lesson_id: Uuid,
) -> Option<LessonState> {
    if !lessons.iter().any(|l| l.id == lesson_id) {
        return None;
    }
    if completed.contains(&lesson_id) {
        return Some(LessonState::Completed);
    }
    match next_lesson(lessons, completed) {
        Some(next) if next.id == lesson_id => Some(LessonState::Next),
        _ => Some(LessonState::Locked),
    }
}

/// Number of `lessons` present in `completed`.
pub fn completed_count(lessons: &[Lesson], completed: &HashSet<Uuid>) -> usize {
    lessons.iter().filter(|l| completed.contains(&l.id)).count()
}

/// Integer percentage rounded down; 0 for a course without lessons.
pub fn completion_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let done = done.min(total);
    (done * 100 / total) as u8
}

pub fn is_course_complete(lessons: &[Lesson], completed: &HashSet<Uuid>) -> bool {
    !lessons.is_empty() && lessons.iter().all(|l| completed.contains(&l.id))
}
