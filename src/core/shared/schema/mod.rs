// Accounts (always available)
pub mod core;
pub use self::core::*;

// Courses, progress and certificates
pub mod learn;
pub use self::learn::*;

diesel::joinable!(courses -> users (created_by));
diesel::joinable!(enrollments -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    courses,
    lessons,
    enrollments,
    progress,
    certificates,
);
