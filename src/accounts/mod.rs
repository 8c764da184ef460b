//! User accounts: registration, credential checks and seeding of demo users.

use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use uuid::Uuid;

use crate::security::password::{hash_password, validate_password, verify_password};
use crate::security::validation::{
    validate_email, validate_length, validate_required, validate_username, ValidationResult,
};
use crate::shared::enums::Role;
use crate::shared::error::{AppError, AppResult};
use crate::shared::models::User;
use crate::shared::schema::users;
use crate::shared::utils::DbPool;

pub const USERNAME_MAX_LEN: usize = 150;
pub const EMAIL_MAX_LEN: usize = 254;
/// Matches `enrollments.full_name`, which falls back to the display name.
pub const DISPLAY_NAME_MAX_LEN: usize = 255;

/// Password given to every account created by [`AccountEngine::create_test_users`].
pub const TEST_USER_PASSWORD: &str = "password123";

const TEST_USERS: &[(&str, Role)] = &[
    ("student1", Role::Student),
    ("teacher1", Role::Teacher),
    ("admin1", Role::Admin),
];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub role: String,
}

impl RegisterRequest {
    /// Field-level problems, empty when the form can be submitted.
    pub fn validate(&self) -> Vec<String> {
        let mut result = ValidationResult::new();
        let username = self.username.trim();

        result.check(
            validate_required(username, "Username")
                .and_then(|_| validate_length(username, "Username", USERNAME_MAX_LEN))
                .and_then(|_| validate_username(username)),
        );

        let email = self.email.trim();
        if !email.is_empty() {
            result.check(
                validate_length(email, "Email", EMAIL_MAX_LEN).and_then(|_| validate_email(email)),
            );
        }

        result.check(validate_length(
            &self.display_name,
            "Display name",
            DISPLAY_NAME_MAX_LEN,
        ));

        let mut errors = result.to_error_messages();

        match self.role() {
            Some(role) if Role::SELF_REGISTERED.contains(&role) => {}
            _ => errors.push("Select a valid role.".to_string()),
        }

        errors.extend(
            validate_password(&self.password, &self.confirm_password, username)
                .iter()
                .map(|issue| issue.message()),
        );

        errors
    }

    pub fn role(&self) -> Option<Role> {
        if self.role.trim().is_empty() {
            return Some(Role::Student);
        }
        self.role.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    Created,
    AlreadyExists,
}

/// Account operations backed by the `users` table.
pub struct AccountEngine {
    db: DbPool,
}

impl AccountEngine {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn register(&self, req: RegisterRequest) -> AppResult<User> {
        let errors = req.validate();
        if !errors.is_empty() {
            return Err(AppError::Validation(errors.join(" ")));
        }
        let role = req.role().unwrap_or_default();

        let username = req.username.trim().to_string();
        let mut conn = self.db.get()?;

        let taken: i64 = users::table
            .filter(users::username.eq(&username))
            .count()
            .get_result(&mut conn)?;
        if taken > 0 {
            return Err(AppError::Conflict(
                "A user with that username already exists.".to_string(),
            ));
        }

        let password_hash =
            hash_password(&req.password).map_err(|e| AppError::Internal(e.to_string()))?;

        let user = User {
            id: Uuid::new_v4(),
            username,
            email: non_empty(&req.email),
            display_name: non_empty(&req.display_name),
            password_hash,
            role,
            is_active: true,
            date_joined: Utc::now(),
        };

        diesel::insert_into(users::table)
            .values(&user)
            .execute(&mut conn)
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict(_) => {
                    AppError::Conflict("A user with that username already exists.".to_string())
                }
                other => other,
            })?;

        log::info!("Registered {} account {}", user.role, user.username);
        Ok(user)
    }

    /// Returns the user when the credentials match an active account.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<Option<User>> {
        let mut conn = self.db.get()?;

        let user: Option<User> = users::table
            .filter(users::username.eq(username.trim()))
            .first(&mut conn)
            .optional()?;

        let Some(user) = user else {
            return Ok(None);
        };
        if !user.is_active {
            return Ok(None);
        }

        match verify_password(password, &user.password_hash) {
            Ok(true) => Ok(Some(user)),
            Ok(false) => Ok(None),
            Err(e) => {
                log::warn!("Stored password hash for {} is unusable: {}", user.username, e);
                Ok(None)
            }
        }
    }

    pub async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        let mut conn = self.db.get()?;
        Ok(users::table.find(user_id).first(&mut conn)?)
    }

    /// Creates `student1`, `teacher1` and `admin1` unless they already exist.
    pub async fn create_test_users(&self) -> AppResult<Vec<(&'static str, SeedOutcome)>> {
        let mut conn = self.db.get()?;
        let mut report = Vec::with_capacity(TEST_USERS.len());

        for &(username, role) in TEST_USERS {
            let exists: i64 = users::table
                .filter(users::username.eq(username))
                .count()
                .get_result(&mut conn)?;
            if exists > 0 {
                report.push((username, SeedOutcome::AlreadyExists));
                continue;
            }

            let user = User {
                id: Uuid::new_v4(),
                username: username.to_string(),
                email: Some(format!("{username}@example.com")),
                display_name: None,
                password_hash: hash_password(TEST_USER_PASSWORD)
                    .map_err(|e| AppError::Internal(e.to_string()))?,
                role,
                is_active: true,
                date_joined: Utc::now(),
            };
            diesel::insert_into(users::table)
                .values(&user)
                .execute(&mut conn)?;
            report.push((username, SeedOutcome::Created));
        }

        Ok(report)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
