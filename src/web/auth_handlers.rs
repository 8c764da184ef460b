//! Authentication handlers for login, registration and logout

use askama::Template;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::{info, warn};

use crate::accounts::{AccountEngine, RegisterRequest};
use crate::core::urls::PageUrls;
use crate::shared::enums::Role;
use crate::shared::error::{AppError, AppResult};
use crate::shared::state::AppState;

use super::auth::clear_auth_cookie;
use super::{flash, PageContext, SelectOption};

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const WRONG_ROLE: &str = "Unauthorized role access";

fn role_options(roles: &[Role], selected: Role) -> Vec<SelectOption> {
    roles
        .iter()
        .map(|r| SelectOption::new(r.as_str(), r.label(), *r == selected))
        .collect()
}

/// Login page template
#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub role: String,
    pub role_label: String,
    pub roles: Vec<SelectOption>,
    pub username: String,
}

#[derive(Template)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
    pub errors: Vec<String>,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub roles: Vec<SelectOption>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleQuery {
    pub role: Option<String>,
}

impl RoleQuery {
    fn role(&self) -> Role {
        self.role
            .as_deref()
            .and_then(|r| r.parse().ok())
            .unwrap_or_default()
    }
}

/// Login form data
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: String,
}

fn login_url(role: Role) -> String {
    format!("{}?role={}", PageUrls::LOGIN, role.as_str())
}

/// Show login page
pub async fn login_page(ctx: PageContext, Query(query): Query<RoleQuery>) -> impl IntoResponse {
    let role = query.role();
    LoginTemplate {
        ctx,
        role: role.as_str().to_string(),
        role_label: role.label().to_string(),
        roles: role_options(Role::ALL, role),
        username: String::new(),
    }
}

/// Handle login form submission
pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let role: Role = form.role.parse().unwrap_or_default();
    let engine = AccountEngine::new(state.conn.clone());

    let Some(user) = engine.authenticate(&form.username, &form.password).await? else {
        warn!("Failed login for '{}'", form.username.trim());
        flash::error(&cookies, INVALID_CREDENTIALS);
        return Ok(Redirect::to(&login_url(role)).into_response());
    };

    if user.role != role {
        warn!(
            "User {} tried to log in as {} but is {}",
            user.username, role, user.role
        );
        flash::error(&cookies, WRONG_ROLE);
        return Ok(Redirect::to(&login_url(role)).into_response());
    }

    let token = state.auth.issue_token(&user)?;
    cookies.add(state.auth.auth_cookie(token));
    info!("User {} logged in as {}", user.username, user.role);

    Ok(Redirect::to(user.role.landing_path()).into_response())
}

pub async fn register_page(ctx: PageContext) -> impl IntoResponse {
    RegisterTemplate {
        ctx,
        errors: Vec::new(),
        username: String::new(),
        email: String::new(),
        display_name: String::new(),
        roles: role_options(Role::SELF_REGISTERED, Role::Student),
    }
}

pub async fn register_submit(
    State(state): State<Arc<AppState>>,
    ctx: PageContext,
    cookies: Cookies,
    Form(form): Form<RegisterRequest>,
) -> AppResult<Response> {
    let engine = AccountEngine::new(state.conn.clone());

    let errors = match engine.register(form.clone()).await {
        Ok(user) => {
            flash::success(&cookies, "Account created. You can now log in.");
            return Ok(Redirect::to(&login_url(user.role)).into_response());
        }
        Err(AppError::Validation(_)) => form.validate(),
        Err(AppError::Conflict(msg)) => vec![msg],
        Err(e) => return Err(e),
    };

    let selected = form.role().unwrap_or_default();
    Ok(RegisterTemplate {
        ctx,
        errors,
        username: form.username,
        email: form.email,
        display_name: form.display_name,
        roles: role_options(Role::SELF_REGISTERED, selected),
    }
    .into_response())
}

/// Handle logout
pub async fn logout(cookies: Cookies) -> impl IntoResponse {
    clear_auth_cookie(&cookies);
    flash::push(&cookies, flash::Level::Info, "You have been logged out.");
    Redirect::to(PageUrls::HOME)
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(PageUrls::LOGIN, get(login_page).post(login_submit))
        .route(PageUrls::REGISTER, get(register_page).post(register_submit))
        .route(PageUrls::LOGOUT, get(logout).post(logout))
}
