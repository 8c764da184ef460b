//! Cookie-carried JWT sessions and the request extractors built on them.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use chrono::{Duration, Utc};
use diesel::prelude::*;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::core::config::AuthSettings;
use crate::shared::enums::Role;
use crate::shared::error::{AppError, AppResult};
use crate::shared::models::User;
use crate::shared::schema::users;
use crate::shared::state::AppState;

pub const AUTH_COOKIE: &str = "auth_token";

/// Extract bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|auth| {
            if auth.to_lowercase().starts_with("bearer ") {
                Some(auth[7..].to_string())
            } else {
                None
            }
        })
}

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id
    pub username: String,
    pub name: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication configuration
#[derive(Clone)]
pub struct AuthConfig {
    jwt_secret: String,
    pub session_hours: i64,
    pub secure_cookies: bool,
}

impl AuthConfig {
    pub fn from_settings(settings: &AuthSettings) -> Self {
        let jwt_secret = if settings.jwt_secret.trim().is_empty() {
            // Sessions do not survive a restart with a generated secret.
            let secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
            tracing::warn!("auth.jwt_secret not configured, using generated JWT secret");
            secret
        } else {
            settings.jwt_secret.clone()
        };

        Self {
            jwt_secret,
            session_hours: settings.session_hours,
            secure_cookies: settings.secure_cookies,
        }
    }

    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.jwt_secret.as_bytes())
    }

    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.jwt_secret.as_bytes())
    }

    pub fn issue_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.session_hours);

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            name: user.full_name().to_string(),
            role: user.role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key())
            .map_err(|e| AppError::Internal(format!("Failed to sign session token: {e}")))
    }

    pub fn decode_token(&self, token: &str) -> Option<Claims> {
        let claims = decode::<Claims>(token, &self.decoding_key(), &Validation::default())
            .ok()?
            .claims;

        if claims.exp < Utc::now().timestamp() {
            return None;
        }
        Some(claims)
    }

    /// Helper to create the session cookie
    pub fn auth_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((AUTH_COOKIE, token))
            .path("/")
            .secure(self.secure_cookies)
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::hours(self.session_hours))
            .build()
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("session_hours", &self.session_hours)
            .field("secure_cookies", &self.secure_cookies)
            .finish_non_exhaustive()
    }
}

pub fn clear_auth_cookie(cookies: &Cookies) {
    cookies.remove(Cookie::build(AUTH_COOKIE).path("/").build());
}

/// Authenticated user extractor
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            name: user.full_name().to_string(),
            role: user.role,
        }
    }

    /// Refuses the request unless the user holds one of `roles`.
    pub fn require(&self, roles: &[Role]) -> AppResult<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            tracing::debug!(user = %self.username, role = %self.role, "role check failed");
            Err(AppError::forbidden("Access Denied"))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_staff()
    }
}

/// Session token from the `Authorization` header, else the session cookie.
pub fn session_token(headers: &HeaderMap, cookies: Option<&Cookies>) -> Option<String> {
    extract_bearer_token(headers)
        .or_else(|| cookies?.get(AUTH_COOKIE).map(|c| c.value().to_string()))
}

/// Account behind a session token.
///
/// Role and name come from the `users` row, not the token, so a role change
/// or a deactivation takes effect on the next request.
pub async fn resolve_session(
    state: &Arc<AppState>,
    token: &str,
) -> AppResult<Option<AuthenticatedUser>> {
    let Some(user_id) = state
        .auth
        .decode_token(token)
        .and_then(|claims| claims.sub.parse::<Uuid>().ok())
    else {
        return Ok(None);
    };

    let pool = state.conn.clone();
    let account = tokio::task::spawn_blocking(move || -> AppResult<Option<User>> {
        let mut conn = pool.get()?;
        Ok(users::table
            .find(user_id)
            .first::<User>(&mut conn)
            .optional()?)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Session lookup failed: {e}")))??;

    Ok(account
        .filter(|user| user.is_active)
        .map(|user| AuthenticatedUser::from_user(&user)))
}

async fn session_from_parts(
    parts: &mut Parts,
    state: &Arc<AppState>,
) -> AppResult<Option<AuthenticatedUser>> {
    let cookies = Cookies::from_request_parts(parts, state).await.ok();
    match session_token(&parts.headers, cookies.as_ref()) {
        Some(token) => resolve_session(state, &token).await,
        None => Ok(None),
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        session_from_parts(parts, state)
            .await?
            .ok_or(AppError::Unauthenticated)
    }
}

/// Optional authenticated user (doesn't fail if not authenticated)
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match session_from_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(user)),
            Err(e) => {
                tracing::warn!("Session lookup failed, treating request as anonymous: {}", e);
                Ok(MaybeUser(None))
            }
        }
    }
}

/// Logged-in administrator.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        user.require(&[Role::Admin])?;
        Ok(AdminUser(user))
    }
}

/// Logged-in teacher, or an administrator acting as one.
#[derive(Debug, Clone)]
pub struct TeacherUser(pub AuthenticatedUser);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for TeacherUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        user.require(&[Role::Teacher, Role::Admin])?;
        Ok(TeacherUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig::from_settings(&AuthSettings {
            jwt_secret: "test-secret".to_string(),
            session_hours: 2,
            secure_cookies: false,
        })
    }

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            username: "teacher1".to_string(),
            email: None,
            display_name: Some("Grace Hopper".to_string()),
            password_hash: String::new(),
            role,
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let config = config();
        let u = user(Role::Teacher);
        let token = config.issue_token(&u).unwrap();

        let claims = config.decode_token(&token).unwrap();
        assert_eq!(claims.sub, u.id.to_string());
        assert_eq!(claims.name, "Grace Hopper");
        assert_eq!(claims.role, Role::Teacher);

        let session = AuthenticatedUser::from_user(&u);
        assert_eq!(session.id.to_string(), claims.sub);
        assert_eq!(session.name, claims.name);
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let token = config().issue_token(&user(Role::Admin)).unwrap();
        let other = AuthConfig::from_settings(&AuthSettings {
            jwt_secret: "another-secret".to_string(),
            ..AuthSettings::default()
        });
        assert!(other.decode_token(&token).is_none());
        assert!(config().decode_token("garbage").is_none());
    }

    #[test]
    fn test_require_role() {
        let session = AuthenticatedUser {
            id: Uuid::new_v4(),
            username: "student1".to_string(),
            name: "student1".to_string(),
            role: Role::Student,
        };
        assert!(session.require(&[Role::Student]).is_ok());
        let err = session.require(&[Role::Teacher, Role::Admin]).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(ref msg) if msg == "Access Denied"));
    }

    #[test]
    fn test_auth_cookie_attributes() {
        let cookie = config().auth_cookie("abc".to_string());
        assert_eq!(cookie.name(), AUTH_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_bearer_header_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer token-123".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("token-123"));
    }
}
