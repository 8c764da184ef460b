//! Web layer: session cookies, flash messages, page context and the account
//! pages. Feature pages live next to their engines (`learn::ui`,
//! `certificates::handlers`, `dashboards`).

use axum::{async_trait, extract::FromRequestParts, http::request::Parts, Router};
use std::convert::Infallible;
use std::sync::Arc;

use crate::shared::enums::Role;
use crate::shared::state::AppState;

pub mod auth;
pub mod auth_handlers;
pub mod error;
pub mod filters;
pub mod flash;

use self::auth::{AuthenticatedUser, MaybeUser};
use self::flash::{Flash, FlashMessage};

/// Data every page template needs for the navigation bar and the flash area.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub user: Option<AuthenticatedUser>,
    pub flash: Option<FlashMessage>,
}

impl PageContext {
    pub fn logged_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn user_name(&self) -> &str {
        self.user.as_ref().map(|u| u.name.as_str()).unwrap_or("")
    }

    pub fn role_label(&self) -> &str {
        self.user.as_ref().map(|u| u.role.label()).unwrap_or("")
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.role == Role::Admin)
    }

    pub fn can_teach(&self) -> bool {
        self.user
            .as_ref()
            .is_some_and(|u| matches!(u.role, Role::Teacher | Role::Admin))
    }

    pub fn dashboard_path(&self) -> &'static str {
        self.user
            .as_ref()
            .map(|u| u.role.landing_path())
            .unwrap_or(crate::core::urls::PageUrls::LOGIN)
    }

    pub fn has_flash(&self) -> bool {
        self.flash.is_some()
    }

    pub fn flash_text(&self) -> &str {
        self.flash.as_ref().map(|f| f.text.as_str()).unwrap_or("")
    }

    pub fn flash_class(&self) -> &str {
        self.flash.as_ref().map(|f| f.css_class()).unwrap_or("")
    }
}

/// One `<option>` of a select box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>, selected: bool) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            selected,
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for PageContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;
        let Flash(flash) = Flash::from_request_parts(parts, state).await?;
        Ok(Self { user, flash })
    }
}

/// Account pages: login, registration and logout.
pub fn configure_web_routes() -> Router<Arc<AppState>> {
    auth_handlers::routes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_anonymous_context() {
        let ctx = PageContext::default();
        assert!(!ctx.logged_in());
        assert!(!ctx.can_teach());
        assert_eq!(ctx.user_name(), "");
        assert_eq!(ctx.dashboard_path(), crate::core::urls::PageUrls::LOGIN);
    }

    #[test]
    fn test_teacher_context() {
        let ctx = PageContext {
            user: Some(AuthenticatedUser {
                id: Uuid::new_v4(),
                username: "teacher1".to_string(),
                name: "Grace".to_string(),
                role: Role::Teacher,
            }),
            flash: None,
        };
        assert!(ctx.can_teach());
        assert!(!ctx.is_admin());
        assert_eq!(ctx.role_label(), "Teacher");
        assert_eq!(ctx.dashboard_path(), Role::Teacher.landing_path());
    }
}
