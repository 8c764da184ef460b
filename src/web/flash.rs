//! One-shot status messages carried across a redirect in a cookie.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::Serialize;
use std::convert::Infallible;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlashMessage {
    pub level: Level,
    pub text: String,
}

impl FlashMessage {
    pub fn css_class(&self) -> &'static str {
        match self.level {
            Level::Success => "alert-success",
            Level::Info => "alert-info",
            Level::Warning => "alert-warning",
            Level::Error => "alert-danger",
        }
    }

    fn encode(&self) -> String {
        urlencoding::encode(&format!("{}:{}", self.level.as_str(), self.text)).into_owned()
    }

    fn decode(raw: &str) -> Option<Self> {
        let decoded = urlencoding::decode(raw).ok()?;
        let (level, text) = decoded.split_once(':')?;
        Some(Self {
            level: Level::parse(level)?,
            text: text.to_string(),
        })
    }
}

/// Queues a message for the next rendered page.
pub fn push(cookies: &Cookies, level: Level, text: impl Into<String>) {
    let message = FlashMessage {
        level,
        text: text.into(),
    };
    cookies.add(
        Cookie::build((FLASH_COOKIE, message.encode()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build(),
    );
}

pub fn success(cookies: &Cookies, text: impl Into<String>) {
    push(cookies, Level::Success, text);
}

pub fn warning(cookies: &Cookies, text: impl Into<String>) {
    push(cookies, Level::Warning, text);
}

pub fn error(cookies: &Cookies, text: impl Into<String>) {
    push(cookies, Level::Error, text);
}

/// Message waiting in the jar, left in place.
pub fn pending(cookies: &Cookies) -> Option<FlashMessage> {
    cookies
        .get(FLASH_COOKIE)
        .and_then(|c| FlashMessage::decode(c.value()))
}

pub fn discard(cookies: &Cookies) {
    cookies.remove(Cookie::build(FLASH_COOKIE).path("/").build());
}

/// Message left by the previous request, removed once read.
#[derive(Debug, Clone, Default)]
pub struct Flash(pub Option<FlashMessage>);

#[async_trait]
impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(cookies) = Cookies::from_request_parts(parts, state).await else {
            return Ok(Flash(None));
        };
        let message = pending(&cookies);
        if message.is_some() {
            discard(&cookies);
        }
        Ok(Flash(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_keeps_colons_and_spaces() {
        let msg = FlashMessage {
            level: Level::Warning,
            text: "Note: complete all lessons first.".to_string(),
        };
        let encoded = msg.encode();
        assert!(!encoded.contains(' '));
        assert_eq!(FlashMessage::decode(&encoded), Some(msg));
    }

    #[test]
    fn test_unknown_level_is_dropped() {
        assert_eq!(FlashMessage::decode("debug%3Ahello"), None);
        assert_eq!(FlashMessage::decode("no-separator"), None);
    }

    #[test]
    fn test_css_class() {
        let msg = FlashMessage {
            level: Level::Error,
            text: "Invalid credentials".to_string(),
        };
        assert_eq!(msg.css_class(), "alert-danger");
    }
}
