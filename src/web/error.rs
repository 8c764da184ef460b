//! HTTP rendering of [`AppError`].

use askama::Template;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tower_cookies::Cookies;

use super::auth::{resolve_session, session_token};
use super::{flash, PageContext};
use crate::core::urls::PageUrls;
use crate::shared::error::AppError;
use crate::shared::state::AppState;

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub ctx: PageContext,
    pub status: u16,
    pub title: String,
    pub message: String,
}

pub fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Forbidden(_) => StatusCode::FORBIDDEN,
        AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
        AppError::Conflict(_) => StatusCode::CONFLICT,
        AppError::Validation(_) => StatusCode::BAD_REQUEST,
        AppError::Pool(_) => StatusCode::SERVICE_UNAVAILABLE,
        AppError::Database(_) | AppError::Pdf(_) | AppError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn title_for(status: StatusCode) -> &'static str {
    match status {
        StatusCode::NOT_FOUND => "Page not found",
        StatusCode::FORBIDDEN => "Access Denied",
        StatusCode::CONFLICT => "Already done",
        StatusCode::BAD_REQUEST => "Invalid request",
        StatusCode::SERVICE_UNAVAILABLE => "Service unavailable",
        _ => "Server error",
    }
}

/// Full error page for `err`.
pub fn error_page(err: &AppError, ctx: PageContext) -> Response {
    let status = status_for(err);
    let page = ErrorTemplate {
        ctx,
        status: status.as_u16(),
        title: title_for(status).to_string(),
        message: err.public_message(),
    };
    match page.render() {
        Ok(html) => (status, axum::response::Html(html)).into_response(),
        Err(e) => {
            log::error!("Failed to render error page: {}", e);
            (status, err.public_message()).into_response()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Unauthenticated = self {
            return Redirect::to(PageUrls::LOGIN).into_response();
        }
        if self.is_server_error() {
            log::error!("Request failed: {}", self);
        } else {
            log::debug!("Request refused: {}", self);
        }
        let mut response = error_page(&self, PageContext::default());
        response.extensions_mut().insert(RenderedError(self));
        response
    }
}

/// Marks a response rendered from an [`AppError`] without request context.
#[derive(Debug, Clone)]
struct RenderedError(AppError);

/// Re-renders error pages with the visitor's navigation and the flash
/// message that was waiting for them, which the error page consumes.
pub async fn error_page_context(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let headers = request.headers().clone();
    let cookies = request.extensions().get::<Cookies>().cloned();
    let pending = cookies.as_ref().and_then(flash::pending);

    let mut response = next.run(request).await;
    let Some(RenderedError(err)) = response.extensions_mut().remove::<RenderedError>() else {
        return response;
    };

    // A pool failure would only fail again.
    let user = match session_token(&headers, cookies.as_ref()) {
        Some(token) if !matches!(err, AppError::Pool(_)) => {
            resolve_session(&state, &token).await.unwrap_or_else(|e| {
                log::warn!("Error page rendered without session: {}", e);
                None
            })
        }
        _ => None,
    };
    if let (Some(cookies), Some(_)) = (cookies.as_ref(), pending.as_ref()) {
        flash::discard(cookies);
    }

    error_page(&err, PageContext {
        user,
        flash: pending,
    })
}
