//! HTTP server initialization and routing

use axum::{routing::get, Router};
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::core::config::AppConfig;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{create_conn, run_migrations};
use crate::core::urls::ApiUrls;

use super::{health_check, health_check_simple, shutdown_signal};

/// Every route of the application with its layers applied.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route(ApiUrls::HEALTHZ, get(health_check_simple))
        .route(ApiUrls::HEALTH, get(health_check))
        .merge(crate::web::configure_web_routes())
        .merge(crate::learn::configure_learn_routes())
        .merge(crate::certificates::configure_certificate_routes())
        .merge(crate::dashboards::configure_dashboards_routes());

    api_router
        .layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            crate::web::error::error_page_context,
        ))
        .with_state(app_state)
        // Layers run in reverse order: tracing wraps the cookie manager
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Connects to the database, applies pending migrations and serves until a
/// shutdown signal arrives.
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let pool = create_conn(&config.database)?;
    let migrate_pool = pool.clone();
    tokio::task::spawn_blocking(move || run_migrations(&migrate_pool))
        .await?
        .map_err(|e| anyhow::anyhow!(e))?;

    let addr: SocketAddr = config.bind_addr().parse()?;
    let app_state = AppState::new(pool, config);
    let app = build_router(app_state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(
                "Failed to bind to {}: {} - is another instance running?",
                addr, e
            );
            return Err(e.into());
        }
    };

    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
