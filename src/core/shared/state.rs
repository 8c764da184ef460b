use std::sync::Arc;

use crate::core::config::AppConfig;
use crate::shared::utils::DbPool;
use crate::web::auth::AuthConfig;

pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(conn: DbPool, config: AppConfig) -> Arc<Self> {
        let auth = AuthConfig::from_settings(&config.auth);
        Arc::new(Self { conn, config, auth })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("pool_size", &self.conn.state().connections)
            .field("server", &self.config.server)
            .finish()
    }
}
