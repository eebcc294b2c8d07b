use std::sync::Arc;

use classroll_config::{CorsConfig, DatabaseConfig, JwtConfig, SchedulingConfig};
use classroll_core::{Clock, SystemClock};
use classroll_db::{MIGRATOR, PgStore, Store, init_db_pool};

use crate::modules::coordinator::Coordinator;

#[derive(Clone, Debug)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        scheduling: SchedulingConfig,
        jwt_config: JwtConfig,
        cors_config: CorsConfig,
    ) -> Self {
        Self {
            coordinator: Arc::new(Coordinator::new(store, clock, scheduling)),
            jwt_config,
            cors_config,
        }
    }
}

/// Connect to Postgres, apply pending migrations and wire the state.
pub async fn init_app_state() -> anyhow::Result<AppState> {
    let db_config = DatabaseConfig::from_env();
    if db_config.url.is_empty() {
        anyhow::bail!("DATABASE_URL must be set");
    }

    let pool = init_db_pool(&db_config).await?;
    MIGRATOR.run(&pool).await?;

    let store = PgStore::new(pool, db_config.lock_timeout);

    Ok(AppState::new(
        Arc::new(store),
        Arc::new(SystemClock),
        SchedulingConfig::from_env(),
        JwtConfig::from_env(),
        CorsConfig::from_env(),
    ))
}
