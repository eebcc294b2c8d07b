//! # Classroll DB
//!
//! Storage for the Classroll enrollment core.
//!
//! Services talk to the [`Store`] / [`StoreTx`] traits only. Two backends
//! implement them:
//!
//! - [`PgStore`]: Postgres via SQLx, with row locks and advisory scope locks
//! - [`MemoryStore`]: in-process, used by tests and local demos
//!
//! # Example
//!
//! ```ignore
//! use classroll_db::{init_db_pool, PgStore, MIGRATOR};
//!
//! let pool = init_db_pool(&db_config).await?;
//! MIGRATOR.run(&pool).await?;
//! let store = PgStore::new(pool, db_config.lock_timeout);
//! ```

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

use classroll_config::DatabaseConfig;
use sqlx::postgres::PgPoolOptions;

pub use error::{IntegrityViolation, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use sqlx::PgPool;
pub use store::{LockScope, Store, StoreTx};

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Build the connection pool. Acquiring a connection is bounded by
/// `acquire_timeout`; a timeout there is reported as a transient failure.
pub async fn init_db_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    tracing::info!(
        max_connections = config.max_connections,
        "connecting to database"
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await
}
