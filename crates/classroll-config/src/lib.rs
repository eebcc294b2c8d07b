//! # Classroll Config
//!
//! Configuration structures loaded from environment variables:
//!
//! - [`jwt`]: credential verification settings
//! - [`cors`]: allowed browser origins
//! - [`database`]: pool sizing and lock timeouts
//! - [`scheduling`]: enrollment and withdrawal windows, retry backoff
//!
//! # Example
//!
//! ```ignore
//! use classroll_config::{DatabaseConfig, JwtConfig, SchedulingConfig};
//!
//! let db = DatabaseConfig::from_env();
//! let jwt = JwtConfig::from_env();
//! let scheduling = SchedulingConfig::from_env();
//! ```

pub mod cors;
pub mod database;
pub mod jwt;
pub mod scheduling;

pub use cors::CorsConfig;
pub use database::DatabaseConfig;
pub use jwt::JwtConfig;
pub use scheduling::SchedulingConfig;

/// Read an environment variable and parse it, falling back to `default` when
/// the variable is unset or unparseable.
pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
