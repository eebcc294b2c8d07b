//! # Classroll Core
//!
//! Core types shared by every Classroll crate.
//!
//! - [`errors`]: the [`CoreError`] taxonomy and the HTTP-facing [`AppError`]
//! - [`clock`]: the injectable [`Clock`] capability used for timestamps and
//!   enrollment-window checks
//!
//! # Example
//!
//! ```ignore
//! use classroll_core::{AppError, CoreError};
//!
//! let err: AppError = CoreError::CapacityFull.into();
//! assert_eq!(err.status, axum::http::StatusCode::CONFLICT);
//! ```

pub mod clock;
pub mod errors;

pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::{AppError, CoreError};
