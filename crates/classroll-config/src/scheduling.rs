//! Enrollment-window and retry policy.
//!
//! # Environment Variables
//!
//! - `ENROLLMENT_GRACE_DAYS`: days after a class's start date during which
//!   students may still join (default: 0, i.e. enrollment closes once the
//!   class has started)
//! - `WITHDRAWAL_GRACE_DAYS`: days after the start date during which an
//!   active enrollment may still be withdrawn (default: 14)
//! - `RETRY_BACKOFF_MS`: base pause before the single internal retry of a
//!   transient storage failure (default: 25)

use std::time::Duration;

use crate::env_or;

#[derive(Clone, Debug)]
pub struct SchedulingConfig {
    pub enrollment_grace_days: i64,
    pub withdrawal_grace_days: i64,
    pub retry_backoff: Duration,
}

impl SchedulingConfig {
    pub fn from_env() -> Self {
        Self {
            enrollment_grace_days: env_or("ENROLLMENT_GRACE_DAYS", 0),
            withdrawal_grace_days: env_or("WITHDRAWAL_GRACE_DAYS", 14),
            retry_backoff: Duration::from_millis(env_or("RETRY_BACKOFF_MS", 25)),
        }
    }
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            enrollment_grace_days: 0,
            withdrawal_grace_days: 14,
            retry_backoff: Duration::from_millis(25),
        }
    }
}
