//! Enrollment ledger module.
//!
//! Enrollment rows, the per-section `live_enrollment` counter, grading and
//! counter reconciliation.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;
