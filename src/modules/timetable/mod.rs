//! Timetable module.
//!
//! Overlap detection for teachers and students, plus the per-person weekly
//! timetable reads.

pub mod controller;
pub mod router;
pub mod service;
