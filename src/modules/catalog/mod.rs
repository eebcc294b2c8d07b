//! Course catalog and class sections.
//!
//! Courses, sections, their weekly slots and section lifecycle. Enrollment
//! counting lives in the ledger; overlap checks live in the timetable.

pub mod controller;
pub mod router;
pub mod service;
