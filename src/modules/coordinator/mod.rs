//! Enrollment and scheduling coordinator.
//!
//! The single entry point for every mutation. Each operation authorizes the
//! caller, runs the catalog, timetable and ledger steps inside one store
//! transaction, and retries once when the store reports a transient failure.

pub mod service;

pub use service::Coordinator;
