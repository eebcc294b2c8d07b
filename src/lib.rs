//! # Classroll API
//!
//! Course enrollment and class scheduling for a school. Managers define
//! courses and class sections with weekly time slots, assign teachers and
//! manage section lifecycles. Students enroll in and withdraw from open
//! sections. Teachers grade their students.
//!
//! Three guarantees hold under any interleaving of concurrent requests:
//!
//! - a section never holds more seats than its capacity
//! - a student never has two sections whose weekly slots overlap
//! - a teacher is never assigned two sections whose weekly slots overlap
//!
//! ## Architecture
//!
//! ```text
//! crates/
//! ├── classroll-core/     # CoreError taxonomy, AppError, Clock
//! ├── classroll-config/   # Environment-driven configuration
//! ├── classroll-models/   # Domain types and DTOs
//! ├── classroll-auth/     # Bearer token verification
//! ├── classroll-db/       # Store trait, Postgres and in-memory backends
//! └── classroll-cli/      # migrate, seed and reconcile commands
//! src/
//! ├── middleware/         # AuthUser extractor
//! ├── modules/
//! │   ├── catalog/       # Courses and class sections
//! │   ├── ledger/        # Enrollment rows, counters, grading
//! │   ├── timetable/     # Overlap detection and timetable reads
//! │   └── coordinator/   # Transaction boundaries and retry
//! └── utils/              # Role helpers
//! ```
//!
//! Every mutating request runs in one store transaction opened by the
//! [`modules::coordinator::Coordinator`]. Locks are taken in a fixed order:
//! person scopes first (students before teachers, then by id), then the
//! class row, then enrollment rows. A transient failure such as a lock
//! timeout is retried once after a short jittered pause.
//!
//! ## API Documentation
//!
//! - Swagger UI: `http://localhost:3000/swagger-ui`
//! - Scalar: `http://localhost:3000/scalar`

pub mod docs;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod modules;
pub mod router;
pub mod state;
pub mod utils;
pub mod validator;

// Re-export workspace crates for convenience
pub use classroll_auth;
pub use classroll_config;
pub use classroll_core;
pub use classroll_db;
pub use classroll_models;
