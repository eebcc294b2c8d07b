//! # Classroll CLI
//!
//! Database seeding utilities for Classroll development and load testing.
//!
//! Directory rows (users, students, teachers) are inserted with plain SQL
//! since identity management lives outside the enrollment core. Courses,
//! sections and enrollments go through the [`classroll::modules::coordinator::Coordinator`]
//! so seeded data obeys the same capacity and timetable rules as live traffic.
//!
//! ## Usage
//!
//! ```ignore
//! use classroll_cli::seeder::{seed_all, SeedConfig};
//!
//! let summary = seed_all(&pool, &coordinator, SeedConfig::default()).await?;
//! ```

pub mod seeder;
