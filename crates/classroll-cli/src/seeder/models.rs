//! Seed records and configuration.

use chrono::NaiveDate;
use classroll_models::{Role, TimeSlotInput, UserId};

/// Seed data for one directory user.
#[derive(Debug, Clone)]
pub struct UserSeed {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    /// Student or teacher code; managers have none
    pub code: Option<String>,
}

/// Seed data for one class section of a course.
#[derive(Debug, Clone)]
pub struct SectionPlan {
    pub capacity: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub slots: Vec<TimeSlotInput>,
}

#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub students: usize,
    pub teachers: usize,
    pub courses: usize,
    pub sections_per_course: usize,
    pub enrollments_per_student: usize,
    /// First day of the seeded term
    pub term_start: NaiveDate,
}

impl SeedConfig {
    pub fn new(term_start: NaiveDate) -> Self {
        Self {
            students: 200,
            teachers: 12,
            courses: 20,
            sections_per_course: 2,
            enrollments_per_student: 4,
            term_start,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub courses: usize,
    pub sections: usize,
    pub sections_without_teacher: usize,
    pub enrollments: usize,
    pub rejected_enrollments: usize,
}
