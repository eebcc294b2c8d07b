//! # Classroll Models
//!
//! Domain models and DTOs shared by the storage layer, the services and the
//! HTTP adapter.
//!
//! # Modules
//!
//! - [`ids`]: strongly typed identifiers
//! - [`roles`]: caller roles and the resolved [`Actor`]
//! - [`courses`]: catalog courses
//! - [`classes`]: class sections and their lifecycle
//! - [`timeslots`]: weekly meeting windows and overlap arithmetic
//! - [`enrollments`]: enrollment ledger rows and grading
//! - [`timetable`]: timetable read models

pub mod classes;
pub mod courses;
pub mod enrollments;
pub mod ids;
pub mod roles;
pub mod timeslots;
pub mod timetable;

pub use classes::{
    AssignTeacherDto, AvailableClass, ClassSection, ClassSectionDetail, ClassStatus,
    CreateClassDto, SetClassStatusDto, UpdateClassDto,
};
pub use courses::{Course, CreateCourseDto};
pub use enrollments::{
    Enrollment, EnrollmentRequestDto, EnrollmentStatus, LetterGrade, LiveEnrollmentCorrection,
    ReconcileReport, SetGradeDto,
};
pub use ids::{ClassId, CourseId, EnrollmentId, TimeSlotId, UserId};
pub use roles::{Actor, Role};
pub use timeslots::{CommittedSlot, DayOfWeek, TimeSlot, TimeSlotInput, WeeklyWindow};
pub use timetable::{Timetable, TimetableEntry};
