//! Read models for per-student and per-teacher weekly timetables.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::ids::{ClassId, UserId};
use crate::timeslots::{DayOfWeek, WeeklyWindow};

/// One weekly meeting in someone's timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TimetableEntry {
    pub class_id: ClassId,
    pub course_code: String,
    pub course_name: String,
    pub semester: String,
    pub academic_year: String,
    pub day_of_week: DayOfWeek,
    #[schema(value_type = String, example = "08:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "10:30:00")]
    pub end_time: NaiveTime,
    pub room: Option<String>,
}

impl WeeklyWindow for TimetableEntry {
    fn day(&self) -> DayOfWeek {
        self.day_of_week
    }
    fn start(&self) -> NaiveTime {
        self.start_time
    }
    fn end(&self) -> NaiveTime {
        self.end_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Timetable {
    pub user_id: UserId,
    pub entries: Vec<TimetableEntry>,
}

impl Timetable {
    /// Entries sorted by day then start time.
    pub fn new(user_id: UserId, mut entries: Vec<TimetableEntry>) -> Self {
        entries.sort_by_key(|e| (e.day_of_week, e.start_time));
        Self { user_id, entries }
    }
}
