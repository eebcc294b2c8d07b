//! Weekly time slots attached to class sections.
//!
//! A slot is a recurring meeting window: a day of the week plus a half-open
//! `[start_time, end_time)` range. Two slots overlap only when they share a
//! day and their ranges intersect; back-to-back slots (10:00-10:30 then
//! 10:30-11:00) do not overlap.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::ids::{ClassId, TimeSlotId};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
    sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "day_of_week", rename_all = "snake_case")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl std::fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        };
        f.write_str(name)
    }
}

/// Anything with a weekly meeting window.
pub trait WeeklyWindow {
    fn day(&self) -> DayOfWeek;
    fn start(&self) -> NaiveTime;
    fn end(&self) -> NaiveTime;

    /// Half-open interval intersection on the same day.
    fn overlaps<W: WeeklyWindow + ?Sized>(&self, other: &W) -> bool {
        self.day() == other.day() && self.start() < other.end() && other.start() < self.end()
    }

    fn describe(&self) -> String {
        format!(
            "{} {}-{}",
            self.day(),
            self.start().format("%H:%M"),
            self.end().format("%H:%M")
        )
    }
}

/// Persisted slot belonging to exactly one class section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TimeSlot {
    pub id: TimeSlotId,
    pub class_id: ClassId,
    pub day_of_week: DayOfWeek,
    #[schema(value_type = String, example = "08:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "10:30:00")]
    pub end_time: NaiveTime,
    pub room: Option<String>,
}

impl WeeklyWindow for TimeSlot {
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

/// A slot someone is already committed to, together with the date range of
/// the section it belongs to. Sections whose date ranges do not intersect
/// never conflict, even when their weekly slots coincide.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CommittedSlot {
    pub class_id: ClassId,
    pub class_start: NaiveDate,
    pub class_end: NaiveDate,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl CommittedSlot {
    pub fn runs_during(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.class_start <= end && start <= self.class_end
    }
}

impl WeeklyWindow for CommittedSlot {
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

/// A proposed slot in a create or update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_slot_range"))]
pub struct TimeSlotInput {
    pub day_of_week: DayOfWeek,
    #[schema(value_type = String, example = "08:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "10:30:00")]
    pub end_time: NaiveTime,
    #[validate(length(max = 50))]
    pub room: Option<String>,
}

impl TimeSlotInput {
    pub fn new(day_of_week: DayOfWeek, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            day_of_week,
            start_time,
            end_time,
            room: None,
        }
    }

    pub fn in_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    /// Materialize into a stored slot for `class_id`.
    pub fn into_slot(self, class_id: ClassId) -> TimeSlot {
        TimeSlot {
            id: TimeSlotId::new(),
            class_id,
            day_of_week: self.day_of_week,
            start_time: self.start_time,
            end_time: self.end_time,
            room: self.room,
        }
    }
}

impl WeeklyWindow for TimeSlotInput {
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

fn validate_slot_range(slot: &TimeSlotInput) -> Result<(), ValidationError> {
    if slot.start_time >= slot.end_time {
        return Err(ValidationError::new("slot_range")
            .with_message("start_time must be before end_time".into()));
    }
    Ok(())
}

/// First pair of mutually overlapping slots within one proposed set, if any.
pub fn find_internal_overlap<W: WeeklyWindow>(slots: &[W]) -> Option<(&W, &W)> {
    slots.iter().enumerate().find_map(|(i, a)| {
        slots[i + 1..]
            .iter()
            .find(|b| a.overlaps(*b))
            .map(|b| (a, b))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn touching_endpoints_do_not_overlap() {
        let a = TimeSlotInput::new(DayOfWeek::Monday, t(10, 0), t(10, 30));
        let b = TimeSlotInput::new(DayOfWeek::Monday, t(10, 30), t(11, 0));
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn intersecting_ranges_overlap_on_same_day_only() {
        let a = TimeSlotInput::new(DayOfWeek::Monday, t(8, 0), t(10, 30));
        let b = TimeSlotInput::new(DayOfWeek::Monday, t(9, 0), t(11, 0));
        let c = TimeSlotInput::new(DayOfWeek::Tuesday, t(9, 0), t(11, 0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn containment_overlaps() {
        let outer = TimeSlotInput::new(DayOfWeek::Friday, t(8, 0), t(12, 0));
        let inner = TimeSlotInput::new(DayOfWeek::Friday, t(9, 0), t(9, 45));
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn slot_range_validation() {
        let bad = TimeSlotInput::new(DayOfWeek::Monday, t(11, 0), t(10, 0));
        assert!(bad.validate().is_err());

        let empty = TimeSlotInput::new(DayOfWeek::Monday, t(10, 0), t(10, 0));
        assert!(empty.validate().is_err());

        let good = TimeSlotInput::new(DayOfWeek::Monday, t(10, 0), t(11, 0)).in_room("B-204");
        assert!(good.validate().is_ok());
    }

    #[test]
    fn internal_overlap_detection() {
        let slots = vec![
            TimeSlotInput::new(DayOfWeek::Monday, t(8, 0), t(9, 0)),
            TimeSlotInput::new(DayOfWeek::Wednesday, t(8, 0), t(9, 0)),
            TimeSlotInput::new(DayOfWeek::Monday, t(8, 30), t(9, 30)),
        ];
        let (a, b) = find_internal_overlap(&slots).unwrap();
        assert_eq!(a.day_of_week, DayOfWeek::Monday);
        assert_eq!(b.start_time, t(8, 30));

        assert!(find_internal_overlap(&slots[..2]).is_none());
    }

    #[test]
    fn committed_slot_date_ranges() {
        let d = |m, day| NaiveDate::from_ymd_opt(2025, m, day).unwrap();
        let committed = CommittedSlot {
            class_id: ClassId::new(),
            class_start: d(9, 1),
            class_end: d(12, 20),
            day_of_week: DayOfWeek::Monday,
            start_time: t(8, 0),
            end_time: t(10, 0),
        };
        assert!(committed.runs_during(d(12, 20), d(12, 31)));
        assert!(committed.runs_during(d(1, 1), d(9, 1)));
        assert!(!committed.runs_during(d(12, 21), d(12, 31)));
    }

    #[test]
    fn describe_formats_window() {
        let slot = TimeSlotInput::new(DayOfWeek::Monday, t(8, 0), t(10, 30));
        assert_eq!(slot.describe(), "Monday 08:00-10:30");
    }
}
