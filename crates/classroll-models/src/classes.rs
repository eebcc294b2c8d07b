//! Class section models and DTOs.
//!
//! A class section is one offering of a course in a semester. It owns the
//! denormalized `live_enrollment` counter: the number of enrollment rows
//! holding a seat (active, or completed with a grade). It never exceeds
//! `capacity`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::courses::Course;
use crate::ids::{ClassId, CourseId, UserId};
use crate::timeslots::{TimeSlot, TimeSlotInput};

/// Section lifecycle. `Open` may move to `Closed` or `Cancelled`; both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "class_status", rename_all = "snake_case")]
pub enum ClassStatus {
    Open,
    Closed,
    Cancelled,
}

impl ClassStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ClassStatus::Open)
    }

    pub fn can_transition_to(&self, next: ClassStatus) -> bool {
        matches!(
            (self, next),
            (ClassStatus::Open, ClassStatus::Closed) | (ClassStatus::Open, ClassStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for ClassStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ClassStatus::Open => "open",
            ClassStatus::Closed => "closed",
            ClassStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ClassSection {
    pub id: ClassId,
    pub course_id: CourseId,
    pub teacher_id: Option<UserId>,
    /// Semester label (e.g. "Fall", "Semester 1")
    pub semester: String,
    /// Academic year in `YYYY-YYYY` form
    pub academic_year: String,
    pub capacity: i32,
    /// Seat-holding enrollments; never above `capacity`
    pub live_enrollment: i32,
    pub status: ClassStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClassSection {
    pub fn seats_left(&self) -> i32 {
        (self.capacity - self.live_enrollment).max(0)
    }

    pub fn has_started(&self, today: NaiveDate) -> bool {
        today >= self.start_date
    }

    pub fn has_ended(&self, today: NaiveDate) -> bool {
        today > self.end_date
    }
}

/// A section together with its weekly slots.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClassSectionDetail {
    #[serde(flatten)]
    pub class: ClassSection,
    pub slots: Vec<TimeSlot>,
}

/// Catalog listing entry for students browsing open sections.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AvailableClass {
    #[serde(flatten)]
    pub class: ClassSection,
    pub course: Course,
    pub seats_left: i32,
    pub slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_create_dates"))]
pub struct CreateClassDto {
    pub course_id: CourseId,
    pub teacher_id: Option<UserId>,
    #[validate(length(min = 1, max = 50))]
    pub semester: String,
    #[validate(custom(function = "validate_academic_year"))]
    pub academic_year: String,
    #[validate(range(min = 1))]
    pub capacity: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(nested)]
    #[serde(default)]
    pub slots: Vec<TimeSlotInput>,
}

/// Partial update of a section. Absent fields keep their current value;
/// `slots`, when present, replaces the whole slot set.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateClassDto {
    /// Must match the current course if supplied; the course link is immutable
    pub course_id: Option<CourseId>,
    pub teacher_id: Option<UserId>,
    #[validate(length(min = 1, max = 50))]
    pub semester: Option<String>,
    #[validate(custom(function = "validate_academic_year"))]
    pub academic_year: Option<String>,
    #[validate(range(min = 1))]
    pub capacity: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[validate(nested)]
    pub slots: Option<Vec<TimeSlotInput>>,
}

impl UpdateClassDto {
    /// Changes when the section meets.
    pub fn reschedules(&self) -> bool {
        self.slots.is_some() || self.start_date.is_some() || self.end_date.is_some()
    }

    /// Touches fields that are frozen once the section has started. Staffing
    /// and labels stay editable for the life of the section.
    pub fn touches_frozen_fields(&self) -> bool {
        self.capacity.is_some() || self.reschedules()
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AssignTeacherDto {
    pub teacher_id: UserId,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SetClassStatusDto {
    pub status: ClassStatus,
}

fn validate_create_dates(dto: &CreateClassDto) -> Result<(), ValidationError> {
    if dto.end_date < dto.start_date {
        return Err(ValidationError::new("date_range")
            .with_message("end_date must not be earlier than start_date".into()));
    }
    Ok(())
}

/// Accepts `YYYY-YYYY` where the second year follows the first.
pub fn validate_academic_year(value: &str) -> Result<(), ValidationError> {
    let invalid = || {
        ValidationError::new("academic_year")
            .with_message("academic_year must look like 2025-2026".into())
    };

    let (first, second) = value.split_once('-').ok_or_else(invalid)?;
    if first.len() != 4 || second.len() != 4 {
        return Err(invalid());
    }
    let first: u16 = first.parse().map_err(|_| invalid())?;
    let second: u16 = second.parse().map_err(|_| invalid())?;
    if second != first + 1 {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeslots::DayOfWeek;
    use chrono::NaiveTime;

    fn create_dto() -> CreateClassDto {
        CreateClassDto {
            course_id: CourseId::new(),
            teacher_id: None,
            semester: "Fall".to_string(),
            academic_year: "2025-2026".to_string(),
            capacity: 40,
            start_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 12, 20).unwrap(),
            slots: vec![TimeSlotInput::new(
                DayOfWeek::Monday,
                NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            )],
        }
    }

    #[test]
    fn test_create_class_dto_validation() {
        assert!(create_dto().validate().is_ok());

        let mut zero_capacity = create_dto();
        zero_capacity.capacity = 0;
        assert!(zero_capacity.validate().is_err());

        let mut reversed = create_dto();
        reversed.end_date = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        assert!(reversed.validate().is_err());

        let mut same_day = create_dto();
        same_day.end_date = same_day.start_date;
        assert!(same_day.validate().is_ok());

        let mut bad_slot = create_dto();
        bad_slot.slots[0].end_time = NaiveTime::from_hms_opt(7, 0, 0).unwrap();
        assert!(bad_slot.validate().is_err());
    }

    #[test]
    fn test_academic_year_format() {
        assert!(validate_academic_year("2025-2026").is_ok());
        assert!(validate_academic_year("2025-2027").is_err());
        assert!(validate_academic_year("25-26").is_err());
        assert!(validate_academic_year("2025/2026").is_err());
        assert!(validate_academic_year("abcd-efgh").is_err());
    }

    #[test]
    fn test_status_transitions() {
        assert!(ClassStatus::Open.can_transition_to(ClassStatus::Closed));
        assert!(ClassStatus::Open.can_transition_to(ClassStatus::Cancelled));
        assert!(!ClassStatus::Closed.can_transition_to(ClassStatus::Open));
        assert!(!ClassStatus::Cancelled.can_transition_to(ClassStatus::Closed));
        assert!(!ClassStatus::Open.can_transition_to(ClassStatus::Open));
    }

    #[test]
    fn test_update_dto_frozen_fields() {
        assert!(!UpdateClassDto::default().touches_frozen_fields());

        let capacity_only = UpdateClassDto {
            capacity: Some(10),
            ..Default::default()
        };
        assert!(capacity_only.touches_frozen_fields());
        assert!(!capacity_only.reschedules());

        let moved = UpdateClassDto {
            end_date: NaiveDate::from_ymd_opt(2025, 12, 1),
            ..Default::default()
        };
        assert!(moved.reschedules());
        assert!(moved.touches_frozen_fields());

        let staffing = UpdateClassDto {
            teacher_id: Some(UserId::new()),
            semester: Some("Spring".to_string()),
            ..Default::default()
        };
        assert!(!staffing.touches_frozen_fields());
    }
}
