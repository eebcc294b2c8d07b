use chrono::NaiveDate;
use tracing::instrument;

use classroll_core::CoreError;
use classroll_db::{Store, StoreTx};
use classroll_models::{ClassId, CommittedSlot, Timetable, UserId, WeeklyWindow};

/// The proposed meeting window and the committed slot it collides with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub class_id: ClassId,
    pub detail: String,
}

impl From<Conflict> for CoreError {
    fn from(conflict: Conflict) -> Self {
        CoreError::ScheduleConflict {
            conflicting_class_id: conflict.class_id.into_inner(),
            detail: conflict.detail,
        }
    }
}

pub struct TimetableService;

impl TimetableService {
    /// First committed slot that a section running `start..=end` with
    /// `proposed` weekly slots would collide with.
    pub fn find_conflict<W: WeeklyWindow>(
        proposed: &[W],
        start: NaiveDate,
        end: NaiveDate,
        committed: &[CommittedSlot],
    ) -> Option<Conflict> {
        committed
            .iter()
            .filter(|c| c.runs_during(start, end))
            .find_map(|c| {
                proposed.iter().find(|p| p.overlaps(c)).map(|p| Conflict {
                    class_id: c.class_id,
                    detail: format!("{} overlaps {}", p.describe(), c.describe()),
                })
            })
    }

    /// Reject if `teacher_id` already teaches something at the same time.
    /// The caller holds the teacher's scope lock.
    #[instrument(skip(tx, proposed))]
    pub async fn check_teacher<W: WeeklyWindow + Sync>(
        tx: &mut dyn StoreTx,
        teacher_id: UserId,
        class_id: ClassId,
        proposed: &[W],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(), CoreError> {
        let committed = tx.teacher_commitments(teacher_id, Some(class_id)).await?;
        match Self::find_conflict(proposed, start, end, &committed) {
            Some(conflict) => {
                tracing::debug!(conflicting_class = %conflict.class_id, "teacher double-booked");
                Err(conflict.into())
            }
            None => Ok(()),
        }
    }

    /// Reject if `student_id` is actively enrolled in something at the same
    /// time. The caller holds the student's scope lock.
    #[instrument(skip(tx, proposed))]
    pub async fn check_student<W: WeeklyWindow + Sync>(
        tx: &mut dyn StoreTx,
        student_id: UserId,
        class_id: ClassId,
        proposed: &[W],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(), CoreError> {
        let committed = tx.student_commitments(student_id, Some(class_id)).await?;
        match Self::find_conflict(proposed, start, end, &committed) {
            Some(conflict) => {
                tracing::debug!(conflicting_class = %conflict.class_id, "student double-booked");
                Err(conflict.into())
            }
            None => Ok(()),
        }
    }

    #[instrument(skip(store))]
    pub async fn student_timetable(
        store: &dyn Store,
        student_id: UserId,
    ) -> Result<Timetable, CoreError> {
        let entries = store.student_timetable(student_id).await?;
        Ok(Timetable::new(student_id, entries))
    }

    #[instrument(skip(store))]
    pub async fn teacher_timetable(
        store: &dyn Store,
        teacher_id: UserId,
    ) -> Result<Timetable, CoreError> {
        let entries = store.teacher_timetable(teacher_id).await?;
        Ok(Timetable::new(teacher_id, entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use classroll_models::{DayOfWeek, TimeSlotInput};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn committed(day: DayOfWeek, start: NaiveTime, end: NaiveTime) -> CommittedSlot {
        CommittedSlot {
            class_id: ClassId::new(),
            class_start: d(2025, 9, 1),
            class_end: d(2025, 12, 20),
            day_of_week: day,
            start_time: start,
            end_time: end,
        }
    }

    #[test]
    fn overlapping_slot_in_same_term_conflicts() {
        let existing = committed(DayOfWeek::Monday, t(8, 0), t(10, 30));
        let proposed = [TimeSlotInput::new(DayOfWeek::Monday, t(9, 0), t(11, 0))];

        let conflict =
            TimetableService::find_conflict(&proposed, d(2025, 9, 1), d(2025, 12, 20), &[
                existing.clone(),
            ])
            .unwrap();
        assert_eq!(conflict.class_id, existing.class_id);
        assert!(conflict.detail.contains("Monday 09:00-11:00"));
        assert!(conflict.detail.contains("Monday 08:00-10:30"));
    }

    #[test]
    fn back_to_back_slots_do_not_conflict() {
        let existing = committed(DayOfWeek::Monday, t(8, 0), t(10, 30));
        let proposed = [TimeSlotInput::new(DayOfWeek::Monday, t(10, 30), t(12, 0))];
        assert!(
            TimetableService::find_conflict(&proposed, d(2025, 9, 1), d(2025, 12, 20), &[
                existing
            ])
            .is_none()
        );
    }

    #[test]
    fn disjoint_terms_do_not_conflict() {
        let existing = committed(DayOfWeek::Monday, t(8, 0), t(10, 30));
        let proposed = [TimeSlotInput::new(DayOfWeek::Monday, t(8, 0), t(10, 30))];
        assert!(
            TimetableService::find_conflict(&proposed, d(2026, 1, 10), d(2026, 5, 30), &[
                existing
            ])
            .is_none()
        );
    }

    #[test]
    fn conflict_converts_to_schedule_conflict() {
        let class_id = ClassId::new();
        let err: CoreError = Conflict {
            class_id,
            detail: "Monday 08:00-09:00 overlaps Monday 08:30-09:30".into(),
        }
        .into();
        assert_eq!(err.code(), "SCHEDULE_CONFLICT");
        assert!(matches!(
            err,
            CoreError::ScheduleConflict { conflicting_class_id, .. }
                if conflicting_class_id == class_id.into_inner()
        ));
    }
}
