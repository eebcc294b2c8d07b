//! Enrollment ledger.
//!
//! Every function here runs inside a transaction that already holds the
//! class row lock, and mutates the locked `ClassSection` in place so the
//! caller persists the counter alongside the ledger rows.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{instrument, warn};

use classroll_core::CoreError;
use classroll_db::StoreTx;
use classroll_models::{
    ClassSection, Enrollment, EnrollmentId, EnrollmentStatus, LetterGrade,
    LiveEnrollmentCorrection, UserId,
};

/// What reconciling one section found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    InSync,
    Corrected(LiveEnrollmentCorrection),
    /// More seat-holding rows than capacity; the counter cannot be made
    /// truthful without breaking the capacity constraint.
    OverCapacity { recorded: i32, actual: i32 },
}

pub struct LedgerService;

impl LedgerService {
    /// Last day on which an active enrollment may be withdrawn.
    pub fn withdrawal_deadline(class: &ClassSection, grace_days: i64) -> NaiveDate {
        class
            .start_date
            .checked_add_signed(Duration::days(grace_days))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Create an active row and take a seat. A withdrawn pair may enroll
    /// again; a completed one may not.
    #[instrument(skip(tx, class), fields(class_id = %class.id))]
    pub async fn enroll(
        tx: &mut dyn StoreTx,
        class: &mut ClassSection,
        student_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Enrollment, CoreError> {
        if let Some(existing) = tx.latest_enrollment(student_id, class.id).await? {
            match existing.status {
                EnrollmentStatus::Active => return Err(CoreError::AlreadyActive),
                EnrollmentStatus::Completed => return Err(CoreError::AlreadyCompleted),
                EnrollmentStatus::Withdrawn => {}
            }
        }

        if class.live_enrollment >= class.capacity {
            return Err(CoreError::CapacityFull);
        }

        let enrollment = Enrollment::new_active(student_id, class.id, now);
        tx.insert_enrollment(&enrollment).await?;

        class.live_enrollment += 1;
        class.updated_at = now;
        tx.update_class(class).await?;

        Ok(enrollment)
    }

    /// Move the pair's active row to `Withdrawn` and free its seat.
    #[instrument(skip(tx, class), fields(class_id = %class.id))]
    pub async fn withdraw(
        tx: &mut dyn StoreTx,
        class: &mut ClassSection,
        student_id: UserId,
        now: DateTime<Utc>,
        today: NaiveDate,
        grace_days: i64,
    ) -> Result<Enrollment, CoreError> {
        let mut enrollment = tx
            .latest_enrollment(student_id, class.id)
            .await?
            .ok_or_else(|| {
                CoreError::not_found(format!(
                    "Student {student_id} has no enrollment in class {}",
                    class.id
                ))
            })?;

        match enrollment.status {
            EnrollmentStatus::Active => {}
            EnrollmentStatus::Withdrawn => return Err(CoreError::AlreadyWithdrawn),
            EnrollmentStatus::Completed => return Err(CoreError::NotActive),
        }

        if today > Self::withdrawal_deadline(class, grace_days) {
            return Err(CoreError::WithdrawalClosed);
        }

        enrollment.status = EnrollmentStatus::Withdrawn;
        enrollment.withdrawn_at = Some(now);
        tx.update_enrollment(&enrollment).await?;

        Self::release_seat(tx, class).await?;
        class.updated_at = now;
        tx.update_class(class).await?;

        Ok(enrollment)
    }

    /// Record a final score. Completion keeps the seat.
    #[instrument(skip(tx, class), fields(class_id = %class.id))]
    pub async fn complete(
        tx: &mut dyn StoreTx,
        class: &ClassSection,
        enrollment_id: EnrollmentId,
        score: f64,
        now: DateTime<Utc>,
    ) -> Result<Enrollment, CoreError> {
        let mut enrollment = tx
            .lock_enrollment(enrollment_id)
            .await?
            .filter(|e| e.class_id == class.id)
            .ok_or_else(|| CoreError::not_found(format!("Enrollment {enrollment_id} not found")))?;

        if !enrollment.is_active() {
            return Err(CoreError::NotActive);
        }

        enrollment.status = EnrollmentStatus::Completed;
        enrollment.completed_at = Some(now);
        enrollment.score = Some(score);
        enrollment.grade = Some(LetterGrade::from_score(score));
        tx.update_enrollment(&enrollment).await?;

        Ok(enrollment)
    }

    /// Withdraw every active row of a section being cancelled.
    #[instrument(skip(tx, class), fields(class_id = %class.id))]
    pub async fn withdraw_all(
        tx: &mut dyn StoreTx,
        class: &mut ClassSection,
        now: DateTime<Utc>,
    ) -> Result<usize, CoreError> {
        let active = tx.active_enrollments(class.id).await?;
        let count = active.len();

        for mut enrollment in active {
            enrollment.status = EnrollmentStatus::Withdrawn;
            enrollment.withdrawn_at = Some(now);
            tx.update_enrollment(&enrollment).await?;
        }

        class.live_enrollment = Self::seat_holders(tx, class).await?;
        Ok(count)
    }

    /// Compare the counter with the ledger and repair drift.
    #[instrument(skip(tx, class), fields(class_id = %class.id))]
    pub async fn reconcile(
        tx: &mut dyn StoreTx,
        class: &mut ClassSection,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, CoreError> {
        let actual = Self::seat_holders(tx, class).await?;
        let recorded = class.live_enrollment;

        if actual == recorded {
            return Ok(ReconcileOutcome::InSync);
        }
        if actual > class.capacity {
            return Ok(ReconcileOutcome::OverCapacity { recorded, actual });
        }

        class.live_enrollment = actual;
        class.updated_at = now;
        tx.update_class(class).await?;

        Ok(ReconcileOutcome::Corrected(LiveEnrollmentCorrection {
            class_id: class.id,
            recorded,
            actual,
        }))
    }

    async fn release_seat(tx: &mut dyn StoreTx, class: &mut ClassSection) -> Result<(), CoreError> {
        if class.live_enrollment > 0 {
            class.live_enrollment -= 1;
            return Ok(());
        }
        warn!(class_id = %class.id, "live_enrollment already zero on withdrawal, recounting");
        class.live_enrollment = Self::seat_holders(tx, class).await?;
        Ok(())
    }

    async fn seat_holders(tx: &mut dyn StoreTx, class: &ClassSection) -> Result<i32, CoreError> {
        let count = tx.count_seat_holders(class.id).await?;
        i32::try_from(count).map_err(|_| CoreError::Internal)
    }
}
