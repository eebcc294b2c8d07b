//! Enrollment ledger rows.
//!
//! State machine per row:
//!
//! ```text
//! Active ──withdraw──▶ Withdrawn   (terminal)
//!   └────grade──────▶ Completed   (terminal, carries a grade)
//! ```
//!
//! Rows are never deleted; a student who withdraws and rejoins gets a fresh
//! `Active` row next to the old `Withdrawn` one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{ClassId, EnrollmentId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "enrollment_status", rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Withdrawn,
    Completed,
}

impl EnrollmentStatus {
    /// Whether a row in this state occupies a seat. Withdrawal frees the
    /// seat; completion does not.
    pub fn holds_seat(&self) -> bool {
        matches!(self, EnrollmentStatus::Active | EnrollmentStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "letter_grade")]
pub enum LetterGrade {
    A,
    B,
    C,
    D,
    F,
}

impl LetterGrade {
    /// Map a 0-10 score onto a letter.
    pub fn from_score(score: f64) -> Self {
        if score >= 8.5 {
            LetterGrade::A
        } else if score >= 7.0 {
            LetterGrade::B
        } else if score >= 5.5 {
            LetterGrade::C
        } else if score >= 4.0 {
            LetterGrade::D
        } else {
            LetterGrade::F
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student_id: UserId,
    pub class_id: ClassId,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
    pub withdrawn_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Set only when `status` is `Completed`
    pub grade: Option<LetterGrade>,
    pub score: Option<f64>,
}

impl Enrollment {
    pub fn new_active(student_id: UserId, class_id: ClassId, now: DateTime<Utc>) -> Self {
        Self {
            id: EnrollmentId::new(),
            student_id,
            class_id,
            status: EnrollmentStatus::Active,
            enrolled_at: now,
            withdrawn_at: None,
            completed_at: None,
            grade: None,
            score: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == EnrollmentStatus::Active
    }
}

/// Body for enroll and withdraw requests. Managers act on behalf of a
/// student by naming them; students omit the field and act for themselves.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct EnrollmentRequestDto {
    pub student_id: Option<UserId>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SetGradeDto {
    /// Score on a 0-10 scale
    #[validate(range(min = 0.0, max = 10.0))]
    pub score: f64,
}

/// One counter correction made by the reconciliation routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LiveEnrollmentCorrection {
    pub class_id: ClassId,
    pub recorded: i32,
    pub actual: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ReconcileReport {
    pub classes_checked: usize,
    pub corrections: Vec<LiveEnrollmentCorrection>,
    /// Sections whose seat-holding rows exceed capacity; left untouched
    pub over_capacity: Vec<ClassId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_holding_states() {
        assert!(EnrollmentStatus::Active.holds_seat());
        assert!(EnrollmentStatus::Completed.holds_seat());
        assert!(!EnrollmentStatus::Withdrawn.holds_seat());
    }

    #[test]
    fn test_score_to_letter() {
        assert_eq!(LetterGrade::from_score(10.0), LetterGrade::A);
        assert_eq!(LetterGrade::from_score(8.5), LetterGrade::A);
        assert_eq!(LetterGrade::from_score(8.49), LetterGrade::B);
        assert_eq!(LetterGrade::from_score(7.0), LetterGrade::B);
        assert_eq!(LetterGrade::from_score(5.5), LetterGrade::C);
        assert_eq!(LetterGrade::from_score(4.0), LetterGrade::D);
        assert_eq!(LetterGrade::from_score(3.99), LetterGrade::F);
        assert_eq!(LetterGrade::from_score(0.0), LetterGrade::F);
    }

    #[test]
    fn test_set_grade_dto_validation() {
        assert!(SetGradeDto { score: 7.5 }.validate().is_ok());
        assert!(SetGradeDto { score: -0.5 }.validate().is_err());
        assert!(SetGradeDto { score: 10.5 }.validate().is_err());
    }

    #[test]
    fn test_new_active_enrollment() {
        let now = Utc::now();
        let e = Enrollment::new_active(UserId::new(), ClassId::new(), now);
        assert!(e.is_active());
        assert_eq!(e.enrolled_at, now);
        assert!(e.grade.is_none());
    }
}
