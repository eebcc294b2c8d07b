//! The storage seam.
//!
//! Every mutation runs inside one [`StoreTx`]: the caller takes scope locks
//! (per student, per teacher) first, then the class row lock, reads, decides
//! and writes, and finally commits. Dropping a transaction without
//! committing rolls it back.
//!
//! Read-only queries on [`Store`] see the last committed state and never wait
//! on writers.

use async_trait::async_trait;
use classroll_models::{
    ClassId, ClassSection, CommittedSlot, Course, CourseId, Enrollment, EnrollmentId, Role,
    TimeSlot, TimetableEntry, UserId,
};

use crate::error::StoreError;

/// Serialization scope guarding a person's timetable. Scope locks must be
/// taken before any class lock, and several scopes in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockScope {
    Student(UserId),
    Teacher(UserId),
}

impl LockScope {
    pub(crate) fn namespace(&self) -> i32 {
        match self {
            LockScope::Student(_) => 1,
            LockScope::Teacher(_) => 2,
        }
    }

    pub(crate) fn user_id(&self) -> UserId {
        match self {
            LockScope::Student(id) | LockScope::Teacher(id) => *id,
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Open a transaction. Waiting for locks inside it is bounded by the
    /// configured lock timeout.
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;

    async fn user_role(&self, user_id: UserId) -> Result<Option<Role>, StoreError>;

    async fn get_course(&self, course_id: CourseId) -> Result<Option<Course>, StoreError>;

    async fn courses_by_ids(&self, ids: &[CourseId]) -> Result<Vec<Course>, StoreError>;

    async fn get_class(&self, class_id: ClassId) -> Result<Option<ClassSection>, StoreError>;

    /// All section ids, oldest first.
    async fn class_ids(&self) -> Result<Vec<ClassId>, StoreError>;

    /// Open sections with at least one free seat.
    async fn open_classes_with_seats(&self) -> Result<Vec<ClassSection>, StoreError>;

    async fn slots_for_classes(&self, ids: &[ClassId]) -> Result<Vec<TimeSlot>, StoreError>;

    /// Students holding an active enrollment in `class_id`, ascending.
    async fn active_student_ids(&self, class_id: ClassId) -> Result<Vec<UserId>, StoreError>;

    /// Sections in which `student_id` holds an active enrollment.
    async fn active_class_ids_for_student(
        &self,
        student_id: UserId,
    ) -> Result<Vec<ClassId>, StoreError>;

    async fn get_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Enrollment>, StoreError>;

    async fn student_timetable(&self, student_id: UserId)
    -> Result<Vec<TimetableEntry>, StoreError>;

    async fn teacher_timetable(&self, teacher_id: UserId)
    -> Result<Vec<TimetableEntry>, StoreError>;
}

#[async_trait]
pub trait StoreTx: Send {
    async fn lock_scope(&mut self, scope: LockScope) -> Result<(), StoreError>;

    /// Lock and load a section row.
    async fn lock_class(&mut self, class_id: ClassId) -> Result<Option<ClassSection>, StoreError>;

    /// Lock and load an enrollment row. Take the class lock first.
    async fn lock_enrollment(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Enrollment>, StoreError>;

    async fn user_role(&mut self, user_id: UserId) -> Result<Option<Role>, StoreError>;

    async fn get_course(&mut self, course_id: CourseId) -> Result<Option<Course>, StoreError>;

    async fn insert_course(&mut self, course: &Course) -> Result<(), StoreError>;

    async fn insert_class(&mut self, class: &ClassSection) -> Result<(), StoreError>;

    /// Persist every mutable column of a locked section.
    async fn update_class(&mut self, class: &ClassSection) -> Result<(), StoreError>;

    async fn class_slots(&mut self, class_id: ClassId) -> Result<Vec<TimeSlot>, StoreError>;

    async fn replace_class_slots(
        &mut self,
        class_id: ClassId,
        slots: &[TimeSlot],
    ) -> Result<(), StoreError>;

    /// Slots of every non-cancelled section taught by `teacher_id`.
    async fn teacher_commitments(
        &mut self,
        teacher_id: UserId,
        exclude: Option<ClassId>,
    ) -> Result<Vec<CommittedSlot>, StoreError>;

    /// Slots of every non-cancelled section `student_id` is actively enrolled in.
    async fn student_commitments(
        &mut self,
        student_id: UserId,
        exclude: Option<ClassId>,
    ) -> Result<Vec<CommittedSlot>, StoreError>;

    /// The active row for the pair if there is one, otherwise the most
    /// recently created row.
    async fn latest_enrollment(
        &mut self,
        student_id: UserId,
        class_id: ClassId,
    ) -> Result<Option<Enrollment>, StoreError>;

    async fn active_enrollments(&mut self, class_id: ClassId)
    -> Result<Vec<Enrollment>, StoreError>;

    async fn insert_enrollment(&mut self, enrollment: &Enrollment) -> Result<(), StoreError>;

    async fn update_enrollment(&mut self, enrollment: &Enrollment) -> Result<(), StoreError>;

    /// Rows currently holding a seat in `class_id`.
    async fn count_seat_holders(&mut self, class_id: ClassId) -> Result<i64, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
