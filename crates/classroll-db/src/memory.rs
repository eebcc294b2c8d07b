//! In-process store.
//!
//! Writers are serialized by a single async mutex held for the whole
//! transaction, so scope and row locks are implied and the lock methods only
//! check existence. Each transaction edits a private copy of the committed
//! state; `commit` publishes the copy and dropping the transaction discards
//! it. Readers clone the published snapshot and never wait on writers.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
#[cfg(any(test, feature = "test-utils"))]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use classroll_models::{
    ClassId, ClassSection, ClassStatus, CommittedSlot, Course, CourseId, Enrollment, EnrollmentId,
    Role, TimeSlot, TimetableEntry, UserId,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{IntegrityViolation, StoreError};
use crate::store::{LockScope, Store, StoreTx};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<UserId, Role>,
    courses: HashMap<CourseId, Course>,
    classes: HashMap<ClassId, ClassSection>,
    slots: HashMap<ClassId, Vec<TimeSlot>>,
    /// Insertion order doubles as creation order.
    enrollments: Vec<Enrollment>,
}

impl MemoryState {
    fn course_code_taken(&self, code: &str) -> bool {
        self.courses.values().any(|c| c.code == code)
    }

    fn commitments<'a>(
        &'a self,
        classes: impl Iterator<Item = &'a ClassSection>,
    ) -> Vec<CommittedSlot> {
        classes
            .filter(|c| c.status != ClassStatus::Cancelled)
            .flat_map(|class| {
                self.slots
                    .get(&class.id)
                    .into_iter()
                    .flatten()
                    .map(move |slot| CommittedSlot {
                        class_id: class.id,
                        class_start: class.start_date,
                        class_end: class.end_date,
                        day_of_week: slot.day_of_week,
                        start_time: slot.start_time,
                        end_time: slot.end_time,
                    })
            })
            .collect()
    }

    fn timetable<'a>(
        &'a self,
        classes: impl Iterator<Item = &'a ClassSection>,
    ) -> Vec<TimetableEntry> {
        classes
            .filter(|c| c.status != ClassStatus::Cancelled)
            .filter_map(|class| self.courses.get(&class.course_id).map(|course| (class, course)))
            .flat_map(|(class, course)| {
                self.slots
                    .get(&class.id)
                    .into_iter()
                    .flatten()
                    .map(move |slot| TimetableEntry {
                        class_id: class.id,
                        course_code: course.code.clone(),
                        course_name: course.name.clone(),
                        semester: class.semester.clone(),
                        academic_year: class.academic_year.clone(),
                        day_of_week: slot.day_of_week,
                        start_time: slot.start_time,
                        end_time: slot.end_time,
                        room: slot.room.clone(),
                    })
            })
            .collect()
    }

    fn active_class_ids(&self, student_id: UserId) -> Vec<ClassId> {
        self.enrollments
            .iter()
            .filter(|e| e.student_id == student_id && e.is_active())
            .map(|e| e.class_id)
            .collect()
    }
}

/// Store kept entirely in memory. Cloning yields another handle to the same data.
#[derive(Clone)]
pub struct MemoryStore {
    writer: Arc<Mutex<()>>,
    committed: Arc<RwLock<Arc<MemoryState>>>,
    lock_timeout: Duration,
    #[cfg(any(test, feature = "test-utils"))]
    injected_failures: Arc<AtomicUsize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl MemoryStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            writer: Arc::new(Mutex::new(())),
            committed: Arc::new(RwLock::new(Arc::new(MemoryState::default()))),
            lock_timeout,
            #[cfg(any(test, feature = "test-utils"))]
            injected_failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn snapshot(&self) -> Arc<MemoryState> {
        self.committed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Register a user. Identity management lives outside the core, so this
    /// is how seeds and tests populate the directory.
    pub async fn add_user(&self, user_id: UserId, role: Role) -> Result<(), StoreError> {
        let mut tx = self.begin_memory().await?;
        tx.working.users.insert(user_id, role);
        tx.publish();
        Ok(())
    }

    /// Overwrite a section's counter without touching enrollment rows.
    /// Simulates drift for reconciliation tests.
    #[cfg(any(test, feature = "test-utils"))]
    pub async fn force_live_enrollment(
        &self,
        class_id: ClassId,
        value: i32,
    ) -> Result<(), StoreError> {
        let mut tx = self.begin_memory().await?;
        if let Some(class) = tx.working.classes.get_mut(&class_id) {
            class.live_enrollment = value;
        }
        tx.publish();
        Ok(())
    }

    /// Make the next `count` calls to `begin` fail with a transient error.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn fail_next_begins(&self, count: usize) {
        self.injected_failures.store(count, Ordering::SeqCst);
    }

    #[cfg(any(test, feature = "test-utils"))]
    fn take_injected_failure(&self) -> bool {
        self.injected_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    async fn begin_memory(&self) -> Result<MemoryTx, StoreError> {
        #[cfg(any(test, feature = "test-utils"))]
        if self.take_injected_failure() {
            return Err(StoreError::Transient("injected failure".to_string()));
        }

        let guard = tokio::time::timeout(self.lock_timeout, self.writer.clone().lock_owned())
            .await
            .map_err(|_| StoreError::Transient("timed out waiting for store lock".to_string()))?;

        Ok(MemoryTx {
            _guard: guard,
            working: (*self.snapshot()).clone(),
            committed: self.committed.clone(),
        })
    }
}

pub struct MemoryTx {
    _guard: OwnedMutexGuard<()>,
    working: MemoryState,
    committed: Arc<RwLock<Arc<MemoryState>>>,
}

impl MemoryTx {
    fn publish(self) {
        let MemoryTx {
            _guard,
            working,
            committed,
        } = self;
        *committed.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(working);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        Ok(Box::new(self.begin_memory().await?))
    }

    async fn user_role(&self, user_id: UserId) -> Result<Option<Role>, StoreError> {
        Ok(self.snapshot().users.get(&user_id).copied())
    }

    async fn get_course(&self, course_id: CourseId) -> Result<Option<Course>, StoreError> {
        Ok(self.snapshot().courses.get(&course_id).cloned())
    }

    async fn courses_by_ids(&self, ids: &[CourseId]) -> Result<Vec<Course>, StoreError> {
        let state = self.snapshot();
        Ok(ids
            .iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .filter_map(|id| state.courses.get(id).cloned())
            .collect())
    }

    async fn get_class(&self, class_id: ClassId) -> Result<Option<ClassSection>, StoreError> {
        Ok(self.snapshot().classes.get(&class_id).cloned())
    }

    async fn class_ids(&self) -> Result<Vec<ClassId>, StoreError> {
        let state = self.snapshot();
        let mut classes: Vec<&ClassSection> = state.classes.values().collect();
        classes.sort_by_key(|c| (c.created_at, c.id));
        Ok(classes.into_iter().map(|c| c.id).collect())
    }

    async fn open_classes_with_seats(&self) -> Result<Vec<ClassSection>, StoreError> {
        let state = self.snapshot();
        let mut classes: Vec<ClassSection> = state
            .classes
            .values()
            .filter(|c| c.status == ClassStatus::Open && c.live_enrollment < c.capacity)
            .cloned()
            .collect();
        classes.sort_by_key(|c| (c.start_date, c.id));
        Ok(classes)
    }

    async fn slots_for_classes(&self, ids: &[ClassId]) -> Result<Vec<TimeSlot>, StoreError> {
        let state = self.snapshot();
        Ok(ids
            .iter()
            .filter_map(|id| state.slots.get(id))
            .flatten()
            .cloned()
            .collect())
    }

    async fn active_student_ids(&self, class_id: ClassId) -> Result<Vec<UserId>, StoreError> {
        let state = self.snapshot();
        let mut ids: Vec<UserId> = state
            .enrollments
            .iter()
            .filter(|e| e.class_id == class_id && e.is_active())
            .map(|e| e.student_id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn active_class_ids_for_student(
        &self,
        student_id: UserId,
    ) -> Result<Vec<ClassId>, StoreError> {
        Ok(self.snapshot().active_class_ids(student_id))
    }

    async fn get_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Enrollment>, StoreError> {
        Ok(self
            .snapshot()
            .enrollments
            .iter()
            .find(|e| e.id == enrollment_id)
            .cloned())
    }

    async fn student_timetable(
        &self,
        student_id: UserId,
    ) -> Result<Vec<TimetableEntry>, StoreError> {
        let state = self.snapshot();
        let ids = state.active_class_ids(student_id);
        Ok(state.timetable(ids.iter().filter_map(|id| state.classes.get(id))))
    }

    async fn teacher_timetable(
        &self,
        teacher_id: UserId,
    ) -> Result<Vec<TimetableEntry>, StoreError> {
        let state = self.snapshot();
        Ok(state.timetable(
            state
                .classes
                .values()
                .filter(|c| c.teacher_id == Some(teacher_id)),
        ))
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_scope(&mut self, _scope: LockScope) -> Result<(), StoreError> {
        Ok(())
    }

    async fn lock_class(&mut self, class_id: ClassId) -> Result<Option<ClassSection>, StoreError> {
        Ok(self.working.classes.get(&class_id).cloned())
    }

    async fn lock_enrollment(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Enrollment>, StoreError> {
        Ok(self
            .working
            .enrollments
            .iter()
            .find(|e| e.id == enrollment_id)
            .cloned())
    }

    async fn user_role(&mut self, user_id: UserId) -> Result<Option<Role>, StoreError> {
        Ok(self.working.users.get(&user_id).copied())
    }

    async fn get_course(&mut self, course_id: CourseId) -> Result<Option<Course>, StoreError> {
        Ok(self.working.courses.get(&course_id).cloned())
    }

    async fn insert_course(&mut self, course: &Course) -> Result<(), StoreError> {
        if self.working.course_code_taken(&course.code) {
            return Err(StoreError::Integrity(IntegrityViolation::DuplicateCourseCode));
        }
        self.working.courses.insert(course.id, course.clone());
        Ok(())
    }

    async fn insert_class(&mut self, class: &ClassSection) -> Result<(), StoreError> {
        if !self.working.courses.contains_key(&class.course_id) {
            return Err(StoreError::Integrity(IntegrityViolation::MissingReference));
        }
        check_counter(class)?;
        self.working.classes.insert(class.id, class.clone());
        Ok(())
    }

    async fn update_class(&mut self, class: &ClassSection) -> Result<(), StoreError> {
        check_counter(class)?;
        match self.working.classes.get_mut(&class.id) {
            Some(existing) => {
                *existing = class.clone();
                Ok(())
            }
            None => Err(StoreError::Integrity(IntegrityViolation::MissingReference)),
        }
    }

    async fn class_slots(&mut self, class_id: ClassId) -> Result<Vec<TimeSlot>, StoreError> {
        Ok(self
            .working
            .slots
            .get(&class_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_class_slots(
        &mut self,
        class_id: ClassId,
        slots: &[TimeSlot],
    ) -> Result<(), StoreError> {
        if !self.working.classes.contains_key(&class_id) {
            return Err(StoreError::Integrity(IntegrityViolation::MissingReference));
        }
        self.working.slots.insert(class_id, slots.to_vec());
        Ok(())
    }

    async fn teacher_commitments(
        &mut self,
        teacher_id: UserId,
        exclude: Option<ClassId>,
    ) -> Result<Vec<CommittedSlot>, StoreError> {
        let state = &self.working;
        Ok(state.commitments(
            state
                .classes
                .values()
                .filter(|c| c.teacher_id == Some(teacher_id) && Some(c.id) != exclude),
        ))
    }

    async fn student_commitments(
        &mut self,
        student_id: UserId,
        exclude: Option<ClassId>,
    ) -> Result<Vec<CommittedSlot>, StoreError> {
        let state = &self.working;
        let ids = state.active_class_ids(student_id);
        Ok(state.commitments(
            ids.iter()
                .filter(|id| Some(**id) != exclude)
                .filter_map(|id| state.classes.get(id)),
        ))
    }

    async fn latest_enrollment(
        &mut self,
        student_id: UserId,
        class_id: ClassId,
    ) -> Result<Option<Enrollment>, StoreError> {
        let rows = self
            .working
            .enrollments
            .iter()
            .filter(|e| e.student_id == student_id && e.class_id == class_id);
        let mut latest = None;
        for row in rows {
            if row.is_active() {
                return Ok(Some(row.clone()));
            }
            latest = Some(row);
        }
        Ok(latest.cloned())
    }

    async fn active_enrollments(
        &mut self,
        class_id: ClassId,
    ) -> Result<Vec<Enrollment>, StoreError> {
        Ok(self
            .working
            .enrollments
            .iter()
            .filter(|e| e.class_id == class_id && e.is_active())
            .cloned()
            .collect())
    }

    async fn insert_enrollment(&mut self, enrollment: &Enrollment) -> Result<(), StoreError> {
        let state = &mut self.working;
        if !state.classes.contains_key(&enrollment.class_id)
            || !state.users.contains_key(&enrollment.student_id)
        {
            return Err(StoreError::Integrity(IntegrityViolation::MissingReference));
        }
        if enrollment.is_active()
            && state.enrollments.iter().any(|e| {
                e.is_active()
                    && e.student_id == enrollment.student_id
                    && e.class_id == enrollment.class_id
            })
        {
            return Err(StoreError::Integrity(
                IntegrityViolation::ActiveEnrollmentExists,
            ));
        }
        state.enrollments.push(enrollment.clone());
        Ok(())
    }

    async fn update_enrollment(&mut self, enrollment: &Enrollment) -> Result<(), StoreError> {
        match self
            .working
            .enrollments
            .iter_mut()
            .find(|e| e.id == enrollment.id)
        {
            Some(existing) => {
                *existing = enrollment.clone();
                Ok(())
            }
            None => Err(StoreError::Integrity(IntegrityViolation::MissingReference)),
        }
    }

    async fn count_seat_holders(&mut self, class_id: ClassId) -> Result<i64, StoreError> {
        Ok(self
            .working
            .enrollments
            .iter()
            .filter(|e| e.class_id == class_id && e.status.holds_seat())
            .count() as i64)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.publish();
        Ok(())
    }
}

/// Mirrors the table CHECK constraints on the counter.
fn check_counter(class: &ClassSection) -> Result<(), StoreError> {
    if class.capacity <= 0 || class.live_enrollment < 0 || class.live_enrollment > class.capacity {
        return Err(StoreError::Integrity(IntegrityViolation::CapacityExceeded));
    }
    Ok(())
}
