//! Postgres-backed store.
//!
//! Scope locks are transaction-level advisory locks keyed by
//! `(namespace, hashtext(user_id))`; class and enrollment rows are locked with
//! `SELECT ... FOR UPDATE`. Every transaction sets a local `lock_timeout`, so
//! lock waits fail with SQLSTATE 55P03 instead of hanging, and that surfaces
//! as [`StoreError::Transient`].

use std::time::Duration;

use async_trait::async_trait;
use classroll_models::{
    ClassId, ClassSection, CommittedSlot, Course, CourseId, Enrollment, EnrollmentId, Role,
    TimeSlot, TimetableEntry, UserId,
};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{IntegrityViolation, StoreError};
use crate::store::{LockScope, Store, StoreTx};

macro_rules! class_columns {
    () => {
        "id, course_id, teacher_id, semester, academic_year, capacity, live_enrollment, \
         status, start_date, end_date, created_at, updated_at"
    };
}

macro_rules! enrollment_columns {
    () => {
        "id, student_id, class_id, status, enrolled_at, withdrawn_at, completed_at, grade, score"
    };
}

macro_rules! timetable_select {
    () => {
        "SELECT c.id AS class_id, co.code AS course_code, co.name AS course_name, \
         c.semester, c.academic_year, s.day_of_week, s.start_time, s.end_time, s.room \
         FROM class_sections c \
         JOIN courses co ON co.id = c.course_id \
         JOIN time_slots s ON s.class_id = c.id "
    };
}

macro_rules! commitment_select {
    () => {
        "SELECT c.id AS class_id, c.start_date AS class_start, c.end_date AS class_end, \
         s.day_of_week, s.start_time, s.end_time \
         FROM class_sections c \
         JOIN time_slots s ON s.class_id = c.id "
    };
}

/// Map a driver error onto the storage taxonomy.
pub(crate) fn classify(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => StoreError::Transient(err.to_string()),
        sqlx::Error::Database(db) => {
            let code = db.code();
            match code.as_deref() {
                // lock_not_available, serialization_failure, deadlock_detected, query_canceled
                Some("55P03" | "40001" | "40P01" | "57014") => {
                    StoreError::Transient(db.message().to_string())
                }
                Some("23505") => match db.constraint() {
                    Some("enrollments_one_active_idx") => {
                        StoreError::Integrity(IntegrityViolation::ActiveEnrollmentExists)
                    }
                    Some("courses_code_key") => {
                        StoreError::Integrity(IntegrityViolation::DuplicateCourseCode)
                    }
                    _ => StoreError::Backend(err.to_string()),
                },
                Some("23514") => match db.constraint() {
                    Some("class_sections_live_enrollment_check") => {
                        StoreError::Integrity(IntegrityViolation::CapacityExceeded)
                    }
                    _ => StoreError::Backend(err.to_string()),
                },
                Some("23503") => StoreError::Integrity(IntegrityViolation::MissingReference),
                _ => StoreError::Backend(err.to_string()),
            }
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

fn raw_ids<T: Copy + Into<Uuid>>(ids: &[T]) -> Vec<Uuid> {
    ids.iter().map(|id| (*id).into()).collect()
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await
            .map_err(classify)?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn user_role(&self, user_id: UserId) -> Result<Option<Role>, StoreError> {
        sqlx::query_scalar::<_, Role>("SELECT role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }

    async fn get_course(&self, course_id: CourseId) -> Result<Option<Course>, StoreError> {
        sqlx::query_as::<_, Course>(
            "SELECT id, code, name, credits, description, created_at FROM courses WHERE id = $1",
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn courses_by_ids(&self, ids: &[CourseId]) -> Result<Vec<Course>, StoreError> {
        sqlx::query_as::<_, Course>(
            "SELECT id, code, name, credits, description, created_at FROM courses WHERE id = ANY($1)",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn get_class(&self, class_id: ClassId) -> Result<Option<ClassSection>, StoreError> {
        sqlx::query_as::<_, ClassSection>(concat!(
            "SELECT ",
            class_columns!(),
            " FROM class_sections WHERE id = $1"
        ))
        .bind(class_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn class_ids(&self) -> Result<Vec<ClassId>, StoreError> {
        sqlx::query_scalar::<_, ClassId>("SELECT id FROM class_sections ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await
            .map_err(classify)
    }

    async fn open_classes_with_seats(&self) -> Result<Vec<ClassSection>, StoreError> {
        sqlx::query_as::<_, ClassSection>(concat!(
            "SELECT ",
            class_columns!(),
            " FROM class_sections WHERE status = 'open' AND live_enrollment < capacity \
             ORDER BY start_date, id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn slots_for_classes(&self, ids: &[ClassId]) -> Result<Vec<TimeSlot>, StoreError> {
        sqlx::query_as::<_, TimeSlot>(
            "SELECT id, class_id, day_of_week, start_time, end_time, room FROM time_slots \
             WHERE class_id = ANY($1) ORDER BY class_id, day_of_week, start_time",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn active_student_ids(&self, class_id: ClassId) -> Result<Vec<UserId>, StoreError> {
        sqlx::query_scalar::<_, UserId>(
            "SELECT student_id FROM enrollments WHERE class_id = $1 AND status = 'active' \
             ORDER BY student_id",
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn active_class_ids_for_student(
        &self,
        student_id: UserId,
    ) -> Result<Vec<ClassId>, StoreError> {
        sqlx::query_scalar::<_, ClassId>(
            "SELECT class_id FROM enrollments WHERE student_id = $1 AND status = 'active'",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn get_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Enrollment>, StoreError> {
        sqlx::query_as::<_, Enrollment>(concat!(
            "SELECT ",
            enrollment_columns!(),
            " FROM enrollments WHERE id = $1"
        ))
        .bind(enrollment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn student_timetable(
        &self,
        student_id: UserId,
    ) -> Result<Vec<TimetableEntry>, StoreError> {
        sqlx::query_as::<_, TimetableEntry>(concat!(
            timetable_select!(),
            "JOIN enrollments e ON e.class_id = c.id \
             WHERE e.student_id = $1 AND e.status = 'active' AND c.status <> 'cancelled'"
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn teacher_timetable(
        &self,
        teacher_id: UserId,
    ) -> Result<Vec<TimetableEntry>, StoreError> {
        sqlx::query_as::<_, TimetableEntry>(concat!(
            timetable_select!(),
            "WHERE c.teacher_id = $1 AND c.status <> 'cancelled'"
        ))
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn lock_scope(&mut self, scope: LockScope) -> Result<(), StoreError> {
        sqlx::query("SELECT pg_advisory_xact_lock($1, hashtext($2))")
            .bind(scope.namespace())
            .bind(scope.user_id().to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn lock_class(&mut self, class_id: ClassId) -> Result<Option<ClassSection>, StoreError> {
        sqlx::query_as::<_, ClassSection>(concat!(
            "SELECT ",
            class_columns!(),
            " FROM class_sections WHERE id = $1 FOR UPDATE"
        ))
        .bind(class_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(classify)
    }

    async fn lock_enrollment(
        &mut self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Enrollment>, StoreError> {
        sqlx::query_as::<_, Enrollment>(concat!(
            "SELECT ",
            enrollment_columns!(),
            " FROM enrollments WHERE id = $1 FOR UPDATE"
        ))
        .bind(enrollment_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(classify)
    }

    async fn user_role(&mut self, user_id: UserId) -> Result<Option<Role>, StoreError> {
        sqlx::query_scalar::<_, Role>("SELECT role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(classify)
    }

    async fn get_course(&mut self, course_id: CourseId) -> Result<Option<Course>, StoreError> {
        sqlx::query_as::<_, Course>(
            "SELECT id, code, name, credits, description, created_at FROM courses WHERE id = $1",
        )
        .bind(course_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(classify)
    }

    async fn insert_course(&mut self, course: &Course) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO courses (id, code, name, credits, description, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(course.id)
        .bind(&course.code)
        .bind(&course.name)
        .bind(course.credits)
        .bind(&course.description)
        .bind(course.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn insert_class(&mut self, class: &ClassSection) -> Result<(), StoreError> {
        sqlx::query(concat!(
            "INSERT INTO class_sections (",
            class_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(class.id)
        .bind(class.course_id)
        .bind(class.teacher_id)
        .bind(&class.semester)
        .bind(&class.academic_year)
        .bind(class.capacity)
        .bind(class.live_enrollment)
        .bind(class.status)
        .bind(class.start_date)
        .bind(class.end_date)
        .bind(class.created_at)
        .bind(class.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn update_class(&mut self, class: &ClassSection) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE class_sections SET teacher_id = $2, semester = $3, academic_year = $4, \
             capacity = $5, live_enrollment = $6, status = $7, start_date = $8, end_date = $9, \
             updated_at = $10 WHERE id = $1",
        )
        .bind(class.id)
        .bind(class.teacher_id)
        .bind(&class.semester)
        .bind(&class.academic_year)
        .bind(class.capacity)
        .bind(class.live_enrollment)
        .bind(class.status)
        .bind(class.start_date)
        .bind(class.end_date)
        .bind(class.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(classify)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Integrity(IntegrityViolation::MissingReference));
        }
        Ok(())
    }

    async fn class_slots(&mut self, class_id: ClassId) -> Result<Vec<TimeSlot>, StoreError> {
        sqlx::query_as::<_, TimeSlot>(
            "SELECT id, class_id, day_of_week, start_time, end_time, room FROM time_slots \
             WHERE class_id = $1 ORDER BY day_of_week, start_time",
        )
        .bind(class_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(classify)
    }

    async fn replace_class_slots(
        &mut self,
        class_id: ClassId,
        slots: &[TimeSlot],
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM time_slots WHERE class_id = $1")
            .bind(class_id)
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?;

        for slot in slots {
            sqlx::query(
                "INSERT INTO time_slots (id, class_id, day_of_week, start_time, end_time, room) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(slot.id)
            .bind(class_id)
            .bind(slot.day_of_week)
            .bind(slot.start_time)
            .bind(slot.end_time)
            .bind(&slot.room)
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?;
        }
        Ok(())
    }

    async fn teacher_commitments(
        &mut self,
        teacher_id: UserId,
        exclude: Option<ClassId>,
    ) -> Result<Vec<CommittedSlot>, StoreError> {
        sqlx::query_as::<_, CommittedSlot>(concat!(
            commitment_select!(),
            "WHERE c.teacher_id = $1 AND c.status <> 'cancelled' \
             AND ($2::uuid IS NULL OR c.id <> $2)"
        ))
        .bind(teacher_id)
        .bind(exclude)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(classify)
    }

    async fn student_commitments(
        &mut self,
        student_id: UserId,
        exclude: Option<ClassId>,
    ) -> Result<Vec<CommittedSlot>, StoreError> {
        sqlx::query_as::<_, CommittedSlot>(concat!(
            commitment_select!(),
            "JOIN enrollments e ON e.class_id = c.id \
             WHERE e.student_id = $1 AND e.status = 'active' AND c.status <> 'cancelled' \
             AND ($2::uuid IS NULL OR c.id <> $2)"
        ))
        .bind(student_id)
        .bind(exclude)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(classify)
    }

    async fn latest_enrollment(
        &mut self,
        student_id: UserId,
        class_id: ClassId,
    ) -> Result<Option<Enrollment>, StoreError> {
        sqlx::query_as::<_, Enrollment>(concat!(
            "SELECT ",
            enrollment_columns!(),
            " FROM enrollments WHERE student_id = $1 AND class_id = $2 \
             ORDER BY (status = 'active') DESC, seq DESC LIMIT 1"
        ))
        .bind(student_id)
        .bind(class_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(classify)
    }

    async fn active_enrollments(
        &mut self,
        class_id: ClassId,
    ) -> Result<Vec<Enrollment>, StoreError> {
        sqlx::query_as::<_, Enrollment>(concat!(
            "SELECT ",
            enrollment_columns!(),
            " FROM enrollments WHERE class_id = $1 AND status = 'active' ORDER BY seq FOR UPDATE"
        ))
        .bind(class_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(classify)
    }

    async fn insert_enrollment(&mut self, enrollment: &Enrollment) -> Result<(), StoreError> {
        sqlx::query(concat!(
            "INSERT INTO enrollments (",
            enrollment_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(enrollment.id)
        .bind(enrollment.student_id)
        .bind(enrollment.class_id)
        .bind(enrollment.status)
        .bind(enrollment.enrolled_at)
        .bind(enrollment.withdrawn_at)
        .bind(enrollment.completed_at)
        .bind(enrollment.grade)
        .bind(enrollment.score)
        .execute(&mut *self.tx)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn update_enrollment(&mut self, enrollment: &Enrollment) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE enrollments SET status = $2, withdrawn_at = $3, completed_at = $4, \
             grade = $5, score = $6 WHERE id = $1",
        )
        .bind(enrollment.id)
        .bind(enrollment.status)
        .bind(enrollment.withdrawn_at)
        .bind(enrollment.completed_at)
        .bind(enrollment.grade)
        .bind(enrollment.score)
        .execute(&mut *self.tx)
        .await
        .map_err(classify)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Integrity(IntegrityViolation::MissingReference));
        }
        Ok(())
    }

    async fn count_seat_holders(&mut self, class_id: ClassId) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM enrollments \
             WHERE class_id = $1 AND status IN ('active', 'completed')",
        )
        .bind(class_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(classify)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(classify)
    }
}
