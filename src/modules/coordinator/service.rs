use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

use classroll_config::SchedulingConfig;
use classroll_core::{Clock, CoreError};
use classroll_db::{LockScope, Store};
use classroll_models::{
    Actor, AvailableClass, ClassId, ClassSection, ClassSectionDetail, ClassStatus, Course,
    CourseId, CreateClassDto, CreateCourseDto, Enrollment, EnrollmentId, ReconcileReport, Role,
    Timetable, UpdateClassDto, UserId,
};

use crate::metrics::{track_enrollment_attempt, track_reconciled, track_retry};
use crate::modules::catalog::service::CatalogService;
use crate::modules::ledger::service::{LedgerService, ReconcileOutcome};
use crate::modules::timetable::service::TimetableService;
use crate::utils::auth_helpers::{require_manager, require_self_or_manager, resolve_student};

pub struct Coordinator {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    config: SchedulingConfig,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: SchedulingConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Run `attempt`, and once more after a short jittered pause if it failed
    /// transiently. Each attempt opens its own transaction, so a failed one
    /// leaves nothing behind.
    async fn retrying<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        match attempt().await {
            Err(err) if err.is_retryable() => {
                let pause = self.backoff();
                track_retry(operation);
                debug!(operation, pause_ms = pause.as_millis() as u64, "retrying after transient failure");
                tokio::time::sleep(pause).await;
                attempt().await
            }
            outcome => outcome,
        }
    }

    fn backoff(&self) -> Duration {
        let base = self.config.retry_backoff.as_millis() as u64;
        let jitter = rand::thread_rng().gen_range(0..=base);
        Duration::from_millis(base + jitter)
    }

    // Enrollment

    #[instrument(skip(self))]
    pub async fn enroll_student(
        &self,
        actor: &Actor,
        class_id: ClassId,
        student_id: Option<UserId>,
    ) -> Result<Enrollment, CoreError> {
        let student_id = resolve_student(actor, student_id)?;

        let result = self
            .retrying("enroll", || self.try_enroll(student_id, class_id))
            .await;

        match &result {
            Ok(enrollment) => {
                track_enrollment_attempt("enrolled");
                info!(enrollment_id = %enrollment.id, %student_id, %class_id, "student enrolled");
            }
            Err(err) => {
                track_enrollment_attempt(err.code());
                debug!(%student_id, %class_id, outcome = err.code(), "enrollment rejected");
            }
        }
        result
    }

    async fn try_enroll(
        &self,
        student_id: UserId,
        class_id: ClassId,
    ) -> Result<Enrollment, CoreError> {
        let mut tx = self.store.begin().await?;

        CatalogService::require_role(tx.as_mut(), student_id, Role::Student).await?;
        tx.lock_scope(LockScope::Student(student_id)).await?;
        let mut class = tx
            .lock_class(class_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("Class {class_id} not found")))?;

        CatalogService::ensure_enrollable(
            &class,
            self.clock.today(),
            self.config.enrollment_grace_days,
        )?;

        let slots = tx.class_slots(class_id).await?;
        TimetableService::check_student(
            tx.as_mut(),
            student_id,
            class_id,
            &slots,
            class.start_date,
            class.end_date,
        )
        .await?;

        let enrollment =
            LedgerService::enroll(tx.as_mut(), &mut class, student_id, self.clock.now()).await?;

        tx.commit().await?;
        Ok(enrollment)
    }

    #[instrument(skip(self))]
    pub async fn withdraw(
        &self,
        actor: &Actor,
        class_id: ClassId,
        student_id: Option<UserId>,
    ) -> Result<Enrollment, CoreError> {
        let student_id = resolve_student(actor, student_id)?;

        let enrollment = self
            .retrying("withdraw", || self.try_withdraw(student_id, class_id))
            .await?;

        info!(enrollment_id = %enrollment.id, %student_id, %class_id, "student withdrawn");
        Ok(enrollment)
    }

    async fn try_withdraw(
        &self,
        student_id: UserId,
        class_id: ClassId,
    ) -> Result<Enrollment, CoreError> {
        let mut tx = self.store.begin().await?;

        tx.lock_scope(LockScope::Student(student_id)).await?;
        let mut class = tx
            .lock_class(class_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("Class {class_id} not found")))?;

        let enrollment = LedgerService::withdraw(
            tx.as_mut(),
            &mut class,
            student_id,
            self.clock.now(),
            self.clock.today(),
            self.config.withdrawal_grace_days,
        )
        .await?;

        tx.commit().await?;
        Ok(enrollment)
    }

    #[instrument(skip(self))]
    pub async fn set_grade(
        &self,
        actor: &Actor,
        enrollment_id: EnrollmentId,
        score: f64,
    ) -> Result<Enrollment, CoreError> {
        match actor.role {
            Role::Manager | Role::Teacher => {}
            Role::Student => return Err(CoreError::forbidden("Students cannot record grades")),
        }
        if !(0.0..=10.0).contains(&score) {
            return Err(CoreError::validation("score must be between 0 and 10"));
        }

        let enrollment = self
            .retrying("set_grade", || self.try_set_grade(actor, enrollment_id, score))
            .await?;

        info!(%enrollment_id, grade = ?enrollment.grade, "grade recorded");
        Ok(enrollment)
    }

    async fn try_set_grade(
        &self,
        actor: &Actor,
        enrollment_id: EnrollmentId,
        score: f64,
    ) -> Result<Enrollment, CoreError> {
        let class_id = self
            .store
            .get_enrollment(enrollment_id)
            .await?
            .map(|e| e.class_id)
            .ok_or_else(|| CoreError::not_found(format!("Enrollment {enrollment_id} not found")))?;

        let mut tx = self.store.begin().await?;
        let class = tx
            .lock_class(class_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("Class {class_id} not found")))?;

        match actor.role {
            Role::Manager => {}
            Role::Teacher if class.teacher_id == Some(actor.user_id) => {}
            Role::Teacher | Role::Student => {
                return Err(CoreError::forbidden(
                    "Only the assigned teacher or a manager may grade this class",
                ));
            }
        }

        let enrollment =
            LedgerService::complete(tx.as_mut(), &class, enrollment_id, score, self.clock.now())
                .await?;

        tx.commit().await?;
        Ok(enrollment)
    }

    // Catalog

    #[instrument(skip(self))]
    pub async fn create_course(
        &self,
        actor: &Actor,
        dto: CreateCourseDto,
    ) -> Result<Course, CoreError> {
        require_manager(actor, "create courses")?;
        dto.validate()?;

        let course = self
            .retrying("create_course", || {
                let dto = dto.clone();
                async move {
                    let mut tx = self.store.begin().await?;
                    let course =
                        CatalogService::create_course(tx.as_mut(), dto, self.clock.now()).await?;
                    tx.commit().await?;
                    Ok::<_, CoreError>(course)
                }
            })
            .await?;

        info!(course_id = %course.id, code = %course.code, "course created");
        Ok(course)
    }

    #[instrument(skip(self))]
    pub async fn get_course(&self, course_id: CourseId) -> Result<Course, CoreError> {
        CatalogService::get_course(self.store.as_ref(), course_id).await
    }

    #[instrument(skip(self))]
    pub async fn get_class(&self, class_id: ClassId) -> Result<ClassSectionDetail, CoreError> {
        CatalogService::get_class(self.store.as_ref(), class_id).await
    }

    /// Students see what they could still join; staff see every open section
    /// with seats.
    #[instrument(skip(self))]
    pub async fn list_available_classes(
        &self,
        actor: &Actor,
    ) -> Result<Vec<AvailableClass>, CoreError> {
        let student_id = match actor.role {
            Role::Student => Some(actor.user_id),
            Role::Teacher | Role::Manager => None,
        };

        CatalogService::list_available(
            self.store.as_ref(),
            student_id,
            self.clock.today(),
            self.config.enrollment_grace_days,
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn create_class(
        &self,
        actor: &Actor,
        dto: CreateClassDto,
    ) -> Result<ClassSectionDetail, CoreError> {
        require_manager(actor, "create classes")?;
        dto.validate()?;

        let detail = self
            .retrying("create_class", || self.try_create_class(dto.clone()))
            .await?;

        info!(class_id = %detail.class.id, course_id = %detail.class.course_id, "class created");
        Ok(detail)
    }

    async fn try_create_class(&self, dto: CreateClassDto) -> Result<ClassSectionDetail, CoreError> {
        let (class, slots) = CatalogService::new_class(dto, self.clock.now())?;
        let mut tx = self.store.begin().await?;

        if let Some(teacher_id) = class.teacher_id {
            CatalogService::require_role(tx.as_mut(), teacher_id, Role::Teacher).await?;
            tx.lock_scope(LockScope::Teacher(teacher_id)).await?;
        }

        if tx.get_course(class.course_id).await?.is_none() {
            return Err(CoreError::validation(format!(
                "Course {} does not exist",
                class.course_id
            )));
        }

        if let Some(teacher_id) = class.teacher_id {
            TimetableService::check_teacher(
                tx.as_mut(),
                teacher_id,
                class.id,
                &slots,
                class.start_date,
                class.end_date,
            )
            .await?;
        }

        tx.insert_class(&class).await?;
        tx.replace_class_slots(class.id, &slots).await?;
        tx.commit().await?;

        Ok(ClassSectionDetail { class, slots })
    }

    #[instrument(skip(self))]
    pub async fn update_class(
        &self,
        actor: &Actor,
        class_id: ClassId,
        patch: UpdateClassDto,
    ) -> Result<ClassSectionDetail, CoreError> {
        require_manager(actor, "update classes")?;
        patch.validate()?;

        let detail = self
            .retrying("update_class", || self.try_update_class(class_id, &patch))
            .await?;

        info!(%class_id, "class updated");
        Ok(detail)
    }

    async fn try_update_class(
        &self,
        class_id: ClassId,
        patch: &UpdateClassDto,
    ) -> Result<ClassSectionDetail, CoreError> {
        let reschedules = patch.reschedules();

        // Scope locks come before the class lock, so who to lock is read from
        // the last committed state and re-checked once the class is locked.
        let seen = self
            .store
            .get_class(class_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("Class {class_id} not found")))?;
        let seen_students = if reschedules {
            self.store.active_student_ids(class_id).await?
        } else {
            Vec::new()
        };
        let teacher_id = patch.teacher_id.or(seen.teacher_id);
        let checks_teacher = patch.teacher_id.is_some() || reschedules;

        let mut tx = self.store.begin().await?;

        if let Some(new_teacher) = patch.teacher_id {
            CatalogService::require_role(tx.as_mut(), new_teacher, Role::Teacher).await?;
        }

        let mut scopes: Vec<LockScope> = seen_students
            .iter()
            .copied()
            .map(LockScope::Student)
            .collect();
        if let Some(teacher_id) = teacher_id
            && checks_teacher
        {
            scopes.push(LockScope::Teacher(teacher_id));
        }
        scopes.sort();
        scopes.dedup();
        for scope in scopes {
            tx.lock_scope(scope).await?;
        }

        let class = tx
            .lock_class(class_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("Class {class_id} not found")))?;

        let mut locked_students: Vec<UserId> = if reschedules {
            tx.active_enrollments(class_id)
                .await?
                .into_iter()
                .map(|e| e.student_id)
                .collect()
        } else {
            Vec::new()
        };
        locked_students.sort();
        if class.teacher_id != seen.teacher_id || locked_students != seen_students {
            warn!(%class_id, "class changed between snapshot and lock");
            return Err(CoreError::Unavailable);
        }

        let today = self.clock.today();
        if patch.touches_frozen_fields() {
            CatalogService::ensure_editable(&class, today)?;
        } else if patch.teacher_id.is_some() {
            CatalogService::ensure_staffable(&class, today)?;
        }
        let next = CatalogService::apply_update(&class, patch, self.clock.now())?;

        let slots = match &patch.slots {
            Some(inputs) => CatalogService::prepare_slots(class_id, inputs.clone())?,
            None => tx.class_slots(class_id).await?,
        };

        if let Some(teacher_id) = next.teacher_id
            && checks_teacher
        {
            TimetableService::check_teacher(
                tx.as_mut(),
                teacher_id,
                class_id,
                &slots,
                next.start_date,
                next.end_date,
            )
            .await?;
        }

        if reschedules {
            for student_id in &seen_students {
                TimetableService::check_student(
                    tx.as_mut(),
                    *student_id,
                    class_id,
                    &slots,
                    next.start_date,
                    next.end_date,
                )
                .await?;
            }
        }

        tx.update_class(&next).await?;
        if patch.slots.is_some() {
            tx.replace_class_slots(class_id, &slots).await?;
        }
        tx.commit().await?;

        Ok(ClassSectionDetail { class: next, slots })
    }

    #[instrument(skip(self))]
    pub async fn assign_teacher(
        &self,
        actor: &Actor,
        class_id: ClassId,
        teacher_id: UserId,
    ) -> Result<ClassSection, CoreError> {
        require_manager(actor, "assign teachers")?;

        let class = self
            .retrying("assign_teacher", || self.try_assign_teacher(class_id, teacher_id))
            .await?;

        info!(%class_id, %teacher_id, "teacher assigned");
        Ok(class)
    }

    async fn try_assign_teacher(
        &self,
        class_id: ClassId,
        teacher_id: UserId,
    ) -> Result<ClassSection, CoreError> {
        let mut tx = self.store.begin().await?;

        CatalogService::require_role(tx.as_mut(), teacher_id, Role::Teacher).await?;
        tx.lock_scope(LockScope::Teacher(teacher_id)).await?;
        let mut class = tx
            .lock_class(class_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("Class {class_id} not found")))?;

        CatalogService::ensure_staffable(&class, self.clock.today())?;

        let slots = tx.class_slots(class_id).await?;
        TimetableService::check_teacher(
            tx.as_mut(),
            teacher_id,
            class_id,
            &slots,
            class.start_date,
            class.end_date,
        )
        .await?;

        class.teacher_id = Some(teacher_id);
        class.updated_at = self.clock.now();
        tx.update_class(&class).await?;
        tx.commit().await?;

        Ok(class)
    }

    #[instrument(skip(self))]
    pub async fn set_class_status(
        &self,
        actor: &Actor,
        class_id: ClassId,
        status: ClassStatus,
    ) -> Result<ClassSection, CoreError> {
        require_manager(actor, "change class status")?;

        let class = self
            .retrying("set_class_status", move || async move {
                let mut tx = self.store.begin().await?;
                let mut class = tx
                    .lock_class(class_id)
                    .await?
                    .ok_or_else(|| CoreError::not_found(format!("Class {class_id} not found")))?;

                CatalogService::ensure_transition(&class, status)?;

                let now = self.clock.now();
                if status == ClassStatus::Cancelled {
                    let withdrawn = LedgerService::withdraw_all(tx.as_mut(), &mut class, now).await?;
                    info!(%class_id, withdrawn, "enrollments withdrawn by cancellation");
                }

                class.status = status;
                class.updated_at = now;
                tx.update_class(&class).await?;
                tx.commit().await?;
                Ok::<_, CoreError>(class)
            })
            .await?;

        info!(%class_id, %status, "class status changed");
        Ok(class)
    }

    // Timetables

    #[instrument(skip(self))]
    pub async fn student_timetable(
        &self,
        actor: &Actor,
        student_id: UserId,
    ) -> Result<Timetable, CoreError> {
        require_self_or_manager(actor, student_id)?;
        TimetableService::student_timetable(self.store.as_ref(), student_id).await
    }

    #[instrument(skip(self))]
    pub async fn teacher_timetable(
        &self,
        actor: &Actor,
        teacher_id: UserId,
    ) -> Result<Timetable, CoreError> {
        require_self_or_manager(actor, teacher_id)?;
        TimetableService::teacher_timetable(self.store.as_ref(), teacher_id).await
    }

    // Maintenance

    /// Recount seat-holding rows for one section, or all of them, and repair
    /// drifted counters. Each section is handled in its own transaction.
    #[instrument(skip(self))]
    pub async fn reconcile(
        &self,
        actor: &Actor,
        class_id: Option<ClassId>,
    ) -> Result<ReconcileReport, CoreError> {
        require_manager(actor, "reconcile enrollment counters")?;

        let class_ids = match class_id {
            Some(id) => vec![id],
            None => self.store.class_ids().await?,
        };

        let mut report = ReconcileReport::default();
        for class_id in class_ids {
            let outcome = self
                .retrying("reconcile", move || async move {
                    let mut tx = self.store.begin().await?;
                    let mut class = tx.lock_class(class_id).await?.ok_or_else(|| {
                        CoreError::not_found(format!("Class {class_id} not found"))
                    })?;
                    let outcome =
                        LedgerService::reconcile(tx.as_mut(), &mut class, self.clock.now()).await?;
                    tx.commit().await?;
                    Ok::<_, CoreError>(outcome)
                })
                .await?;

            report.classes_checked += 1;
            match outcome {
                ReconcileOutcome::InSync => {}
                ReconcileOutcome::Corrected(correction) => {
                    warn!(
                        %class_id,
                        recorded = correction.recorded,
                        actual = correction.actual,
                        "live_enrollment drift corrected"
                    );
                    track_reconciled();
                    report.corrections.push(correction);
                }
                ReconcileOutcome::OverCapacity { recorded, actual } => {
                    error!(%class_id, recorded, actual, "seat-holding rows exceed capacity");
                    report.over_capacity.push(class_id);
                }
            }
        }

        info!(
            classes_checked = report.classes_checked,
            corrections = report.corrections.len(),
            "reconciliation finished"
        );
        Ok(report)
    }
}
