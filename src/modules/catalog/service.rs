use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::instrument;

use classroll_core::CoreError;
use classroll_db::{IntegrityViolation, Store, StoreError, StoreTx};
use classroll_models::timeslots::find_internal_overlap;
use classroll_models::{
    AvailableClass, ClassId, ClassSection, ClassSectionDetail, ClassStatus, Course, CourseId,
    CreateClassDto, CreateCourseDto, Role, TimeSlot, TimeSlotInput, UpdateClassDto, UserId,
    WeeklyWindow,
};

pub struct CatalogService;

impl CatalogService {
    /// Last day on which a section still accepts enrollments.
    pub fn enrollment_deadline(class: &ClassSection, grace_days: i64) -> NaiveDate {
        class
            .start_date
            .checked_add_signed(Duration::days(grace_days))
            .unwrap_or(NaiveDate::MAX)
            .min(class.end_date)
    }

    /// A section accepts enrollments while it is open and today is on or
    /// before its enrollment deadline.
    pub fn ensure_enrollable(
        class: &ClassSection,
        today: NaiveDate,
        grace_days: i64,
    ) -> Result<(), CoreError> {
        if class.status != ClassStatus::Open {
            return Err(CoreError::class_not_open(format!(
                "class is {}",
                class.status
            )));
        }
        let deadline = Self::enrollment_deadline(class, grace_days);
        if today > deadline {
            return Err(CoreError::class_not_open(format!(
                "enrollment closed on {deadline}"
            )));
        }
        Ok(())
    }

    /// Capacity, dates and slots may only change on an open section that has
    /// not started.
    pub fn ensure_editable(class: &ClassSection, today: NaiveDate) -> Result<(), CoreError> {
        if class.status != ClassStatus::Open {
            return Err(CoreError::class_not_open(format!(
                "class is {}",
                class.status
            )));
        }
        if class.has_started(today) {
            return Err(CoreError::class_not_open(format!(
                "class started on {}",
                class.start_date
            )));
        }
        Ok(())
    }

    /// The teacher of a section may change until it ends, unless it was cancelled.
    pub fn ensure_staffable(class: &ClassSection, today: NaiveDate) -> Result<(), CoreError> {
        if class.status == ClassStatus::Cancelled {
            return Err(CoreError::class_not_open("class is cancelled"));
        }
        if class.has_ended(today) {
            return Err(CoreError::class_not_open(format!(
                "class ended on {}",
                class.end_date
            )));
        }
        Ok(())
    }

    pub fn ensure_transition(class: &ClassSection, next: ClassStatus) -> Result<(), CoreError> {
        if !class.status.can_transition_to(next) {
            return Err(CoreError::class_not_open(format!(
                "cannot move a {} class to {}",
                class.status, next
            )));
        }
        Ok(())
    }

    /// Check the user exists and has the expected role.
    pub async fn require_role(
        tx: &mut dyn StoreTx,
        user_id: UserId,
        expected: Role,
    ) -> Result<(), CoreError> {
        match tx.user_role(user_id).await? {
            None => Err(CoreError::not_found(format!("{expected} {user_id} not found"))),
            Some(role) if role == expected => Ok(()),
            Some(role) => Err(CoreError::validation(format!(
                "User {user_id} is a {role}, not a {expected}"
            ))),
        }
    }

    /// Validate a proposed slot set and bind it to `class_id`.
    pub fn prepare_slots(
        class_id: ClassId,
        inputs: Vec<TimeSlotInput>,
    ) -> Result<Vec<TimeSlot>, CoreError> {
        if let Some((a, b)) = find_internal_overlap(&inputs) {
            return Err(CoreError::validation(format!(
                "Slots overlap each other: {} and {}",
                a.describe(),
                b.describe()
            )));
        }
        Ok(inputs
            .into_iter()
            .map(|slot| slot.into_slot(class_id))
            .collect())
    }

    /// Build a fresh open section from a validated create request.
    pub fn new_class(
        dto: CreateClassDto,
        now: DateTime<Utc>,
    ) -> Result<(ClassSection, Vec<TimeSlot>), CoreError> {
        let id = ClassId::new();
        let slots = Self::prepare_slots(id, dto.slots)?;
        let class = ClassSection {
            id,
            course_id: dto.course_id,
            teacher_id: dto.teacher_id,
            semester: dto.semester,
            academic_year: dto.academic_year,
            capacity: dto.capacity,
            live_enrollment: 0,
            status: ClassStatus::Open,
            start_date: dto.start_date,
            end_date: dto.end_date,
            created_at: now,
            updated_at: now,
        };
        Ok((class, slots))
    }

    /// Apply the scalar fields of a patch. Slots are handled separately.
    pub fn apply_update(
        class: &ClassSection,
        patch: &UpdateClassDto,
        now: DateTime<Utc>,
    ) -> Result<ClassSection, CoreError> {
        if let Some(course_id) = patch.course_id
            && course_id != class.course_id
        {
            return Err(CoreError::validation(
                "The course of an existing class cannot be changed",
            ));
        }

        let mut next = class.clone();

        if let Some(capacity) = patch.capacity {
            if capacity < class.live_enrollment {
                return Err(CoreError::CapacityConflict {
                    requested: capacity,
                    live_enrollment: class.live_enrollment,
                });
            }
            next.capacity = capacity;
        }
        if let Some(semester) = &patch.semester {
            next.semester = semester.clone();
        }
        if let Some(academic_year) = &patch.academic_year {
            next.academic_year = academic_year.clone();
        }
        if let Some(start_date) = patch.start_date {
            next.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            next.end_date = end_date;
        }
        if next.end_date < next.start_date {
            return Err(CoreError::validation(
                "end_date must not be earlier than start_date",
            ));
        }
        if let Some(teacher_id) = patch.teacher_id {
            next.teacher_id = Some(teacher_id);
        }

        next.updated_at = now;
        Ok(next)
    }

    #[instrument(skip(tx))]
    pub async fn create_course(
        tx: &mut dyn StoreTx,
        dto: CreateCourseDto,
        now: DateTime<Utc>,
    ) -> Result<Course, CoreError> {
        let course = Course {
            id: CourseId::new(),
            code: dto.code.trim().to_uppercase(),
            name: dto.name,
            credits: dto.credits,
            description: dto.description,
            created_at: now,
        };

        match tx.insert_course(&course).await {
            Ok(()) => Ok(course),
            Err(StoreError::Integrity(IntegrityViolation::DuplicateCourseCode)) => {
                Err(CoreError::DuplicateCourseCode(course.code))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(store))]
    pub async fn get_course(store: &dyn Store, course_id: CourseId) -> Result<Course, CoreError> {
        store
            .get_course(course_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("Course {course_id} not found")))
    }

    #[instrument(skip(store))]
    pub async fn get_class(
        store: &dyn Store,
        class_id: ClassId,
    ) -> Result<ClassSectionDetail, CoreError> {
        let class = store
            .get_class(class_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("Class {class_id} not found")))?;
        let slots = store.slots_for_classes(&[class_id]).await?;

        Ok(ClassSectionDetail { class, slots })
    }

    /// Open sections with free seats whose enrollment window is still open,
    /// minus the ones `student_id` is already active in.
    #[instrument(skip(store))]
    pub async fn list_available(
        store: &dyn Store,
        student_id: Option<UserId>,
        today: NaiveDate,
        grace_days: i64,
    ) -> Result<Vec<AvailableClass>, CoreError> {
        let already_in: HashSet<ClassId> = match student_id {
            Some(id) => store
                .active_class_ids_for_student(id)
                .await?
                .into_iter()
                .collect(),
            None => HashSet::new(),
        };

        let classes: Vec<ClassSection> = store
            .open_classes_with_seats()
            .await?
            .into_iter()
            .filter(|c| Self::ensure_enrollable(c, today, grace_days).is_ok())
            .filter(|c| !already_in.contains(&c.id))
            .collect();

        let class_ids: Vec<ClassId> = classes.iter().map(|c| c.id).collect();
        let course_ids: Vec<CourseId> = classes.iter().map(|c| c.course_id).collect();

        let mut slots_by_class: HashMap<ClassId, Vec<TimeSlot>> = HashMap::new();
        for slot in store.slots_for_classes(&class_ids).await? {
            slots_by_class.entry(slot.class_id).or_default().push(slot);
        }
        let courses: HashMap<CourseId, Course> = store
            .courses_by_ids(&course_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        Ok(classes
            .into_iter()
            .filter_map(|class| {
                let course = courses.get(&class.course_id)?.clone();
                let slots = slots_by_class.remove(&class.id).unwrap_or_default();
                Some(AvailableClass {
                    seats_left: class.seats_left(),
                    course,
                    slots,
                    class,
                })
            })
            .collect())
    }
}
