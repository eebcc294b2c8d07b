use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use classroll_models::{
    AssignTeacherDto, AvailableClass, ClassSection, ClassSectionDetail, ClassStatus, Course,
    CreateClassDto, CreateCourseDto, DayOfWeek, Enrollment, EnrollmentRequestDto,
    EnrollmentStatus, LetterGrade, LiveEnrollmentCorrection, ReconcileReport, Role,
    SetClassStatusDto, SetGradeDto, TimeSlot, TimeSlotInput, Timetable, TimetableEntry,
    UpdateClassDto,
};

use crate::modules::ledger::model::ReconcileParams;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::catalog::controller::create_course,
        crate::modules::catalog::controller::get_course,
        crate::modules::catalog::controller::create_class,
        crate::modules::catalog::controller::list_available_classes,
        crate::modules::catalog::controller::get_class,
        crate::modules::catalog::controller::update_class,
        crate::modules::catalog::controller::assign_teacher,
        crate::modules::catalog::controller::set_class_status,
        crate::modules::ledger::controller::enroll,
        crate::modules::ledger::controller::withdraw,
        crate::modules::ledger::controller::set_grade,
        crate::modules::ledger::controller::reconcile,
        crate::modules::timetable::controller::get_student_timetable,
        crate::modules::timetable::controller::get_teacher_timetable,
    ),
    components(
        schemas(
            Role,
            Course,
            CreateCourseDto,
            ClassStatus,
            ClassSection,
            ClassSectionDetail,
            AvailableClass,
            CreateClassDto,
            UpdateClassDto,
            AssignTeacherDto,
            SetClassStatusDto,
            DayOfWeek,
            TimeSlot,
            TimeSlotInput,
            Enrollment,
            EnrollmentStatus,
            LetterGrade,
            EnrollmentRequestDto,
            SetGradeDto,
            LiveEnrollmentCorrection,
            ReconcileReport,
            ReconcileParams,
            Timetable,
            TimetableEntry,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Courses", description = "Course catalog"),
        (name = "Classes", description = "Class sections, slots and lifecycle"),
        (name = "Enrollments", description = "Enrollment, withdrawal and grading"),
        (name = "Timetables", description = "Weekly timetables for students and teachers"),
        (name = "Admin", description = "Maintenance operations")
    ),
    info(
        title = "Classroll API",
        version = "0.1.0",
        description = "Course enrollment and class scheduling with capacity and timetable guarantees.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
