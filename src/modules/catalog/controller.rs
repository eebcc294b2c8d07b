use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;
use uuid::Uuid;

use classroll_core::AppError;
use classroll_models::{
    AssignTeacherDto, AvailableClass, ClassId, ClassSection, ClassSectionDetail, Course, CourseId,
    CreateClassDto, CreateCourseDto, SetClassStatusDto, UpdateClassDto,
};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Create a new course
///
/// Course codes are unique after trimming and upper-casing.
#[utoipa::path(
    post,
    path = "/api/courses",
    summary = "Create course",
    request_body = CreateCourseDto,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - manager only"),
        (status = 409, description = "Course code already exists")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_course(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateCourseDto>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let course = state.coordinator.create_course(&actor, dto).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    summary = "Get course by ID",
    params(
        ("id" = Uuid, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Course details", body = Course),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Course not found")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_course(
    State(state): State<AppState>,
    AuthUser(_actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Course>, AppError> {
    let course = state.coordinator.get_course(CourseId::from(id)).await?;
    Ok(Json(course))
}

/// Create a class section with its weekly slots
///
/// When a teacher is named, the slots are checked against the teacher's
/// existing sections.
#[utoipa::path(
    post,
    path = "/api/classes",
    summary = "Create class section",
    request_body = CreateClassDto,
    responses(
        (status = 201, description = "Class created", body = ClassSectionDetail),
        (status = 400, description = "Invalid input or unknown course"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - manager only"),
        (status = 404, description = "Teacher not found"),
        (status = 409, description = "Teacher schedule conflict"),
        (status = 503, description = "Temporarily unavailable, retry")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_class(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateClassDto>,
) -> Result<(StatusCode, Json<ClassSectionDetail>), AppError> {
    let detail = state.coordinator.create_class(&actor, dto).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Open sections a caller could still enroll in
///
/// Students do not see sections they are already enrolled in.
#[utoipa::path(
    get,
    path = "/api/classes/available",
    summary = "List available classes",
    responses(
        (status = 200, description = "Open sections with free seats", body = Vec<AvailableClass>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_available_classes(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Vec<AvailableClass>>, AppError> {
    let classes = state.coordinator.list_available_classes(&actor).await?;
    Ok(Json(classes))
}

#[utoipa::path(
    get,
    path = "/api/classes/{id}",
    summary = "Get class section by ID",
    params(
        ("id" = Uuid, Path, description = "Class ID")
    ),
    responses(
        (status = 200, description = "Class details with slots", body = ClassSectionDetail),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Class not found")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_class(
    State(state): State<AppState>,
    AuthUser(_actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ClassSectionDetail>, AppError> {
    let detail = state.coordinator.get_class(ClassId::from(id)).await?;
    Ok(Json(detail))
}

/// Update a class section that has not started yet
///
/// A new slot set or date range is re-checked against the teacher and every
/// enrolled student.
#[utoipa::path(
    patch,
    path = "/api/classes/{id}",
    summary = "Update class section",
    params(
        ("id" = Uuid, Path, description = "Class ID")
    ),
    request_body = UpdateClassDto,
    responses(
        (status = 200, description = "Class updated", body = ClassSectionDetail),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - manager only"),
        (status = 404, description = "Class not found"),
        (status = 409, description = "Schedule or capacity conflict"),
        (status = 503, description = "Temporarily unavailable, retry")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_class(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateClassDto>,
) -> Result<Json<ClassSectionDetail>, AppError> {
    let detail = state
        .coordinator
        .update_class(&actor, ClassId::from(id), dto)
        .await?;
    Ok(Json(detail))
}

#[utoipa::path(
    put,
    path = "/api/classes/{id}/teacher",
    summary = "Assign teacher",
    params(
        ("id" = Uuid, Path, description = "Class ID")
    ),
    request_body = AssignTeacherDto,
    responses(
        (status = 200, description = "Teacher assigned", body = ClassSection),
        (status = 400, description = "User is not a teacher"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - manager only"),
        (status = 404, description = "Class or teacher not found"),
        (status = 409, description = "Teacher schedule conflict or class not open")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn assign_teacher(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Json(dto): Json<AssignTeacherDto>,
) -> Result<Json<ClassSection>, AppError> {
    let class = state
        .coordinator
        .assign_teacher(&actor, ClassId::from(id), dto.teacher_id)
        .await?;
    Ok(Json(class))
}

/// Close or cancel a class section
///
/// Cancelling withdraws every active enrollment in the section.
#[utoipa::path(
    put,
    path = "/api/classes/{id}/status",
    summary = "Set class status",
    params(
        ("id" = Uuid, Path, description = "Class ID")
    ),
    request_body = SetClassStatusDto,
    responses(
        (status = 200, description = "Status changed", body = ClassSection),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - manager only"),
        (status = 404, description = "Class not found"),
        (status = 409, description = "Transition not allowed")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn set_class_status(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Json(dto): Json<SetClassStatusDto>,
) -> Result<Json<ClassSection>, AppError> {
    let class = state
        .coordinator
        .set_class_status(&actor, ClassId::from(id), dto.status)
        .await?;
    Ok(Json(class))
}
