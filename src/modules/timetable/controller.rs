use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;
use uuid::Uuid;

use classroll_core::AppError;
use classroll_models::{Timetable, UserId};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Weekly timetable of a student's active enrollments
#[utoipa::path(
    get,
    path = "/api/timetables/students/{id}",
    summary = "Get student timetable",
    params(
        ("id" = Uuid, Path, description = "Student user ID")
    ),
    responses(
        (status = 200, description = "Weekly timetable", body = Timetable),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - own timetable or manager only")
    ),
    tag = "Timetables",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_student_timetable(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(student_id): Path<Uuid>,
) -> Result<Json<Timetable>, AppError> {
    let timetable = state
        .coordinator
        .student_timetable(&actor, UserId::from(student_id))
        .await?;

    Ok(Json(timetable))
}

/// Weekly timetable of the sections a teacher is assigned to
#[utoipa::path(
    get,
    path = "/api/timetables/teachers/{id}",
    summary = "Get teacher timetable",
    params(
        ("id" = Uuid, Path, description = "Teacher user ID")
    ),
    responses(
        (status = 200, description = "Weekly timetable", body = Timetable),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - own timetable or manager only")
    ),
    tag = "Timetables",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_teacher_timetable(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(teacher_id): Path<Uuid>,
) -> Result<Json<Timetable>, AppError> {
    let timetable = state
        .coordinator
        .teacher_timetable(&actor, UserId::from(teacher_id))
        .await?;

    Ok(Json(timetable))
}
