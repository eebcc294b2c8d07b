use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use uuid::Uuid;

use classroll_core::AppError;
use classroll_models::{
    ClassId, Enrollment, EnrollmentId, EnrollmentRequestDto, ReconcileReport, SetGradeDto,
};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::model::ReconcileParams;

/// Enroll a student in a class section
///
/// Students enroll themselves and send `{}`. Managers name the student.
#[utoipa::path(
    post,
    path = "/api/classes/{id}/enrollments",
    summary = "Enroll in class",
    params(
        ("id" = Uuid, Path, description = "Class ID")
    ),
    request_body = EnrollmentRequestDto,
    responses(
        (status = 201, description = "Enrolled", body = Enrollment),
        (status = 400, description = "Invalid input or user is not a student"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Class or student not found"),
        (status = 409, description = "Capacity full, already enrolled or completed, class not open, or schedule conflict"),
        (status = 503, description = "Temporarily unavailable, retry")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn enroll(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(class_id): Path<Uuid>,
    Json(dto): Json<EnrollmentRequestDto>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    let enrollment = state
        .coordinator
        .enroll_student(&actor, ClassId::from(class_id), dto.student_id)
        .await?;

    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// Withdraw a student from a class section
#[utoipa::path(
    post,
    path = "/api/classes/{id}/withdrawal",
    summary = "Withdraw from class",
    params(
        ("id" = Uuid, Path, description = "Class ID")
    ),
    request_body = EnrollmentRequestDto,
    responses(
        (status = 200, description = "Withdrawn", body = Enrollment),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Class or enrollment not found"),
        (status = 409, description = "Already withdrawn, not active or withdrawal closed"),
        (status = 503, description = "Temporarily unavailable, retry")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn withdraw(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(class_id): Path<Uuid>,
    Json(dto): Json<EnrollmentRequestDto>,
) -> Result<Json<Enrollment>, AppError> {
    let enrollment = state
        .coordinator
        .withdraw(&actor, ClassId::from(class_id), dto.student_id)
        .await?;

    Ok(Json(enrollment))
}

/// Record a final score and complete the enrollment
#[utoipa::path(
    post,
    path = "/api/enrollments/{id}/grade",
    summary = "Set grade",
    params(
        ("id" = Uuid, Path, description = "Enrollment ID")
    ),
    request_body = SetGradeDto,
    responses(
        (status = 200, description = "Grade recorded", body = Enrollment),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - assigned teacher or manager only"),
        (status = 404, description = "Enrollment not found"),
        (status = 409, description = "Enrollment is not active"),
        (status = 422, description = "Score out of range")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn set_grade(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(enrollment_id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<SetGradeDto>,
) -> Result<Json<Enrollment>, AppError> {
    let enrollment = state
        .coordinator
        .set_grade(&actor, EnrollmentId::from(enrollment_id), dto.score)
        .await?;

    Ok(Json(enrollment))
}

/// Recount seat-holding enrollments and repair drifted counters
#[utoipa::path(
    post,
    path = "/api/admin/reconcile",
    summary = "Reconcile enrollment counters",
    params(ReconcileParams),
    responses(
        (status = 200, description = "Reconciliation report", body = ReconcileReport),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - manager only"),
        (status = 404, description = "Class not found")
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn reconcile(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Query(params): Query<ReconcileParams>,
) -> Result<Json<ReconcileReport>, AppError> {
    let report = state
        .coordinator
        .reconcile(&actor, params.class_id())
        .await?;

    Ok(Json(report))
}
