//! Error types for the Classroll enrollment core.
//!
//! Two layers live here:
//!
//! - [`CoreError`]: the closed taxonomy every service operation returns. Each
//!   variant names the invariant that blocked a request and carries a stable
//!   machine code.
//! - [`AppError`]: the HTTP-facing wrapper (status + `anyhow::Error`) that
//!   controllers return. A `CoreError` converts into an `AppError` with the
//!   matching status, and the response body keeps the machine code.

use anyhow::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use uuid::Uuid;
use validator::ValidationErrors;

/// Domain error taxonomy shared by the catalog, timetable, ledger and coordinator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    /// Malformed or out-of-range input. Not retried.
    #[error("{0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The credential was missing, malformed or expired.
    #[error("{0}")]
    Unauthorized(String),

    /// The caller's role may not perform this operation.
    #[error("{0}")]
    Forbidden(String),

    #[error("Class has no remaining capacity")]
    CapacityFull,

    #[error("Student already holds an active enrollment in this class")]
    AlreadyActive,

    /// The student finished this section; a graded seat is never reopened.
    #[error("Student has already completed this class")]
    AlreadyCompleted,

    #[error("Class is not open: {0}")]
    ClassNotOpen(String),

    #[error("Schedule conflict with class {conflicting_class_id} on {detail}")]
    ScheduleConflict {
        conflicting_class_id: Uuid,
        detail: String,
    },

    #[error("Capacity {requested} is below the current live enrollment of {live_enrollment}")]
    CapacityConflict { requested: i32, live_enrollment: i32 },

    #[error("Enrollment is already withdrawn")]
    AlreadyWithdrawn,

    #[error("Enrollment is not active")]
    NotActive,

    #[error("Withdrawal period for this class has ended")]
    WithdrawalClosed,

    #[error("Course code '{0}' already exists")]
    DuplicateCourseCode(String),

    /// Transient storage failure or lock contention that survived the internal retry.
    #[error("Service temporarily unavailable, please retry")]
    Unavailable,

    /// Unexpected storage failure. Details are logged, never returned.
    #[error("Internal server error")]
    Internal,
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn class_not_open(msg: impl Into<String>) -> Self {
        Self::ClassNotOpen(msg.into())
    }

    /// Stable machine-readable code surfaced to callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::CapacityFull => "CAPACITY_FULL",
            Self::AlreadyActive => "ALREADY_ACTIVE",
            Self::AlreadyCompleted => "ALREADY_COMPLETED",
            Self::ClassNotOpen(_) => "CLASS_NOT_OPEN",
            Self::ScheduleConflict { .. } => "SCHEDULE_CONFLICT",
            Self::CapacityConflict { .. } => "CAPACITY_CONFLICT",
            Self::AlreadyWithdrawn => "ALREADY_WITHDRAWN",
            Self::NotActive => "NOT_ACTIVE",
            Self::WithdrawalClosed => "WITHDRAWAL_CLOSED",
            Self::DuplicateCourseCode(_) => "DUPLICATE_COURSE_CODE",
            Self::Unavailable => "UNAVAILABLE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::CapacityFull
            | Self::AlreadyActive
            | Self::AlreadyCompleted
            | Self::ClassNotOpen(_)
            | Self::ScheduleConflict { .. }
            | Self::CapacityConflict { .. }
            | Self::AlreadyWithdrawn
            | Self::NotActive
            | Self::WithdrawalClosed
            | Self::DuplicateCourseCode(_) => StatusCode::CONFLICT,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

impl From<ValidationErrors> for CoreError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// HTTP error returned by controllers.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: Error,
}

impl AppError {
    pub fn new<E>(status: StatusCode, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            status,
            error: err.into(),
        }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    pub fn bad_request<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::BAD_REQUEST, err)
    }

    pub fn unprocessable<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, err)
    }

    /// The domain error behind this response, if there is one.
    pub fn core(&self) -> Option<&CoreError> {
        self.error.downcast_ref::<CoreError>()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        Self::new(err.status(), err)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        CoreError::from(errors).into()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, retryable) = match self.core() {
            Some(core) => (core.code(), core.is_retryable()),
            None => ("INTERNAL_ERROR", false),
        };

        if self.status.is_server_error() && self.status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(error = %self.error, "request failed");
        }

        let body = Json(json!({
            "error": code,
            "message": self.error.to_string(),
            "retryable": retryable,
        }));

        (self.status, body).into_response()
    }
}
