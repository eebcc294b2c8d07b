use axum::{Router, routing::post};

use crate::state::AppState;

use super::controller::{enroll, reconcile, set_grade, withdraw};

/// Enrollment routes nested under `/classes`.
pub fn init_class_enrollments_router() -> Router<AppState> {
    Router::new()
        .route("/{id}/enrollments", post(enroll))
        .route("/{id}/withdrawal", post(withdraw))
}

pub fn init_enrollments_router() -> Router<AppState> {
    Router::new().route("/{id}/grade", post(set_grade))
}

pub fn init_admin_router() -> Router<AppState> {
    Router::new().route("/reconcile", post(reconcile))
}
