use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use super::controller::{
    assign_teacher, create_class, create_course, get_class, get_course, list_available_classes,
    set_class_status, update_class,
};

pub fn init_courses_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_course))
        .route("/{id}", get(get_course))
}

pub fn init_classes_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_class))
        .route("/available", get(list_available_classes))
        .route("/{id}", get(get_class).patch(update_class))
        .route("/{id}/teacher", put(assign_teacher))
        .route("/{id}/status", put(set_class_status))
}
