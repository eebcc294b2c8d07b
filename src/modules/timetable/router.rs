use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{get_student_timetable, get_teacher_timetable};

/// Routes: GET /students/{id}, GET /teachers/{id}
pub fn init_timetables_router() -> Router<AppState> {
    Router::new()
        .route("/students/{id}", get(get_student_timetable))
        .route("/teachers/{id}", get(get_teacher_timetable))
}
