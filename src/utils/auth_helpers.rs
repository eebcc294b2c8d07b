//! Role checks shared by the coordinator operations.
//!
//! Every helper matches on [`Role`] exhaustively so adding a role forces a
//! decision at each call site.

use classroll_core::CoreError;
use classroll_models::{Actor, Role, UserId};

/// Only managers may run catalog and administrative operations.
pub fn require_manager(actor: &Actor, action: &str) -> Result<(), CoreError> {
    match actor.role {
        Role::Manager => Ok(()),
        Role::Student | Role::Teacher => Err(CoreError::forbidden(format!(
            "Only managers may {action}"
        ))),
    }
}

/// Resolve which student an enroll or withdraw request acts on.
///
/// Students act for themselves and may omit the id. Managers act on behalf
/// of a named student.
pub fn resolve_student(actor: &Actor, requested: Option<UserId>) -> Result<UserId, CoreError> {
    match actor.role {
        Role::Student => match requested {
            None => Ok(actor.user_id),
            Some(id) if id == actor.user_id => Ok(id),
            Some(_) => Err(CoreError::forbidden(
                "Students may only manage their own enrollments",
            )),
        },
        Role::Manager => requested.ok_or_else(|| {
            CoreError::validation("student_id is required when acting on behalf of a student")
        }),
        Role::Teacher => Err(CoreError::forbidden(
            "Teachers cannot change student enrollments",
        )),
    }
}

/// Timetables are visible to their owner and to managers.
pub fn require_self_or_manager(actor: &Actor, subject: UserId) -> Result<(), CoreError> {
    match actor.role {
        Role::Manager => Ok(()),
        Role::Student | Role::Teacher if actor.user_id == subject => Ok(()),
        Role::Student | Role::Teacher => Err(CoreError::forbidden(
            "You may only view your own timetable",
        )),
    }
}
