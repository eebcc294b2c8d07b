//! Catalog course models.
//!
//! A course is an immutable catalog entry. Class sections reference it by id
//! and it is never deleted once referenced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::CourseId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Course {
    pub id: CourseId,
    /// Catalog code, unique across the catalog (e.g. "CS101")
    pub code: String,
    pub name: String,
    pub credits: i32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCourseDto {
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = 1, max = 20))]
    pub credits: i32,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto(code: &str, credits: i32) -> CreateCourseDto {
        CreateCourseDto {
            code: code.to_string(),
            name: "Data Structures".to_string(),
            credits,
            description: None,
        }
    }

    #[test]
    fn test_create_course_dto_validation() {
        assert!(dto("CS201", 3).validate().is_ok());
        assert!(dto("", 3).validate().is_err());
        assert!(dto(&"X".repeat(21), 3).validate().is_err());
        assert!(dto("CS201", 0).validate().is_err());
        assert!(dto("CS201", 21).validate().is_err());
    }
}
