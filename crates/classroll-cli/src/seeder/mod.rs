//! Development data seeding.

pub mod catalog;
pub mod enrollments;
pub mod models;
pub mod users;

use std::time::Instant;

use sqlx::PgPool;

use classroll::modules::coordinator::Coordinator;
use classroll_models::{Actor, Role, UserId};

pub use models::{SeedConfig, SeedSummary};

/// Seed a full data set: one manager, teachers, students, courses,
/// sections and enrollments.
pub async fn seed_all(
    db: &PgPool,
    coordinator: &Coordinator,
    config: SeedConfig,
) -> anyhow::Result<SeedSummary> {
    let start_time = Instant::now();

    let managers = users::generate_users(Role::Manager, 1);
    let teachers = users::generate_users(Role::Teacher, config.teachers);
    let students = users::generate_users(Role::Student, config.students);

    let all_users: Vec<_> = managers
        .iter()
        .chain(teachers.iter())
        .chain(students.iter())
        .cloned()
        .collect();
    users::seed_users(db, &all_users).await?;

    let manager = managers
        .first()
        .map(|m| Actor::new(m.id, Role::Manager))
        .ok_or_else(|| anyhow::anyhow!("no manager generated"))?;
    let teacher_ids: Vec<UserId> = teachers.iter().map(|t| t.id).collect();
    let student_ids: Vec<UserId> = students.iter().map(|s| s.id).collect();

    let courses = catalog::seed_courses(coordinator, &manager, config.courses).await?;
    let (class_ids, unstaffed) = catalog::seed_sections(
        coordinator,
        &manager,
        &courses,
        &teacher_ids,
        config.sections_per_course,
        config.term_start,
    )
    .await?;
    let (enrolled, rejected) = enrollments::seed_enrollments(
        coordinator,
        &manager,
        &student_ids,
        &class_ids,
        config.enrollments_per_student,
    )
    .await?;

    println!("✅ Seeding finished in {:?}", start_time.elapsed());

    Ok(SeedSummary {
        users: all_users.len(),
        courses: courses.len(),
        sections: class_ids.len(),
        sections_without_teacher: unstaffed,
        enrollments: enrolled,
        rejected_enrollments: rejected,
    })
}

/// Remove every seeded row. Courses are matched by their `SEED` code prefix;
/// users by the `example.com` domain.
pub async fn clear_seed(db: &PgPool) -> Result<u64, sqlx::Error> {
    let mut tx = db.begin().await?;

    let seeded_classes = "SELECT cs.id FROM class_sections cs \
                          JOIN courses c ON c.id = cs.course_id WHERE c.code LIKE 'SEED%'";
    sqlx::query(&format!(
        "DELETE FROM enrollments WHERE class_id IN ({seeded_classes})"
    ))
    .execute(&mut *tx)
    .await?;
    sqlx::query(&format!(
        "DELETE FROM time_slots WHERE class_id IN ({seeded_classes})"
    ))
    .execute(&mut *tx)
    .await?;
    sqlx::query(&format!("DELETE FROM class_sections WHERE id IN ({seeded_classes})"))
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM courses WHERE code LIKE 'SEED%'")
        .execute(&mut *tx)
        .await?;
    let users = sqlx::query("DELETE FROM users WHERE email LIKE '%@example.com'")
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(users)
}
