//! Enrollment seeding.
//!
//! Each student tries a handful of random sections. Rejections (full
//! sections, timetable clashes) are expected and only counted.

use std::time::Instant;

use rand::seq::SliceRandom;

use classroll::modules::coordinator::Coordinator;
use classroll_core::CoreError;
use classroll_models::{Actor, ClassId, UserId};

/// Returns `(enrolled, rejected)`.
pub async fn seed_enrollments(
    coordinator: &Coordinator,
    manager: &Actor,
    students: &[UserId],
    class_ids: &[ClassId],
    per_student: usize,
) -> Result<(usize, usize), CoreError> {
    let start_time = Instant::now();
    println!(
        "📝 Seeding up to {} enrollments ({} per student)...",
        students.len() * per_student,
        per_student
    );

    let attempts: Vec<(UserId, ClassId)> = {
        let mut rng = rand::thread_rng();
        students
            .iter()
            .flat_map(|student| {
                class_ids
                    .choose_multiple(&mut rng, per_student)
                    .map(|class_id| (*student, *class_id))
                    .collect::<Vec<_>>()
            })
            .collect()
    };

    let mut enrolled = 0;
    let mut rejected = 0;
    for (student_id, class_id) in attempts {
        match coordinator
            .enroll_student(manager, class_id, Some(student_id))
            .await
        {
            Ok(_) => enrolled += 1,
            Err(CoreError::Unavailable) => return Err(CoreError::Unavailable),
            Err(_) => rejected += 1,
        }
    }

    println!(
        "   ✓ {} enrollments, {} rejected in {:?}",
        enrolled,
        rejected,
        start_time.elapsed()
    );
    Ok((enrolled, rejected))
}
