//! Course and section seeding.
//!
//! Sections are created through the coordinator, so a randomly picked
//! teacher who is already busy at those hours is rejected the same way a
//! live request would be. Such sections are created unstaffed instead.

use std::time::Instant;

use chrono::{Duration, NaiveDate, NaiveTime};
use fake::Fake;
use fake::faker::lorem::en::Words;
use rand::Rng;
use rand::seq::SliceRandom;

use classroll::modules::coordinator::Coordinator;
use classroll_core::CoreError;
use classroll_models::{
    Actor, ClassId, Course, CreateClassDto, CreateCourseDto, DayOfWeek, TimeSlotInput, UserId,
};

use super::models::SectionPlan;

const WEEKDAYS: [DayOfWeek; 5] = [
    DayOfWeek::Monday,
    DayOfWeek::Tuesday,
    DayOfWeek::Wednesday,
    DayOfWeek::Thursday,
    DayOfWeek::Friday,
];

/// Two 90-minute meetings on distinct weekdays, starting on the hour
/// between 08:00 and 16:00.
pub fn plan_section<R: Rng>(rng: &mut R, term_start: NaiveDate) -> SectionPlan {
    let days: Vec<DayOfWeek> = WEEKDAYS.choose_multiple(rng, 2).copied().collect();
    let hour = rng.gen_range(8..=16);
    let start = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    let end = start + Duration::minutes(90);

    SectionPlan {
        capacity: rng.gen_range(15..=40),
        start_date: term_start,
        end_date: term_start + Duration::weeks(16),
        slots: days
            .into_iter()
            .map(|day| TimeSlotInput::new(day, start, end))
            .collect(),
    }
}

fn generate_course_dto(index: usize) -> CreateCourseDto {
    let words: Vec<String> = Words(2..4).fake();
    let mut name = words.join(" ");
    if let Some(first) = name.get_mut(0..1) {
        first.make_ascii_uppercase();
    }

    CreateCourseDto {
        code: format!("SEED{:04}", index),
        name,
        credits: (index % 4 + 2) as i32,
        description: None,
    }
}

/// Creates `count` courses. Codes already taken by an earlier seed run are skipped.
pub async fn seed_courses(
    coordinator: &Coordinator,
    manager: &Actor,
    count: usize,
) -> Result<Vec<Course>, CoreError> {
    let start_time = Instant::now();
    println!("📚 Seeding {} courses...", count);

    let mut courses = Vec::with_capacity(count);
    for index in 0..count {
        match coordinator
            .create_course(manager, generate_course_dto(index))
            .await
        {
            Ok(course) => courses.push(course),
            Err(CoreError::DuplicateCourseCode(code)) => {
                println!("   ⚠ Course {} already exists, skipping", code);
            }
            Err(e) => return Err(e),
        }
    }

    println!(
        "   ✓ Inserted {} courses in {:?}",
        courses.len(),
        start_time.elapsed()
    );
    Ok(courses)
}

/// Creates sections for every course. Returns the ids and how many ended
/// up without a teacher.
pub async fn seed_sections(
    coordinator: &Coordinator,
    manager: &Actor,
    courses: &[Course],
    teachers: &[UserId],
    sections_per_course: usize,
    term_start: NaiveDate,
) -> Result<(Vec<ClassId>, usize), CoreError> {
    let start_time = Instant::now();
    println!(
        "🏫 Seeding {} sections ({} per course)...",
        courses.len() * sections_per_course,
        sections_per_course
    );

    let plans: Vec<(SectionPlan, Option<UserId>)> = {
        let mut rng = rand::thread_rng();
        (0..courses.len() * sections_per_course)
            .map(|_| (plan_section(&mut rng, term_start), teachers.choose(&mut rng).copied()))
            .collect()
    };

    let mut class_ids = Vec::with_capacity(plans.len());
    let mut unstaffed = 0;
    for (index, (plan, teacher_id)) in plans.into_iter().enumerate() {
        let course = &courses[index / sections_per_course.max(1)];
        let dto = CreateClassDto {
            course_id: course.id,
            teacher_id,
            semester: "Fall".to_string(),
            academic_year: format!(
                "{}-{}",
                term_start.format("%Y"),
                (term_start + Duration::days(366)).format("%Y")
            ),
            capacity: plan.capacity,
            start_date: plan.start_date,
            end_date: plan.end_date,
            slots: plan.slots,
        };

        let detail = match coordinator.create_class(manager, dto.clone()).await {
            Err(CoreError::ScheduleConflict { .. }) => {
                coordinator
                    .create_class(
                        manager,
                        CreateClassDto {
                            teacher_id: None,
                            ..dto
                        },
                    )
                    .await?
            }
            other => other?,
        };
        if detail.class.teacher_id.is_none() {
            unstaffed += 1;
        }
        class_ids.push(detail.class.id);
    }

    println!(
        "   ✓ Inserted {} sections ({} unstaffed) in {:?}",
        class_ids.len(),
        unstaffed,
        start_time.elapsed()
    );
    Ok((class_ids, unstaffed))
}
