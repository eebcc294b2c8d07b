//! Coordinator against a real Postgres store, where advisory scope locks,
//! `FOR UPDATE` on the class row and `lock_timeout` do the serializing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use sqlx::PgPool;

use classroll::classroll_config::SchedulingConfig;
use classroll::classroll_core::{CoreError, FixedClock};
use classroll::classroll_db::PgStore;
use classroll::classroll_models::{
    Actor, ClassId, CreateClassDto, CreateCourseDto, DayOfWeek, Role, TimeSlotInput, UserId,
};
use classroll::modules::coordinator::Coordinator;

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, m, d).unwrap()
}

fn monday(from: u32, to: u32) -> TimeSlotInput {
    TimeSlotInput::new(
        DayOfWeek::Monday,
        NaiveTime::from_hms_opt(from, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(to, 0, 0).unwrap(),
    )
}

fn coordinator(pool: PgPool) -> Arc<Coordinator> {
    let store = PgStore::new(pool, Duration::from_secs(5));
    let config = SchedulingConfig {
        retry_backoff: Duration::from_millis(5),
        ..SchedulingConfig::default()
    };
    Arc::new(Coordinator::new(
        Arc::new(store),
        Arc::new(FixedClock::on(date(8, 1))),
        config,
    ))
}

async fn insert_user(pool: &PgPool, role: Role) -> Actor {
    let id = UserId::new();
    sqlx::query("INSERT INTO users (id, full_name, email, role) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(format!("User {id}"))
        .bind(format!("{id}@test.local"))
        .bind(role)
        .execute(pool)
        .await
        .unwrap();

    let table = match role {
        Role::Student => Some("students (user_id, student_code)"),
        Role::Teacher => Some("teachers (user_id, teacher_code)"),
        Role::Manager => None,
    };
    if let Some(table) = table {
        sqlx::query(&format!("INSERT INTO {table} VALUES ($1, $2)"))
            .bind(id)
            .bind(id.to_string())
            .execute(pool)
            .await
            .unwrap();
    }
    Actor::new(id, role)
}

async fn create_class(
    coordinator: &Coordinator,
    manager: &Actor,
    code: &str,
    capacity: i32,
    slots: Vec<TimeSlotInput>,
) -> ClassId {
    let course = coordinator
        .create_course(
            manager,
            CreateCourseDto {
                code: code.to_string(),
                name: format!("Course {code}"),
                credits: 3,
                description: None,
            },
        )
        .await
        .unwrap();

    coordinator
        .create_class(
            manager,
            CreateClassDto {
                course_id: course.id,
                teacher_id: None,
                semester: "Fall".to_string(),
                academic_year: "2025-2026".to_string(),
                capacity,
                start_date: date(9, 1),
                end_date: date(12, 20),
                slots,
            },
        )
        .await
        .unwrap()
        .class
        .id
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn concurrent_enrollments_stop_at_capacity(pool: PgPool) {
    let coordinator = coordinator(pool.clone());
    let manager = insert_user(&pool, Role::Manager).await;
    let capacity = 4;
    let attempts = 16;
    let class_id = create_class(&coordinator, &manager, "PG101", capacity, vec![]).await;

    let mut handles = Vec::new();
    for _ in 0..attempts {
        let student = insert_user(&pool, Role::Student).await;
        let coordinator = coordinator.clone();
        handles.push(tokio::spawn(async move {
            coordinator.enroll_student(&student, class_id, None).await
        }));
    }

    let mut enrolled = 0;
    let mut full = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => enrolled += 1,
            Err(CoreError::CapacityFull) => full += 1,
            Err(other) => panic!("unexpected outcome: {other:?}"),
        }
    }

    assert_eq!(enrolled, capacity);
    assert_eq!(full, attempts - capacity);

    let class = coordinator.get_class(class_id).await.unwrap().class;
    assert_eq!(class.live_enrollment, capacity);

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM enrollments WHERE class_id = $1 AND status = 'active'",
    )
    .bind(class_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(rows, i64::from(capacity));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn concurrent_assignments_never_double_book_a_teacher(pool: PgPool) {
    let coordinator = coordinator(pool.clone());
    let manager = insert_user(&pool, Role::Manager).await;
    let teacher = insert_user(&pool, Role::Teacher).await;
    let early = create_class(&coordinator, &manager, "PG201", 10, vec![monday(8, 10)]).await;
    let late = create_class(&coordinator, &manager, "PG202", 10, vec![monday(9, 11)]).await;

    let handles = [early, late].map(|class_id| {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            coordinator
                .assign_teacher(&manager, class_id, teacher.user_id)
                .await
        })
    });

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }

    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.code() == "SCHEDULE_CONFLICT"),
        "{outcomes:?}"
    );

    let staffed: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM class_sections WHERE teacher_id = $1")
            .bind(teacher.user_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(staffed, 1);
}
