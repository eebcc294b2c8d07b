mod common;

use axum::http::StatusCode;
use serde_json::json;

use classroll::classroll_models::Role;
use common::{setup_test_app, slot};

#[tokio::test]
async fn test_create_course_normalizes_code() {
    let app = setup_test_app();
    let manager = app.create_user(Role::Manager).await;

    let (status, body) = app
        .send(
            "POST",
            "/api/courses",
            Some(&manager.token),
            Some(json!({ "code": " cs101 ", "name": "Intro to CS", "credits": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["code"], "CS101");
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            "POST",
            "/api/courses",
            Some(&manager.token),
            Some(json!({ "code": "CS101", "name": "Again", "credits": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "DUPLICATE_COURSE_CODE");

    let (status, body) = app
        .send("GET", &format!("/api/courses/{id}"), Some(&manager.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Intro to CS");
}

#[tokio::test]
async fn test_non_manager_cannot_create_course() {
    let app = setup_test_app();
    let teacher = app.create_user(Role::Teacher).await;

    let (status, body) = app
        .send(
            "POST",
            "/api/courses",
            Some(&teacher.token),
            Some(json!({ "code": "X1", "name": "X", "credits": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");
}

#[tokio::test]
async fn test_invalid_class_payload_is_rejected() {
    let app = setup_test_app();
    let manager = app.create_user(Role::Manager).await;
    let course_id = app.create_course(&manager, "GEO101").await;

    let (status, _) = app
        .send(
            "POST",
            "/api/classes",
            Some(&manager.token),
            Some(json!({
                "course_id": course_id,
                "semester": "Fall",
                "academic_year": "2025-2026",
                "capacity": 0,
                "start_date": "2025-09-01",
                "end_date": "2025-12-20",
                "slots": []
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .send(
            "POST",
            "/api/classes",
            Some(&manager.token),
            Some(json!({
                "course_id": course_id,
                "semester": "Fall",
                "academic_year": "2025-2026",
                "capacity": 10,
                "start_date": "2025-09-01",
                "end_date": "2025-12-20",
                "slots": [slot("monday", "11:00:00", "10:00:00")]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_capacity_cannot_drop_below_live_enrollment() {
    let app = setup_test_app();
    let manager = app.create_user(Role::Manager).await;
    let course_id = app.create_course(&manager, "ENG101").await;
    let class_id = app
        .create_class(&manager, &course_id, 3, None, json!([]))
        .await;
    for _ in 0..2 {
        let student = app.create_user(Role::Student).await;
        let (status, _) = app.enroll(&student, &class_id).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let uri = format!("/api/classes/{class_id}");
    let (status, body) = app
        .send("PATCH", &uri, Some(&manager.token), Some(json!({ "capacity": 1 })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CAPACITY_CONFLICT");

    let (status, body) = app
        .send("PATCH", &uri, Some(&manager.token), Some(json!({ "capacity": 2 })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["capacity"], 2);
}

#[tokio::test]
async fn test_teacher_assignment_conflict() {
    let app = setup_test_app();
    let manager = app.create_user(Role::Manager).await;
    let teacher = app.create_user(Role::Teacher).await;
    let course_id = app.create_course(&manager, "MUS100").await;

    app.create_class(
        &manager,
        &course_id,
        10,
        Some(teacher.id),
        json!([slot("tuesday", "13:00:00", "15:00:00")]),
    )
    .await;
    let other = app
        .create_class(
            &manager,
            &course_id,
            10,
            None,
            json!([slot("tuesday", "14:00:00", "16:00:00")]),
        )
        .await;

    let (status, body) = app
        .send(
            "PUT",
            &format!("/api/classes/{other}/teacher"),
            Some(&manager.token),
            Some(json!({ "teacher_id": teacher.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "SCHEDULE_CONFLICT");

    let free = app.create_user(Role::Teacher).await;
    let (status, body) = app
        .send(
            "PUT",
            &format!("/api/classes/{other}/teacher"),
            Some(&manager.token),
            Some(json!({ "teacher_id": free.id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["teacher_id"], free.id.to_string());
}

#[tokio::test]
async fn test_closing_class_hides_it_from_listing() {
    let app = setup_test_app();
    let manager = app.create_user(Role::Manager).await;
    let student = app.create_user(Role::Student).await;
    let course_id = app.create_course(&manager, "PHIL101").await;
    let class_id = app
        .create_class(&manager, &course_id, 10, None, json!([]))
        .await;

    let (status, body) = app
        .send("GET", "/api/classes/available", Some(&student.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["course"]["code"], "PHIL101");
    assert_eq!(body[0]["seats_left"], 10);

    let (status, body) = app
        .send(
            "PUT",
            &format!("/api/classes/{class_id}/status"),
            Some(&manager.token),
            Some(json!({ "status": "closed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "closed");

    let (_, body) = app
        .send("GET", "/api/classes/available", Some(&student.token), None)
        .await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, body) = app.enroll(&student, &class_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CLASS_NOT_OPEN");
}

#[tokio::test]
async fn test_unknown_class_is_not_found() {
    let app = setup_test_app();
    let manager = app.create_user(Role::Manager).await;

    let (status, body) = app
        .send(
            "GET",
            &format!("/api/classes/{}", uuid::Uuid::new_v4()),
            Some(&manager.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}
