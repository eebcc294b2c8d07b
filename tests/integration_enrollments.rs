mod common;

use axum::http::StatusCode;
use serde_json::json;

use classroll::classroll_models::Role;
use common::{setup_test_app, slot};

#[tokio::test]
async fn test_student_enrolls_and_withdraws() {
    let app = setup_test_app();
    let manager = app.create_user(Role::Manager).await;
    let student = app.create_user(Role::Student).await;

    let course_id = app.create_course(&manager, "MATH101").await;
    let class_id = app
        .create_class(
            &manager,
            &course_id,
            30,
            None,
            json!([slot("monday", "08:00:00", "10:30:00")]),
        )
        .await;

    let (status, body) = app.enroll(&student, &class_id).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "active");
    assert_eq!(body["student_id"], student.id.to_string());

    let (status, body) = app
        .send("GET", &format!("/api/classes/{class_id}"), Some(&student.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["live_enrollment"], 1);
    assert_eq!(body["slots"][0]["day_of_week"], "monday");

    let (status, body) = app
        .send(
            "POST",
            &format!("/api/classes/{class_id}/withdrawal"),
            Some(&student.token),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "withdrawn");

    let (status, body) = app
        .send(
            "POST",
            &format!("/api/classes/{class_id}/withdrawal"),
            Some(&student.token),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "ALREADY_WITHDRAWN");
}

#[tokio::test]
async fn test_full_class_returns_capacity_full() {
    let app = setup_test_app();
    let manager = app.create_user(Role::Manager).await;
    let first = app.create_user(Role::Student).await;
    let second = app.create_user(Role::Student).await;

    let course_id = app.create_course(&manager, "PHYS200").await;
    let class_id = app
        .create_class(&manager, &course_id, 1, None, json!([]))
        .await;

    let (status, _) = app.enroll(&first, &class_id).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.enroll(&second, &class_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CAPACITY_FULL");
    assert_eq!(body["retryable"], false);

    let (status, _) = app.enroll(&first, &class_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_schedule_conflict_names_the_other_class() {
    let app = setup_test_app();
    let manager = app.create_user(Role::Manager).await;
    let student = app.create_user(Role::Student).await;

    let course_a = app.create_course(&manager, "HIST110").await;
    let course_b = app.create_course(&manager, "ART120").await;
    let x = app
        .create_class(
            &manager,
            &course_a,
            10,
            None,
            json!([slot("monday", "08:00:00", "10:30:00")]),
        )
        .await;
    let y = app
        .create_class(
            &manager,
            &course_b,
            10,
            None,
            json!([slot("monday", "09:00:00", "11:00:00")]),
        )
        .await;

    let (status, _) = app.enroll(&student, &x).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.enroll(&student, &y).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "SCHEDULE_CONFLICT");
    assert!(body["message"].as_str().unwrap().contains(&x));
}

#[tokio::test]
async fn test_manager_enrolls_on_behalf_of_student() {
    let app = setup_test_app();
    let manager = app.create_user(Role::Manager).await;
    let student = app.create_user(Role::Student).await;
    let teacher = app.create_user(Role::Teacher).await;

    let course_id = app.create_course(&manager, "BIO101").await;
    let class_id = app
        .create_class(&manager, &course_id, 5, None, json!([]))
        .await;
    let uri = format!("/api/classes/{class_id}/enrollments");

    let (status, body) = app
        .send("POST", &uri, Some(&manager.token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, _) = app
        .send(
            "POST",
            &uri,
            Some(&teacher.token),
            Some(json!({ "student_id": student.id })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(
            "POST",
            &uri,
            Some(&manager.token),
            Some(json!({ "student_id": student.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["student_id"], student.id.to_string());
}

#[tokio::test]
async fn test_teacher_grades_enrollment() {
    let app = setup_test_app();
    let manager = app.create_user(Role::Manager).await;
    let teacher = app.create_user(Role::Teacher).await;
    let student = app.create_user(Role::Student).await;

    let course_id = app.create_course(&manager, "CHEM210").await;
    let class_id = app
        .create_class(&manager, &course_id, 5, Some(teacher.id), json!([]))
        .await;
    let (_, enrollment) = app.enroll(&student, &class_id).await;
    let enrollment_id = enrollment["id"].as_str().unwrap();
    let uri = format!("/api/enrollments/{enrollment_id}/grade");

    let (status, body) = app
        .send("POST", &uri, Some(&teacher.token), Some(json!({ "score": 12 })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, _) = app
        .send("POST", &uri, Some(&student.token), Some(json!({ "score": 10 })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send("POST", &uri, Some(&teacher.token), Some(json!({ "score": 7.5 })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "completed");
    assert_eq!(body["grade"], "B");

    let (status, body) = app
        .send("POST", &uri, Some(&teacher.token), Some(json!({ "score": 9 })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "NOT_ACTIVE");
}

#[tokio::test]
async fn test_requests_without_token_are_unauthorized() {
    let app = setup_test_app();
    let manager = app.create_user(Role::Manager).await;
    let course_id = app.create_course(&manager, "ECON100").await;
    let class_id = app
        .create_class(&manager, &course_id, 5, None, json!([]))
        .await;

    let (status, body) = app
        .send(
            "POST",
            &format!("/api/classes/{class_id}/enrollments"),
            None,
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_transient_failure_is_hidden_by_retry() {
    let app = setup_test_app();
    let manager = app.create_user(Role::Manager).await;
    let student = app.create_user(Role::Student).await;
    let course_id = app.create_course(&manager, "LAW300").await;
    let class_id = app
        .create_class(&manager, &course_id, 5, None, json!([]))
        .await;

    app.store.fail_next_begins(1);
    let (status, _) = app.enroll(&student, &class_id).await;
    assert_eq!(status, StatusCode::CREATED);

    app.store.fail_next_begins(2);
    let (status, body) = app
        .send(
            "POST",
            &format!("/api/classes/{class_id}/withdrawal"),
            Some(&student.token),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "UNAVAILABLE");
    assert_eq!(body["retryable"], true);
}
