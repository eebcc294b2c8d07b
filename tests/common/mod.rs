#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use classroll::classroll_auth::create_access_token;
use classroll::classroll_config::{CorsConfig, JwtConfig, SchedulingConfig};
use classroll::classroll_core::FixedClock;
use classroll::classroll_db::MemoryStore;
use classroll::classroll_models::{Role, UserId};
use classroll::router::init_router;
use classroll::state::AppState;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub clock: FixedClock,
    pub jwt_config: JwtConfig,
}

pub struct TestUser {
    pub id: UserId,
    pub token: String,
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Router over an in-memory store with the clock pinned to 2025-08-01.
pub fn setup_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::default());
    let clock = FixedClock::on(date(2025, 8, 1));
    let jwt_config = JwtConfig {
        secret: "integration-test-secret".to_string(),
        access_token_expiry: 3600,
    };
    let state = AppState::new(
        store.clone(),
        Arc::new(clock.clone()),
        SchedulingConfig {
            retry_backoff: Duration::from_millis(1),
            ..SchedulingConfig::default()
        },
        jwt_config.clone(),
        CorsConfig::default(),
    );

    TestApp {
        router: init_router(state),
        store,
        clock,
        jwt_config,
    }
}

impl TestApp {
    pub async fn create_user(&self, role: Role) -> TestUser {
        let id = UserId::new();
        self.store.add_user(id, role).await.unwrap();
        let token = create_access_token(id, role, &self.jwt_config).unwrap();
        TestUser { id, token }
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub async fn create_course(&self, manager: &TestUser, code: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/api/courses",
                Some(&manager.token),
                Some(json!({
                    "code": code,
                    "name": format!("Course {code}"),
                    "credits": 3
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    /// Create a Fall 2025 section and return its id.
    pub async fn create_class(
        &self,
        manager: &TestUser,
        course_id: &str,
        capacity: i32,
        teacher_id: Option<UserId>,
        slots: Value,
    ) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/api/classes",
                Some(&manager.token),
                Some(json!({
                    "course_id": course_id,
                    "teacher_id": teacher_id,
                    "semester": "Fall",
                    "academic_year": "2025-2026",
                    "capacity": capacity,
                    "start_date": "2025-09-01",
                    "end_date": "2025-12-20",
                    "slots": slots
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn enroll(&self, student: &TestUser, class_id: &str) -> (StatusCode, Value) {
        self.send(
            "POST",
            &format!("/api/classes/{class_id}/enrollments"),
            Some(&student.token),
            Some(json!({})),
        )
        .await
    }
}

pub fn slot(day: &str, start: &str, end: &str) -> Value {
    json!({ "day_of_week": day, "start_time": start, "end_time": end })
}
