use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    extract::{Extension, State},
    Json,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};

use dashboard_cell::handlers::*;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig, TestUser};

fn config_for(mock_server: &MockServer) -> Arc<AppConfig> {
    TestConfig::with_supabase_url(&mock_server.uri()).to_arc()
}

fn as_user(user: &TestUser) -> Extension<User> {
    Extension(user.to_user())
}

async fn mount_json(server: &MockServer, table: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/rest/v1/{}", table)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn admin_stats_count_current_rows() {
    let mock_server = MockServer::start().await;
    let cardio = Uuid::new_v4();
    let now = Utc::now();

    mount_json(&mock_server, "doctors", json!([{ "specialty_id": cardio }])).await;
    mount_json(&mock_server, "users", json!([
        { "user_role": "client", "last_login": now },
        { "user_role": "doctor", "last_login": null }
    ])).await;
    mount_json(&mock_server, "appointments", json!([
        { "client_id": Uuid::new_v4(), "date_time": now, "status": "pending" },
        { "client_id": Uuid::new_v4(), "date_time": now - Duration::days(400), "status": "completed" }
    ])).await;
    mount_json(&mock_server, "specialties", json!([
        MockSupabaseResponses::specialty_row(cardio, "Cardiology"),
        MockSupabaseResponses::specialty_row(Uuid::new_v4(), "Dermatology")
    ])).await;

    let Json(stats) = admin_stats(
        State(config_for(&mock_server)),
        as_user(&TestUser::admin("admin@example.com")),
    )
    .await
    .unwrap();

    let body = serde_json::to_value(&stats).unwrap();
    assert_eq!(body["totalDoctors"], 1);
    assert_eq!(body["totalPatients"], 1);
    assert_eq!(body["totalAppointments"], 2);
    assert_eq!(body["totalSpecialties"], 2);
    assert_eq!(body["todayAppointments"], 1);
    assert_eq!(body["pendingAppointments"], 1);
    assert_eq!(body["completedAppointments"], 1);
    assert_eq!(body["activeUsers"], 1);
    assert_eq!(body["monthlyAppointments"].as_array().unwrap().len(), 6);
    assert_eq!(body["specialtyStats"], json!([{ "specialty": "Cardiology", "count": 1 }]));
}

#[tokio::test]
async fn admin_dashboard_is_admin_only() {
    let mock_server = MockServer::start().await;

    let result = admin_stats(
        State(config_for(&mock_server)),
        as_user(&TestUser::doctor("house@example.com")),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn activities_describe_recent_bookings() {
    let mock_server = MockServer::start().await;
    let client_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    let mut row = MockSupabaseResponses::appointment_row(
        Uuid::new_v4(), client_id, doctor_id, Utc::now() + Duration::days(1), "pending"
    );
    row["client"] = json!({
        "id": client_id,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "email": "ada@example.com"
    });
    row["doctor"] = MockSupabaseResponses::doctor_row(doctor_id, None, "house@example.com", Uuid::new_v4());

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("order", "created_at.desc"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let Json(feed) = admin_activities(
        State(config_for(&mock_server)),
        as_user(&TestUser::admin("admin@example.com")),
    )
    .await
    .unwrap();

    assert_eq!(feed.results.len(), 1);
    assert_eq!(feed.results[0].message, "New appointment: Ada Lovelace with Dr. Gregory House");
    assert_eq!(feed.results[0].kind, "appointment_created");
}

#[tokio::test]
async fn doctor_stats_are_scoped_to_the_linked_profile() {
    let mock_server = MockServer::start().await;
    let doctor_user = TestUser::doctor("house@example.com");
    let doctor_id = Uuid::new_v4();
    let patient = Uuid::new_v4();

    mount_json(&mock_server, "doctors", json!([
        MockSupabaseResponses::doctor_row(doctor_id, Some(doctor_user.id), "house@example.com", Uuid::new_v4())
    ])).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "client_id": patient, "date_time": Utc::now() - Duration::days(60), "status": "completed" },
            { "client_id": patient, "date_time": Utc::now() - Duration::days(30), "status": "completed" }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let Json(stats) = doctor_stats(State(config_for(&mock_server)), as_user(&doctor_user))
        .await
        .unwrap();

    assert_eq!(stats.total_patients, 1);
    assert_eq!(stats.completed_appointments, 2);
    assert_eq!(stats.today_appointments, 0);
}

#[tokio::test]
async fn doctor_dashboard_without_profile_is_not_found() {
    let mock_server = MockServer::start().await;
    mount_json(&mock_server, "doctors", json!([])).await;

    let result = doctor_recent_appointments(
        State(config_for(&mock_server)),
        as_user(&TestUser::doctor("ghost@example.com")),
    )
    .await;

    assert_matches!(result, Err(AppError::NotFound(msg)) if msg == "Doctor not found");
}
