use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};

use auth_cell::handlers::*;
use auth_cell::models::*;
use auth_cell::services::code_store::{InMemoryCodeStore, VerificationCodeStore};
use auth_cell::services::password::PasswordService;
use auth_cell::services::password_reset::CODE_TTL;
use shared_config::AppConfig;
use shared_models::auth::{Role, TokenType};
use shared_models::error::AppError;
use shared_utils::jwt::{issue_token, validate_token};
use shared_utils::test_utils::{MockSupabaseResponses, RecordingMailer, TestConfig, TestUser};

struct Harness {
    state: Arc<AuthState>,
    codes: Arc<InMemoryCodeStore>,
    mailer: Arc<RecordingMailer>,
}

fn harness(config: AppConfig) -> Harness {
    let codes = Arc::new(InMemoryCodeStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    let state = Arc::new(AuthState::new(Arc::new(config), codes.clone(), mailer.clone()));
    Harness { state, codes, mailer }
}

async fn mock_user_lookup(server: &MockServer, email: &str, rows: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", format!("eq.{}", email)))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

async fn mock_user_update(server: &MockServer, rows: Value) {
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

// ==============================================================================
// REGISTRATION
// ==============================================================================

#[tokio::test]
async fn register_creates_a_client_account() {
    let mock_server = MockServer::start().await;
    let h = harness(TestConfig::with_supabase_url(&mock_server.uri()).to_app_config());
    let id = Uuid::new_v4();

    mock_user_lookup(&mock_server, "ada@example.com", json!([])).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::user_row(id, "ada@example.com", Role::Client, "$argon2id$stub")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = RegisterRequest {
        email: Some("ada@Example.com".to_string()),
        password: Some("s3cret".to_string()),
        first_name: Some("Ada".to_string()),
        last_name: Some("Lovelace".to_string()),
        address: Some("1 Analytical Way".to_string()),
        ..Default::default()
    };

    let (status, Json(account)) = register(State(h.state), Json(request)).await.unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(account.id, id);
    assert_eq!(account.user_role, Role::Client);

    let body = serde_json::to_value(&account).unwrap();
    assert!(body.get("password_hash").is_none());

    let requests = mock_server.received_requests().await.unwrap();
    let insert = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
    let sent: Value = serde_json::from_slice(&insert.body).unwrap();
    assert_eq!(sent["email"], "ada@example.com");
    assert_eq!(sent["user_role"], "client");
    assert!(sent["password_hash"].as_str().unwrap().starts_with("$argon2"));
}

#[tokio::test]
async fn register_rejects_other_roles_and_missing_fields() {
    let h = harness(TestConfig::default().to_app_config());

    let request = RegisterRequest {
        email: Some("ada@example.com".to_string()),
        password: Some("s3cret".to_string()),
        user_role: Some("admin".to_string()),
        ..Default::default()
    };

    let result = register(State(h.state), Json(request)).await;

    assert_matches!(result, Err(AppError::FieldErrors(fields)) => {
        assert!(fields.contains_key("user_role"));
        assert!(!fields.contains_key("first_name"));
        assert!(!fields.contains_key("email"));
    });

    let h = harness(TestConfig::default().to_app_config());
    let request = RegisterRequest {
        first_name: Some("Ada".to_string()),
        ..Default::default()
    };

    let result = register(State(h.state), Json(request)).await;

    assert_matches!(result, Err(AppError::FieldErrors(fields)) => {
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    });
}

#[tokio::test]
async fn register_with_only_email_and_password_then_login() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let h = harness(config);
    let id = Uuid::new_v4();
    let hash = PasswordService::hash_password("pw123").unwrap();

    let mut stored = MockSupabaseResponses::user_row(id, "a@x.com", Role::Client, &hash);
    stored["first_name"] = json!("");
    stored["last_name"] = json!("");

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.a@x.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([stored.clone()])))
        .expect(1)
        .mount(&mock_server)
        .await;
    mock_user_lookup(&mock_server, "a@x.com", json!([stored])).await;
    mock_user_update(&mock_server, json!([])).await;

    let request = RegisterRequest {
        email: Some("a@x.com".to_string()),
        password: Some("pw123".to_string()),
        ..Default::default()
    };
    let (status, Json(account)) = register(State(h.state.clone()), Json(request)).await.unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(account.first_name, "");

    let requests = mock_server.received_requests().await.unwrap();
    let insert = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
    let sent: Value = serde_json::from_slice(&insert.body).unwrap();
    assert_eq!(sent["first_name"], "");
    assert_eq!(sent["last_name"], "");

    let Json(login) = client_login(
        State(h.state),
        Json(LoginRequest { email: "a@x.com".to_string(), password: "pw123".to_string() }),
    )
    .await
    .unwrap();

    assert_eq!(login.user_role, Role::Client);
    assert_eq!(login.user_id, id);
}

#[tokio::test]
async fn register_rejects_a_taken_email() {
    let mock_server = MockServer::start().await;
    let h = harness(TestConfig::with_supabase_url(&mock_server.uri()).to_app_config());

    mock_user_lookup(&mock_server, "ada@example.com", json!([
        MockSupabaseResponses::user_row(Uuid::new_v4(), "ada@example.com", Role::Client, "")
    ])).await;

    let request = RegisterRequest {
        email: Some("ada@example.com".to_string()),
        password: Some("s3cret".to_string()),
        first_name: Some("Ada".to_string()),
        last_name: Some("Lovelace".to_string()),
        ..Default::default()
    };

    let result = register(State(h.state), Json(request)).await;

    assert_matches!(result, Err(AppError::FieldErrors(fields)) if fields.contains_key("email"));
}

// ==============================================================================
// LOGIN
// ==============================================================================

#[tokio::test]
async fn client_login_returns_tokens_and_profile() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let secret = config.jwt_secret.clone();
    let h = harness(config);
    let id = Uuid::new_v4();
    let hash = PasswordService::hash_password("s3cret").unwrap();

    mock_user_lookup(&mock_server, "ada@example.com", json!([
        MockSupabaseResponses::user_row(id, "ada@example.com", Role::Client, &hash)
    ])).await;
    mock_user_update(&mock_server, json!([])).await;

    let request = LoginRequest {
        email: "ada@example.com".to_string(),
        password: "s3cret".to_string(),
    };

    let Json(response) = client_login(State(h.state), Json(request)).await.unwrap();

    assert_eq!(response.user_id, id);
    assert_eq!(response.user_role, Role::Client);
    assert!(response.is_superuser.is_none());

    let caller = validate_token(&response.tokens.access, &secret, TokenType::Access).unwrap();
    assert_eq!(caller.id, id);
    assert!(validate_token(&response.tokens.refresh, &secret, TokenType::Refresh).is_ok());

    let requests = mock_server.received_requests().await.unwrap();
    let touch = requests.iter().find(|r| r.method.as_str() == "PATCH").unwrap();
    let sent: Value = serde_json::from_slice(&touch.body).unwrap();
    assert!(sent["last_login"].is_string());
}

#[tokio::test]
async fn client_login_rejects_wrong_password_and_wrong_role() {
    let mock_server = MockServer::start().await;
    let h = harness(TestConfig::with_supabase_url(&mock_server.uri()).to_app_config());
    let hash = PasswordService::hash_password("s3cret").unwrap();

    mock_user_lookup(&mock_server, "ada@example.com", json!([
        MockSupabaseResponses::user_row(Uuid::new_v4(), "ada@example.com", Role::Client, &hash)
    ])).await;
    mock_user_lookup(&mock_server, "root@example.com", json!([
        MockSupabaseResponses::user_row(Uuid::new_v4(), "root@example.com", Role::Admin, &hash)
    ])).await;

    let wrong_password = client_login(State(h.state.clone()), Json(LoginRequest {
        email: "ada@example.com".to_string(),
        password: "guess".to_string(),
    })).await;
    assert_matches!(wrong_password, Err(AppError::Auth(_)));

    let wrong_role = client_login(State(h.state), Json(LoginRequest {
        email: "root@example.com".to_string(),
        password: "s3cret".to_string(),
    })).await;
    assert_matches!(wrong_role, Err(AppError::Auth(_)));
}

#[tokio::test]
async fn inactive_client_cannot_log_in() {
    let mock_server = MockServer::start().await;
    let h = harness(TestConfig::with_supabase_url(&mock_server.uri()).to_app_config());
    let hash = PasswordService::hash_password("s3cret").unwrap();

    let mut row = MockSupabaseResponses::user_row(Uuid::new_v4(), "ada@example.com", Role::Client, &hash);
    row["is_active"] = json!(false);
    mock_user_lookup(&mock_server, "ada@example.com", json!([row])).await;

    let result = client_login(State(h.state), Json(LoginRequest {
        email: "ada@example.com".to_string(),
        password: "s3cret".to_string(),
    })).await;

    assert_matches!(result, Err(AppError::Auth(msg)) if msg.contains("inactive"));
}

#[tokio::test]
async fn admin_login_reports_superuser_flag() {
    let mock_server = MockServer::start().await;
    let h = harness(TestConfig::with_supabase_url(&mock_server.uri()).to_app_config());
    let hash = PasswordService::hash_password("root-pw").unwrap();

    mock_user_lookup(&mock_server, "root@example.com", json!([
        MockSupabaseResponses::user_row(Uuid::new_v4(), "root@example.com", Role::Admin, &hash)
    ])).await;
    mock_user_update(&mock_server, json!([])).await;

    let Json(response) = admin_login(State(h.state), Json(LoginRequest {
        email: "root@example.com".to_string(),
        password: "root-pw".to_string(),
    })).await.unwrap();

    assert_eq!(response.user_role, Role::Admin);
    assert_eq!(response.is_superuser, Some(true));
}

#[tokio::test]
async fn refresh_token_issues_a_new_access_token() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let secret = config.jwt_secret.clone();
    let h = harness(config);
    let user = TestUser::client("ada@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_row(user.id, &user.email, Role::Client, "")
        ])))
        .mount(&mock_server)
        .await;

    let refresh = issue_token(
        user.id, &user.email, user.role, TokenType::Refresh, chrono::Duration::hours(1), &secret,
    ).unwrap();

    let Json(body) = refresh_token(State(h.state.clone()), Json(RefreshRequest { refresh })).await.unwrap();
    let access = body["access"].as_str().unwrap();
    assert_eq!(validate_token(access, &secret, TokenType::Access).unwrap().id, user.id);

    let access_as_refresh = issue_token(
        user.id, &user.email, user.role, TokenType::Access, chrono::Duration::hours(1), &secret,
    ).unwrap();
    let result = refresh_token(State(h.state), Json(RefreshRequest { refresh: access_as_refresh })).await;
    assert_matches!(result, Err(AppError::Auth(_)));
}

// ==============================================================================
// PASSWORD RESET
// ==============================================================================

#[tokio::test]
async fn forgot_password_stores_and_mails_a_code() {
    let mock_server = MockServer::start().await;
    let h = harness(TestConfig::with_supabase_url(&mock_server.uri()).to_app_config());

    mock_user_lookup(&mock_server, "ada@example.com", json!([
        MockSupabaseResponses::user_row(Uuid::new_v4(), "ada@example.com", Role::Client, "")
    ])).await;

    forgot_password(State(h.state), Json(ForgotPasswordRequest {
        email: "ada@example.com".to_string(),
    })).await.unwrap();

    let code = h.codes.get("ada@example.com").await.unwrap().unwrap();
    assert_eq!(code.len(), 4);

    let sent = h.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ada@example.com");
    assert!(sent[0].body.contains(&code));
}

#[tokio::test]
async fn forgot_password_refuses_unknown_and_non_client_accounts() {
    let mock_server = MockServer::start().await;
    let h = harness(TestConfig::with_supabase_url(&mock_server.uri()).to_app_config());

    mock_user_lookup(&mock_server, "nobody@example.com", json!([])).await;
    mock_user_lookup(&mock_server, "house@example.com", json!([
        MockSupabaseResponses::user_row(Uuid::new_v4(), "house@example.com", Role::Doctor, "")
    ])).await;

    let unknown = forgot_password(State(h.state.clone()), Json(ForgotPasswordRequest {
        email: "nobody@example.com".to_string(),
    })).await;
    assert_matches!(unknown, Err(AppError::NotFound(_)));

    let doctor = forgot_password(State(h.state), Json(ForgotPasswordRequest {
        email: "house@example.com".to_string(),
    })).await;
    assert_matches!(doctor, Err(AppError::Forbidden(_)));

    assert!(h.mailer.sent().await.is_empty());
}

#[tokio::test]
async fn verify_code_resets_password_once() {
    let mock_server = MockServer::start().await;
    let h = harness(TestConfig::with_supabase_url(&mock_server.uri()).to_app_config());
    let row = MockSupabaseResponses::user_row(Uuid::new_v4(), "ada@example.com", Role::Client, "");

    mock_user_lookup(&mock_server, "ada@example.com", json!([row.clone()])).await;
    mock_user_update(&mock_server, json!([row])).await;

    h.codes.put("ada@example.com", "4821", CODE_TTL).await.unwrap();

    let request = VerifyCodeRequest {
        email: "ada@example.com".to_string(),
        code: "4821".to_string(),
        new_password: "n3w-secret".to_string(),
    };

    verify_code(State(h.state.clone()), Json(request.clone())).await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let update = requests.iter().find(|r| r.method.as_str() == "PATCH").unwrap();
    let sent: Value = serde_json::from_slice(&update.body).unwrap();
    assert!(PasswordService::verify_password("n3w-secret", sent["password_hash"].as_str().unwrap()));

    let replay = verify_code(State(h.state), Json(request)).await;
    assert_matches!(replay, Err(AppError::BadRequest(msg)) if msg.contains("expired"));
}

#[tokio::test]
async fn verify_code_rejects_a_wrong_code() {
    let h = harness(TestConfig::default().to_app_config());
    h.codes.put("ada@example.com", "4821", CODE_TTL).await.unwrap();

    let result = verify_code(State(h.state), Json(VerifyCodeRequest {
        email: "ada@example.com".to_string(),
        code: "1111".to_string(),
        new_password: "n3w-secret".to_string(),
    })).await;

    assert_matches!(result, Err(AppError::BadRequest(msg)) if msg == "Invalid verification code");
    assert!(h.codes.get("ada@example.com").await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn verify_code_rejects_a_code_after_five_minutes() {
    let h = harness(TestConfig::default().to_app_config());
    h.codes.put("ada@example.com", "4821", CODE_TTL).await.unwrap();

    tokio::time::advance(CODE_TTL + Duration::from_secs(1)).await;

    let result = verify_code(State(h.state), Json(VerifyCodeRequest {
        email: "ada@example.com".to_string(),
        code: "4821".to_string(),
        new_password: "n3w-secret".to_string(),
    })).await;

    assert_matches!(result, Err(AppError::BadRequest(msg)) if msg == "The code has expired or is invalid");
}

// ==============================================================================
// PROFILE
// ==============================================================================

#[tokio::test]
async fn update_profile_applies_only_present_fields() {
    let mock_server = MockServer::start().await;
    let h = harness(TestConfig::with_supabase_url(&mock_server.uri()).to_app_config());
    let user = TestUser::client("ada@example.com");

    let mut updated = MockSupabaseResponses::user_row(user.id, &user.email, Role::Client, "");
    updated["first_name"] = json!("Augusta");
    mock_user_update(&mock_server, json!([updated])).await;

    let request = UpdateProfileRequest {
        first_name: Some("Augusta".to_string()),
        last_name: Some("".to_string()),
        gender: Some("null".to_string()),
        ..Default::default()
    };

    let Json(body) = update_profile(State(h.state), Extension(user.to_user()), Json(request))
        .await
        .unwrap();

    assert_eq!(body["user"]["first_name"], "Augusta");

    let requests = mock_server.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent, json!({ "first_name": "Augusta" }));
}

#[tokio::test]
async fn update_profile_rejects_an_email_owned_by_someone_else() {
    let mock_server = MockServer::start().await;
    let h = harness(TestConfig::with_supabase_url(&mock_server.uri()).to_app_config());
    let user = TestUser::client("ada@example.com");

    mock_user_lookup(&mock_server, "taken@example.com", json!([
        MockSupabaseResponses::user_row(Uuid::new_v4(), "taken@example.com", Role::Client, "")
    ])).await;

    let result = update_profile(State(h.state), Extension(user.to_user()), Json(UpdateProfileRequest {
        email: Some("taken@example.com".to_string()),
        ..Default::default()
    })).await;

    assert_matches!(result, Err(AppError::FieldErrors(fields)) if fields.contains_key("email"));
}

#[tokio::test]
async fn update_profile_is_for_clients_only() {
    let h = harness(TestConfig::default().to_app_config());
    let doctor = TestUser::doctor("house@example.com");

    let result = update_profile(State(h.state), Extension(doctor.to_user()), Json(UpdateProfileRequest {
        first_name: Some("Greg".to_string()),
        ..Default::default()
    })).await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}
