use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, TokenType, User};

use crate::jwt::issue_token;
use crate::mailer::{Mailer, OutgoingEmail};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            access_token_ttl_minutes: 60,
            refresh_token_ttl_minutes: 24 * 60,
            redis_url: None,
            mail_api_url: None,
            mail_api_key: None,
            mail_from: "no-reply@test.local".to_string(),
            support_email: "support@test.local".to_string(),
            server_port: 0,
            bootstrap_admin_email: None,
            bootstrap_admin_password: None,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl TestUser {
    pub fn new(email: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role,
        }
    }

    pub fn client(email: &str) -> Self {
        Self::new(email, Role::Client)
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, Role::Doctor)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, Role::Admin)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        issue_token(
            user.id,
            &user.email,
            user.role,
            TokenType::Access,
            Duration::hours(exp_hours.unwrap_or(24)),
            secret,
        )
        .expect("test token should sign")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }
}

/// Row shapes as PostgREST returns them for the booking schema.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn user_row(id: Uuid, email: &str, role: Role, password_hash: &str) -> Value {
        json!({
            "id": id,
            "email": email,
            "password_hash": password_hash,
            "first_name": "Test",
            "last_name": "User",
            "user_role": role,
            "is_active": true,
            "is_staff": role == Role::Admin,
            "is_superuser": role == Role::Admin,
            "date_joined": "2024-01-01T00:00:00Z",
            "last_login": null,
            "address": "",
            "gender": ""
        })
    }

    pub fn specialty_row(id: Uuid, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "description": ""
        })
    }

    pub fn doctor_row(id: Uuid, user_id: Option<Uuid>, email: &str, specialty_id: Uuid) -> Value {
        json!({
            "id": id,
            "user_id": user_id,
            "first_name": "Gregory",
            "last_name": "House",
            "email": email,
            "phone": "555-0100",
            "address": "221B Main St",
            "city": "Princeton",
            "state": "NJ",
            "zip_code": "08540",
            "specialty_id": specialty_id,
            "availability": {},
            "bio": "",
            "photo": null,
            "consultation_fee": 120.0
        })
    }

    pub fn appointment_row(
        id: Uuid,
        client_id: Uuid,
        doctor_id: Uuid,
        date_time: DateTime<Utc>,
        status: &str,
    ) -> Value {
        json!({
            "id": id,
            "client_id": client_id,
            "doctor_id": doctor_id,
            "date_time": date_time,
            "status": status,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }
}

/// Mailer double that keeps every message in memory.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        self.sent.lock().await.push(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::validate_token;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_service_key, "test-service-key");
        assert!(app_config.is_configured());
        assert!(app_config.mail_api_url.is_none());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor("doc@example.com");
        assert_eq!(user.email, "doc@example.com");
        assert_eq!(user.role, Role::Doctor);

        let user_model = user.to_user();
        assert_eq!(user_model.email, user.email);
        assert_eq!(user_model.id, user.id);
    }

    #[test]
    fn test_jwt_token_creation() {
        let config = TestConfig::default();
        let user = TestUser::client("a@x.com");
        let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

        assert_eq!(token.split('.').count(), 3);
        assert!(validate_token(&token, &config.jwt_secret, TokenType::Access).is_ok());
        assert!(validate_token(
            &JwtTestUtils::create_expired_token(&user, &config.jwt_secret),
            &config.jwt_secret,
            TokenType::Access
        ).is_err());
    }

    #[tokio::test]
    async fn recording_mailer_keeps_messages() {
        let mailer = RecordingMailer::new();
        mailer.send(OutgoingEmail {
            to: "a@x.com".to_string(),
            subject: "Hi".to_string(),
            body: "Body".to_string(),
        }).await.unwrap();

        assert_eq!(mailer.sent().await.len(), 1);
    }
}
