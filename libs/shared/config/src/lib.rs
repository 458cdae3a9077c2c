use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_minutes: i64,
    pub redis_url: Option<String>,
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<String>,
    pub mail_from: String,
    pub support_email: String,
    pub server_port: u16,
    pub bootstrap_admin_email: Option<String>,
    pub bootstrap_admin_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            access_token_ttl_minutes: parse_or("ACCESS_TOKEN_TTL_MINUTES", 60),
            refresh_token_ttl_minutes: parse_or("REFRESH_TOKEN_TTL_MINUTES", 24 * 60),
            redis_url: optional("REDIS_URL"),
            mail_api_url: optional("MAIL_API_URL"),
            mail_api_key: optional("MAIL_API_KEY"),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "no-reply@curatime.local".to_string()),
            support_email: env::var("SUPPORT_EMAIL")
                .unwrap_or_else(|_| {
                    warn!("SUPPORT_EMAIL not set, using default");
                    "support@curatime.local".to_string()
                }),
            server_port: parse_or("SERVER_PORT", 3000),
            bootstrap_admin_email: optional("BOOTSTRAP_ADMIN_EMAIL"),
            bootstrap_admin_password: optional("BOOTSTRAP_ADMIN_PASSWORD"),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_service_key.is_empty()
            && !self.jwt_secret.is_empty()
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value, using default", key);
            default
        }),
        Err(_) => default,
    }
}
