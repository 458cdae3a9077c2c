use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info};

use shared_config::AppConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<()>;
}

/// Delivers mail through a transactional email HTTP API
/// (`POST {MAIL_API_URL}` with a bearer key).
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        debug!("Sending email to {} via {}", email.to, self.api_url);

        let response = self.client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [email.to],
                "subject": email.subject,
                "text": email.body
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Mail API error ({}): {}", status, error_text);
            return Err(anyhow!("Mail API error ({}): {}", status, error_text));
        }

        Ok(())
    }
}

/// Used when no mail API is configured: the message is written to the log
/// instead of being delivered.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        info!(to = %email.to, subject = %email.subject, "Mail delivery not configured, message logged only");
        Ok(())
    }
}

pub fn mailer_from_config(config: &AppConfig) -> Arc<dyn Mailer> {
    match (&config.mail_api_url, &config.mail_api_key) {
        (Some(url), Some(key)) => Arc::new(HttpMailer::new(
            url.clone(),
            key.clone(),
            config.mail_from.clone(),
        )),
        _ => Arc::new(LogMailer),
    }
}
