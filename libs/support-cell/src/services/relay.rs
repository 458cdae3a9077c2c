use std::sync::Arc;

use tracing::{error, info};

use shared_utils::mailer::{Mailer, OutgoingEmail};

use crate::models::{ContactRequest, SupportError, DEFAULT_CATEGORY, DEFAULT_SUBJECT};

/// Forwards contact-form messages to the support mailbox.
pub struct SupportRelay {
    mailer: Arc<dyn Mailer>,
    support_email: String,
}

impl SupportRelay {
    pub fn new(mailer: Arc<dyn Mailer>, support_email: impl Into<String>) -> Self {
        Self {
            mailer,
            support_email: support_email.into(),
        }
    }

    pub async fn relay(&self, request: &ContactRequest) -> Result<(), SupportError> {
        let email = compose(request, &self.support_email)?;
        let subject = email.subject.clone();

        self.mailer.send(email).await.map_err(|e| {
            error!("Support relay failed: {}", e);
            SupportError::Mail(e.to_string())
        })?;

        info!("Support message \"{}\" relayed to {}", subject, self.support_email);
        Ok(())
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn compose(request: &ContactRequest, to: &str) -> Result<OutgoingEmail, SupportError> {
    let message = non_blank(&request.message).ok_or(SupportError::MissingMessage)?;
    let category = non_blank(&request.category).unwrap_or(DEFAULT_CATEGORY);
    let sender = non_blank(&request.sender).unwrap_or("anonymous");

    Ok(OutgoingEmail {
        to: to.to_string(),
        subject: non_blank(&request.subject).unwrap_or(DEFAULT_SUBJECT).to_string(),
        body: format!("Category: {}\nFrom: {}\n\n{}", category, sender, message),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn fills_in_defaults() {
        let request = ContactRequest {
            message: Some("The booking page is blank".to_string()),
            ..Default::default()
        };

        let email = compose(&request, "support@curatime.test").unwrap();

        assert_eq!(email.to, "support@curatime.test");
        assert_eq!(email.subject, "Support CuraTime");
        assert_eq!(email.body, "Category: general\nFrom: anonymous\n\nThe booking page is blank");
    }

    #[test]
    fn keeps_sender_and_category() {
        let request = ContactRequest {
            subject: Some("Billing".to_string()),
            category: Some("payments".to_string()),
            message: Some("Charged twice".to_string()),
            sender: Some("ada@example.com".to_string()),
        };

        let email = compose(&request, "support@curatime.test").unwrap();

        assert_eq!(email.subject, "Billing");
        assert!(email.body.starts_with("Category: payments\nFrom: ada@example.com"));
    }

    #[test]
    fn blank_message_is_rejected() {
        let request = ContactRequest {
            message: Some("   ".to_string()),
            ..Default::default()
        };

        assert_matches!(compose(&request, "support@curatime.test"), Err(SupportError::MissingMessage));
    }
}
