//! Outbound email.
//!
//! [`HttpMailer`] relays through a transactional email provider's JSON API; [`LogMailer`]
//! only logs and is what runs when mail is disabled in config.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use common::types::VisitorRecord;
use configs::MailConfig;

use crate::errors::ServiceError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, msg: &EmailMessage) -> Result<(), ServiceError>;
}

/// The visitor details that go into an approval request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorNotice {
    pub name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub vehicle_number: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<&VisitorRecord> for VisitorNotice {
    fn from(v: &VisitorRecord) -> Self {
        Self {
            name: v.name.clone(),
            phone_number: v.phone_number.clone(),
            purpose: v.purpose.clone(),
            vehicle_number: v.vehicle_number.clone(),
            timestamp: Some(v.timestamp),
        }
    }
}

/// Sender identity used on every outgoing message.
#[derive(Debug, Clone)]
pub struct Sender {
    pub name: String,
    pub address: String,
}

impl Sender {
    pub fn from_config(cfg: &MailConfig) -> Self {
        Self { name: cfg.from_name.clone(), address: cfg.from_address.clone() }
    }

    fn header(&self) -> String {
        format!("\"{}\" <{}>", self.name, self.address)
    }
}

pub fn visitor_notification(sender: &Sender, visitor: &VisitorNotice, resident_email: &str) -> EmailMessage {
    let vehicle = visitor
        .vehicle_number
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("N/A");
    let when = visitor
        .timestamp
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let text = format!(
        "Hello,\n\n\
         You have a new visitor waiting for your approval.\n\n\
         Visitor Details:\n\
         Name: {}\n\
         Phone: {}\n\
         Purpose: {}\n\
         Vehicle Number: {}\n\
         Timestamp: {}\n\n\
         Please log in to your dashboard to approve or reject this visitor.\n\n\
         Thank you.\n",
        visitor.name, visitor.phone_number, visitor.purpose, vehicle, when
    );
    EmailMessage {
        from: sender.header(),
        to: resident_email.to_string(),
        subject: format!("New Visitor Approval Request from {}", visitor.name),
        text,
    }
}

pub fn verification_email(sender: &Sender, name: &str, email: &str, token: &str) -> EmailMessage {
    EmailMessage {
        from: sender.header(),
        to: email.to_string(),
        subject: "Verify your GateLog email address".into(),
        text: format!(
            "Hello {name},\n\n\
             Use this verification token to activate your account:\n\n\
             {token}\n\n\
             You can sign in once your email address is verified.\n"
        ),
    }
}

pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl HttpMailer {
    pub fn new(client: reqwest::Client, cfg: &MailConfig) -> Self {
        Self { client, api_url: cfg.api_url.clone(), api_key: cfg.api_key.clone() }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    #[instrument(skip(self, msg), fields(to = %msg.to))]
    async fn send(&self, msg: &EmailMessage) -> Result<(), ServiceError> {
        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(msg)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ServiceError::Upstream(format!("mail provider returned {status}: {body}")));
        }
        info!(subject = %msg.subject, "email_sent");
        Ok(())
    }
}

#[derive(Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, msg: &EmailMessage) -> Result<(), ServiceError> {
        info!(to = %msg.to, subject = %msg.subject, "mail disabled; message not sent");
        Ok(())
    }
}

pub fn mailer_from_config(cfg: &MailConfig, client: reqwest::Client) -> Arc<dyn Mailer> {
    if cfg.enabled {
        Arc::new(HttpMailer::new(client, cfg))
    } else {
        Arc::new(LogMailer)
    }
}

/// Recording mailer for tests
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryMailer {
        pub sent: Mutex<Vec<EmailMessage>>,
        pub fail_with: Option<String>,
    }

    impl MemoryMailer {
        pub fn failing(reason: &str) -> Self {
            Self { sent: Mutex::new(Vec::new()), fail_with: Some(reason.to_string()) }
        }

        pub fn sent(&self) -> Vec<EmailMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for MemoryMailer {
        async fn send(&self, msg: &EmailMessage) -> Result<(), ServiceError> {
            if let Some(reason) = &self.fail_with {
                return Err(ServiceError::Upstream(reason.clone()));
            }
            self.sent.lock().unwrap().push(msg.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sender() -> Sender {
        Sender { name: "GateLog Notifications".into(), address: "noreply@example.com".into() }
    }

    #[test]
    fn notification_lists_visitor_details() {
        let notice = VisitorNotice {
            name: "Ravi".into(),
            phone_number: "9876543210".into(),
            purpose: "Delivery".into(),
            vehicle_number: None,
            timestamp: Some(Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()),
        };
        let msg = visitor_notification(&sender(), &notice, "asha@example.com");
        assert_eq!(msg.subject, "New Visitor Approval Request from Ravi");
        assert_eq!(msg.to, "asha@example.com");
        assert_eq!(msg.from, "\"GateLog Notifications\" <noreply@example.com>");
        assert!(msg.text.contains("Phone: 9876543210"));
        assert!(msg.text.contains("Vehicle Number: N/A"));
        assert!(msg.text.contains("Timestamp: 2024-06-01 09:30:00 UTC"));
        assert!(msg.text.contains("approve or reject"));
    }

    #[test]
    fn notice_accepts_partial_visitor_json() {
        let n: VisitorNotice = serde_json::from_str(r#"{"name":"Ravi","vehicleNumber":"MH12"}"#).unwrap();
        assert_eq!(n.vehicle_number.as_deref(), Some("MH12"));
        assert!(n.timestamp.is_none());
    }

    #[test]
    fn verification_mail_carries_token() {
        let msg = verification_email(&sender(), "Asha", "asha@example.com", "tok123");
        assert!(msg.text.contains("tok123"));
        assert!(msg.text.starts_with("Hello Asha,"));
    }

    #[tokio::test]
    async fn disabled_mail_uses_log_mailer() {
        let mailer = mailer_from_config(&MailConfig::default(), reqwest::Client::new());
        let msg = verification_email(&sender(), "A", "a@example.com", "t");
        assert!(mailer.send(&msg).await.is_ok());
    }
}
