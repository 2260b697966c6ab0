//! Outbound notifications (invite mail).
//!
//! [`SmtpSender`] delivers through an SMTP relay. [`LoggingSender`] is the
//! development fallback used when no relay is configured.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub from: String,
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub id: Uuid,
    pub accepted: usize,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum NotificationError {
    #[error("no recipients")]
    NoRecipients,

    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

pub trait NotificationSender: Send + Sync {
    fn send(&self, notification: &Notification) -> Result<DeliveryReceipt, NotificationError>;
}

/// Writes notifications to the log instead of delivering them. Only meant
/// for development, when no SMTP relay is configured.
///
/// The body is redacted: invite bodies carry single-use tokens.
#[derive(Debug, Default, Clone)]
pub struct LoggingSender;

impl NotificationSender for LoggingSender {
    fn send(&self, notification: &Notification) -> Result<DeliveryReceipt, NotificationError> {
        if notification.recipients.is_empty() {
            return Err(NotificationError::NoRecipients);
        }
        let receipt = DeliveryReceipt {
            id: Uuid::now_v7(),
            accepted: notification.recipients.len(),
        };
        info!(
            delivery_id = %receipt.id,
            from = %notification.from,
            subject = %notification.subject,
            recipients = ?notification.recipients,
            body_len = notification.body.len(),
            "notification sent"
        );
        Ok(receipt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    /// 587 unless overridden.
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub starttls: bool,
}

impl SmtpConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 587,
            username: None,
            password: None,
            starttls: true,
        }
    }
}

/// Delivers notifications through an SMTP relay.
///
/// Sending blocks the calling thread for the whole SMTP exchange.
pub struct SmtpSender {
    transport: SmtpTransport,
    host: String,
}

impl SmtpSender {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotificationError> {
        let builder = if config.starttls {
            SmtpTransport::starttls_relay(&config.host)
        } else {
            SmtpTransport::relay(&config.host)
        }
        .map_err(|e| NotificationError::Delivery(format!("smtp transport: {e}")))?;

        let mut builder = builder.port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }
        Ok(Self {
            transport: builder.build(),
            host: config.host.clone(),
        })
    }
}

impl NotificationSender for SmtpSender {
    fn send(&self, notification: &Notification) -> Result<DeliveryReceipt, NotificationError> {
        let message = build_message(notification)?;
        let response = self.transport.send(&message).map_err(|e| {
            warn!(host = %self.host, error = %e, "smtp delivery failed");
            NotificationError::Delivery(e.to_string())
        })?;
        let receipt = DeliveryReceipt {
            id: Uuid::now_v7(),
            accepted: notification.recipients.len(),
        };
        info!(
            delivery_id = %receipt.id,
            host = %self.host,
            code = %response.code(),
            recipients = notification.recipients.len(),
            "notification delivered"
        );
        Ok(receipt)
    }
}

fn mailbox(raw: &str) -> Result<Mailbox, NotificationError> {
    raw.trim()
        .parse()
        .map_err(|_| NotificationError::InvalidAddress(raw.to_string()))
}

/// Plain-text message with every recipient on `To`.
pub fn build_message(notification: &Notification) -> Result<Message, NotificationError> {
    if notification.recipients.is_empty() {
        return Err(NotificationError::NoRecipients);
    }
    let mut builder = Message::builder()
        .from(mailbox(&notification.from)?)
        .subject(notification.subject.as_str())
        .header(ContentType::TEXT_PLAIN);
    for to in &notification.recipients {
        builder = builder.to(mailbox(to)?);
    }
    builder
        .body(notification.body.clone())
        .map_err(|e| NotificationError::Delivery(format!("message build: {e}")))
}

/// Keeps every sent notification in memory.
#[derive(Debug, Default)]
pub struct RecordingOutbox {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (nothing is recorded while failing).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl NotificationSender for RecordingOutbox {
    fn send(&self, notification: &Notification) -> Result<DeliveryReceipt, NotificationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::Delivery("outbox set to fail".to_string()));
        }
        if notification.recipients.is_empty() {
            return Err(NotificationError::NoRecipients);
        }
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| NotificationError::Delivery("outbox lock poisoned".to_string()))?;
        sent.push(notification.clone());
        Ok(DeliveryReceipt {
            id: Uuid::now_v7(),
            accepted: notification.recipients.len(),
        })
    }
}
