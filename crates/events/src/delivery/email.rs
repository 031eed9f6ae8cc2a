//! Email delivery.
//!
//! [`MockEmailBackend`] simulates a provider with fixed latency.
//! [`SmtpEmailBackend`] wraps the `lettre` async SMTP transport. Its
//! configuration is loaded from environment variables; if `SMTP_HOST` is not
//! set, [`EmailConfig::from_env`] returns `None` and the mock should be used.

use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{DeliveryBackend, DeliveryError, DeliveryResult};
use crate::envelope::{EmailPayload, Envelope, DEFAULT_FROM_ADDRESS};

// ---------------------------------------------------------------------------
// MockEmailBackend
// ---------------------------------------------------------------------------

/// Provider name reported by the mock backend.
pub const MOCK_EMAIL_PROVIDER: &str = "mock-email-provider";

/// Simulated provider latency.
const MOCK_EMAIL_LATENCY: Duration = Duration::from_millis(100);

/// Pretends to send email after a short delay.
#[derive(Debug, Clone)]
pub struct MockEmailBackend {
    latency: Duration,
}

impl MockEmailBackend {
    pub fn new() -> Self {
        Self {
            latency: MOCK_EMAIL_LATENCY,
        }
    }

    /// Override the simulated latency (zero disables it).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl Default for MockEmailBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryBackend for MockEmailBackend {
    type Payload = EmailPayload;

    fn provider(&self) -> &'static str {
        MOCK_EMAIL_PROVIDER
    }

    async fn send(
        &self,
        envelope: &Envelope<EmailPayload>,
    ) -> Result<DeliveryResult, DeliveryError> {
        tokio::time::sleep(self.latency).await;

        let email = envelope.payload();
        tracing::info!(
            message_id = %envelope.message_id(),
            to = %email.to,
            subject = %email.subject,
            from = %email.from,
            "Email sent"
        );

        Ok(DeliveryResult {
            delivered: true,
            provider: MOCK_EMAIL_PROVIDER.to_string(),
            estimated_delivery_time: "1-2 minutes".to_string(),
            platform: None,
            cost: None,
        })
    }
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Configuration for the SMTP email backend.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// Sender used in place of the default `from` address.
    pub smtp_from: Option<String>,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set.
    ///
    /// | Variable        | Required | Default |
    /// |-----------------|----------|---------|
    /// | `SMTP_HOST`     | yes      | -       |
    /// | `SMTP_PORT`     | no       | `587`   |
    /// | `SMTP_FROM`     | no       | -       |
    /// | `SMTP_USER`     | no       | -       |
    /// | `SMTP_PASSWORD` | no       | -       |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            smtp_from: std::env::var("SMTP_FROM").ok().filter(|f| !f.trim().is_empty()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// SmtpEmailBackend
// ---------------------------------------------------------------------------

/// Provider name reported by the SMTP backend.
pub const SMTP_PROVIDER: &str = "smtp";

/// Sends email through an SMTP relay.
pub struct SmtpEmailBackend {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    default_from: Option<String>,
}

impl SmtpEmailBackend {
    /// Build the relay transport once; it is reused for every send.
    pub fn new(config: &EmailConfig) -> Result<Self, DeliveryError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
            default_from: config.smtp_from.clone(),
        })
    }

    /// The payload's sender, unless it is the placeholder default and a
    /// relay sender is configured.
    fn sender<'a>(&'a self, email: &'a EmailPayload) -> &'a str {
        match &self.default_from {
            Some(from) if email.from == DEFAULT_FROM_ADDRESS => from,
            _ => &email.from,
        }
    }
}

impl DeliveryBackend for SmtpEmailBackend {
    type Payload = EmailPayload;

    fn provider(&self) -> &'static str {
        SMTP_PROVIDER
    }

    async fn send(
        &self,
        envelope: &Envelope<EmailPayload>,
    ) -> Result<DeliveryResult, DeliveryError> {
        let email = envelope.payload();
        let message = Message::builder()
            .from(self.sender(email).parse()?)
            .to(email.to.parse()?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| DeliveryError::Build(e.to_string()))?;

        self.mailer.send(message).await?;

        tracing::info!(
            message_id = %envelope.message_id(),
            to = %email.to,
            "Email sent via SMTP"
        );

        Ok(DeliveryResult {
            delivered: true,
            provider: SMTP_PROVIDER.to_string(),
            estimated_delivery_time: "1-2 minutes".to_string(),
            platform: None,
            cost: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> Envelope<EmailPayload> {
        Envelope::new(EmailPayload {
            to: "a@b.com".into(),
            subject: "S".into(),
            body: "B".into(),
            from: DEFAULT_FROM_ADDRESS.into(),
        })
    }

    #[tokio::test]
    async fn mock_reports_mock_provider() {
        let backend = MockEmailBackend::new().with_latency(Duration::ZERO);
        let result = backend.send(&envelope()).await.unwrap();
        assert!(result.delivered);
        assert_eq!(result.provider, "mock-email-provider");
        assert_eq!(result.estimated_delivery_time, "1-2 minutes");
        assert!(result.cost.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn mock_simulates_latency() {
        let backend = MockEmailBackend::default();
        let started = tokio::time::Instant::now();
        backend.send(&envelope()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn result_omits_absent_optional_fields() {
        let result = DeliveryResult {
            delivered: true,
            provider: MOCK_EMAIL_PROVIDER.into(),
            estimated_delivery_time: "1-2 minutes".into(),
            platform: None,
            cost: None,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "delivered": true,
                "provider": "mock-email-provider",
                "estimatedDeliveryTime": "1-2 minutes",
            })
        );
    }

    #[test]
    fn from_env_returns_none_without_smtp_host() {
        std::env::remove_var("SMTP_HOST");
        assert!(EmailConfig::from_env().is_none());
    }

    #[test]
    fn smtp_sender_overrides_only_the_default_address() {
        let backend = SmtpEmailBackend::new(&EmailConfig {
            smtp_host: "localhost".into(),
            smtp_port: 2525,
            smtp_from: Some("relay@example.org".into()),
            smtp_user: None,
            smtp_password: None,
        })
        .unwrap();

        let defaulted = envelope();
        assert_eq!(backend.sender(defaulted.payload()), "relay@example.org");

        let explicit = EmailPayload {
            from: "team@example.org".into(),
            ..defaulted.payload().clone()
        };
        assert_eq!(backend.sender(&explicit), "team@example.org");
    }

    #[tokio::test]
    async fn smtp_rejects_unparseable_recipient() {
        let backend = SmtpEmailBackend::new(&EmailConfig {
            smtp_host: "localhost".into(),
            smtp_port: 2525,
            smtp_from: None,
            smtp_user: None,
            smtp_password: None,
        })
        .unwrap();
        let bad = Envelope::new(EmailPayload {
            to: "not-an-email".into(),
            subject: "S".into(),
            body: "B".into(),
            from: DEFAULT_FROM_ADDRESS.into(),
        });
        let err = backend.send(&bad).await.unwrap_err();
        assert!(err.to_string().contains("Email address parse error"));
    }
}
