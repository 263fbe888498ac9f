//! SMTP delivery via `lettre`.
use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{MailError, Mailer};
use crate::config::MailSettings;

/// Sends through an SMTP relay over implicit TLS (port 465 by default)
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_settings(settings: &MailSettings) -> Result<Self, MailError> {
        let from: Mailbox = format!("SmartFarm <{}>", settings.sender())
            .parse()
            .map_err(|e| MailError::Address(format!("{e}")))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.expose().to_string(),
            ))
            .timeout(Some(Duration::from_secs(settings.timeout_secs)))
            .build();

        Ok(Self { transport, from })
    }

    fn build(&self, to: &str, subject: &str, body: &str) -> Result<Message, MailError> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| MailError::Address(format!("{to}: {e}")))?;
        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let message = self.build(to, subject, body)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        tracing::debug!(to, subject, "mail sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> MailSettings {
        MailSettings {
            enabled: true,
            username: "farm@naver.com".to_string(),
            ..MailSettings::default()
        }
    }

    #[tokio::test]
    async fn builds_plain_text_message() {
        let mailer = SmtpMailer::from_settings(&settings()).unwrap();
        let message = mailer.build("kim@farm.kr", "subject", "hello").unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: kim@farm.kr"));
        assert!(raw.contains("farm@naver.com"));
        assert!(raw.contains("text/plain"));
    }

    #[tokio::test]
    async fn rejects_bad_recipient() {
        let mailer = SmtpMailer::from_settings(&settings()).unwrap();
        assert!(matches!(
            mailer.build("not an address", "s", "b"),
            Err(MailError::Address(_))
        ));
    }

    #[test]
    fn rejects_bad_sender() {
        let mut bad = settings();
        bad.username = "no-at-sign".to_string();
        assert!(matches!(
            SmtpMailer::from_settings(&bad),
            Err(MailError::Address(_))
        ));
    }
}
