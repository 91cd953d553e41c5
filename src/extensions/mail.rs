//! Outgoing mail over SMTP.
//!
//! With `MAIL_SUPPRESS_SEND` set, messages are recorded in an in-memory outbox
//! instead of being delivered. The outbox keeps the latest `OUTBOX_LIMIT`
//! messages; `take_outbox` drains it.

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::config::Settings;
use crate::error::{AppError, InitError};

/// Most messages kept in the outbox; older ones are dropped first.
pub const OUTBOX_LIMIT: usize = 100;

/// A message as handed to `Mail::send`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Clone)]
pub struct Mail {
    sender: Mailbox,
    transport: Option<SmtpTransport>,
    outbox: Arc<Mutex<VecDeque<OutgoingMessage>>>,
}

impl Mail {
    pub fn init_app(settings: &Settings) -> Result<Self, InitError> {
        let sender: Mailbox = settings
            .get_str("MAIL_DEFAULT_SENDER")
            .unwrap_or("noreply@example.com")
            .parse()
            .map_err(|e| InitError::extension("mail", format!("MAIL_DEFAULT_SENDER: {}", e)))?;

        let transport = if settings.get_bool("MAIL_SUPPRESS_SEND") {
            None
        } else {
            let server = settings.get_str("MAIL_SERVER").unwrap_or("localhost");
            let port = settings.get_u64("MAIL_PORT")?.unwrap_or(25);
            let port = u16::try_from(port)
                .map_err(|_| InitError::extension("mail", "MAIL_PORT must fit in 16 bits"))?;

            let mut builder = SmtpTransport::builder_dangerous(server).port(port);
            if let (Some(user), Some(password)) =
                (settings.get_str("MAIL_USERNAME"), settings.get_str("MAIL_PASSWORD"))
            {
                builder = builder.credentials(Credentials::new(user.to_string(), password.to_string()));
            }
            Some(builder.build())
        };

        Ok(Mail {
            sender,
            transport,
            outbox: Arc::new(Mutex::new(VecDeque::new())),
        })
    }

    pub fn suppressed(&self) -> bool {
        self.transport.is_none()
    }

    /// Builds and delivers a plain-text message. Blocks on SMTP I/O.
    ///
    /// # Arguments
    ///
    /// * `to` - Recipient address, e.g. `"Jane <jane@example.com>"`.
    /// * `subject` - Subject line.
    /// * `body` - Plain-text body.
    ///
    /// # Returns
    ///
    /// * `Result<(), AppError>` - `MailError` for a bad recipient or a failed
    ///   delivery. Suppressed messages go to the outbox and always succeed.
    pub fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        let recipient: Mailbox = to
            .parse()
            .map_err(|e| AppError::MailError(format!("Invalid recipient '{}': {}", to, e)))?;
        let message = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| AppError::MailError(e.to_string()))?;

        match &self.transport {
            Some(transport) => {
                transport
                    .send(&message)
                    .map_err(|e| AppError::MailError(e.to_string()))?;
                log::info!("mail: delivered '{}' to {}", subject, to);
            }
            None => {
                log::debug!("mail: suppressed '{}' to {}", subject, to);
                let mut outbox = self
                    .outbox
                    .lock()
                    .map_err(|_| AppError::MailError("Outbox lock poisoned".into()))?;
                if outbox.len() >= OUTBOX_LIMIT {
                    outbox.pop_front();
                }
                outbox.push_back(OutgoingMessage {
                    to: to.to_string(),
                    subject: subject.to_string(),
                    body: body.to_string(),
                });
            }
        }
        Ok(())
    }

    /// `send` on the blocking thread pool.
    pub async fn send_async(&self, to: String, subject: String, body: String) -> Result<(), AppError> {
        let mail = self.clone();
        tokio::task::spawn_blocking(move || mail.send(&to, &subject, &body))
            .await
            .map_err(|e| AppError::MailError(format!("Mail worker failed: {}", e)))?
    }

    /// Messages recorded while sending is suppressed.
    pub fn outbox(&self) -> Vec<OutgoingMessage> {
        self.outbox
            .lock()
            .map(|o| o.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Empties the outbox, returning what it held.
    pub fn take_outbox(&self) -> Vec<OutgoingMessage> {
        self.outbox
            .lock()
            .map(|mut o| o.drain(..).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_suppressed_mail_is_recorded() {
        let mail = Mail::init_app(&Settings::testing()).unwrap();
        assert!(mail.suppressed());

        mail.send("someone@example.com", "Hello", "Body").unwrap();

        assert_eq!(
            mail.outbox(),
            vec![OutgoingMessage {
                to: "someone@example.com".into(),
                subject: "Hello".into(),
                body: "Body".into(),
            }]
        );
    }

    #[test]
    fn test_outbox_is_bounded_and_drainable() {
        let mail = Mail::init_app(&Settings::testing()).unwrap();
        for i in 0..OUTBOX_LIMIT + 5 {
            mail.send("someone@example.com", &format!("#{}", i), "b").unwrap();
        }

        let outbox = mail.outbox();
        assert_eq!(outbox.len(), OUTBOX_LIMIT);
        assert_eq!(outbox[0].subject, "#5");

        assert_eq!(mail.take_outbox().len(), OUTBOX_LIMIT);
        assert!(mail.outbox().is_empty());
    }

    #[test]
    fn test_invalid_recipient() {
        let mail = Mail::init_app(&Settings::testing()).unwrap();
        assert!(matches!(mail.send("not-an-address", "s", "b"), Err(AppError::MailError(_))));
        assert!(mail.outbox().is_empty());
    }

    #[test]
    fn test_invalid_sender_fails_init() {
        let settings = Settings::testing().with("MAIL_DEFAULT_SENDER", json!("nope"));
        assert!(matches!(
            Mail::init_app(&settings),
            Err(InitError::Extension { name: "mail", .. })
        ));
    }

    #[test]
    fn test_transport_built_when_not_suppressed() {
        let settings = Settings::testing().with("MAIL_SUPPRESS_SEND", json!(false));
        assert!(!Mail::init_app(&settings).unwrap().suppressed());
    }

    #[actix_rt::test]
    async fn test_send_async() {
        let mail = Mail::init_app(&Settings::testing()).unwrap();
        mail.send_async("a@example.com".into(), "s".into(), "b".into())
            .await
            .unwrap();
        assert_eq!(mail.outbox().len(), 1);
    }
}
