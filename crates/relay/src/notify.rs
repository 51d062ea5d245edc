use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{info, warn};

use crate::context::MailSettings;
use crate::error::{RelayError, Result};
use crate::relay::is_rejected;

/// What the dispatcher did with one relay outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// No confirmation address is configured; zero transport activity.
    Skipped,
    Sent,
    /// The transport failed; the run carries on.
    Failed(String),
}

/// Pick the configured body for a relay outcome, newline-terminated.
pub fn compose_body(mail: &MailSettings, relay_output: &str) -> String {
    let text = if is_rejected(relay_output) {
        &mail.fail_body
    } else {
        &mail.success_body
    };
    format!("{text}\n")
}

/// Mail transport seam. The production implementation speaks
/// authenticated SMTP; tests substitute a recording mock.
pub trait Mailer {
    fn send(&self, mail: &MailSettings, body: &str) -> Result<()>;
}

/// Sends one message over SMTP: connect, STARTTLS, authenticate with
/// plain credentials, submit, close.
pub struct SmtpMailer;

impl Mailer for SmtpMailer {
    fn send(&self, mail: &MailSettings, body: &str) -> Result<()> {
        let from: Mailbox = mail
            .sender
            .parse()
            .map_err(|e| RelayError::NotificationFailed(format!("invalid sender address: {e}")))?;
        let to: Mailbox = mail.confirm_address.parse().map_err(|e| {
            RelayError::NotificationFailed(format!("invalid confirmation address: {e}"))
        })?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .body(body.to_string())
            .map_err(|e| RelayError::NotificationFailed(e.to_string()))?;

        let transport = SmtpTransport::starttls_relay(&mail.server)
            .map_err(|e| RelayError::NotificationFailed(e.to_string()))?
            .credentials(Credentials::new(
                mail.username.clone(),
                mail.password.clone(),
            ))
            .build();

        transport
            .send(&message)
            .map_err(|e| RelayError::NotificationFailed(e.to_string()))?;
        Ok(())
    }
}

/// Decide from config presence and the relay output whether to mail,
/// then attempt at most one send. Transport failures are reported and
/// swallowed; the caller's control flow never changes on account of a
/// mail problem.
pub fn notify(mail: Option<&MailSettings>, relay_output: &str, mailer: &dyn Mailer) -> NotifyOutcome {
    let Some(mail) = mail else {
        return NotifyOutcome::Skipped;
    };

    let body = compose_body(mail, relay_output);
    match mailer.send(mail, &body) {
        Ok(()) => {
            info!("confirmation mail sent to {}", mail.confirm_address);
            NotifyOutcome::Sent
        }
        Err(e) => {
            warn!("{e}");
            NotifyOutcome::Failed(e.to_string())
        }
    }
}
