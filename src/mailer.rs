// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Mail composition and SMTP delivery.
//!
//! The composer turns a validated submission into a [`ContactEmail`]
//! (subject, plain text and HTML bodies, addressing). Delivery goes through
//! the [`MailTransport`] trait; [`SmtpRelay`] implements it with lettre.

use crate::config::SmtpConfig;
use crate::validator::ValidSubmission;
use crate::BoxFuture;
use chrono::{DateTime, Utc};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fmt::Write;
use std::net::IpAddr;
use thiserror::Error;
use tracing::{debug, info};

/// Mail errors. Each variant is a distinct user-facing category.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP credentials are not configured")]
    NotConfigured,

    #[error("Invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("SMTP relay unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to build message: {0}")]
    Compose(String),

    #[error("Failed to send message: {0}")]
    Send(String),
}

/// A composed contact message, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactEmail {
    pub from: Mailbox,
    pub to: Mailbox,
    pub reply_to: Mailbox,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl ContactEmail {
    /// Build the MIME message (multipart/alternative).
    pub fn to_message(&self) -> Result<Message, MailError> {
        Message::builder()
            .from(self.from.clone())
            .reply_to(self.reply_to.clone())
            .to(self.to.clone())
            .subject(self.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                self.text.clone(),
                self.html.clone(),
            ))
            .map_err(|e| MailError::Compose(e.to_string()))
    }
}

fn parse_address(address: &str) -> Result<Address, MailError> {
    address
        .parse::<Address>()
        .map_err(|e| MailError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Escape text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Builds [`ContactEmail`]s with fixed sender and recipient.
#[derive(Debug, Clone)]
pub struct MailComposer {
    from: Mailbox,
    to: Mailbox,
}

impl MailComposer {
    pub fn new(from: Mailbox, to: Mailbox) -> Self {
        Self { from, to }
    }

    /// Sender is the authenticated SMTP user, recipient the contact address.
    pub fn from_config(config: &SmtpConfig) -> Result<Self, MailError> {
        let (user, _) = config.credentials().ok_or(MailError::NotConfigured)?;
        let from = Mailbox::new(Some(config.from_name.clone()), parse_address(user)?);
        let recipient = config.recipient().ok_or(MailError::NotConfigured)?;
        let to = Mailbox::new(None, parse_address(recipient)?);
        Ok(Self::new(from, to))
    }

    pub fn from_mailbox(&self) -> &Mailbox {
        &self.from
    }

    /// Compose the message for a validated submission.
    pub fn compose(
        &self,
        submission: &ValidSubmission,
        ip: IpAddr,
        received_at: DateTime<Utc>,
    ) -> Result<ContactEmail, MailError> {
        let reply_to = Mailbox::new(
            Some(submission.name.clone()),
            parse_address(&submission.email)?,
        );

        let subject = match submission.interest.as_deref() {
            Some(interest) => format!(
                "New contact form message from {} ({})",
                submission.name, interest
            ),
            None => format!("New contact form message from {}", submission.name),
        };

        let ip = ip.to_string();
        let received = received_at.to_rfc3339();
        let fields = [
            ("Name", submission.name.as_str()),
            ("Email", submission.email.as_str()),
            ("Organization", submission.organization.as_deref().unwrap_or("-")),
            ("Interest", submission.interest.as_deref().unwrap_or("-")),
            ("IP", ip.as_str()),
            ("Received", received.as_str()),
        ];

        let mut text = String::new();
        for (label, value) in &fields {
            let _ = writeln!(text, "{}: {}", label, value);
        }
        let _ = write!(text, "\nMessage:\n{}\n", submission.message);

        let mut html = String::from("<table cellpadding=\"4\" cellspacing=\"0\">\n");
        for (label, value) in &fields {
            let _ = writeln!(
                html,
                "<tr><th align=\"left\">{}</th><td>{}</td></tr>",
                label,
                escape_html(value)
            );
        }
        html.push_str("</table>\n");
        let message_html = escape_html(&submission.message).replace('\n', "<br>\n");
        let _ = write!(html, "<h3>Message</h3>\n<p>{}</p>\n", message_html);

        Ok(ContactEmail {
            from: self.from.clone(),
            to: self.to.clone(),
            reply_to,
            subject,
            text,
            html,
        })
    }
}

/// Delivery seam for composed messages.
pub trait MailTransport: Send + Sync {
    /// Pre-flight check that the relay is reachable and accepts us.
    fn verify(&self) -> BoxFuture<'_, Result<(), MailError>>;

    /// Send a single message. No retries.
    fn send<'a>(&'a self, email: &'a ContactEmail) -> BoxFuture<'a, Result<(), MailError>>;
}

/// Authenticated SMTP relay.
pub struct SmtpRelay {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpRelay {
    /// Build the relay client. Fails with `NotConfigured` without credentials.
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let (user, pass) = config.credentials().ok_or(MailError::NotConfigured)?;

        let builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailError::Unavailable(e.to_string()))?
        } else {
            let tls = TlsParameters::new(config.host.clone())
                .map_err(|e| MailError::Unavailable(e.to_string()))?;
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .tls(Tls::Opportunistic(tls))
        };

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(user.to_string(), pass.to_string()))
            .timeout(Some(config.timeout()))
            .build();

        Ok(Self {
            transport,
            host: config.host.clone(),
        })
    }

    async fn test_connection(&self) -> Result<(), MailError> {
        match self.transport.test_connection().await {
            Ok(true) => {
                debug!(host = %self.host, "SMTP relay reachable");
                Ok(())
            }
            Ok(false) => Err(MailError::Unavailable(format!(
                "{} did not accept the connection",
                self.host
            ))),
            Err(e) => Err(MailError::Unavailable(e.to_string())),
        }
    }

    async fn deliver(&self, email: &ContactEmail) -> Result<(), MailError> {
        let message = email.to_message()?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| MailError::Send(e.to_string()))?;
        info!(
            host = %self.host,
            code = %response.code(),
            "Contact message accepted by relay"
        );
        Ok(())
    }
}

impl MailTransport for SmtpRelay {
    fn verify(&self) -> BoxFuture<'_, Result<(), MailError>> {
        Box::pin(self.test_connection())
    }

    fn send<'a>(&'a self, email: &'a ContactEmail) -> BoxFuture<'a, Result<(), MailError>> {
        Box::pin(self.deliver(email))
    }
}
