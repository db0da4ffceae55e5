// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! The contact request gate.
//!
//! Checks run in a fixed order and short-circuit on the first failure:
//! content type, honeypot, block, rate, CAPTCHA, fields, then delivery.
//! CAPTCHA and field rejections are bad events for the caller's IP.

use crate::captcha::{CaptchaError, CaptchaVerifier};
use crate::error::{ContactError, Result};
use crate::mailer::{MailComposer, MailError, MailTransport};
use crate::metrics::Metrics;
use crate::tracker::{AbuseTracker, BadEventOutcome, RateDecision};
use crate::validator::{Submission, SubmissionValidator, ValidationError};
use chrono::Utc;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Successful outcomes. Both render as `{ok:true}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accepted {
    /// Message relayed
    Delivered,
    /// Honeypot tripped; nothing sent
    Honeypot,
}

impl Accepted {
    fn label(&self) -> &'static str {
        match self {
            Self::Delivered => "OK",
            Self::Honeypot => "HONEYPOT",
        }
    }
}

/// Composer and transport, present only when SMTP is configured.
pub struct Outbox {
    pub composer: MailComposer,
    pub transport: Arc<dyn MailTransport>,
}

/// Contact gate. Built once per process and shared by every request.
pub struct ContactGate {
    tracker: AbuseTracker,
    validator: SubmissionValidator,
    captcha: Arc<dyn CaptchaVerifier>,
    outbox: Option<Outbox>,
    metrics: Metrics,
}

impl ContactGate {
    pub fn new(
        tracker: AbuseTracker,
        validator: SubmissionValidator,
        captcha: Arc<dyn CaptchaVerifier>,
        outbox: Option<Outbox>,
        metrics: Metrics,
    ) -> Self {
        Self {
            tracker,
            validator,
            captcha,
            outbox,
            metrics,
        }
    }

    pub fn tracker(&self) -> &AbuseTracker {
        &self.tracker
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run a submission through every gate and relay it.
    pub async fn submit(
        &self,
        ip: IpAddr,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<Accepted> {
        let result = self.run(ip, content_type, body).await;

        match &result {
            Ok(accepted) => self.metrics.record_outcome(accepted.label()),
            Err(err) => {
                self.metrics.record_outcome(err.code());
                if err.is_bad_event() {
                    if let BadEventOutcome::Blocked { .. } = self.tracker.mark_bad(ip).await {
                        self.metrics.record_block();
                    }
                }
                info!(%ip, code = err.code(), "Submission rejected");
            }
        }

        result
    }

    async fn run(&self, ip: IpAddr, content_type: Option<&str>, body: &[u8]) -> Result<Accepted> {
        self.validator.validate_content_type(content_type)?;
        let submission = Submission::from_json(body)?;

        if submission.is_trapped() {
            info!(%ip, "Honeypot field filled, discarding submission");
            return Ok(Accepted::Honeypot);
        }

        if let Some(retry_after) = self.tracker.is_blocked(ip).await {
            debug!(%ip, retry_after_secs = retry_after.as_secs(), "Blocked IP");
            return Err(ContactError::Blocked { retry_after });
        }

        if let RateDecision::Limited { retry_after } = self.tracker.rate_limited(ip).await {
            return Err(ContactError::RateLimited { retry_after });
        }

        let fields = self.validator.sanitize(&submission);

        let token = fields
            .captcha_token
            .as_deref()
            .ok_or(ContactError::CaptchaMissing)?;
        self.verify_captcha(token, ip).await?;

        let valid = self.validator.validate(&fields)?;

        let outbox = self.outbox.as_ref().ok_or_else(|| {
            error!("SMTP credentials missing, cannot relay contact message");
            ContactError::MailNotConfigured
        })?;

        outbox.transport.verify().await.map_err(|e| {
            error!(error = %e, "SMTP pre-flight check failed");
            ContactError::MailUnavailable
        })?;

        let email = outbox
            .composer
            .compose(&valid, ip, Utc::now())
            .map_err(|e| {
                error!(error = %e, "Failed to compose contact message");
                match e {
                    MailError::InvalidAddress { .. } => {
                        ContactError::Validation(ValidationError::InvalidEmail)
                    }
                    _ => ContactError::MailCompose,
                }
            })?;

        outbox.transport.send(&email).await.map_err(|e| {
            error!(error = %e, "SMTP send failed");
            ContactError::MailSend
        })?;

        self.metrics.record_email_sent();
        info!(%ip, "Contact message relayed");
        Ok(Accepted::Delivered)
    }

    async fn verify_captcha(&self, token: &str, ip: IpAddr) -> Result<()> {
        match self.captcha.verify(token, ip).await {
            Ok(verification) if verification.success => Ok(()),
            Ok(verification) => {
                warn!(
                    %ip,
                    error_codes = ?verification.error_codes,
                    "CAPTCHA verification rejected"
                );
                Err(ContactError::CaptchaFailed)
            }
            Err(CaptchaError::NotConfigured) => {
                error!("CAPTCHA secret missing, cannot verify submissions");
                Err(ContactError::CaptchaNotConfigured)
            }
            Err(e) => {
                warn!(%ip, error = %e, "CAPTCHA verification errored");
                Err(ContactError::CaptchaFailed)
            }
        }
    }
}
