// SPDX-License-Identifier: PMPL-1.0-or-later
//! Request outcomes for the contact endpoint
//!
//! Every rejection is a typed value with a status, a user-facing message and
//! a coarse code. Diagnostic detail stays in the logs.

use crate::validator::ValidationError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Contact endpoint rejection
#[derive(Debug, Error)]
pub enum ContactError {
    #[error("Method not allowed.")]
    MethodNotAllowed,

    #[error("Request body too large.")]
    PayloadTooLarge,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Forbidden.")]
    Blocked { retry_after: Duration },

    #[error("Too many requests. Please try again later.")]
    RateLimited { retry_after: Duration },

    #[error("Verification required.")]
    CaptchaMissing,

    #[error("Verification failed.")]
    CaptchaFailed,

    #[error("Verification is unavailable.")]
    CaptchaNotConfigured,

    #[error("Email service is not configured.")]
    MailNotConfigured,

    #[error("Email service unavailable. Please try again later.")]
    MailUnavailable,

    #[error("Could not prepare your message.")]
    MailCompose,

    #[error("Failed to send message. Please try again later.")]
    MailSend,

    #[error("Internal server error.")]
    Internal,
}

impl ContactError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Validation(_) | Self::CaptchaMissing | Self::CaptchaFailed => {
                StatusCode::BAD_REQUEST
            }
            Self::Blocked { .. } => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::CaptchaNotConfigured
            | Self::MailNotConfigured
            | Self::MailUnavailable
            | Self::MailCompose
            | Self::MailSend
            | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::Validation(err) => err.code(),
            Self::Blocked { .. } => "BLOCKED",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::CaptchaMissing => "CAPTCHA_MISSING",
            Self::CaptchaFailed => "CAPTCHA_FAILED",
            Self::CaptchaNotConfigured => "CAPTCHA_CONFIG",
            Self::MailNotConfigured => "SMTP_CONFIG",
            Self::MailUnavailable => "SMTP_VERIFY",
            Self::MailCompose => "SMTP_COMPOSE",
            Self::MailSend => "SMTP_SEND",
            Self::Internal => "INTERNAL",
        }
    }

    /// Whether this rejection counts toward blocking the caller.
    pub fn is_bad_event(&self) -> bool {
        match self {
            Self::CaptchaMissing | Self::CaptchaFailed => true,
            Self::Validation(err) => !matches!(
                err,
                ValidationError::InvalidContentType { .. } | ValidationError::InvalidJson
            ),
            _ => false,
        }
    }
}

/// JSON body shared by every contact response
#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl ContactResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            error: None,
            code: None,
        }
    }

    pub fn error(err: &ContactError) -> Self {
        Self {
            ok: false,
            error: Some(err.to_string()),
            code: Some(err.code()),
        }
    }
}

fn retry_after_header(retry_after: Duration) -> HeaderValue {
    // Round up so clients never retry a second early
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    HeaderValue::from(secs.max(1))
}

impl IntoResponse for ContactError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(ContactResponse::error(&self))).into_response();
        let headers = response.headers_mut();
        match self {
            Self::RateLimited { retry_after } | Self::Blocked { retry_after } => {
                headers.insert(header::RETRY_AFTER, retry_after_header(retry_after));
            }
            Self::MethodNotAllowed => {
                headers.insert(header::ALLOW, HeaderValue::from_static("POST"));
            }
            _ => {}
        }
        response
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ContactError>;
