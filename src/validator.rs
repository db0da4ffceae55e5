// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Contact submission validator.
//!
//! Implements the payload-level gates of the contact endpoint:
//! - Content-Type validation
//! - Trimming and length caps for every field
//! - Required fields, email shape, name and message heuristics

use crate::config::ValidationConfig;
use crate::heuristics::{count_urls, is_valid_email, looks_like_gibberish, word_count};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Validation error types.
///
/// The display strings are returned verbatim to the browser.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Content-Type must be application/json.")]
    InvalidContentType { actual: Option<String> },

    #[error("Invalid JSON body.")]
    InvalidJson,

    #[error("Missing required fields.")]
    MissingFields,

    #[error("Invalid email.")]
    InvalidEmail,

    #[error("Invalid name.")]
    InvalidName,

    #[error("Invalid message.")]
    InvalidMessage,
}

impl ValidationError {
    /// Coarse machine-readable code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidContentType { .. } => "BAD_CONTENT_TYPE",
            Self::InvalidJson => "INVALID_JSON",
            Self::MissingFields => "MISSING_FIELDS",
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::InvalidName => "INVALID_NAME",
            Self::InvalidMessage => "INVALID_MESSAGE",
        }
    }
}

/// Raw contact form payload.
///
/// Every field is optional on the wire; non-string values are treated as
/// absent rather than failing the whole body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Submission {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub organization: Option<String>,

    /// Older form field for `organization`
    #[serde(default, deserialize_with = "lenient_string")]
    pub org: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub interest: Option<String>,

    /// Older form field for `interest`
    #[serde(default, deserialize_with = "lenient_string")]
    pub topic: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,

    /// Honeypot field, hidden from humans
    #[serde(default, rename = "_gotcha", deserialize_with = "lenient_string")]
    pub honeypot: Option<String>,

    /// Turnstile token
    #[serde(
        default,
        rename = "cf-turnstile-response",
        deserialize_with = "lenient_string"
    )]
    pub captcha_token: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

impl Submission {
    /// Parse a JSON object body.
    pub fn from_json(body: &[u8]) -> Result<Self, ValidationError> {
        match serde_json::from_slice::<Value>(body) {
            Ok(value @ Value::Object(_)) => {
                serde_json::from_value(value).map_err(|_| ValidationError::InvalidJson)
            }
            _ => Err(ValidationError::InvalidJson),
        }
    }

    /// Whether the honeypot field was filled in.
    pub fn is_trapped(&self) -> bool {
        self.honeypot
            .as_deref()
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Submission after trimming and length caps. Empty fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizedSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub organization: Option<String>,
    pub interest: Option<String>,
    pub message: Option<String>,
    pub captcha_token: Option<String>,
}

/// A submission that passed every field gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubmission {
    pub name: String,
    pub email: String,
    pub organization: Option<String>,
    pub interest: Option<String>,
    pub message: String,
}

/// Trim and cap a field by characters; empty results become `None`.
fn clean(value: Option<&str>, max_chars: usize) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }
    let capped: String = trimmed.chars().take(max_chars).collect();
    Some(capped.trim_end().to_string())
}

/// Contact submission validator.
pub struct SubmissionValidator {
    config: ValidationConfig,
}

impl SubmissionValidator {
    /// Create a new validator with the given configuration.
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate the Content-Type header.
    pub fn validate_content_type(&self, content_type: Option<&str>) -> Result<(), ValidationError> {
        let ct = content_type.map(|s| {
            // Extract just the media type, ignoring charset etc.
            s.split(';').next().unwrap_or(s).trim().to_lowercase()
        });

        let accepted = ct.as_ref().is_some_and(|actual| {
            self.config
                .require_content_type
                .iter()
                .any(|expected| expected.eq_ignore_ascii_case(actual))
        });

        if accepted {
            Ok(())
        } else {
            debug!(content_type = ?ct, "Content-Type invalid");
            Err(ValidationError::InvalidContentType { actual: ct })
        }
    }

    /// Trim and cap every field. A blank primary field falls back to its
    /// older alias.
    pub fn sanitize(&self, submission: &Submission) -> SanitizedSubmission {
        let c = &self.config;
        SanitizedSubmission {
            name: clean(submission.name.as_deref(), c.max_name_chars),
            email: clean(submission.email.as_deref(), c.max_email_chars),
            organization: clean(submission.organization.as_deref(), c.max_organization_chars)
                .or_else(|| clean(submission.org.as_deref(), c.max_organization_chars)),
            interest: clean(submission.interest.as_deref(), c.max_interest_chars)
                .or_else(|| clean(submission.topic.as_deref(), c.max_interest_chars)),
            message: clean(submission.message.as_deref(), c.max_message_chars),
            captcha_token: clean(submission.captcha_token.as_deref(), c.max_token_chars),
        }
    }

    /// Apply the field gates to a sanitized submission.
    ///
    /// A malformed email is reported before missing fields, so the caller
    /// learns about it whatever else is wrong with the form.
    pub fn validate(&self, fields: &SanitizedSubmission) -> Result<ValidSubmission, ValidationError> {
        if let Some(email) = fields.email.as_deref() {
            if !is_valid_email(email) {
                debug!("Email failed pattern check");
                return Err(ValidationError::InvalidEmail);
            }
        }

        let (Some(name), Some(email), Some(message)) = (
            fields.name.as_deref(),
            fields.email.as_deref(),
            fields.message.as_deref(),
        ) else {
            return Err(ValidationError::MissingFields);
        };

        self.validate_name(name)?;
        self.validate_message(message)?;

        Ok(ValidSubmission {
            name: name.to_string(),
            email: email.to_string(),
            organization: fields.organization.clone(),
            interest: fields.interest.clone(),
            message: message.to_string(),
        })
    }

    /// Names need at least two words and must read as language.
    pub fn validate_name(&self, name: &str) -> Result<(), ValidationError> {
        if word_count(name) < 2 {
            debug!("Name has fewer than two words");
            return Err(ValidationError::InvalidName);
        }
        if looks_like_gibberish(name) {
            debug!("Name looks like gibberish");
            return Err(ValidationError::InvalidName);
        }
        Ok(())
    }

    /// Messages need a minimum length, few links and must read as language.
    pub fn validate_message(&self, message: &str) -> Result<(), ValidationError> {
        if message.chars().count() < self.config.min_message_chars {
            debug!("Message too short");
            return Err(ValidationError::InvalidMessage);
        }
        let urls = count_urls(message);
        if urls > self.config.max_message_urls {
            debug!(urls, "Message carries too many links");
            return Err(ValidationError::InvalidMessage);
        }
        if looks_like_gibberish(message) {
            debug!("Message looks like gibberish");
            return Err(ValidationError::InvalidMessage);
        }
        Ok(())
    }
}
