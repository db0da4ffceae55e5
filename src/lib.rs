// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Relay
//!
//! Backend for a website contact form. A submission passes through a fixed
//! sequence of gates before it is relayed over SMTP:
//!
//! - Content-Type validation (JSON only)
//! - Honeypot field (silently accepted, never delivered)
//! - Temporary per-IP block after repeated bad events (8 in 10 min -> 1 h)
//! - Per-IP rate limiting (5 per minute)
//! - Cloudflare Turnstile verification
//! - Field validation and gibberish heuristics
//!
//! The crate also carries the page-translation rules used by the site
//! ([`i18n`]) and serves the translation dictionaries.

use std::future::Future;
use std::pin::Pin;

pub mod captcha;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod heuristics;
pub mod i18n;
pub mod mailer;
pub mod metrics;
pub mod tracker;
pub mod validator;

pub use config::Config;
pub use error::{ContactError, ContactResponse};
pub use gate::{Accepted, ContactGate, Outbox};
pub use tracker::{AbuseTracker, RateDecision};
pub use validator::{SubmissionValidator, ValidationError};

/// Boxed `Send` future returned by the trait seams ([`captcha::CaptchaVerifier`],
/// [`mailer::MailTransport`]).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
