// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Shared fixtures: fake CAPTCHA verifier, recording mail transport and
//! gate/router builders.

#![allow(dead_code)]

use contact_relay::{
    captcha::{CaptchaError, CaptchaVerifier, Verification},
    config::{AbuseConfig, Config, I18nConfig, ValidationConfig},
    gate::{ContactGate, Outbox},
    handlers::{router, AppState},
    i18n::DictionaryStore,
    mailer::{ContactEmail, MailComposer, MailError, MailTransport},
    metrics::Metrics,
    tracker::AbuseTracker,
    validator::SubmissionValidator,
    BoxFuture,
};
use axum::Router;
use lettre::message::Mailbox;
use serde_json::{json, Value};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};

pub const VALID_TOKEN: &str = "valid-token";
pub const SENDER: &str = "relay@example.org";
pub const RECIPIENT: &str = "inbox@example.org";

pub const MESSAGE: &str = "Hello there, I am reaching out about a possible collaboration \
    between our organizations on the community garden project next spring. We would love \
    to hear back from you soon.";

/// Accepts exactly [`VALID_TOKEN`].
pub struct FakeCaptcha {
    configured: bool,
}

impl FakeCaptcha {
    pub fn new() -> Self {
        Self { configured: true }
    }

    pub fn unconfigured() -> Self {
        Self { configured: false }
    }
}

impl CaptchaVerifier for FakeCaptcha {
    fn verify<'a>(
        &'a self,
        token: &'a str,
        _remote_ip: IpAddr,
    ) -> BoxFuture<'a, Result<Verification, CaptchaError>> {
        Box::pin(async move {
            if !self.configured {
                return Err(CaptchaError::NotConfigured);
            }
            let success = token == VALID_TOKEN;
            Ok(Verification {
                success,
                error_codes: if success {
                    Vec::new()
                } else {
                    vec!["invalid-input-response".to_string()]
                },
                hostname: None,
            })
        })
    }
}

/// How the recording transport should behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Healthy,
    VerifyFails,
    SendFails,
}

/// Keeps every message it is asked to send.
pub struct RecordingTransport {
    mode: TransportMode,
    sent: Mutex<Vec<ContactEmail>>,
}

impl RecordingTransport {
    pub fn new(mode: TransportMode) -> Self {
        Self {
            mode,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<ContactEmail> {
        self.sent.lock().unwrap().clone()
    }
}

impl MailTransport for RecordingTransport {
    fn verify(&self) -> BoxFuture<'_, Result<(), MailError>> {
        Box::pin(async move {
            match self.mode {
                TransportMode::VerifyFails => Err(MailError::Unavailable("connection refused".into())),
                _ => Ok(()),
            }
        })
    }

    fn send<'a>(&'a self, email: &'a ContactEmail) -> BoxFuture<'a, Result<(), MailError>> {
        Box::pin(async move {
            if self.mode == TransportMode::SendFails {
                return Err(MailError::Send("554 rejected".into()));
            }
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        })
    }
}

pub fn composer() -> MailComposer {
    MailComposer::new(
        Mailbox::new(Some("Contact Form".into()), SENDER.parse().unwrap()),
        Mailbox::new(None, RECIPIENT.parse().unwrap()),
    )
}

/// Test rig around a gate with fakes plugged in.
pub struct Rig {
    pub gate: ContactGate,
    pub transport: Arc<RecordingTransport>,
}

pub fn rig_with(
    abuse: AbuseConfig,
    captcha: FakeCaptcha,
    mode: Option<TransportMode>,
) -> Rig {
    let transport = Arc::new(RecordingTransport::new(mode.unwrap_or(TransportMode::Healthy)));
    let outbox = mode.map(|_| Outbox {
        composer: composer(),
        transport: transport.clone(),
    });
    let gate = ContactGate::new(
        AbuseTracker::new(abuse),
        SubmissionValidator::new(ValidationConfig::default()),
        Arc::new(captcha),
        outbox,
        Metrics::new().unwrap(),
    );
    Rig { gate, transport }
}

pub fn rig() -> Rig {
    rig_with(
        AbuseConfig::default(),
        FakeCaptcha::new(),
        Some(TransportMode::Healthy),
    )
}

/// Router over a rig's gate. Returns the transport for inspection.
pub fn app_with(rig: Rig, i18n: I18nConfig) -> (Router, Arc<RecordingTransport>, Arc<AppState>) {
    app_with_config(
        rig,
        Config {
            i18n,
            ..Config::default()
        },
    )
}

pub fn app_with_config(rig: Rig, config: Config) -> (Router, Arc<RecordingTransport>, Arc<AppState>) {
    let state = Arc::new(AppState {
        gate: rig.gate,
        dictionaries: DictionaryStore::from_config(&config.i18n),
        config,
    });
    let app = router(state.clone()).layer(axum::extract::connect_info::MockConnectInfo(
        SocketAddr::from(([203, 0, 113, 7], 40000)),
    ));
    (app, rig.transport, state)
}

pub fn app(rig: Rig) -> (Router, Arc<RecordingTransport>, Arc<AppState>) {
    app_with(rig, I18nConfig::default())
}

/// A submission that passes every gate.
pub fn valid_payload() -> Value {
    json!({
        "name": "Jane Doe",
        "email": "jane@example.com",
        "organization": "Greenway Trust",
        "interest": "Partnerships",
        "message": MESSAGE,
        "cf-turnstile-response": VALID_TOKEN,
    })
}

pub fn with_field(mut payload: Value, key: &str, value: Value) -> Value {
    payload[key] = value;
    payload
}

pub fn body(payload: &Value) -> Vec<u8> {
    serde_json::to_vec(payload).unwrap()
}

pub fn ip(addr: &str) -> IpAddr {
    addr.parse().unwrap()
}
