// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for the contact relay.

use prometheus::{IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters exposed on `/metrics`. Owns its registry, so several instances
/// (tests, embedded use) never collide.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    submissions: IntCounterVec,
    emails_sent: IntCounter,
    ip_blocks: IntCounter,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let submissions = IntCounterVec::new(
            Opts::new(
                "contact_submissions_total",
                "Contact submissions by outcome code",
            ),
            &["outcome"],
        )?;
        let emails_sent = IntCounter::new(
            "contact_emails_sent_total",
            "Contact messages accepted by the SMTP relay",
        )?;
        let ip_blocks = IntCounter::new(
            "contact_ip_blocks_total",
            "IPs blocked after repeated bad events",
        )?;

        registry.register(Box::new(submissions.clone()))?;
        registry.register(Box::new(emails_sent.clone()))?;
        registry.register(Box::new(ip_blocks.clone()))?;

        Ok(Self {
            registry,
            submissions,
            emails_sent,
            ip_blocks,
        })
    }

    /// Count a submission under its outcome code (`OK`, `HONEYPOT`, error code).
    pub fn record_outcome(&self, outcome: &str) {
        self.submissions.with_label_values(&[outcome]).inc();
    }

    pub fn record_email_sent(&self) {
        self.emails_sent.inc();
    }

    pub fn record_block(&self) {
        self.ip_blocks.inc();
    }

    pub fn outcome_count(&self, outcome: &str) -> u64 {
        self.submissions.with_label_values(&[outcome]).get()
    }

    pub fn emails_sent(&self) -> u64 {
        self.emails_sent.get()
    }

    pub fn ip_blocks(&self) -> u64 {
        self.ip_blocks.get()
    }

    /// Render the text exposition format.
    pub fn render(&self) -> prometheus::Result<String> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}
