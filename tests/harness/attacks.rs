// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Abuse patterns for security testing.

use super::generators;
use serde_json::Value;
use std::time::Duration;

/// What each simulated request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// Human-looking submission with a valid token
    Legit,
    /// Valid fields, rejected token
    ForgedToken,
    /// Honeypot filled
    Honeypot,
    /// Valid token, junk message
    Junk,
}

impl PayloadKind {
    pub fn payload(&self, i: usize) -> Value {
        match self {
            Self::Legit => generators::legit_payload(i),
            Self::ForgedToken => generators::forged_token_payload(i),
            Self::Honeypot => generators::honeypot_payload(i),
            Self::Junk => generators::junk_payload(i),
        }
    }
}

/// Attack pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Requests per second (simulated)
    pub requests_per_second: f64,
    /// Number of unique IPs to simulate
    pub unique_ips: usize,
    /// Payload carried by every request
    pub payload: PayloadKind,
    /// Whether to send `application/json`
    pub valid_content_type: bool,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            requests_per_second: 10.0,
            unique_ips: 1,
            payload: PayloadKind::Legit,
            valid_content_type: true,
        }
    }
}

/// Predefined attack patterns.
impl AttackConfig {
    /// Single IP flood with well-formed submissions.
    pub fn single_ip_flood() -> Self {
        Self {
            total_requests: 200,
            requests_per_second: 20.0,
            ..Default::default()
        }
    }

    /// Many IPs, each well under the per-IP limit.
    pub fn distributed_flood() -> Self {
        Self {
            total_requests: 300,
            requests_per_second: 50.0,
            unique_ips: 100,
            ..Default::default()
        }
    }

    /// Replayed or forged CAPTCHA tokens from one IP.
    pub fn captcha_forgery() -> Self {
        Self {
            total_requests: 60,
            requests_per_second: 0.1,
            payload: PayloadKind::ForgedToken,
            ..Default::default()
        }
    }

    /// Scripted junk that gets past the CAPTCHA.
    pub fn junk_spam() -> Self {
        Self {
            total_requests: 40,
            requests_per_second: 0.05,
            unique_ips: 2,
            payload: PayloadKind::Junk,
            ..Default::default()
        }
    }

    /// Naive form-filling bot.
    pub fn honeypot_bot() -> Self {
        Self {
            total_requests: 100,
            requests_per_second: 50.0,
            unique_ips: 3,
            payload: PayloadKind::Honeypot,
            ..Default::default()
        }
    }

    /// Wrong Content-Type on every request.
    pub fn content_type_bypass() -> Self {
        Self {
            total_requests: 50,
            requests_per_second: 10.0,
            unique_ips: 5,
            valid_content_type: false,
            ..Default::default()
        }
    }

    /// Stay just under the rate limit (5 per minute).
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 30,
            requests_per_second: 1.0 / 13.0,
            ..Default::default()
        }
    }

    /// Simulated gap between consecutive requests.
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.requests_per_second)
    }

    /// Calculate expected duration for the attack.
    pub fn expected_duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_requests as f64 / self.requests_per_second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slow_drip_stays_under_limit() {
        let config = AttackConfig::slow_drip();
        // Five requests must span more than the 60 s window
        assert!(config.interval() * 5 > Duration::from_secs(60));
    }

    #[test]
    fn test_expected_duration() {
        let config = AttackConfig::single_ip_flood();
        assert_eq!(config.expected_duration(), Duration::from_secs(10));
    }
}
