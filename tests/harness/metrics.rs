// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Metrics collection for abuse simulation results.

use contact_relay::{Accepted, ContactError};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

/// Collects metrics during a simulation.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    /// Simulated time covered by the run
    simulated: Duration,
    /// Count of requests by outcome
    outcomes: HashMap<Outcome, usize>,
    /// Count of requests by IP
    requests_per_ip: HashMap<IpAddr, usize>,
    /// Gate latency samples (microseconds, wall clock)
    latencies: Vec<u64>,
}

/// Possible outcomes for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Delivered,
    Honeypot,
    RateLimited,
    Blocked,
    CaptchaRejected,
    ValidationFailed,
    MalformedRequest,
    ServerError,
}

impl Outcome {
    /// Classify a gate result.
    pub fn of(result: &Result<Accepted, ContactError>) -> Self {
        match result {
            Ok(Accepted::Delivered) => Self::Delivered,
            Ok(Accepted::Honeypot) => Self::Honeypot,
            Err(ContactError::RateLimited { .. }) => Self::RateLimited,
            Err(ContactError::Blocked { .. }) => Self::Blocked,
            Err(ContactError::CaptchaMissing | ContactError::CaptchaFailed) => {
                Self::CaptchaRejected
            }
            Err(ContactError::Validation(err)) => match err.code() {
                "BAD_CONTENT_TYPE" | "INVALID_JSON" => Self::MalformedRequest,
                _ => Self::ValidationFailed,
            },
            Err(_) => Self::ServerError,
        }
    }
}

impl AttackMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request outcome.
    pub fn record(&mut self, outcome: Outcome, ip: IpAddr, latency: Duration) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        *self.requests_per_ip.entry(ip).or_insert(0) += 1;
        self.latencies.push(latency.as_micros() as u64);
    }

    /// Set the simulated duration of the run.
    pub fn set_simulated(&mut self, simulated: Duration) {
        self.simulated = simulated;
    }

    /// Get total request count.
    pub fn total_requests(&self) -> usize {
        self.outcomes.values().sum()
    }

    /// Get count for a specific outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Ratio of requests that did not result in a delivered message.
    pub fn block_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        let delivered = self.count(Outcome::Delivered);
        (total - delivered) as f64 / total as f64
    }

    /// Get median latency in microseconds.
    pub fn median_latency_us(&self) -> u64 {
        if self.latencies.is_empty() {
            return 0;
        }
        let mut sorted = self.latencies.clone();
        sorted.sort_unstable();
        sorted[sorted.len() / 2]
    }

    /// Get number of unique IPs that made requests.
    pub fn unique_ips(&self) -> usize {
        self.requests_per_ip.len()
    }

    /// Generate a summary report.
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            total_requests: self.total_requests(),
            delivered: self.count(Outcome::Delivered),
            honeypot: self.count(Outcome::Honeypot),
            rate_limited: self.count(Outcome::RateLimited),
            blocked: self.count(Outcome::Blocked),
            captcha_rejected: self.count(Outcome::CaptchaRejected),
            validation_failed: self.count(Outcome::ValidationFailed),
            malformed: self.count(Outcome::MalformedRequest),
            server_errors: self.count(Outcome::ServerError),
            simulated_secs: self.simulated.as_secs(),
            block_rate: self.block_rate(),
            median_latency_us: self.median_latency_us(),
            unique_ips: self.unique_ips(),
        }
    }
}

/// Summary report of a simulation.
#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub total_requests: usize,
    pub delivered: usize,
    pub honeypot: usize,
    pub rate_limited: usize,
    pub blocked: usize,
    pub captcha_rejected: usize,
    pub validation_failed: usize,
    pub malformed: usize,
    pub server_errors: usize,
    pub simulated_secs: u64,
    pub block_rate: f64,
    pub median_latency_us: u64,
    pub unique_ips: usize,
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Abuse Simulation Report ===")?;
        writeln!(f, "Simulated time:    {} s", self.simulated_secs)?;
        writeln!(f, "Total Requests:    {}", self.total_requests)?;
        writeln!(f)?;
        writeln!(f, "--- Outcomes ---")?;
        writeln!(f, "Delivered:         {}", self.delivered)?;
        writeln!(f, "Honeypot:          {}", self.honeypot)?;
        writeln!(f, "Rate Limited:      {}", self.rate_limited)?;
        writeln!(f, "Blocked:           {}", self.blocked)?;
        writeln!(f, "CAPTCHA Rejected:  {}", self.captcha_rejected)?;
        writeln!(f, "Validation Failed: {}", self.validation_failed)?;
        writeln!(f, "Malformed:         {}", self.malformed)?;
        writeln!(f, "Server Errors:     {}", self.server_errors)?;
        writeln!(f, "Block Rate:        {:.1}%", self.block_rate * 100.0)?;
        writeln!(f)?;
        writeln!(f, "Median latency:    {} us", self.median_latency_us)?;
        writeln!(f, "Unique IPs:        {}", self.unique_ips)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contact_relay::ValidationError;

    #[test]
    fn test_outcome_classification() {
        assert_eq!(Outcome::of(&Ok(Accepted::Honeypot)), Outcome::Honeypot);
        assert_eq!(
            Outcome::of(&Err(ValidationError::InvalidJson.into())),
            Outcome::MalformedRequest
        );
        assert_eq!(
            Outcome::of(&Err(ValidationError::InvalidName.into())),
            Outcome::ValidationFailed
        );
        assert_eq!(Outcome::of(&Err(ContactError::MailSend)), Outcome::ServerError);
    }

    #[test]
    fn test_block_rate() {
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let mut metrics = AttackMetrics::new();
        for _ in 0..3 {
            metrics.record(Outcome::Delivered, ip, Duration::ZERO);
        }
        for _ in 0..7 {
            metrics.record(Outcome::RateLimited, ip, Duration::ZERO);
        }

        assert_eq!(metrics.unique_ips(), 1);
        assert!((metrics.block_rate() - 0.7).abs() < 0.01);
    }
}
