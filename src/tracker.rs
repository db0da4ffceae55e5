// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-IP abuse tracking for the contact endpoint.
//!
//! Three process-local structures:
//! 1. A sliding window of accepted attempts (rate limit, 5 per 60s default)
//! 2. A sliding window of bad events (failed CAPTCHA or field gates)
//! 3. Temporary blocks, set once enough bad events accumulate
//!
//! State is per instance and lost on restart. Running several instances
//! multiplies the effective limits; that is accepted, the tracker is an
//! abuse dampener and not a security boundary.
//!
//! Time comes from `tokio::time::Instant` so tests can pause the clock.

use crate::config::AbuseConfig;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Result of a rate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Attempt recorded
    Allowed {
        /// Attempts left in the current window
        remaining: usize,
    },
    /// Window is full
    Limited {
        /// Time until the oldest attempt leaves the window
        retry_after: Duration,
    },
}

impl RateDecision {
    pub fn is_limited(&self) -> bool {
        matches!(self, Self::Limited { .. })
    }
}

/// Result of recording a bad event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadEventOutcome {
    /// Event stored; `count` events remain in the window
    Recorded { count: usize },
    /// Threshold reached, the IP is now blocked
    Blocked { until_in: Duration },
}

/// Counts for health output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackerSnapshot {
    pub rate_tracked_ips: usize,
    pub bad_event_ips: usize,
    pub blocked_ips: usize,
}

/// Drop entries older than `window` from the front of a time-ordered queue.
fn prune(events: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = events.front() {
        if now.duration_since(*oldest) >= window {
            events.pop_front();
        } else {
            break;
        }
    }
}

/// Thread-safe abuse tracker. Construct once per process and share.
pub struct AbuseTracker {
    config: AbuseConfig,
    /// Accepted attempts per IP
    attempts: RwLock<HashMap<IpAddr, VecDeque<Instant>>>,
    /// Bad events per IP
    bad_events: RwLock<HashMap<IpAddr, VecDeque<Instant>>>,
    /// Block expiry per IP
    blocks: RwLock<HashMap<IpAddr, Instant>>,
}

impl AbuseTracker {
    /// Create a new tracker with the given limits.
    pub fn new(config: AbuseConfig) -> Self {
        Self {
            config,
            attempts: RwLock::new(HashMap::new()),
            bad_events: RwLock::new(HashMap::new()),
            blocks: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &AbuseConfig {
        &self.config
    }

    /// Remaining block time for an IP, evicting the entry once expired.
    pub async fn is_blocked(&self, ip: IpAddr) -> Option<Duration> {
        let now = Instant::now();
        {
            let blocks = self.blocks.read().await;
            match blocks.get(&ip) {
                None => return None,
                Some(until) if now < *until => return Some(until.duration_since(now)),
                Some(_) => {}
            }
        }

        let mut blocks = self.blocks.write().await;
        // Re-check under the write lock, a new block may have landed.
        match blocks.get(&ip) {
            Some(until) if now < *until => Some(until.duration_since(now)),
            Some(_) => {
                debug!(%ip, "Block expired");
                blocks.remove(&ip);
                None
            }
            None => None,
        }
    }

    /// Check the rate window and record the attempt when there is room.
    pub async fn rate_limited(&self, ip: IpAddr) -> RateDecision {
        let now = Instant::now();
        let window = self.config.rate_window();
        let max = self.config.rate_limit_max;

        let mut attempts = self.attempts.write().await;
        let events = attempts.entry(ip).or_default();
        prune(events, now, window);

        if events.len() >= max {
            let retry_after = events
                .front()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(window);
            debug!(%ip, ?retry_after, "Rate limit reached");
            return RateDecision::Limited { retry_after };
        }

        events.push_back(now);
        RateDecision::Allowed {
            remaining: max - events.len(),
        }
    }

    /// Record a bad event and block the IP once the threshold is reached.
    pub async fn mark_bad(&self, ip: IpAddr) -> BadEventOutcome {
        let now = Instant::now();

        let count = {
            let mut bad_events = self.bad_events.write().await;
            let events = bad_events.entry(ip).or_default();
            events.push_back(now);
            prune(events, now, self.config.bad_event_window());
            let count = events.len();
            if count >= self.config.bad_event_threshold {
                bad_events.remove(&ip);
            }
            count
        };

        if count < self.config.bad_event_threshold {
            debug!(%ip, count, "Bad event recorded");
            return BadEventOutcome::Recorded { count };
        }

        let duration = self.config.block_duration();
        self.blocks.write().await.insert(ip, now + duration);
        warn!(%ip, count, block_secs = duration.as_secs(), "Bad event threshold reached, blocking IP");
        BadEventOutcome::Blocked { until_in: duration }
    }

    /// Drop empty windows and expired blocks (called periodically).
    pub async fn cleanup(&self) {
        let now = Instant::now();

        {
            let window = self.config.rate_window();
            let mut attempts = self.attempts.write().await;
            attempts.retain(|_, events| {
                prune(events, now, window);
                !events.is_empty()
            });
        }

        {
            let window = self.config.bad_event_window();
            let mut bad_events = self.bad_events.write().await;
            bad_events.retain(|_, events| {
                prune(events, now, window);
                !events.is_empty()
            });
        }

        {
            let mut blocks = self.blocks.write().await;
            blocks.retain(|_, until| now < *until);
        }
    }

    pub async fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            rate_tracked_ips: self.attempts.read().await.len(),
            bad_event_ips: self.bad_events.read().await.len(),
            blocked_ips: self.blocks.read().await.len(),
        }
    }
}
