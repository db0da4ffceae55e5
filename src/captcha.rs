// SPDX-License-Identifier: PMPL-1.0-or-later
// Turnstile verification for the contact relay
//
// Exchanges the browser-issued token with Cloudflare's siteverify endpoint.
// One attempt per submission, no retries.

use crate::config::CaptchaConfig;
use crate::BoxFuture;
use serde::Deserialize;
use std::net::IpAddr;
use thiserror::Error;
use tracing::debug;

/// CAPTCHA verification errors.
#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("CAPTCHA secret is not configured")]
    NotConfigured,

    #[error("Verification request failed: {0}")]
    Transport(String),

    #[error("Verification service returned {status}")]
    Status { status: u16 },

    #[error("Unreadable verification response: {0}")]
    InvalidResponse(String),
}

/// Outcome reported by the verification service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Verification {
    pub success: bool,

    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,

    #[serde(default)]
    pub hostname: Option<String>,
}

/// Token verification seam, so the gate can run against a fake.
pub trait CaptchaVerifier: Send + Sync {
    fn verify<'a>(
        &'a self,
        token: &'a str,
        remote_ip: IpAddr,
    ) -> BoxFuture<'a, Result<Verification, CaptchaError>>;
}

/// Cloudflare Turnstile client
pub struct TurnstileVerifier {
    client: reqwest::Client,
    secret: Option<String>,
    verify_url: String,
}

impl TurnstileVerifier {
    /// Create a verifier from configuration
    pub fn new(config: &CaptchaConfig) -> Result<Self, CaptchaError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CaptchaError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            secret: config.secret.clone(),
            verify_url: config.verify_url.clone(),
        })
    }

    async fn siteverify(&self, token: &str, remote_ip: IpAddr) -> Result<Verification, CaptchaError> {
        let secret = self.secret.as_deref().ok_or(CaptchaError::NotConfigured)?;
        let remote_ip = remote_ip.to_string();

        let response = self
            .client
            .post(&self.verify_url)
            .form(&[
                ("secret", secret),
                ("response", token),
                ("remoteip", remote_ip.as_str()),
            ])
            .send()
            .await
            .map_err(|e| CaptchaError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptchaError::Status {
                status: status.as_u16(),
            });
        }

        let verification: Verification = response
            .json()
            .await
            .map_err(|e| CaptchaError::InvalidResponse(e.to_string()))?;

        debug!(
            success = verification.success,
            error_codes = ?verification.error_codes,
            "Turnstile verification completed"
        );
        Ok(verification)
    }
}

impl CaptchaVerifier for TurnstileVerifier {
    fn verify<'a>(
        &'a self,
        token: &'a str,
        remote_ip: IpAddr,
    ) -> BoxFuture<'a, Result<Verification, CaptchaError>> {
        Box::pin(self.siteverify(token, remote_ip))
    }
}
