// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Relay Service
//!
//! Accepts contact-form submissions as JSON, screens them (honeypot, per-IP
//! rate limit and block, Turnstile, field heuristics) and relays accepted
//! messages over authenticated SMTP.
//!
//! ## Configuration
//!
//! Loaded from environment variables (a `.env` file is read if present):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `SMTP_HOST` / `SMTP_PORT` / `SMTP_SECURE`: relay endpoint
//! - `SMTP_USER` / `SMTP_PASS`: relay credentials, also the sender address
//! - `CONTACT_TO`: recipient (default: `SMTP_USER`)
//! - `TURNSTILE_SECRET_KEY`: Cloudflare Turnstile secret
//! - `RATE_LIMIT_MAX` / `RATE_LIMIT_WINDOW_SECS`: rate gate (default: 5 / 60)
//! - `TRUST_PROXY_HEADERS`: read the client IP from proxy headers (default: false)
//! - `I18N_DIR` / `I18N_LANGUAGES` / `I18N_DEFAULT_LANG`: dictionaries

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contact_relay::{
    captcha::TurnstileVerifier,
    config::Config,
    gate::{ContactGate, Outbox},
    handlers::{router, AppState},
    i18n::DictionaryStore,
    mailer::{MailComposer, MailError, SmtpRelay},
    metrics::Metrics,
    tracker::AbuseTracker,
    validator::SubmissionValidator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        rate_limit_max = config.abuse.rate_limit_max,
        rate_window_secs = config.abuse.rate_window_secs,
        bad_event_threshold = config.abuse.bad_event_threshold,
        block_secs = config.abuse.block_secs,
        smtp_host = %config.smtp.host,
        captcha_configured = config.captcha.secret.is_some(),
        "Starting contact relay"
    );

    let captcha = TurnstileVerifier::new(&config.captcha)?;
    let outbox = build_outbox(&config)?;

    let gate = ContactGate::new(
        AbuseTracker::new(config.abuse.clone()),
        SubmissionValidator::new(config.validation.clone()),
        Arc::new(captcha),
        outbox,
        Metrics::new()?,
    );

    let state = Arc::new(AppState {
        gate,
        dictionaries: DictionaryStore::from_config(&config.i18n),
        config: config.clone(),
    });

    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_state.gate.tracker().cleanup().await;
        }
    });

    let app = router(state);

    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

/// SMTP relay and composer. Missing credentials are not fatal: the service
/// starts and answers submissions with `SMTP_CONFIG`.
fn build_outbox(config: &Config) -> anyhow::Result<Option<Outbox>> {
    let relay = match SmtpRelay::new(&config.smtp) {
        Ok(relay) => relay,
        Err(MailError::NotConfigured) => {
            warn!("SMTP_USER/SMTP_PASS not set, contact messages cannot be relayed");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    let composer = MailComposer::from_config(&config.smtp)?;

    Ok(Some(Outbox {
        composer,
        transport: Arc::new(relay),
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
