// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the contact relay.
//!
//! Thin layer over [`ContactGate`]: resolves the caller's IP, hands the raw
//! body to the gate and renders the outcome as JSON.

use crate::config::Config;
use crate::error::{ContactError, ContactResponse};
use crate::gate::ContactGate;
use crate::i18n::{DictionaryStore, I18nError};
use crate::tracker::TrackerSnapshot;
use crate::validator::ValidationError;
use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, ConnectInfo, DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::any::Any;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, warn};

/// Largest accepted request body. Far above the capped form fields, far
/// below axum's 2 MB default.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared application state.
pub struct AppState {
    pub gate: ContactGate,
    pub dictionaries: DictionaryStore,
    pub config: Config,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub tracker: TrackerSnapshot,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.config.cors_allow_origin.as_deref());

    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/metrics", get(metrics))
        .route("/api/contact", post(submit).fallback(method_not_allowed))
        .route("/contact", post(submit).fallback(method_not_allowed))
        .route("/i18n/:lang", get(dictionary))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let allow_origin = match origin.map(HeaderValue::from_str) {
        Some(Ok(value)) => AllowOrigin::exact(value),
        Some(Err(_)) => {
            warn!(origin = ?origin, "Invalid CORS origin, allowing any");
            AllowOrigin::any()
        }
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Convert a handler panic into the standard 500 body.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(detail, "Handler panicked");
    ContactError::Internal.into_response()
}

/// Resolve the caller's IP, preferring proxy headers when trusted.
pub fn client_ip(headers: &HeaderMap, peer: IpAddr, trust_proxy_headers: bool) -> IpAddr {
    if !trust_proxy_headers {
        return peer;
    }

    let header_ip = |name: &str| -> Option<IpAddr> {
        let value = headers.get(name)?.to_str().ok()?;
        value.split(',').next()?.trim().parse().ok()
    };

    header_ip("cf-connecting-ip")
        .or_else(|| header_ip("x-forwarded-for"))
        .or_else(|| header_ip("x-real-ip"))
        .unwrap_or(peer)
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "contact-relay",
        version: env!("CARGO_PKG_VERSION"),
        tracker: state.gate.tracker().snapshot().await,
    })
}

/// Prometheus exposition endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.gate.metrics().render() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Contact form submission.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let ip = client_ip(&headers, addr.ip(), state.config.trust_proxy_headers);
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return body_rejection(ip, rejection).into_response(),
    };
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    debug!(%ip, content_type = ?content_type, bytes = body.len(), "Processing submission");

    match state.gate.submit(ip, content_type, &body).await {
        Ok(_) => (StatusCode::OK, Json(ContactResponse::ok())).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Map a body read failure onto the contact response shape.
fn body_rejection(ip: IpAddr, rejection: BytesRejection) -> ContactError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!(%ip, limit = MAX_BODY_BYTES, "Request body over limit");
        ContactError::PayloadTooLarge
    } else {
        debug!(%ip, error = %rejection, "Failed to read request body");
        ContactError::Validation(ValidationError::InvalidJson)
    }
}

/// Any method other than POST on the contact route.
pub async fn method_not_allowed() -> Response {
    ContactError::MethodNotAllowed.into_response()
}

/// Translation dictionary for a language (`/i18n/es` or `/i18n/es.json`).
pub async fn dictionary(State(state): State<Arc<AppState>>, Path(lang): Path<String>) -> Response {
    let lang = lang.strip_suffix(".json").unwrap_or(&lang);

    match state.dictionaries.load(lang).await {
        Ok((language, dictionary)) => {
            let mut response = Json(dictionary.to_json()).into_response();
            let headers = response.headers_mut();
            headers.insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=300"),
            );
            if let Ok(value) = HeaderValue::from_str(&language) {
                headers.insert(header::CONTENT_LANGUAGE, value);
            }
            response
        }
        Err(err @ (I18nError::UnsupportedLanguage(_) | I18nError::NotFound(_))) => {
            debug!(error = %err, "Dictionary unavailable");
            (StatusCode::NOT_FOUND, Body::empty()).into_response()
        }
        Err(err) => {
            error!(error = %err, "Failed to load dictionary");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
