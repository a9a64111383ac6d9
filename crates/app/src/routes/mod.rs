//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness
//! GET  /health/ready                - Database readiness
//!
//! # Embedded app API (session token required)
//! GET  /api/usage                   - Tier, usage, lock and trial state
//! GET  /api/settings                - Per-shop settings
//! PUT  /api/settings                - Update per-shop settings
//! POST /api/batch/descriptions      - Bulk title/description optimization
//! POST /api/batch/alt-text          - Bulk image alt text
//! POST /api/batch/ads               - Ad copy, billed per product
//! POST /api/products/{id}/optimize  - Single-product optimization
//!
//! # Webhooks (HMAC verified)
//! POST /webhooks/app/uninstalled    - Start anti-churn lockout
//! ```

pub mod batch;
pub mod health;
pub mod settings;
pub mod usage;
pub mod webhooks;

use axum::{
    Router,
    http::{HeaderValue, header},
    routing::{get, post},
};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::state::AppState;

/// Embedded app API routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/usage", get(usage::show))
        .route("/settings", get(settings::show).put(settings::update))
        .route("/batch/descriptions", post(batch::descriptions))
        .route("/batch/alt-text", post(batch::alt_text))
        .route("/batch/ads", post(batch::ads))
        .route("/products/{id}/optimize", post(batch::optimize_product))
}

/// Webhook routes.
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/app/uninstalled", post(webhooks::app_uninstalled))
}

/// Build the full application router with tracing and Sentry layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api_routes())
        .nest("/webhooks", webhook_routes())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
