//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing with status and latency)
//! 3. Security headers (`X-Content-Type-Options`)
//! 4. Path normalization (trailing slashes)
//!
//! Authentication is an extractor ([`ShopSession`]) rather than a layer, so
//! health checks and webhooks stay outside it.

pub mod auth;

pub use auth::ShopSession;
