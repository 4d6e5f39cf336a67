//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. CORS
//! 3. `TraceLayer` (request span with an empty `request_id` field)
//! 4. Request ID (fills the span field, echoes `x-request-id`)
//! 5. Rate limiting (fixed window per client IP and path)
//!
//! Authentication is not a layer: handlers opt in through the extractors in
//! [`auth`].

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{AuthUser, OptionalAuth, RequireAdmin, RequireAuth};
pub use rate_limit::{RateLimiters, rate_limit_middleware};
pub use request_id::request_id_middleware;
