//! HTTP middleware and request extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS for the single-page app origin
//! 5. Rate limiting on register/login (governor)
//!
//! Authentication is not a layer: handlers opt in by taking one of the
//! extractors in [`auth`].

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{
    AdminAuth, ApprovedCourier, ApprovedRestaurant, Authenticated, CustomerAuth, ModeratorAuth,
};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
