//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP, frame options, default cache policy)
//! 5. Admin gate (session + membership check on `/admin` and `/api/admin`)

pub mod admin_gate;
pub mod auth;
pub mod request_id;
pub mod security_headers;

pub use admin_gate::admin_gate_middleware;
pub use auth::{AdminRejection, AdminSession, RequireAdmin, RequireAdminApi, wants_json};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;
