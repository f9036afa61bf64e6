//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (added by the binary: HTTP transaction, hub per request)
//! 2. CORS (permissive; answers preflight requests itself)
//! 3. `TraceLayer` (request span with status and latency)
//! 4. Request ID (record, tag and echo `x-request-id`)

pub mod request_id;

pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
