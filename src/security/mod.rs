//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → http::middleware::client_ip (resolve caller address)
//!     → rate_limit.rs (per-client token bucket)
//!     → handler
//! ```
//!
//! # Design Decisions
//! - Limits are keyed by the resolved client address, never the raw socket,
//!   so clients behind a shared proxy are not throttled together
//! - Requests that resolve to 0.0.0.0 share one bucket

pub mod rate_limit;
