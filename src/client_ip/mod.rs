//! Client IP resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Proxy header value (e.g. X-Forwarded-For, Forwarded)
//!     → parser.rs (split on commas, extract `for=` or bare literals)
//!     → trust.rs (drop addresses inside trusted proxy prefixes)
//!     → resolver.rs (take rightmost survivor)
//!
//! Fallback order (resolver.rs):
//!     header attempt → transport peer address → 0.0.0.0
//! ```
//!
//! # Design Decisions
//! - Everything here is a pure function of its inputs; no caching per client
//! - Malformed header segments are skipped, never fatal
//! - Trusted prefixes are fixed at startup and shared read-only
//! - If every header candidate is trusted we fall back to the peer address

pub mod error;
pub mod parser;
pub mod resolver;
pub mod trust;

pub use error::ResolveError;
pub use parser::parse_candidates;
pub use resolver::{ClientIp, ClientIpResolver, IpSource};
pub use trust::TrustedPrefixSet;
