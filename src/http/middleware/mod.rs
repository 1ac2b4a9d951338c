//! Request middleware, outermost first:
//! client_ip.rs (resolve and attach the caller's address) →
//! rate limiting (security::rate_limit, keyed by that address).

pub mod client_ip;

pub use client_ip::client_ip_middleware;
