//! Client IP resolution for services behind reverse proxies.
//!
//! Every request is attributed to exactly one address: the rightmost
//! untrusted entry of a configured proxy header, else the socket peer,
//! else `0.0.0.0`.

pub mod client_ip;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use client_ip::{ClientIp, ClientIpResolver, TrustedPrefixSet};
pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
