//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (peer address captured as ConnectInfo)
//!     → request.rs (assign / propagate x-request-id)
//!     → middleware/client_ip.rs (resolve caller address, access log)
//!     → security::rate_limit (per-client limits)
//!     → server.rs handlers (/ip, /health), params.rs for options
//! ```

pub mod middleware;
pub mod params;
pub mod request;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::HttpServer;
