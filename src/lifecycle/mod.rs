//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → metrics exporter → resolver + router → listener
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C or Shutdown::trigger → stop accepting → drain → exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: anything that can fail on config runs before bind
//! - Fail fast: any startup error is fatal

pub mod shutdown;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, StartupError};
