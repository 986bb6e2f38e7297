//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → every subscribed server stops accepting → in-flight requests finish → exit
//! ```
//!
//! # Design Decisions
//! - Startup order lives in main: config, logging, metrics, handler, listener
//! - One broadcast channel fans out to plain and TLS listeners alike

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
