//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Init logging/metrics → Load store → Spawn collectors → Serve API
//!
//! Shutdown (shutdown.rs):
//!     SIGTERM/SIGINT → broadcast → collectors exit, API drains → store saved
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then store, then collectors, API last
//! - Fail fast: any startup error is fatal

pub mod shutdown;
pub mod startup;

pub use shutdown::Shutdown;
