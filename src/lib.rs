//! Container status aggregation for a self-hosted deployment fleet.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!   │ SSH poller   │   │ agent push   │   │ multi-server │
//!   │ (inspect)    │   │ (strings)    │   │ check        │
//!   └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!          │                  │                  │
//!          └────────────┬─────┴──────────────────┘
//!                       ▼
//!              ┌─────────────────┐      ┌──────────────┐
//!              │ status engine   │◀─────│ compose      │
//!              │ aggregate /     │      │ exclusions   │
//!              │ excluded        │      └──────────────┘
//!              └────────┬────────┘
//!                       ▼
//!              ┌─────────────────┐      ┌──────────────┐
//!              │ status store    │─────▶│ HTTP API     │
//!              └─────────────────┘      └──────────────┘
//! ```
//!
//! The engine in [`status`] is pure; everything with I/O lives in
//! [`collectors`], [`store`] and [`api`].

pub mod api;
pub mod collectors;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod status;
pub mod store;

pub use config::schema::FleetConfig;
pub use lifecycle::Shutdown;
pub use status::AggregateStatus;
pub use store::StatusStore;
