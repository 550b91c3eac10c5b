//! Inventory service.
//!
//! A small HTTP service whose `/data` endpoint increments a shared counter,
//! records an access row, publishes an event and emits a correlated log line,
//! all under one trace.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                INVENTORY SERVICE                 │
//!                     │                                                  │
//!   GET /data         │  ┌────────┐    ┌──────────────┐                  │
//!   ──────────────────┼─▶│  http  │───▶│   workflow   │──┬─▶ counter ────┼──▶ Redis
//!                     │  │ server │    │ orchestrator │  ├─▶ store ──────┼──▶ PostgreSQL
//!                     │  └───┬────┘    └──────┬───────┘  └─▶ queue ──────┼──▶ Kafka
//!                     │      │                │                          │
//!   GET /healthz      │      │         ┌──────▼───────┐                  │
//!   ──────────────────┼──────┼────────▶│    health    │── same backends  │
//!                     │      │         └──────────────┘                  │
//!   GET /metrics      │      ▼                                           │
//!   ──────────────────┼─▶ observability (spans, metrics, log sink)       │
//!                     │                                                  │
//!                     │  config · lifecycle (startup, signals, shutdown) │
//!                     └──────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod backends;
pub mod config;
pub mod http;
pub mod workflow;

// Cross-cutting concerns
pub mod health;
pub mod lifecycle;
pub mod observability;

// In-memory fakes, for unit tests and the `testing` feature
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
