//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! GET /healthz
//!     → readiness.rs
//!         counter PING      ─┐
//!         store SELECT 1    ─┼─ in order, first failure stops the rest
//!         queue metadata    ─┘
//!     → ReadinessReport { ready, detail }
//!     → 200 "ok" | 503 "not ready <detail>"
//! ```
//!
//! # Design Decisions
//! - Checks run on demand per request; no background ticker, no cached state
//! - No retries and no timeout budget beyond each client's defaults
//! - The report names the failure only through its message text

pub mod readiness;

pub use readiness::{ReadinessAggregator, ReadinessReport};
