//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Metrics recorder → Counter → Store (+migrations) → Queue
//!         → AppState + log writer guard
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain in-flight requests
//!         → Flush spans and log lines → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then backends, then the listener
//! - No shutdown deadline: in-flight workflows run to completion

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{flush_telemetry, Shutdown, ShutdownSignal};
pub use startup::{build_state, StartupError};
