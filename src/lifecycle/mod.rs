//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Compile snapshot → Store + reload manager
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast → Server drains, poller exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Forced config reload
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::handle_signals;
pub use startup::{initialize, Services, StartupError};
