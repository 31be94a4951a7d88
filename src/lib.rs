//! # mgmtutil - Server management utilities
//!
//! Two small tools for managing server hardware through vendor management
//! interfaces:
//!
//! - **Hard reset / power down** through a platform management abstraction
//!   layer (`hpireset` binary, [`reset`] module)
//! - **Serial-over-LAN console input shim**: raw console mode, keycode packing,
//!   buffered reads and a select over the SOL socket ([`console`] module,
//!   driven by the `solconsole` binary)
//!
//! ## Architecture
//!
//! - [`error`] - Centralized error types and handling
//! - [`config`] - TOML configuration
//! - [`hpi`] - Management session seam and the in-memory domain backend
//! - [`reset`] - Resource walk that sets the reset control
//! - [`console`] - SOL console input shim
//! - [`logging`] - Logger setup shared by the binaries

// Core modules
pub mod config;
pub mod error;
pub mod logging;

// Management layer
pub mod hpi;
pub mod reset;

// Serial-over-LAN console
pub mod console;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::{MgmtError, Result};
pub use reset::{run_reset, ResetAction, ResetOptions, ResetReport};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
