//! Error types and handling infrastructure for mgmtutil.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! the library error type. The binaries wrap it with `anyhow` for top-level context.
//!
//! Errors fall in two groups:
//!
//! - **Session failures** (open, discovery, domain info): fatal, the reset tool
//!   exits with status -1
//! - **Record failures** (entry lookup, control set): logged, they end or skip a
//!   branch of the resource walk

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for mgmtutil operations.
#[derive(Error, Debug)]
pub enum MgmtError {
    /// Opening or initializing the management session failed
    #[error("Failed to open management session: {message}")]
    SessionOpen { message: String },

    /// Resource discovery (or the domain info query that follows it) failed
    #[error("Resource discovery failed: {message}")]
    Discovery { message: String },

    /// An RPT or RDR cursor pointed at an entry that does not exist
    #[error("Entry not found: {what}")]
    EntryNotFound { what: String },

    /// Call made on a session that was already closed
    #[error("Management session is closed")]
    SessionClosed,

    /// Setting a control state was rejected by the domain
    #[error("Failed to set control {num} on resource {resource}: {message}")]
    ControlSet {
        resource: u32,
        num: u32,
        message: String,
    },

    /// Domain description file could not be read or parsed
    #[error("Invalid domain file {path}: {message}")]
    DomainFile { path: PathBuf, message: String },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Console mode or console event errors
    #[error("Console operation failed: {message}")]
    Console { message: String },

    /// Invalid command line arguments
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// I/O errors from sockets, files and the terminal
    #[error("I/O operation failed: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Standard Result type for mgmtutil operations.
pub type Result<T> = std::result::Result<T, MgmtError>;

impl MgmtError {
    /// Create a SessionOpen error
    pub fn session_open(message: impl Into<String>) -> Self {
        Self::SessionOpen {
            message: message.into(),
        }
    }

    /// Create a Discovery error
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }

    /// Create an EntryNotFound error
    pub fn entry_not_found(what: impl Into<String>) -> Self {
        Self::EntryNotFound { what: what.into() }
    }

    /// Create a DomainFile error for the given path
    pub fn domain_file(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::DomainFile {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a ConfigError with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a Console error with a descriptive message
    pub fn console(message: impl Into<String>) -> Self {
        Self::Console {
            message: message.into(),
        }
    }

    /// Create an Io error with additional context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create an InvalidArgument error with a descriptive message
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// True for failures that leave no usable session. The reset tool maps these
    /// to exit status -1.
    pub fn is_session_failure(&self) -> bool {
        matches!(
            self,
            Self::SessionOpen { .. }
                | Self::Discovery { .. }
                | Self::SessionClosed
                | Self::DomainFile { .. }
        )
    }
}

impl From<std::io::Error> for MgmtError {
    fn from(err: std::io::Error) -> Self {
        let message = match err.kind() {
            std::io::ErrorKind::NotFound => "Not found",
            std::io::ErrorKind::PermissionDenied => "Permission denied",
            std::io::ErrorKind::ConnectionRefused => "Connection refused",
            std::io::ErrorKind::ConnectionReset => "Connection reset",
            _ => "I/O operation failed",
        };
        Self::Io {
            message: message.to_string(),
            source: err,
        }
    }
}
