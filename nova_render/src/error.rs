//! Error types for the Nova renderer
//!
//! Errors are split by how the render loop reacts to them: configuration and
//! logic errors are fatal, surface staleness and query exhaustion are
//! contained inside the frame graph.

use std::fmt;

/// Result type for Nova operations
pub type Result<T> = std::result::Result<T, Error>;

/// Nova renderer errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid setup detected at construction time (attachment size mismatch,
    /// missing pipeline state, broken pass dependencies, bad config)
    ConfigurationError(String),

    /// Programming bug: a contract was violated (begin while active, end while idle...)
    LogicError(String),

    /// The presentable surface is stale (resize raced the acquire). Recoverable.
    TransientSurfaceError(String),

    /// A bounded device resource ran out for this frame (timestamp queries). Recoverable.
    ResourceExhaustion(String),

    /// Backend-specific failure
    BackendError(String),

    /// Invalid or destroyed resource handle
    InvalidResource(String),

    /// Initialization failed (engine, device, subsystems)
    InitializationFailed(String),

    /// The device stopped executing work; every pending wait is abandoned
    DeviceLost(String),
}

impl Error {
    /// Whether the frame graph absorbs this error without stopping the render loop
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::TransientSurfaceError(_) | Error::ResourceExhaustion(_))
    }

    /// Whether this error must terminate the render loop
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Message carried by the error
    pub fn message(&self) -> &str {
        match self {
            Error::ConfigurationError(msg)
            | Error::LogicError(msg)
            | Error::TransientSurfaceError(msg)
            | Error::ResourceExhaustion(msg)
            | Error::BackendError(msg)
            | Error::InvalidResource(msg)
            | Error::InitializationFailed(msg)
            | Error::DeviceLost(msg) => msg,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            Error::LogicError(msg) => write!(f, "Logic error: {}", msg),
            Error::TransientSurfaceError(msg) => write!(f, "Transient surface error: {}", msg),
            Error::ResourceExhaustion(msg) => write!(f, "Resource exhaustion: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::DeviceLost(msg) => write!(f, "Device lost: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
