//! Error types for bridge operations

use thiserror::Error;

/// Main error type for bridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Serial port open failed
    #[error("Failed to open serial port {port}: {reason}")]
    PortOpenFailed {
        /// Port path
        port: String,
        /// Failure reason
        reason: String,
    },

    /// Serial read error
    #[error("Serial read error: {0}")]
    ReadError(String),

    /// Serial write error
    #[error("Serial write error: {0}")]
    WriteError(String),

    /// Serial link disconnected (EOF from the device)
    #[error("Serial link disconnected")]
    Disconnected,

    /// Command serialization failed
    #[error("Command encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// A queue endpoint was dropped while still in use
    #[error("Channel closed")]
    ChannelClosed,

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Check if this error is fatal to the owning worker.
    ///
    /// Transport failures are not retried by the bridge; they terminate the
    /// worker and must surface to process-level supervision.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            BridgeError::Disconnected
                | BridgeError::ReadError(_)
                | BridgeError::WriteError(_)
                | BridgeError::Io(_)
        )
    }
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
