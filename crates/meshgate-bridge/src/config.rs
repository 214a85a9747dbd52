//! Configuration types for the gateway bridge
//!
//! This module provides the serial link settings and interface server
//! settings consumed by the bridge daemon, plus the protocol constants
//! shared across modules.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default serial device path for the gateway
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyAMA0";

/// Default baud rate for the gateway serial link
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Frame delimiter on the serial link (line terminator)
pub const FRAME_DELIMITER: u8 = b'\n';

/// Byte threshold after which a delimiter-less frame is emitted anyway
pub const MAX_FRAME_SIZE: usize = 4096;

/// Top-level configuration for a bridge instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Serial link settings
    #[serde(default)]
    pub serial: SerialConfig,

    /// Interface server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Serial link settings
///
/// The link always runs 8 data bits, no parity, one stop bit, and no read
/// timeout: frame reads block until a delimiter or the byte threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Path to the serial device (e.g. /dev/ttyAMA0)
    pub port: PathBuf,

    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: PathBuf::from(DEFAULT_SERIAL_PORT),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// Interface server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// gRPC listening port
    pub listen_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_port: meshgate_proto::DEFAULT_PORT,
        }
    }
}
