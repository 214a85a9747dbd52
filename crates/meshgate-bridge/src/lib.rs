//! Serial-to-gRPC bridge core for a mesh network gateway device.
//!
//! This crate bridges a physical mesh gateway (attached over a serial link)
//! to remote gRPC clients. The gateway emits newline-delimited text/JSON
//! frames describing mesh events; the bridge parses them into structured
//! log records and streams them out, while accepting control commands to
//! forward back onto the mesh.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        meshgate bridge                         │
//! ├────────────────────────────────────────────────────────────────┤
//! │                                                                │
//! │  ┌────────┐   ┌────────┐   parse    ┌───────────┐   stream    │
//! │  │ Serial │──►│ Reader │──────────► │ log queue │───────────► │──► client
//! │  │ device │   │ worker │            └───────────┘  Read RPC   │
//! │  │        │   ├────────┤            ┌───────────┐             │
//! │  │        │◄──│ Writer │◄────────── │ cmd queue │◄─────────── │◄── client
//! │  └────────┘   │ worker │  serialize └───────────┘  Write RPC  │
//! │               └────────┘                                      │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Logs flow one direction (device → reader → log queue → Read stream) and
//! commands the other (Write RPC → command queue → writer → device). The two
//! queues are independent FIFOs with no cross-queue ordering guarantee.
//!
//! # Message flow
//!
//! ## Device → client
//!
//! 1. [`transport::FrameReader`] reads one delimited frame from the port
//! 2. [`parser::parse_frame`] classifies it (meshlog / generic / dropped)
//! 3. The reader worker pushes the [`record::LogRecord`] to the log queue
//! 4. An active Read stream drains the queue to the connected client
//!
//! ## Client → device
//!
//! 1. The Write RPC enqueues a [`record::ControlDirective`]
//! 2. The writer worker serializes it as a `controlcommand` JSON envelope
//! 3. [`transport::FrameWriter`] pushes the bytes to the device
//!
//! At most one Read stream drains the log queue at a time: a second
//! concurrent Read blocks on the stream-lock until the first disconnects.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod parser;
pub mod record;
pub mod server;
pub mod transport;
pub mod worker;

pub mod test_utils;

pub use config::{LinkConfig, SerialConfig, ServerConfig};
pub use error::{BridgeError, Result};
pub use record::{ControlDirective, LogKind, LogRecord, LogSource};
pub use server::{LinkService, STREAM_SENTINEL};
pub use transport::{FrameReader, FrameSink, FrameSource, FrameWriter, SerialLink};
pub use worker::Worker;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
