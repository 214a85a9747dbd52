//! Structured log records and control directives
//!
//! [`LogRecord`] is the canonical unit flowing through the inbound log
//! queue; [`ControlDirective`] is the unit flowing through the outbound
//! command queue. Records are immutable after creation and ownership
//! transfers fully into the queue on enqueue.

use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::Result;

/// Origin subsystem of a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    /// The mesh network, via the gateway device
    Mesh,
    /// The bridge itself
    Link,
}

impl LogSource {
    /// Fixed wire tag for this source
    pub fn as_str(&self) -> &'static str {
        match self {
            LogSource::Mesh => "MESH",
            LogSource::Link => "LINK",
        }
    }
}

impl std::fmt::Display for LogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed taxonomy of log record kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    /// Mesh synchronization event
    MeshSync,
    /// Node time synchronized
    NodeSync,
    /// Node handshake acknowledged
    Handshake,
    /// Sensor readings from a mesh node
    SensorData,
    /// Configuration readings from a mesh node
    ConfigData,
    /// Control node configuration
    CtrlData,
    /// Mesh node list
    NodeList,
    /// Generic application message (fallback kind)
    Message,
    /// Operational record produced by the bridge itself
    ServerLog,
}

impl LogKind {
    /// Fixed wire tag for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::MeshSync => "meshsync",
            LogKind::NodeSync => "nodesync",
            LogKind::Handshake => "handshake",
            LogKind::SensorData => "sensordata",
            LogKind::ConfigData => "configdata",
            LogKind::CtrlData => "ctrldata",
            LogKind::NodeList => "nodelist",
            LogKind::Message => "message",
            LogKind::ServerLog => "serverlog",
        }
    }
}

impl std::fmt::Display for LogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured log record
///
/// Metadata is an ordered list of pre-stringified key/value pairs; nested
/// mappings from the device are flattened to `key-value=key-value` text by
/// the parser before they reach a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Origin subsystem
    pub source: LogSource,
    /// Record kind from the closed taxonomy
    pub kind: LogKind,
    /// Timestamp of parse, ISO-8601 second precision, UTC
    pub time: String,
    /// Short human-readable summary
    pub log: String,
    /// Kind-specific metadata, in extraction order
    pub metadata: Vec<(String, String)>,
}

impl LogRecord {
    /// Create a record stamped with the current time and no metadata
    pub fn new(source: LogSource, kind: LogKind, log: impl Into<String>) -> Self {
        Self {
            source,
            kind,
            time: log_time(),
            log: log.into(),
            metadata: Vec::new(),
        }
    }

    /// Attach metadata pairs, preserving order
    pub fn with_metadata(mut self, metadata: Vec<(String, String)>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Create an operational record from the bridge itself
    pub fn server_log(log: impl Into<String>) -> Self {
        Self::new(LogSource::Link, LogKind::ServerLog, log)
    }
}

impl From<LogRecord> for meshgate_proto::ComplexLog {
    fn from(record: LogRecord) -> Self {
        meshgate_proto::ComplexLog {
            logsource: record.source.as_str().to_string(),
            logtype: record.kind.as_str().to_string(),
            logtime: record.time,
            logmessage: record.log,
            logmetadata: record.metadata.into_iter().collect(),
        }
    }
}

/// A control directive bound for the mesh
///
/// Consumed exactly once by the writer worker. Enqueue acknowledgment does
/// not imply device receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlDirective {
    /// Command verb understood by the control node
    pub command: String,
    /// Flat string metadata forwarded alongside the command
    pub metadata: HashMap<String, String>,
}

impl ControlDirective {
    /// Serialize to the JSON envelope the control node firmware expects:
    /// `{"type": "controlcommand", "command": <command>, ...metadata}`
    pub fn to_wire_bytes(&self) -> Result<Vec<u8>> {
        let mut envelope = Map::new();
        envelope.insert("type".to_string(), Value::String("controlcommand".into()));
        envelope.insert("command".to_string(), Value::String(self.command.clone()));
        for (key, value) in &self.metadata {
            envelope.insert(key.clone(), Value::String(value.clone()));
        }

        Ok(serde_json::to_vec(&Value::Object(envelope))?)
    }
}

/// Current UTC time as an ISO-8601 string at second precision
pub fn log_time() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}
