//! Frame parsing pipeline
//!
//! Pure, side-effect-free translation of one raw serial frame into a
//! [`LogRecord`], or nothing when the frame is unintelligible.
//!
//! Classification is an ordered fallback chain:
//!
//! 1. JSON decode. A top-level `type == "meshlog"` dispatches through the
//!    meshlog taxonomy; any other decoded value wraps as a generic
//!    `message` record tagged `format: "dict"`.
//! 2. ASCII decode. A non-empty string (after trimming trailing whitespace)
//!    wraps as a generic `message` record tagged `format: "str"`.
//! 3. Otherwise the frame is silently dropped.
//!
//! A meshlog frame missing an expected field is a parse failure for the
//! dispatched kind; it falls through the chain like any other JSON failure
//! and never partially constructs a record.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::record::{LogKind, LogRecord, LogSource};

/// Internal parse failure. Never surfaces past [`parse_frame`]; a failed
/// frame either falls back to ASCII classification or is dropped.
#[derive(Debug, Error)]
enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("field {0} is not a mapping")]
    NotAMapping(&'static str),

    #[error("field {0} is not a list")]
    NotAList(&'static str),
}

type ParseResult<T> = std::result::Result<T, ParseError>;

/// Parse one raw frame into a log record.
///
/// Returns `None` when the frame is neither valid JSON nor non-empty ASCII
/// text; such frames are dropped without error.
pub fn parse_frame(frame: &[u8]) -> Option<LogRecord> {
    match parse_json(frame) {
        Ok(record) => Some(record),
        Err(_) => parse_ascii(frame),
    }
}

/// Attempt to interpret the frame as JSON.
fn parse_json(frame: &[u8]) -> ParseResult<LogRecord> {
    let value: Value = serde_json::from_slice(frame)?;

    if value.get("type").and_then(Value::as_str) == Some("meshlog") {
        parse_meshlog(&value)
    } else {
        let original = value
            .get("type")
            .map(stringify)
            .unwrap_or_else(|| "unknown".to_string());

        Ok(
            LogRecord::new(LogSource::Mesh, LogKind::Message, value.to_string())
                .with_metadata(vec![
                    ("format".to_string(), "dict".to_string()),
                    ("type".to_string(), original),
                ]),
        )
    }
}

/// Dispatch a meshlog envelope through the event taxonomy.
fn parse_meshlog(value: &Value) -> ParseResult<LogRecord> {
    let logdata = value
        .get("logdata")
        .ok_or(ParseError::MissingField("logdata"))?
        .as_object()
        .ok_or(ParseError::NotAMapping("logdata"))?;

    let event = field(logdata, "type")?
        .as_str()
        .ok_or(ParseError::MissingField("type"))?;

    let record = match event {
        "meshsync" => mesh_record(LogKind::MeshSync, "mesh synchronization event")
            .with_metadata(vec![(
                "synctype".to_string(),
                stringify(field(logdata, "synctype")?),
            )]),

        "nodesync" => {
            mesh_record(LogKind::NodeSync, "node time synchronized").with_metadata(vec![(
                "offset".to_string(),
                stringify(field(logdata, "offset")?),
            )])
        }

        "handshake-rxack" => mesh_record(LogKind::Handshake, "node handshaked")
            .with_metadata(vec![(
                "node".to_string(),
                stringify(field(logdata, "node")?),
            )]),

        "sensordata" => {
            mesh_record(LogKind::SensorData, "sensordata acquired").with_metadata(vec![
                ("ping".to_string(), stringify(field(logdata, "ping")?)),
                ("node".to_string(), stringify(field(logdata, "node")?)),
                ("sensors".to_string(), flatten(field(logdata, "sensors")?, "sensors")?),
            ])
        }

        "configdata" => {
            mesh_record(LogKind::ConfigData, "configdata acquired").with_metadata(vec![
                ("ping".to_string(), stringify(field(logdata, "ping")?)),
                ("node".to_string(), stringify(field(logdata, "node")?)),
                ("config".to_string(), flatten(field(logdata, "config")?, "config")?),
            ])
        }

        "controlconfigdata" => mesh_record(LogKind::CtrlData, "controlnode config acquired")
            .with_metadata(vec![
                ("nodeID".to_string(), stringify(field(logdata, "nodeID")?)),
                ("config".to_string(), flatten(field(logdata, "config")?, "config")?),
            ]),

        "controlnodelist" => {
            let nodelist = field(logdata, "nodelist")?;
            if !nodelist.is_array() {
                return Err(ParseError::NotAList("nodelist"));
            }
            mesh_record(LogKind::NodeList, "mesh nodelist acquired").with_metadata(vec![(
                "nodelist".to_string(),
                nodelist.to_string(),
            )])
        }

        "messagerx" => {
            let text = stringify(field(logdata, "message")?);
            let rxtype = stringify(field(logdata, "rxtype")?);
            LogRecord::new(LogSource::Mesh, LogKind::Message, text).with_metadata(vec![
                ("format".to_string(), "str".to_string()),
                ("type".to_string(), rxtype),
            ])
        }

        // Unknown mesh event kinds degrade to a generic dict dump
        other => LogRecord::new(LogSource::Mesh, LogKind::Message, value.to_string())
            .with_metadata(vec![
                ("format".to_string(), "dict".to_string()),
                ("type".to_string(), other.to_string()),
            ]),
    };

    Ok(record)
}

/// Attempt to interpret the frame as plain ASCII text.
fn parse_ascii(frame: &[u8]) -> Option<LogRecord> {
    let text = std::str::from_utf8(frame).ok()?;
    if !text.is_ascii() {
        return None;
    }

    let trimmed = text.trim_end();
    if trimmed.is_empty() {
        return None;
    }

    Some(
        LogRecord::new(LogSource::Mesh, LogKind::Message, trimmed).with_metadata(vec![
            ("format".to_string(), "str".to_string()),
            ("type".to_string(), "unknown".to_string()),
        ]),
    )
}

fn mesh_record(kind: LogKind, log: &str) -> LogRecord {
    LogRecord::new(LogSource::Mesh, kind, log)
}

fn field<'a>(data: &'a Map<String, Value>, key: &'static str) -> ParseResult<&'a Value> {
    data.get(key).ok_or(ParseError::MissingField(key))
}

/// Render a JSON value as a bare string (strings lose their quotes).
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Flatten a nested mapping into `key-value=key-value` text, keys in the
/// mapping's natural order.
///
/// This encoding is lossy for debugging purposes only: embedded `-` or `=`
/// in values are not escaped, so it is not safely reversible.
fn flatten(value: &Value, name: &'static str) -> ParseResult<String> {
    let map = value.as_object().ok_or(ParseError::NotAMapping(name))?;
    Ok(map
        .iter()
        .map(|(key, value)| format!("{}-{}", key, stringify(value)))
        .collect::<Vec<_>>()
        .join("="))
}
