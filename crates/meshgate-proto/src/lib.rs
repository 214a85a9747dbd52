//! Wire schema and gRPC bindings for the meshgate bridge interface.
//!
//! The schema lives in `proto/meshgate.proto` and is compiled at build time
//! with `tonic-build`. This crate re-exports the generated message types and
//! the `Interface` service client/server so downstream crates never reach
//! into the generated module path directly.

/// Generated gRPC bindings for the bridge interface service.
#[allow(clippy::all)]
pub mod generated {
    tonic::include_proto!("meshgate");
}

pub use generated::interface_client::InterfaceClient;
pub use generated::interface_server::{Interface, InterfaceServer};
pub use generated::{Acknowledge, ComplexLog, ControlCommand, Trigger};

/// Default listening port for the bridge interface server.
pub const DEFAULT_PORT: u16 = 50000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complex_log_defaults_are_empty() {
        let log = ComplexLog::default();
        assert!(log.logsource.is_empty());
        assert!(log.logmetadata.is_empty());
    }

    #[test]
    fn acknowledge_roundtrip() {
        use prost::Message;

        let ack = Acknowledge {
            success: true,
            error: String::new(),
        };
        let bytes = ack.encode_to_vec();
        let decoded = Acknowledge::decode(bytes.as_slice()).unwrap();
        assert!(decoded.success);
    }
}
