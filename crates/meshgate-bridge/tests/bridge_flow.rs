//! End-to-end bridge flow over mock transport halves
//!
//! Wires the reader/writer workers and the interface service together the
//! way the daemon does, then drives both directions: device frames out to a
//! Read stream, and a Write command down to the device.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tonic::Request;

use meshgate_bridge::test_utils::{MockFrameSink, MockFrameSource};
use meshgate_bridge::{LinkService, LogRecord, Worker, STREAM_SENTINEL};
use meshgate_proto::{ControlCommand, Interface, Trigger};

#[tokio::test]
async fn device_frames_reach_the_read_stream_in_arrival_order() {
    let source = MockFrameSource::with_frames(vec![
        br#"{"type":"meshlog","logdata":{"type":"handshake-rxack","node":"N7"}}"#.to_vec(),
        b"plain text status\n".to_vec(),
        br#"{"type":"meshlog","logdata":{"type":"sensordata","ping":"p9","node":2,"sensors":{"temp":21}}}"#.to_vec(),
    ]);

    let (log_tx, log_rx) = mpsc::unbounded_channel();
    let (command_tx, _command_rx) = mpsc::unbounded_channel();

    let reader = Worker::spawn_reader(source, log_tx.clone());
    let service = LinkService::new(log_tx, log_rx, command_tx);

    let mut stream = service
        .read(Request::new(Trigger {
            triggermessage: STREAM_SENTINEL.to_string(),
            metadata: HashMap::new(),
        }))
        .await
        .unwrap()
        .into_inner();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.logtype, "handshake");
    assert_eq!(first.logmetadata.get("node").unwrap(), "N7");

    let second = stream.next().await.unwrap().unwrap();
    assert_eq!(second.logtype, "message");
    assert_eq!(second.logmessage, "plain text status");

    let third = stream.next().await.unwrap().unwrap();
    assert_eq!(third.logtype, "sensordata");
    assert_eq!(third.logmetadata.get("sensors").unwrap(), "temp-21");

    reader.stop().await;
}

#[tokio::test]
async fn write_command_reaches_the_device_exactly_once() {
    let sink = MockFrameSink::new();
    let written = sink.written();

    let (log_tx, mut log_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let writer = Worker::spawn_writer(sink, command_rx);
    // the log stream side is unused here; observe log_rx directly instead
    let service = LinkService::new(log_tx, mpsc::unbounded_channel::<LogRecord>().1, command_tx);

    let mut metadata = HashMap::new();
    metadata.insert("node".to_string(), "5".to_string());

    let ack = service
        .write(Request::new(ControlCommand {
            command: "readsensors-node".to_string(),
            metadata,
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(ack.success);

    // wait for the writer to drain the command queue
    tokio::time::sleep(Duration::from_millis(50)).await;

    {
        let writes = written.lock().unwrap();
        assert_eq!(writes.len(), 1, "exactly one serialized write");

        let value: serde_json::Value = serde_json::from_slice(&writes[0]).unwrap();
        assert_eq!(value["type"], "controlcommand");
        assert_eq!(value["command"], "readsensors-node");
        assert_eq!(value["node"], "5");
    }

    // exactly one log record mirrors the write
    let record: LogRecord = log_rx.try_recv().unwrap();
    assert!(record.log.contains("readsensors-node"));
    assert!(log_rx.try_recv().is_err());

    writer.stop().await;
}
