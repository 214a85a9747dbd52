//! The network-facing bridge interface
//!
//! [`LinkService`] implements the `Interface` gRPC contract: a
//! server-streaming `Read` that drains the log queue to a connected client
//! indefinitely, and a unary `Write` that enqueues a control command and
//! acknowledges the enqueue (not device receipt).
//!
//! At most one `Read` stream drains the log queue at a time. The stream-lock
//! is an async mutex around the queue's receiver: a second concurrent `Read`
//! parks on the lock until the holder's client disconnects, at which point
//! the holding task drops its guard and the lock transfers. This is a
//! deliberate single-reader design; it keeps the log stream from being
//! interleaved nondeterministically across consumers.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::{debug, info, warn};

use meshgate_proto::{Acknowledge, ComplexLog, ControlCommand, Interface, Trigger};

use crate::record::{ControlDirective, LogRecord};

/// Trigger sentinel that starts a log stream
pub const STREAM_SENTINEL: &str = "start-stream-read";

/// Interval between diagnostic records on a misused Read stream
const MISUSE_INTERVAL: Duration = Duration::from_secs(2);

/// Buffer between the queue drain task and the outgoing stream
const STREAM_BUFFER: usize = 64;

/// The bridge's gRPC interface service
pub struct LinkService {
    /// Inbound log queue receiver, behind the stream-lock
    logs: Arc<Mutex<mpsc::UnboundedReceiver<LogRecord>>>,
    /// Producer side of the log queue, for the bridge's own records
    log_tx: mpsc::UnboundedSender<LogRecord>,
    /// Outbound command queue
    command_tx: mpsc::UnboundedSender<ControlDirective>,
}

impl LinkService {
    /// Build the service around the two bridge queues
    pub fn new(
        log_tx: mpsc::UnboundedSender<LogRecord>,
        log_rx: mpsc::UnboundedReceiver<LogRecord>,
        command_tx: mpsc::UnboundedSender<ControlDirective>,
    ) -> Self {
        Self {
            logs: Arc::new(Mutex::new(log_rx)),
            log_tx,
            command_tx,
        }
    }
}

#[tonic::async_trait]
impl Interface for LinkService {
    type ReadStream = ReceiverStream<Result<ComplexLog, Status>>;

    async fn read(
        &self,
        request: Request<Trigger>,
    ) -> Result<Response<Self::ReadStream>, Status> {
        let trigger = request.into_inner();
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        if trigger.triggermessage == STREAM_SENTINEL {
            info!("Read stream requested");
            let logs = self.logs.clone();

            tokio::spawn(async move {
                // stream-lock: held for the lifetime of this drain task and
                // released by guard drop when the client disconnects
                let mut queue = logs.lock().await;
                debug!("Read stream holds the log queue");

                loop {
                    tokio::select! {
                        record = queue.recv() => {
                            let Some(record) = record else { break };
                            if tx.send(Ok(record.into())).await.is_err() {
                                break;
                            }
                        }
                        _ = tx.closed() => break,
                    }
                }

                debug!("Read stream released the log queue");
            });
        } else {
            warn!(trigger = %trigger.triggermessage, "Read stream initiated without sentinel");

            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(MISUSE_INTERVAL);
                loop {
                    ticker.tick().await;
                    let record = LogRecord::server_log("invalid read stream initiation code");
                    if tx.send(Ok(record.into())).await.is_err() {
                        break;
                    }
                }
            });
        }

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn write(
        &self,
        request: Request<ControlCommand>,
    ) -> Result<Response<Acknowledge>, Status> {
        let request = request.into_inner();
        let directive = ControlDirective {
            command: request.command,
            metadata: request.metadata,
        };

        let ack = match self.command_tx.send(directive.clone()) {
            Ok(()) => {
                debug!(command = %directive.command, "Control command queued");
                let _ = self.log_tx.send(LogRecord::server_log(format!(
                    "control command '{}' queued for the mesh",
                    directive.command
                )));
                Acknowledge {
                    success: true,
                    error: String::new(),
                }
            }
            Err(e) => {
                warn!(command = %directive.command, error = %e, "Control command enqueue failed");
                let _ = self.log_tx.send(LogRecord::server_log(format!(
                    "control command '{}' could not be queued: {}",
                    directive.command, e
                )));
                Acknowledge {
                    success: false,
                    error: e.to_string(),
                }
            }
        };

        Ok(Response::new(ack))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{LogKind, LogSource};
    use std::collections::HashMap;
    use tokio_stream::StreamExt;

    fn service() -> (
        LinkService,
        mpsc::UnboundedSender<LogRecord>,
        mpsc::UnboundedReceiver<ControlDirective>,
    ) {
        let (log_tx, log_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let service = LinkService::new(log_tx.clone(), log_rx, command_tx);
        (service, log_tx, command_rx)
    }

    fn sentinel() -> Request<Trigger> {
        Request::new(Trigger {
            triggermessage: STREAM_SENTINEL.to_string(),
            metadata: HashMap::new(),
        })
    }

    #[tokio::test]
    async fn write_enqueues_command_and_success_record() {
        let (service, _log_tx, mut command_rx) = service();

        let ack = service
            .write(Request::new(ControlCommand {
                command: "connection-on".to_string(),
                metadata: HashMap::new(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(ack.success);
        assert!(ack.error.is_empty());

        let directive = command_rx.try_recv().unwrap();
        assert_eq!(directive.command, "connection-on");

        // exactly one command queued
        assert!(command_rx.try_recv().is_err());

        // the success record is observable through a Read stream
        let mut stream = service.read(sentinel()).await.unwrap().into_inner();
        let log = stream.next().await.unwrap().unwrap();
        assert_eq!(log.logsource, "LINK");
        assert_eq!(log.logtype, "serverlog");
        assert!(log.logmessage.contains("connection-on"));
    }

    #[tokio::test]
    async fn write_failure_is_acknowledged_and_logged() {
        let (service, _log_tx, command_rx) = service();
        drop(command_rx);

        let ack = service
            .write(Request::new(ControlCommand {
                command: "connection-off".to_string(),
                metadata: HashMap::new(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(!ack.success);
        assert!(!ack.error.is_empty());

        let mut stream = service.read(sentinel()).await.unwrap().into_inner();
        let log = stream.next().await.unwrap().unwrap();
        assert!(log.logmessage.contains("could not be queued"));
    }

    #[tokio::test]
    async fn read_streams_records_in_queue_order() {
        let (service, log_tx, _command_rx) = service();

        for node in ["N1", "N2", "N3"] {
            log_tx
                .send(
                    LogRecord::new(LogSource::Mesh, LogKind::Handshake, "node handshaked")
                        .with_metadata(vec![("node".to_string(), node.to_string())]),
                )
                .unwrap();
        }

        let mut stream = service.read(sentinel()).await.unwrap().into_inner();
        for node in ["N1", "N2", "N3"] {
            let log = stream.next().await.unwrap().unwrap();
            assert_eq!(log.logmetadata.get("node").unwrap(), node);
        }
    }

    #[tokio::test]
    async fn read_without_sentinel_emits_diagnostics() {
        let (service, _log_tx, _command_rx) = service();

        let mut stream = service
            .read(Request::new(Trigger {
                triggermessage: "observe".to_string(),
                metadata: HashMap::new(),
            }))
            .await
            .unwrap()
            .into_inner();

        let log = stream.next().await.unwrap().unwrap();
        assert_eq!(log.logsource, "LINK");
        assert_eq!(log.logmessage, "invalid read stream initiation code");
    }

    #[tokio::test]
    async fn second_read_stream_waits_for_the_first_to_disconnect() {
        let (service, log_tx, _command_rx) = service();

        let mut first = service.read(sentinel()).await.unwrap().into_inner();

        // receiving a record proves the first stream holds the lock
        log_tx.send(LogRecord::server_log("record one")).unwrap();
        let log = first.next().await.unwrap().unwrap();
        assert_eq!(log.logmessage, "record one");

        let mut second = service.read(sentinel()).await.unwrap().into_inner();

        // records keep going to the holder; the second stream observes
        // nothing while the first client stays connected
        log_tx.send(LogRecord::server_log("record two")).unwrap();
        let log = first.next().await.unwrap().unwrap();
        assert_eq!(log.logmessage, "record two");

        let starved =
            tokio::time::timeout(Duration::from_millis(100), second.next()).await;
        assert!(starved.is_err());

        // disconnecting the first client transfers the lock
        drop(first);
        tokio::time::sleep(Duration::from_millis(100)).await;

        log_tx.send(LogRecord::server_log("record three")).unwrap();
        let log = tokio::time::timeout(Duration::from_secs(1), second.next())
            .await
            .expect("second stream should take over")
            .unwrap()
            .unwrap();
        assert_eq!(log.logmessage, "record three");
    }
}
