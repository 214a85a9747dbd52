//! Reader/writer workers and their lifecycle
//!
//! The reader worker pulls frames from the transport, parses them, and
//! pushes structured records onto the log queue. The writer worker drains
//! the command queue, serializes each directive, and pushes the bytes to
//! the transport.
//!
//! Both loops run until a shutdown signal or an unrecoverable transport
//! failure; parse failures never terminate the reader. Cancellation is
//! cooperative: each loop selects on a `watch` signal between blocking
//! operations, and [`Worker::stop`] falls back to aborting the task (with a
//! logged warning) when termination cannot be confirmed within the grace
//! period.

use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::parser;
use crate::record::{ControlDirective, LogRecord};
use crate::transport::{FrameSink, FrameSource};

/// How long a stopping worker gets to exit on its own
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Handle to a running worker task
pub struct Worker {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<Result<()>>,
}

impl Worker {
    /// Spawn a named worker around a cancellable loop.
    ///
    /// The loop receives a `watch` receiver it must select on between
    /// blocking operations.
    pub fn spawn<F, Fut>(name: &'static str, body: F) -> Self
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let (shutdown, signal) = watch::channel(false);
        let handle = tokio::spawn(body(signal));
        debug!(worker = name, "Worker started");

        Self {
            name,
            shutdown,
            handle,
        }
    }

    /// Spawn the reader worker: transport frames in, log records out.
    pub fn spawn_reader<S>(source: S, log_tx: mpsc::UnboundedSender<LogRecord>) -> Self
    where
        S: FrameSource + 'static,
    {
        Self::spawn("reader", move |signal| reader_loop(source, log_tx, signal))
    }

    /// Spawn the writer worker: command directives in, transport bytes out.
    pub fn spawn_writer<K>(sink: K, command_rx: mpsc::UnboundedReceiver<ControlDirective>) -> Self
    where
        K: FrameSink + 'static,
    {
        Self::spawn("writer", move |signal| writer_loop(sink, command_rx, signal))
    }

    /// Wait for the worker to finish on its own.
    ///
    /// Only an unrecoverable transport failure (or a panic) ends a worker
    /// without a shutdown request; the error is surfaced here for
    /// process-level supervision.
    pub async fn wait(&mut self) -> Result<()> {
        match (&mut self.handle).await {
            Ok(result) => result,
            Err(e) => {
                warn!(worker = self.name, error = %e, "Worker task failed");
                Ok(())
            }
        }
    }

    /// Request termination and wait for it to be confirmed.
    ///
    /// Best-effort: a worker stuck in a blocking call past the grace period
    /// is aborted, and the unconfirmed termination is logged.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let abort = self.handle.abort_handle();

        match tokio::time::timeout(SHUTDOWN_GRACE, self.handle).await {
            Ok(Ok(Ok(()))) => debug!(worker = self.name, "Worker stopped"),
            Ok(Ok(Err(e))) => {
                warn!(worker = self.name, error = %e, "Worker exited with error during shutdown")
            }
            Ok(Err(e)) => warn!(worker = self.name, error = %e, "Worker task failed"),
            Err(_) => {
                abort.abort();
                warn!(
                    worker = self.name,
                    "Could not confirm worker termination, task aborted"
                );
            }
        }
    }
}

/// Reader loop: blocking frame read, parse, enqueue.
///
/// Unparseable frames are dropped silently; only a transport failure or a
/// shutdown signal ends the loop.
async fn reader_loop<S: FrameSource>(
    mut source: S,
    log_tx: mpsc::UnboundedSender<LogRecord>,
    mut signal: watch::Receiver<bool>,
) -> Result<()> {
    loop {
        tokio::select! {
            _ = signal.changed() => return Ok(()),
            frame = source.read_frame() => {
                let frame = frame?;
                match parser::parse_frame(&frame) {
                    Some(record) => {
                        trace!(kind = %record.kind, "Parsed frame");
                        if log_tx.send(record).is_err() {
                            // log queue consumer side is gone, nothing left to feed
                            return Ok(());
                        }
                    }
                    None => trace!(size = frame.len(), "Dropped unintelligible frame"),
                }
            }
        }
    }
}

/// Writer loop: dequeue, serialize, transport write.
async fn writer_loop<K: FrameSink>(
    mut sink: K,
    mut command_rx: mpsc::UnboundedReceiver<ControlDirective>,
    mut signal: watch::Receiver<bool>,
) -> Result<()> {
    loop {
        tokio::select! {
            _ = signal.changed() => return Ok(()),
            directive = command_rx.recv() => {
                let Some(directive) = directive else {
                    // command queue producer side is gone
                    return Ok(());
                };
                let payload = directive.to_wire_bytes()?;
                trace!(command = %directive.command, size = payload.len(), "Writing command");
                sink.write_bytes(&payload).await?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::record::LogKind;
    use crate::test_utils::{MockFrameSink, MockFrameSource};
    use std::collections::HashMap;

    #[tokio::test]
    async fn reader_parses_and_enqueues_in_order() {
        let source = MockFrameSource::with_frames(vec![
            b"{\"type\":\"meshlog\",\"logdata\":{\"type\":\"handshake-rxack\",\"node\":\"N7\"}}".to_vec(),
            b"not json not ascii \xff\xfe".to_vec(),
            b"hello-device\n".to_vec(),
        ]);
        let (log_tx, mut log_rx) = mpsc::unbounded_channel();

        let worker = Worker::spawn_reader(source, log_tx);

        let first = log_rx.recv().await.unwrap();
        assert_eq!(first.kind, LogKind::Handshake);

        // the undecodable frame is dropped, so the next record is the text one
        let second = log_rx.recv().await.unwrap();
        assert_eq!(second.kind, LogKind::Message);
        assert_eq!(second.log, "hello-device");

        worker.stop().await;
    }

    #[tokio::test]
    async fn reader_surfaces_transport_failure() {
        let source = MockFrameSource::with_frames(vec![]).disconnect_when_drained();
        let (log_tx, _log_rx) = mpsc::unbounded_channel();

        let mut worker = Worker::spawn_reader(source, log_tx);

        match worker.wait().await {
            Err(BridgeError::Disconnected) => {}
            other => panic!("expected Disconnected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn writer_serializes_exactly_one_write_per_command() {
        let sink = MockFrameSink::new();
        let written = sink.written();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let worker = Worker::spawn_writer(sink, command_rx);

        command_tx
            .send(ControlDirective {
                command: "connection-on".to_string(),
                metadata: HashMap::new(),
            })
            .unwrap();

        // wait for the writer to drain the queue
        tokio::time::sleep(Duration::from_millis(50)).await;

        {
            let writes = written.lock().unwrap();
            assert_eq!(writes.len(), 1);
            let value: serde_json::Value = serde_json::from_slice(&writes[0]).unwrap();
            assert_eq!(value["type"], "controlcommand");
            assert_eq!(value["command"], "connection-on");
        }

        worker.stop().await;
    }

    #[tokio::test]
    async fn stop_interrupts_a_blocked_reader() {
        // no frames queued: the mock source blocks forever, so only the
        // shutdown signal can end the loop
        let source = MockFrameSource::with_frames(vec![]);
        let (log_tx, _log_rx) = mpsc::unbounded_channel();

        let worker = Worker::spawn_reader(source, log_tx);
        worker.stop().await;
    }
}
