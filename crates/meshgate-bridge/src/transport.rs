//! Serial transport for the gateway link
//!
//! The gateway emits newline-delimited frames over a fixed-parameter serial
//! connection (115200 baud, 8N1, no read timeout). [`SerialLink::open`]
//! opens the port and splits it into a [`FrameReader`] half owned by the
//! reader worker and a [`FrameWriter`] half owned by the writer worker; no
//! other component touches the connection.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{error, info, trace};

use crate::config::{SerialConfig, FRAME_DELIMITER, MAX_FRAME_SIZE};
use crate::error::{BridgeError, Result};

/// Buffer size for reads from the serial port
const READ_BUFFER_SIZE: usize = 512;

/// Read half of the gateway link, producing whole delimited frames.
type SerialFrameReader = FrameReader<ReadHalf<SerialStream>>;

/// Write half of the gateway link.
type SerialFrameWriter = FrameWriter<WriteHalf<SerialStream>>;

/// Source of delimited frames from the gateway
#[async_trait]
pub trait FrameSource: Send {
    /// Block until one whole frame is available.
    ///
    /// Never returns a partial frame. A device disappearance is fatal: it
    /// surfaces as [`BridgeError::Disconnected`] and is not retried here.
    async fn read_frame(&mut self) -> Result<Bytes>;
}

/// Sink for raw bytes toward the gateway
#[async_trait]
pub trait FrameSink: Send {
    /// Best-effort write; no device-side acknowledgment is awaited.
    async fn write_bytes(&mut self, data: &[u8]) -> Result<()>;
}

/// The physical serial connection to the gateway device
pub struct SerialLink;

impl SerialLink {
    /// Open the port with the gateway's fixed parameters and split it into
    /// its reader and writer halves.
    pub fn open(config: &SerialConfig) -> Result<(SerialFrameReader, SerialFrameWriter)> {
        let port = config.port.to_string_lossy();
        info!(port = %port, baud = config.baud_rate, "Opening serial link");

        let stream = tokio_serial::new(port.as_ref(), config.baud_rate)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .data_bits(DataBits::Eight)
            .open_native_async()
            .map_err(|e| BridgeError::PortOpenFailed {
                port: port.to_string(),
                reason: e.to_string(),
            })?;

        let (read_half, write_half) = tokio::io::split(stream);
        Ok((FrameReader::new(read_half), FrameWriter::new(write_half)))
    }
}

/// Accumulates serial bytes and yields whole delimited frames
pub struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
}

impl<R: AsyncRead + Unpin + Send> FrameReader<R> {
    /// Wrap a raw byte stream in a frame reader
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_BUFFER_SIZE * 2),
        }
    }

    /// Pull one complete frame out of the buffer, if present.
    ///
    /// The delimiter stays attached to the returned frame; the parser trims
    /// trailing whitespace itself. A buffer past the byte threshold is
    /// flushed as a frame even without a delimiter, mirroring the bounded
    /// read-until behavior of the gateway link.
    fn take_frame(&mut self) -> Option<Bytes> {
        if let Some(pos) = self.buf.iter().position(|&b| b == FRAME_DELIMITER) {
            return Some(self.buf.split_to(pos + 1).freeze());
        }

        if self.buf.len() >= MAX_FRAME_SIZE {
            trace!(size = self.buf.len(), "Flushing oversized frame");
            return Some(self.buf.split().freeze());
        }

        None
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> FrameSource for FrameReader<R> {
    async fn read_frame(&mut self) -> Result<Bytes> {
        loop {
            if let Some(frame) = self.take_frame() {
                trace!(size = frame.len(), "Received frame");
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_BUFFER_SIZE];
            match self.inner.read(&mut chunk).await {
                // EOF: the device disappeared; partial buffer contents are
                // dropped rather than surfaced as a short frame
                Ok(0) => return Err(BridgeError::Disconnected),
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) => {
                    error!(error = %e, "Serial read error");
                    return Err(BridgeError::ReadError(e.to_string()));
                }
            }
        }
    }
}

/// Pushes raw command bytes to the gateway
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin + Send> FrameWriter<W> {
    /// Wrap a raw byte sink in a frame writer
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> FrameSink for FrameWriter<W> {
    async fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data).await.map_err(|e| {
            error!(error = %e, "Serial write error");
            BridgeError::WriteError(e.to_string())
        })?;

        self.inner
            .flush()
            .await
            .map_err(|e| BridgeError::WriteError(format!("Flush failed: {}", e)))
    }
}
