//! Mock transport halves for exercising the bridge without hardware
//!
//! [`MockFrameSource`] replays a scripted sequence of frames and then either
//! blocks forever (the steady state of a quiet gateway) or reports a
//! disconnect. [`MockFrameSink`] records every write for inspection.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::{BridgeError, Result};
use crate::transport::{FrameSink, FrameSource};

/// Frame source replaying a scripted sequence
pub struct MockFrameSource {
    frames: VecDeque<Bytes>,
    disconnect_when_drained: bool,
}

impl MockFrameSource {
    /// Create a source that yields the given frames, then blocks forever
    pub fn with_frames(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames: frames.into_iter().map(Bytes::from).collect(),
            disconnect_when_drained: false,
        }
    }

    /// Report a device disconnect once the scripted frames run out
    pub fn disconnect_when_drained(mut self) -> Self {
        self.disconnect_when_drained = true;
        self
    }
}

#[async_trait]
impl FrameSource for MockFrameSource {
    async fn read_frame(&mut self) -> Result<Bytes> {
        if let Some(frame) = self.frames.pop_front() {
            return Ok(frame);
        }

        if self.disconnect_when_drained {
            return Err(BridgeError::Disconnected);
        }

        // quiet link: block like a real read with no timeout
        std::future::pending().await
    }
}

/// Frame sink recording every write
pub struct MockFrameSink {
    written: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockFrameSink {
    /// Create an empty recording sink
    pub fn new() -> Self {
        Self {
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle to the recorded writes
    pub fn written(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        self.written.clone()
    }
}

impl Default for MockFrameSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameSink for MockFrameSink {
    async fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.written.lock().expect("sink lock poisoned").push(data.to_vec());
        Ok(())
    }
}
