//! Transport layer for I/O abstraction
//!
//! Both peers (tablet and motion controller) speak delimiter-terminated text
//! frames over a byte stream. [`FrameReader`] turns raw reads into frames;
//! [`Transport`] hides whether the bytes come from a UART or a test double.

use crate::error::Result;
use parking_lot::Mutex;
use std::sync::Arc;

mod mock;
mod serial;
pub use mock::MockTransport;
pub use serial::SerialTransport;

/// Transport shared between a listener thread and its writers
pub type SharedTransport = Arc<Mutex<Box<dyn Transport>>>;

/// Upper bound on buffered bytes without a delimiter before the buffer is discarded
const MAX_FRAME_BUFFER: usize = 4096;

/// Transport trait for device communication
pub trait Transport: Send {
    /// Read data into buffer, returns number of bytes read (0 on timeout)
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write data from buffer, returns number of bytes written
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Flush any pending writes (blocking until complete)
    fn flush(&mut self) -> Result<()>;

    /// Write the whole buffer, retrying short writes
    fn write_all(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let n = self.write(data)?;
            if n == 0 {
                return Err(crate::Error::Io(std::io::ErrorKind::WriteZero.into()));
            }
            data = &data[n..];
        }
        self.flush()
    }
}

/// Wrap a transport for sharing between threads
pub fn shared<T: Transport + 'static>(transport: T) -> SharedTransport {
    Arc::new(Mutex::new(Box::new(transport)))
}

/// Accumulates bytes and yields delimiter-terminated text frames
///
/// Any byte in the delimiter set ends a frame. Frames are returned without
/// their delimiter and with surrounding whitespace trimmed; empty frames
/// are skipped. Invalid UTF-8 is replaced rather than rejected so one
/// corrupt byte cannot wedge the stream.
pub struct FrameReader {
    buffer: Vec<u8>,
    delimiters: &'static [u8],
}

impl FrameReader {
    pub fn new(delimiters: &'static [u8]) -> Self {
        Self {
            buffer: Vec::with_capacity(256),
            delimiters,
        }
    }

    /// Newline-terminated frames (tablet link)
    pub fn lines() -> Self {
        Self::new(b"\n")
    }

    fn is_delimiter(&self, byte: u8) -> bool {
        self.delimiters.contains(&byte)
    }

    /// Read available bytes and return the next complete frame, if any
    pub fn read_frame(&mut self, transport: &mut dyn Transport) -> Result<Option<String>> {
        if let Some(frame) = self.pop_frame() {
            return Ok(Some(frame));
        }

        let mut temp_buf = [0u8; 256];
        let n = transport.read(&mut temp_buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.push(&temp_buf[..n]);
        Ok(self.pop_frame())
    }

    /// Append raw bytes
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
        if self.buffer.len() > MAX_FRAME_BUFFER && !self.buffer.iter().any(|&b| self.is_delimiter(b))
        {
            log::warn!(
                "Discarding {} bytes without frame delimiter",
                self.buffer.len()
            );
            self.buffer.clear();
        }
    }

    /// Split off the next complete, non-empty frame
    pub fn pop_frame(&mut self) -> Option<String> {
        while let Some(pos) = self.buffer.iter().position(|&b| self.is_delimiter(b)) {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let frame = text.trim();
            if !frame.is_empty() {
                return Some(frame.to_string());
            }
        }
        None
    }
}
