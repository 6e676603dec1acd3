//! Serial transport for the tablet (RFCOMM) and motion-controller (USB CDC) links

use super::Transport;
use crate::error::Result;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

/// Bounds how long a listener holds the port lock and how quickly it
/// notices shutdown
const READ_TIMEOUT: Duration = Duration::from_millis(50);

pub struct SerialTransport {
    peer: &'static str,
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open `path` at `baud_rate`, 8N1 without flow control
    ///
    /// Bytes queued before the daemon started (half-sent requests, ACKs for
    /// a previous run) are discarded.
    pub fn open(peer: &'static str, path: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()?;

        if let Err(e) = port.clear(ClearBuffer::Input) {
            log::warn!("{}: could not discard stale input: {}", peer, e);
        }

        log::info!("{} link on {} at {} baud", peer, path, baud_rate);
        Ok(Self { peer, port })
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        match self.port.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => Ok(0),
            Err(e) => {
                log::debug!("{}: read failed: {}", self.peer, e);
                Err(e.into())
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(self.port.write(data)?)
    }

    fn flush(&mut self) -> Result<()> {
        self.port.flush()?;
        Ok(())
    }
}
