//! Motion-controller listener
//!
//! A pure demultiplexer: ACK frames go into the motion AckRecord, anything
//! else (debug chatter, partial garbage) is logged and dropped.

use crate::mission::MissionContext;
use crate::protocol::motor::{FRAME_DELIMITERS, decode_ack};
use crate::transport::{FrameReader, SharedTransport};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Pause between empty polls; lets writers take the port lock
const IDLE_POLL: Duration = Duration::from_millis(2);

/// Pause after a transport error before retrying the read
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub struct MotorListener {
    transport: SharedTransport,
    context: Arc<MissionContext>,
    reader: FrameReader,
}

impl MotorListener {
    pub fn new(transport: SharedTransport, context: Arc<MissionContext>) -> Self {
        Self {
            transport,
            context,
            reader: FrameReader::new(FRAME_DELIMITERS),
        }
    }

    pub fn run(&mut self) {
        log::info!("Motor listener started");

        while !self.context.should_shutdown() {
            let frame = {
                let mut port = self.transport.lock();
                self.reader.read_frame(&mut **port)
            };

            match frame {
                Ok(Some(frame)) => self.handle_frame(&frame),
                Ok(None) => thread::sleep(IDLE_POLL),
                Err(e) => {
                    log::error!("Motor link read error: {}", e);
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }

        log::info!("Motor listener exiting");
    }

    fn handle_frame(&self, frame: &str) {
        match decode_ack(frame) {
            Ok(id) => {
                log::debug!("ACK received for command {}", id);
                self.context.record_motion_ack(id);
            }
            Err(_) => log::warn!("Ignoring motion-controller frame {:?}", frame),
        }
    }
}
