//! Outbound writers for the two serial peers
//!
//! Each link wraps the transport its listener reads from. Writes take the
//! transport lock only for the duration of one write; retry delays are
//! slept with the lock released.

use crate::config::{AndroidConfig, MotorConfig};
use crate::error::Result;
use crate::mission::{MotorAction, Pose};
use crate::protocol::{android, motor};
use crate::transport::SharedTransport;
use std::thread;
use std::time::Duration;

/// Writer side of the tablet link
#[derive(Clone)]
pub struct AndroidLink {
    transport: SharedTransport,
    push_retries: u32,
    push_retry_delay: Duration,
}

impl AndroidLink {
    pub fn new(transport: SharedTransport, config: &AndroidConfig) -> Self {
        Self {
            transport,
            push_retries: config.push_retries.max(1),
            push_retry_delay: Duration::from_millis(config.push_retry_delay_ms),
        }
    }

    /// Reply to a request of category `cat`
    pub fn reply(&self, cat: &str, status: &str) {
        let sent = android::encode_reply(cat, status).and_then(|line| self.write_line(&line));
        if let Err(e) = sent {
            log::error!("Failed to send {:?} reply to Android: {}", status, e);
        }
    }

    /// Mission progress notice not tied to a request
    pub fn notify(&self, status: &str) {
        self.reply(android::CAT_STATUS, status);
    }

    /// Report the robot pose at a snapshot (`None` = unknown)
    pub fn push_robot_pose(&self, pose: Option<Pose>) {
        match android::encode_robot_pose(pose) {
            Ok(line) => self.push(&line),
            Err(e) => log::error!("Failed to encode pose push: {}", e),
        }
    }

    /// Report the target recognised on an obstacle
    pub fn push_target(&self, obstacle_id: i32, target_id: i32) {
        match android::encode_target(obstacle_id, target_id) {
            Ok(line) => self.push(&line),
            Err(e) => log::error!("Failed to encode target push: {}", e),
        }
    }

    /// Best-effort write with bounded retry
    fn push(&self, line: &str) {
        for attempt in 1..=self.push_retries {
            match self.write_line(line) {
                Ok(()) => return,
                Err(e) => {
                    log::warn!(
                        "Android push attempt {}/{} failed: {}",
                        attempt,
                        self.push_retries,
                        e
                    );
                    if attempt < self.push_retries {
                        thread::sleep(self.push_retry_delay);
                    }
                }
            }
        }
        log::error!("Giving up on Android push {:?}", line.trim_end());
    }

    fn write_line(&self, line: &str) -> Result<()> {
        log::debug!("Android -> {}", line.trim_end());
        self.transport.lock().write_all(line.as_bytes())
    }
}

/// Writer side of the motion-controller link
#[derive(Clone)]
pub struct MotorLink {
    transport: SharedTransport,
    move_speed: u8,
    turn_speed: u8,
}

impl MotorLink {
    pub fn new(transport: SharedTransport, config: &MotorConfig) -> Self {
        Self {
            transport,
            move_speed: config.move_speed,
            turn_speed: config.turn_speed,
        }
    }

    /// Send a maneuver at the configured default speed
    pub fn send(&self, id: u32, action: MotorAction, value: u32) -> Result<()> {
        let speed = if action.is_turn() {
            self.turn_speed
        } else {
            self.move_speed
        };
        self.send_with_speed(id, action, speed, value)
    }

    pub fn send_with_speed(&self, id: u32, action: MotorAction, speed: u8, value: u32) -> Result<()> {
        let frame = motor::encode_frame(id, action, speed, value);
        log::debug!("Motor -> {}", frame);
        self.transport.lock().write_all(frame.as_bytes())
    }
}
