//! Android listener
//!
//! Reads one newline-framed request at a time and answers every one of
//! them. Mission requests are recorded in the context for the executor;
//! direct motion commands bypass the mission pipeline entirely.
//!
//! A direct command's ACK wait runs on its own short-lived thread so this
//! loop keeps reading (a Stop must always get through). Direct commands
//! draw ids from the same counter as the mission, but share the motion
//! AckRecord with it: if both are in flight, one ACK can overwrite the
//! other's before its waiter wakes.

use crate::error::Error;
use crate::link::{AndroidLink, MotorLink};
use crate::mission::{AckOutcome, MissionContext, MissionRequest};
use crate::protocol::android::{self, AndroidMessage, DirectMotion, status};
use crate::transport::{FrameReader, SharedTransport};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const IDLE_POLL: Duration = Duration::from_millis(2);
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub struct AndroidListener {
    transport: SharedTransport,
    link: AndroidLink,
    motor: MotorLink,
    context: Arc<MissionContext>,
    ack_timeout: Duration,
    reader: FrameReader,
}

impl AndroidListener {
    pub fn new(
        transport: SharedTransport,
        link: AndroidLink,
        motor: MotorLink,
        context: Arc<MissionContext>,
        ack_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            link,
            motor,
            context,
            ack_timeout,
            reader: FrameReader::lines(),
        }
    }

    pub fn run(&mut self) {
        log::info!("Android listener started");

        while !self.context.should_shutdown() {
            let line = {
                let mut port = self.transport.lock();
                self.reader.read_frame(&mut **port)
            };

            match line {
                Ok(Some(line)) => self.handle_line(&line),
                Ok(None) => thread::sleep(IDLE_POLL),
                Err(e) => {
                    log::error!("Android link read error: {}", e);
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }

        log::info!("Android listener exiting");
    }

    fn handle_line(&self, line: &str) {
        log::debug!("Android <- {}", line);

        match android::decode(line) {
            Ok(AndroidMessage::StartMission(request)) => self.start_mission(request),
            Ok(AndroidMessage::Stop) => self.stop(),
            Ok(AndroidMessage::DirectMotion(command)) => self.direct_motion(command),
            Err(e) => {
                log::warn!("Dropping Android message ({}): {}", e, line);
                match android::category(line).as_deref() {
                    Some(android::CAT_ARENA) => {
                        self.link.reply(android::CAT_ARENA, status::INVALID_MAP)
                    }
                    Some(android::CAT_MOTION) => {
                        self.link.reply(android::CAT_MOTION, status::INVALID_COMMAND)
                    }
                    _ => {}
                }
            }
        }
    }

    fn start_mission(&self, request: MissionRequest) {
        let count = request.obstacles.len();
        match self.context.submit_mission(request) {
            Ok(()) => {
                log::info!("Mission accepted with {} obstacles", count);
                self.link.reply(android::CAT_ARENA, status::MAP_RECEIVED);
            }
            Err(Error::Busy) => {
                log::warn!("Rejecting new mission: robot is busy");
                self.link.reply(android::CAT_ARENA, status::BUSY);
            }
            Err(e) => log::error!("Failed to submit mission: {}", e),
        }
    }

    fn stop(&self) {
        if self.context.request_stop() {
            log::info!("Stop requested");
        } else {
            log::info!("Stop received while idle");
        }
        self.link.reply(android::CAT_STOP, status::STOP_RECEIVED);
    }

    fn direct_motion(&self, command: DirectMotion) {
        let id = self.context.next_command_id();
        log::info!(
            "Direct command {}: {} {} at {}%",
            id,
            command.action.wire_name(),
            command.value,
            command.speed
        );

        if let Err(e) = self
            .motor
            .send_with_speed(id, command.action, command.speed, command.value)
        {
            log::error!("Failed to send direct command {}: {}", id, e);
            self.link
                .reply(android::CAT_MOTION, &status::command_failed(id));
            return;
        }

        let context = Arc::clone(&self.context);
        let link = self.link.clone();
        let timeout = self.ack_timeout;
        let spawned = thread::Builder::new()
            .name(format!("direct-cmd-{}", id))
            .spawn(move || {
                let outcome = context
                    .motion_ack()
                    .wait_for_id(id, timeout, || context.should_shutdown());
                report_direct_outcome(&link, id, outcome);
            });

        if let Err(e) = spawned {
            log::error!("Failed to spawn ACK waiter for direct command {}: {}", id, e);
        }
    }
}

fn report_direct_outcome(link: &AndroidLink, id: u32, outcome: AckOutcome) {
    match outcome {
        AckOutcome::Acked => {
            log::info!("Direct command {} done", id);
            link.reply(android::CAT_MOTION, &status::command_done(id));
        }
        AckOutcome::TimedOut => {
            log::warn!("Direct command {} timed out", id);
            link.reply(android::CAT_MOTION, status::COMMAND_TIMEOUT);
        }
        AckOutcome::Failed => {
            link.reply(android::CAT_MOTION, &status::command_failed(id));
        }
        AckOutcome::Stopped => log::debug!("Direct command {} abandoned at shutdown", id),
    }
}
