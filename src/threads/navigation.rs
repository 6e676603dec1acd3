//! Navigation executor (the mission state machine)
//!
//! # Mission flow
//!
//! 1. Block until a new arena or a stop is signalled
//! 2. Pathfinding: POST the arena, decode the route
//! 3. Navigating: execute the route strictly in order
//!    - motion step: send frame with a fresh id, wait for `!id/DONE`
//!    - snapshot step: launch a capture thread, wait for capture completion
//! 4. Back to Idle, whatever the outcome
//!
//! Every wait is bounded by a timeout and interrupted by stop/shutdown. A
//! timeout aborts the rest of the mission exactly like a stop does.

use crate::config::MissionConfig;
use crate::error::Result;
use crate::link::{AndroidLink, MotorLink};
use crate::mission::{
    AckOutcome, Command, MissionContext, MissionRequest, MotorAction, Route, Work,
};
use crate::protocol::android::status;
use crate::protocol::route;
use crate::services::PathPlanner;
use std::sync::Arc;
use std::time::Duration;

use super::CaptureTask;

/// Why a route stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Abort {
    Stopped,
    MotionTimeout(u32),
    MotionFailed(u32),
    CaptureTimeout(i32),
    CaptureFailed(i32),
}

pub struct NavigationExecutor {
    context: Arc<MissionContext>,
    link: AndroidLink,
    motor: MotorLink,
    planner: Arc<dyn PathPlanner>,
    capture: CaptureTask,
    ack_timeout: Duration,
    capture_timeout: Duration,
}

impl NavigationExecutor {
    pub fn new(
        context: Arc<MissionContext>,
        link: AndroidLink,
        motor: MotorLink,
        planner: Arc<dyn PathPlanner>,
        capture: CaptureTask,
        config: &MissionConfig,
    ) -> Self {
        Self {
            context,
            link,
            motor,
            planner,
            capture,
            ack_timeout: config.ack_timeout(),
            capture_timeout: config.capture_timeout(),
        }
    }

    pub fn run(&mut self) {
        log::info!("Navigation executor started");

        while let Some(work) = self.context.wait_for_work() {
            match work {
                Work::Stopped => log::info!("Stop consumed before pathfinding"),
                Work::Mission(request) => self.run_mission(request),
            }
        }

        log::info!("Navigation executor exiting");
    }

    fn run_mission(&self, request: MissionRequest) {
        log::info!(
            "Pathfinding for {} obstacles from ({}, {})",
            request.obstacles.len(),
            request.start.x,
            request.start.y
        );

        let route = match self.plan(&request) {
            Ok(route) => route,
            Err(e) => {
                log::error!("Pathfinding failed: {}", e);
                if self.context.take_stop() {
                    log::info!("Stop arrived during pathfinding, failure not reported");
                    return;
                }
                self.context.finish_mission();
                self.link.notify(status::PATHFINDING_FAILED);
                return;
            }
        };

        let commands = route.commands.clone();
        log::info!(
            "Route has {} commands, {} snapshot poses",
            commands.len(),
            route.snap_positions.len()
        );
        if !self.context.begin_navigation(route) {
            log::info!("Stop arrived during pathfinding, route discarded");
            return;
        }
        self.link.notify(status::ROUTE_CALCULATED);

        let result = self.execute(&commands);
        self.context.finish_mission();

        match result {
            Ok(()) => {
                log::info!("Navigation complete");
                self.link.notify(status::NAVIGATION_COMPLETE);
            }
            Err(Abort::Stopped) => log::info!("Mission aborted by stop"),
            Err(Abort::MotionTimeout(id)) => {
                log::warn!(
                    "Timed out after {:?} waiting for ACK of command {}, mission aborted",
                    self.ack_timeout,
                    id
                );
                self.link.notify(status::COMMAND_TIMEOUT);
            }
            Err(Abort::CaptureTimeout(obstacle)) => {
                log::warn!(
                    "Timed out after {:?} waiting for capture of obstacle {}, mission aborted",
                    self.capture_timeout,
                    obstacle
                );
                self.link.notify(status::COMMAND_TIMEOUT);
            }
            Err(Abort::MotionFailed(id)) => {
                log::error!("Command {} could not be sent, mission aborted", id);
                self.link.notify(&status::command_failed(id));
            }
            Err(Abort::CaptureFailed(obstacle)) => {
                log::error!("Capture of obstacle {} failed, mission aborted", obstacle);
                self.link.notify(status::CAPTURE_FAILED);
            }
        }
    }

    fn plan(&self, request: &MissionRequest) -> Result<Route> {
        let body = route::encode_request(request)?;
        let response = self.planner.request_route(&body)?;
        route::decode_response(&response)
    }

    /// Execute the route in order; every step must complete before the next
    fn execute(&self, commands: &[Command]) -> std::result::Result<(), Abort> {
        for (index, command) in commands.iter().enumerate() {
            if self.context.take_stop() || self.context.should_shutdown() {
                log::info!(
                    "Abandoning {} remaining commands",
                    commands.len() - index
                );
                return Err(Abort::Stopped);
            }

            match *command {
                Command::MoveForward(value) => self.maneuver(MotorAction::Forward, value)?,
                Command::MoveBackward(value) => self.maneuver(MotorAction::Backward, value)?,
                Command::TurnLeft(value) => self.maneuver(MotorAction::TurnLeft, value)?,
                Command::TurnRight(value) => self.maneuver(MotorAction::TurnRight, value)?,
                Command::Snapshot(obstacle) => self.snapshot(obstacle)?,
            }
        }
        Ok(())
    }

    fn maneuver(&self, action: MotorAction, value: u32) -> std::result::Result<(), Abort> {
        let id = self.context.next_command_id();
        if let Err(e) = self.motor.send(id, action, value) {
            log::error!("Failed to send command {}: {}", id, e);
            return Err(Abort::MotionFailed(id));
        }
        log::info!("Command {} sent: {} {}", id, action.wire_name(), value);

        let outcome = self
            .context
            .motion_ack()
            .wait_for_id(id, self.ack_timeout, || self.context.is_interrupted());
        match outcome {
            AckOutcome::Acked => {
                log::debug!("Command {} acknowledged", id);
                Ok(())
            }
            AckOutcome::TimedOut => Err(Abort::MotionTimeout(id)),
            AckOutcome::Failed => Err(Abort::MotionFailed(id)),
            AckOutcome::Stopped => Err(Abort::Stopped),
        }
    }

    fn snapshot(&self, obstacle: i32) -> std::result::Result<(), Abort> {
        let pose = self.context.next_snapshot_pose();
        if pose.is_none() {
            log::warn!(
                "No recorded pose left for snapshot of obstacle {}, reporting unknown pose",
                obstacle
            );
        }

        self.context.capture_ack().reset();
        if let Err(e) = self.capture.dispatch(obstacle, pose) {
            log::error!("Skipping snapshot of obstacle {}: {}", obstacle, e);
            return Ok(());
        }

        let outcome = self.context.capture_ack().wait_for_capture(
            obstacle,
            self.capture_timeout,
            || self.context.is_interrupted(),
        );
        match outcome {
            AckOutcome::Acked => Ok(()),
            AckOutcome::TimedOut => Err(Abort::CaptureTimeout(obstacle)),
            AckOutcome::Failed => Err(Abort::CaptureFailed(obstacle)),
            AckOutcome::Stopped => Err(Abort::Stopped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AndroidConfig, MotorConfig};
    use crate::error::Error;
    use crate::mission::{Direction, MissionPhase, Obstacle, Pose};
    use crate::services::{Camera, VisionClassifier};
    use crate::transport::{MockTransport, shared};
    use std::thread;
    use std::time::Instant;

    struct FixedPlanner(std::result::Result<&'static str, u16>);

    impl PathPlanner for FixedPlanner {
        fn request_route(&self, _body: &str) -> Result<String> {
            match self.0 {
                Ok(body) => Ok(body.to_string()),
                Err(status) => Err(Error::HttpStatus {
                    status,
                    body: String::new(),
                }),
            }
        }
    }

    struct NullCamera;

    impl Camera for NullCamera {
        fn capture(&self) -> Result<Vec<u8>> {
            Ok(vec![0xFF, 0xD8])
        }
    }

    struct BrokenCamera;

    impl Camera for BrokenCamera {
        fn capture(&self) -> Result<Vec<u8>> {
            Err(Error::Camera("sensor not detected".to_string()))
        }
    }

    /// Succeeds, but only after `0`
    struct SlowCamera(Duration);

    impl Camera for SlowCamera {
        fn capture(&self) -> Result<Vec<u8>> {
            thread::sleep(self.0);
            Ok(vec![0xFF, 0xD8])
        }
    }

    struct NullVision;

    impl VisionClassifier for NullVision {
        fn classify(&self, _image: Vec<u8>, _obstacle_id: i32) -> Result<String> {
            Ok(r#"{"count":0}"#.to_string())
        }
    }

    struct Fixture {
        executor: NavigationExecutor,
        context: Arc<MissionContext>,
        android: MockTransport,
        motor: MockTransport,
    }

    fn fixture(planner: FixedPlanner, ack_timeout_ms: u64) -> Fixture {
        fixture_with_camera(planner, Arc::new(NullCamera), ack_timeout_ms, 1000)
    }

    fn fixture_with_camera(
        planner: FixedPlanner,
        camera: Arc<dyn Camera>,
        ack_timeout_ms: u64,
        capture_timeout_ms: u64,
    ) -> Fixture {
        let android = MockTransport::new();
        let motor = MockTransport::new();
        let context = Arc::new(MissionContext::new());
        let link = AndroidLink::new(shared(android.clone()), &AndroidConfig::default());
        let capture = CaptureTask::new(
            Arc::clone(&context),
            link.clone(),
            camera,
            Arc::new(NullVision),
        );
        let config = MissionConfig {
            ack_timeout_ms,
            capture_timeout_ms,
        };
        let executor = NavigationExecutor::new(
            Arc::clone(&context),
            link,
            MotorLink::new(shared(motor.clone()), &MotorConfig::default()),
            Arc::new(planner),
            capture,
            &config,
        );
        Fixture {
            executor,
            context,
            android,
            motor,
        }
    }

    fn request() -> MissionRequest {
        MissionRequest {
            obstacles: vec![Obstacle {
                id: 1,
                x: 1,
                y: 2,
                facing: Direction::North,
            }],
            start: Pose::default(),
        }
    }

    /// Acknowledge every motion frame as soon as it is written
    fn auto_ack(f: &Fixture) -> thread::JoinHandle<()> {
        let motor = f.motor.clone();
        let context = Arc::clone(&f.context);
        thread::spawn(move || {
            let mut acked = 0;
            while !context.should_shutdown() {
                let frames = motor.written_text().matches(';').count() as u32;
                while acked < frames {
                    acked += 1;
                    context.record_motion_ack(acked);
                }
                thread::sleep(Duration::from_millis(2));
            }
        })
    }

    #[test]
    fn test_pathfinding_failure_returns_to_idle() {
        let f = fixture(FixedPlanner(Err(503)), 1000);
        f.context.submit_mission(request()).unwrap();
        let Some(Work::Mission(req)) = f.context.wait_for_work() else {
            panic!("expected mission");
        };
        f.executor.run_mission(req);

        assert_eq!(f.context.phase(), MissionPhase::Idle);
        assert!(f.android.written_text().contains(status::PATHFINDING_FAILED));
        assert!(f.motor.get_written().is_empty());
    }

    #[test]
    fn test_stop_during_failed_pathfinding_is_silent() {
        let f = fixture(FixedPlanner(Err(500)), 1000);
        f.context.submit_mission(request()).unwrap();
        let Some(Work::Mission(req)) = f.context.wait_for_work() else {
            panic!("expected mission");
        };
        assert!(f.context.request_stop());
        f.executor.run_mission(req);

        assert_eq!(f.context.phase(), MissionPhase::Idle);
        assert!(!f.context.is_stop_requested());
        assert!(!f.android.written_text().contains(status::PATHFINDING_FAILED));
        assert!(f.motor.get_written().is_empty());
    }

    #[test]
    fn test_undecodable_route_returns_to_idle() {
        let f = fixture(FixedPlanner(Ok(r#"{"data":{"commands":[]}}"#)), 1000);
        f.executor.run_mission(request());
        assert_eq!(f.context.phase(), MissionPhase::Idle);
        assert!(f.android.written_text().contains(status::PATHFINDING_FAILED));
    }

    #[test]
    fn test_route_executes_in_order() {
        let f = fixture(
            FixedPlanner(Ok(r#"{"data":{"commands":["FW10","BW20","FL90","FR90"]}}"#)),
            5000,
        );
        let acker = auto_ack(&f);
        f.executor.run_mission(request());

        assert_eq!(
            f.motor.written_text(),
            ":1/MOTOR/FWD/70/10;:2/MOTOR/BWD/70/20;:3/MOTOR/TURNL/60/90;:4/MOTOR/TURNR/60/90;"
        );
        assert!(f.android.written_text().ends_with(
            "{\"cat\":\"status\",\"status\":\"Navigation complete.\"}\n"
        ));
        assert_eq!(f.context.phase(), MissionPhase::Idle);

        f.context.signal_shutdown();
        acker.join().unwrap();
    }

    #[test]
    fn test_missing_ack_times_out() {
        let f = fixture(FixedPlanner(Ok(r#"{"data":{"commands":["FW10","FW20"]}}"#)), 50);
        let start = Instant::now();
        f.executor.run_mission(request());

        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(f.motor.written_text(), ":1/MOTOR/FWD/70/10;");
        assert!(f.android.written_text().contains(status::COMMAND_TIMEOUT));
        assert!(!f.android.written_text().contains(status::NAVIGATION_COMPLETE));
        assert_eq!(f.context.phase(), MissionPhase::Idle);
    }

    #[test]
    fn test_snapshot_without_pose_continues() {
        let f = fixture(FixedPlanner(Ok(r#"{"data":{"commands":["SP1","FW10"]}}"#)), 5000);
        let acker = auto_ack(&f);
        f.executor.run_mission(request());

        assert_eq!(f.motor.written_text(), ":1/MOTOR/FWD/70/10;");
        assert!(f.android.written_text().contains(status::NAVIGATION_COMPLETE));

        f.context.signal_shutdown();
        acker.join().unwrap();
    }

    #[test]
    fn test_failed_capture_aborts_route() {
        let f = fixture_with_camera(
            FixedPlanner(Ok(r#"{"data":{"commands":["SP1","FW10"]}}"#)),
            Arc::new(BrokenCamera),
            5000,
            5000,
        );
        f.executor.run_mission(request());

        assert!(f.motor.get_written().is_empty());
        assert!(f.android.written_text().contains(status::CAPTURE_FAILED));
        assert!(!f.android.written_text().contains(status::NAVIGATION_COMPLETE));
        assert_eq!(f.context.phase(), MissionPhase::Idle);
    }

    #[test]
    fn test_slow_capture_times_out() {
        let f = fixture_with_camera(
            FixedPlanner(Ok(r#"{"data":{"commands":["FW10","SP1","FW20"]}}"#)),
            Arc::new(SlowCamera(Duration::from_millis(500))),
            5000,
            50,
        );
        let acker = auto_ack(&f);
        let start = Instant::now();
        f.executor.run_mission(request());

        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(start.elapsed() < Duration::from_millis(500));
        assert_eq!(f.motor.written_text(), ":1/MOTOR/FWD/70/10;");
        assert!(f.android.written_text().contains(status::COMMAND_TIMEOUT));
        assert!(!f.android.written_text().contains(status::NAVIGATION_COMPLETE));
        assert_eq!(f.context.phase(), MissionPhase::Idle);

        f.context.signal_shutdown();
        acker.join().unwrap();
    }
}
