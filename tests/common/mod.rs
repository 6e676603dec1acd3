//! Shared test rig: the full thread set wired to mock serial links and
//! in-process fakes for the planner, vision service, camera and the motion
//! controller itself.

#![allow(dead_code)]

use parking_lot::Mutex;
use setu::config::Config;
use setu::services::{Camera, PathPlanner, VisionClassifier};
use setu::transport::{MockTransport, shared};
use setu::{MissionContext, Result, Services, ThreadHandles, spawn_threads};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// ============================================================================
// Event log
// ============================================================================

/// Ordered record of what the fakes observed, across threads
#[derive(Clone, Default)]
pub struct Events(Arc<Mutex<Vec<String>>>);

impl Events {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

// ============================================================================
// Fakes
// ============================================================================

pub struct FakePlanner {
    response: String,
    delay: Duration,
    pub requests: Mutex<Vec<String>>,
}

impl PathPlanner for FakePlanner {
    fn request_route(&self, body: &str) -> Result<String> {
        self.requests.lock().push(body.to_string());
        thread::sleep(self.delay);
        Ok(self.response.clone())
    }
}

pub struct FakeVision {
    response: String,
    events: Events,
    pub uploads: Mutex<Vec<(Vec<u8>, i32)>>,
}

impl VisionClassifier for FakeVision {
    fn classify(&self, image: Vec<u8>, obstacle_id: i32) -> Result<String> {
        self.events.push(format!("upload {}", obstacle_id));
        self.uploads.lock().push((image, obstacle_id));
        Ok(self.response.clone())
    }
}

pub struct FakeCamera {
    events: Events,
}

pub const FAKE_IMAGE: &[u8] = b"\xFF\xD8fake-jpeg\xFF\xD9";

impl Camera for FakeCamera {
    fn capture(&self) -> Result<Vec<u8>> {
        self.events.push("capture");
        Ok(FAKE_IMAGE.to_vec())
    }
}

/// Plays the motion controller: ACKs the first `ack_limit` frames it sees
fn spawn_fake_controller(
    motor: MockTransport,
    context: Arc<MissionContext>,
    events: Events,
    ack_limit: usize,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut seen = 0;
        while !context.should_shutdown() {
            let frames = split_frames(&motor.written_text(), ';');
            for frame in frames.iter().skip(seen) {
                events.push(format!("frame {}", frame));
                if seen < ack_limit {
                    let id = frame_id(frame);
                    thread::sleep(Duration::from_millis(5));
                    events.push(format!("ack {}", id));
                    motor.inject_read(format!("!{}/DONE;\n", id).as_bytes());
                }
                seen += 1;
            }
            thread::sleep(Duration::from_millis(2));
        }
    })
}

// ============================================================================
// Rig
// ============================================================================

pub struct RigOptions {
    pub route: String,
    pub vision: String,
    pub planner_delay: Duration,
    pub ack_timeout_ms: u64,
    pub ack_limit: usize,
}

impl Default for RigOptions {
    fn default() -> Self {
        Self {
            route: r#"{"data":{"commands":["FW100","TR90","SP1"],"snap_positions":[{"x":1,"y":2,"d":0}]}}"#
                .to_string(),
            vision: r#"{"count":1,"objects":[{"class_label":"Up Arrow","img_id":-1}]}"#
                .to_string(),
            planner_delay: Duration::ZERO,
            ack_timeout_ms: 5_000,
            ack_limit: usize::MAX,
        }
    }
}

pub struct Rig {
    pub context: Arc<MissionContext>,
    pub android: MockTransport,
    pub motor: MockTransport,
    pub planner: Arc<FakePlanner>,
    pub vision: Arc<FakeVision>,
    pub events: Events,
    handles: Option<ThreadHandles>,
    controller: Option<JoinHandle<()>>,
}

impl Rig {
    pub fn start(options: RigOptions) -> Self {
        let mut config = Config::default();
        config.mission.ack_timeout_ms = options.ack_timeout_ms;
        config.mission.capture_timeout_ms = 5_000;
        config.android.push_retry_delay_ms = 1;

        let events = Events::default();
        let android = MockTransport::new();
        let motor = MockTransport::new();
        let context = Arc::new(MissionContext::new());

        let planner = Arc::new(FakePlanner {
            response: options.route,
            delay: options.planner_delay,
            requests: Mutex::new(Vec::new()),
        });
        let vision = Arc::new(FakeVision {
            response: options.vision,
            events: events.clone(),
            uploads: Mutex::new(Vec::new()),
        });
        let services = Services {
            planner: planner.clone(),
            vision: vision.clone(),
            camera: Arc::new(FakeCamera {
                events: events.clone(),
            }),
        };

        let handles = spawn_threads(
            &config,
            Arc::clone(&context),
            shared(android.clone()),
            shared(motor.clone()),
            services,
        )
        .expect("spawn threads");

        let controller = spawn_fake_controller(
            motor.clone(),
            Arc::clone(&context),
            events.clone(),
            options.ack_limit,
        );

        Self {
            context,
            android,
            motor,
            planner,
            vision,
            events,
            handles: Some(handles),
            controller: Some(controller),
        }
    }

    /// Deliver one line from the tablet
    pub fn send(&self, line: &str) {
        self.android.inject_read(line.as_bytes());
        self.android.inject_read(b"\n");
    }

    /// Everything written to the tablet, one entry per line
    pub fn android_lines(&self) -> Vec<String> {
        split_frames(&self.android.written_text(), '\n')
    }

    /// Motion frames written to the controller
    pub fn motor_frames(&self) -> Vec<String> {
        split_frames(&self.motor.written_text(), ';')
    }

    pub fn saw_android(&self, needle: &str) -> bool {
        self.android_lines().iter().any(|l| l.contains(needle))
    }

    pub fn wait_for_android(&self, needle: &str, timeout: Duration) -> bool {
        wait_until(timeout, || self.saw_android(needle))
    }
}

impl Drop for Rig {
    fn drop(&mut self) {
        self.context.signal_shutdown();
        if let Some(handles) = self.handles.take() {
            handles.join();
        }
        if let Some(controller) = self.controller.take() {
            let _ = controller.join();
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub const SCENARIO_A_ARENA: &str = r#"{"cat":"sendArena","value":{"obstacles":[{"id":1,"x":2,"y":3,"d":0}],"robot_x":1,"robot_y":1,"robot_dir":1}}"#;

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

pub fn split_frames(text: &str, delimiter: char) -> Vec<String> {
    text.split(delimiter)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// Command id of a `:<id>/MOTOR/...` frame
pub fn frame_id(frame: &str) -> u32 {
    frame
        .trim_start_matches(':')
        .split('/')
        .next()
        .and_then(|id| id.parse().ok())
        .unwrap_or(0)
}
