//! Thread architecture for Setu
//!
//! Three long-lived threads share one [`MissionContext`]:
//! - Android listener: tablet requests, replies, direct motion commands
//! - Motor listener: demultiplexes motion-controller ACKs
//! - Navigation executor: the mission state machine
//!
//! Each snapshot additionally runs a short-lived capture thread, and each
//! direct motion command a short-lived ACK waiter. There is no call path
//! between loops; they only meet in the context.

mod android;
mod capture;
mod motor;
mod navigation;

pub use android::AndroidListener;
pub use capture::CaptureTask;
pub use motor::MotorListener;
pub use navigation::NavigationExecutor;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::link::{AndroidLink, MotorLink};
use crate::mission::MissionContext;
use crate::services::{Camera, PathPlanner, VisionClassifier};
use crate::transport::SharedTransport;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Remote collaborators used by the executor and capture tasks
#[derive(Clone)]
pub struct Services {
    pub planner: Arc<dyn PathPlanner>,
    pub vision: Arc<dyn VisionClassifier>,
    pub camera: Arc<dyn Camera>,
}

/// Thread handles for the long-lived loops
pub struct ThreadHandles {
    pub android: JoinHandle<()>,
    pub motor: JoinHandle<()>,
    pub navigation: JoinHandle<()>,
}

impl ThreadHandles {
    /// Wait for all loops to exit (after `signal_shutdown`)
    pub fn join(self) {
        for (name, handle) in [
            ("android-listener", self.android),
            ("motor-listener", self.motor),
            ("navigation", self.navigation),
        ] {
            if handle.join().is_err() {
                log::error!("{} thread panicked", name);
            }
        }
    }
}

/// Spawn the listener and executor threads
pub fn spawn_threads(
    config: &Config,
    context: Arc<MissionContext>,
    android_transport: SharedTransport,
    motor_transport: SharedTransport,
    services: Services,
) -> Result<ThreadHandles> {
    let android_link = AndroidLink::new(Arc::clone(&android_transport), &config.android);
    let motor_link = MotorLink::new(Arc::clone(&motor_transport), &config.motor);

    let capture = CaptureTask::new(
        Arc::clone(&context),
        android_link.clone(),
        services.camera,
        services.vision,
    );

    let mut android_listener = AndroidListener::new(
        android_transport,
        android_link.clone(),
        motor_link.clone(),
        Arc::clone(&context),
        config.mission.ack_timeout(),
    );
    let android = thread::Builder::new()
        .name("android-listener".into())
        .spawn(move || android_listener.run())
        .map_err(|e| Error::Other(format!("Failed to spawn android listener: {}", e)))?;

    let mut motor_listener = MotorListener::new(motor_transport, Arc::clone(&context));
    let motor = thread::Builder::new()
        .name("motor-listener".into())
        .spawn(move || motor_listener.run())
        .map_err(|e| Error::Other(format!("Failed to spawn motor listener: {}", e)))?;

    let mut executor = NavigationExecutor::new(
        context,
        android_link,
        motor_link,
        services.planner,
        capture,
        &config.mission,
    );
    let navigation = thread::Builder::new()
        .name("navigation".into())
        .spawn(move || executor.run())
        .map_err(|e| Error::Other(format!("Failed to spawn navigation executor: {}", e)))?;

    Ok(ThreadHandles {
        android,
        motor,
        navigation,
    })
}
