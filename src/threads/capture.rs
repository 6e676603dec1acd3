//! Image capture task
//!
//! One short-lived thread per snapshot:
//!
//! 1. capture a still
//! 2. record completion (success or failure) in the capture AckRecord, which
//!    releases the executor
//! 3. report the snapshot pose to the tablet
//! 4. upload to the vision service and report the recognised target
//!
//! Steps 3 and 4 overlap with the next route steps. Nothing after step 2
//! can affect mission state.

use crate::error::{Error, Result};
use crate::link::AndroidLink;
use crate::mission::{Completion, MissionContext, Pose};
use crate::protocol::vision;
use crate::services::{Camera, VisionClassifier};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Everything a capture thread needs; cloned into each one
#[derive(Clone)]
pub struct CaptureTask {
    context: Arc<MissionContext>,
    link: AndroidLink,
    camera: Arc<dyn Camera>,
    vision: Arc<dyn VisionClassifier>,
}

impl CaptureTask {
    pub fn new(
        context: Arc<MissionContext>,
        link: AndroidLink,
        camera: Arc<dyn Camera>,
        vision: Arc<dyn VisionClassifier>,
    ) -> Self {
        Self {
            context,
            link,
            camera,
            vision,
        }
    }

    /// Launch a detached capture for `obstacle_id`
    pub fn dispatch(&self, obstacle_id: i32, pose: Option<Pose>) -> Result<JoinHandle<()>> {
        let task = self.clone();
        thread::Builder::new()
            .name(format!("capture-{}", obstacle_id))
            .spawn(move || task.run(obstacle_id, pose))
            .map_err(|e| Error::Other(format!("Failed to spawn capture thread: {}", e)))
    }

    fn run(self, obstacle_id: i32, pose: Option<Pose>) {
        let image = match self.camera.capture() {
            Ok(image) => {
                log::info!("Captured image for obstacle {}", obstacle_id);
                self.context.record_capture(Completion::Done(obstacle_id));
                image
            }
            Err(e) => {
                log::error!("Capture failed for obstacle {}: {}", obstacle_id, e);
                self.context.record_capture(Completion::Failed(obstacle_id));
                return;
            }
        };

        self.link.push_robot_pose(pose);

        match self.classify(image, obstacle_id) {
            Ok(Some(target_id)) => {
                log::info!("Obstacle {} shows target {}", obstacle_id, target_id);
                self.link.push_target(obstacle_id, target_id);
            }
            Ok(None) => log::info!("No recognisable target on obstacle {}", obstacle_id),
            Err(e) => log::error!("Vision request for obstacle {} failed: {}", obstacle_id, e),
        }
    }

    fn classify(&self, image: Vec<u8>, obstacle_id: i32) -> Result<Option<i32>> {
        let body = self.vision.classify(image, obstacle_id)?;
        let detections = vision::decode_response(&body)?;
        log::debug!(
            "Vision returned {} detections for obstacle {}",
            detections.len(),
            obstacle_id
        );
        Ok(vision::select_target(&detections))
    }
}
