//! Remote collaborators
//!
//! The executor and capture tasks only see these traits. Production uses
//! HTTP ([`http`]) and a shell camera ([`camera`]); tests plug in fakes.
//! Payload encoding and decoding stays in [`crate::protocol`].

pub mod camera;
pub mod http;

pub use camera::CommandCamera;
pub use http::{HttpPathPlanner, HttpVisionClassifier};

use crate::error::Result;

/// Pathfinding service: JSON request body in, response body out
pub trait PathPlanner: Send + Sync {
    fn request_route(&self, body: &str) -> Result<String>;
}

/// Vision service: image bytes tagged with an obstacle id in, response body out
pub trait VisionClassifier: Send + Sync {
    fn classify(&self, image: Vec<u8>, obstacle_id: i32) -> Result<String>;
}

/// Still camera
pub trait Camera: Send + Sync {
    /// Capture one frame and return the encoded image
    fn capture(&self) -> Result<Vec<u8>>;
}
