//! Configuration for Setu
//!
//! Loads configuration from a TOML file. Every field carries a default so a
//! partial file (or no file at all) yields a usable development setup.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub android: AndroidConfig,
    #[serde(default)]
    pub motor: MotorConfig,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub mission: MissionConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tablet link (serial over Bluetooth RFCOMM)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AndroidConfig {
    /// Serial device path (default: /dev/rfcomm0)
    #[serde(default = "default_android_port")]
    pub port: String,

    /// Baud rate (default: 115200)
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Attempts per out-of-band push before giving up (default: 3)
    #[serde(default = "default_push_retries")]
    pub push_retries: u32,

    /// Delay between push attempts in milliseconds (default: 300)
    #[serde(default = "default_push_retry_delay")]
    pub push_retry_delay_ms: u64,
}

/// Motion controller link
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MotorConfig {
    /// Serial device path (default: /dev/ttyACM0)
    #[serde(default = "default_motor_port")]
    pub port: String,

    /// Baud rate (default: 115200)
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Speed percentage for FWD/BWD frames (default: 70)
    #[serde(default = "default_move_speed")]
    pub move_speed: u8,

    /// Speed percentage for TURNL/TURNR frames (default: 60)
    #[serde(default = "default_turn_speed")]
    pub turn_speed: u8,
}

/// Remote pathfinding and vision endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServicesConfig {
    #[serde(default = "default_pathfinding_url")]
    pub pathfinding_url: String,

    #[serde(default = "default_vision_url")]
    pub vision_url: String,

    /// Whole-request timeout for the route request (default: 20000)
    #[serde(default = "default_pathfinding_timeout")]
    pub pathfinding_timeout_ms: u64,

    /// Whole-request timeout for the image upload (default: 30000)
    #[serde(default = "default_vision_timeout")]
    pub vision_timeout_ms: u64,
}

/// Mission executor timing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MissionConfig {
    /// Wait for a motion-controller ACK before aborting (default: 30000)
    #[serde(default = "default_ack_timeout")]
    pub ack_timeout_ms: u64,

    /// Wait for capture completion before aborting (default: 20000)
    #[serde(default = "default_capture_timeout")]
    pub capture_timeout_ms: u64,
}

/// Still-camera invocation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CameraConfig {
    /// Image file written by every capture (default: capture.jpg)
    #[serde(default = "default_capture_path")]
    pub capture_path: String,

    /// Capture program (default: raspistill)
    #[serde(default = "default_camera_program")]
    pub program: String,

    /// Program arguments; `{output}` is replaced with `capture_path`
    #[serde(default = "default_camera_args")]
    pub args: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

impl MissionConfig {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }
}

impl Default for AndroidConfig {
    fn default() -> Self {
        Self {
            port: default_android_port(),
            baud_rate: default_baud_rate(),
            push_retries: default_push_retries(),
            push_retry_delay_ms: default_push_retry_delay(),
        }
    }
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            port: default_motor_port(),
            baud_rate: default_baud_rate(),
            move_speed: default_move_speed(),
            turn_speed: default_turn_speed(),
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            pathfinding_url: default_pathfinding_url(),
            vision_url: default_vision_url(),
            pathfinding_timeout_ms: default_pathfinding_timeout(),
            vision_timeout_ms: default_vision_timeout(),
        }
    }
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: default_ack_timeout(),
            capture_timeout_ms: default_capture_timeout(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            capture_path: default_capture_path(),
            program: default_camera_program(),
            args: default_camera_args(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_android_port() -> String {
    "/dev/rfcomm0".to_string()
}
fn default_motor_port() -> String {
    "/dev/ttyACM0".to_string()
}
fn default_baud_rate() -> u32 {
    115_200
}
fn default_push_retries() -> u32 {
    3
}
fn default_push_retry_delay() -> u64 {
    300
}
fn default_move_speed() -> u8 {
    70
}
fn default_turn_speed() -> u8 {
    60
}
fn default_pathfinding_url() -> String {
    "http://127.0.0.1:4000/path".to_string()
}
fn default_vision_url() -> String {
    "http://127.0.0.1:5000/detect".to_string()
}
fn default_pathfinding_timeout() -> u64 {
    20_000
}
fn default_vision_timeout() -> u64 {
    30_000
}
fn default_ack_timeout() -> u64 {
    30_000
}
fn default_capture_timeout() -> u64 {
    20_000
}
fn default_capture_path() -> String {
    "capture.jpg".to_string()
}
fn default_camera_program() -> String {
    "raspistill".to_string()
}
fn default_camera_args() -> Vec<String> {
    ["-n", "-t", "200", "-w", "640", "-h", "480", "-o", "{output}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_log_level() -> String {
    "info".to_string()
}
