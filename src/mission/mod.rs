//! Mission state machine data and synchronization
//!
//! ```text
//! Idle --(arena received)--> Pathfinding --(route decoded)--> Navigating
//!   ^                              |                               |
//!   +------(failure / stop)--------+---(route done / abort)--------+
//! ```
//!
//! Only the navigation executor moves the phase forward. Listeners record
//! requests and signal; see [`MissionContext`].

mod ack;
mod context;
pub mod types;

pub use ack::{AckOutcome, AckRecord, Completion};
pub use context::{MissionContext, Work};
pub use types::{
    Command, Direction, MAX_COMMANDS, MAX_OBSTACLES, MAX_SNAP_POSITIONS, MissionPhase,
    MissionRequest, MotorAction, Obstacle, Pose, Route,
};
