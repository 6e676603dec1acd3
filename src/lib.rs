//! Setu - on-board mission controller
//!
//! Bridges the tablet (serial, newline-framed JSON), the motion controller
//! (serial, `;`-framed text), a remote pathfinding service and a remote
//! vision service, and owns the single source of truth for what the robot
//! is doing.
//!
//! ## Architecture
//!
//! ```text
//!  tablet ──► android-listener ──┐                ┌──► motion controller
//!                                ▼                │
//!                         MissionContext ◄── navigation ──► pathfinding (HTTP)
//!                                ▲                │
//! controller ─► motor-listener ──┘                └──► capture-N ──► vision (HTTP)
//! ```
//!
//! See [`threads`] for the loop contracts and [`mission`] for the state
//! machine and ACK rendezvous.

pub mod config;
pub mod error;
pub mod link;
pub mod mission;
pub mod protocol;
pub mod services;
pub mod threads;
pub mod transport;

pub use config::Config;
pub use error::{Error, Result};
pub use mission::{MissionContext, MissionPhase};
pub use threads::{Services, ThreadHandles, spawn_threads};
