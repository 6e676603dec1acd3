//! Shared mission context
//!
//! The single source of truth for what the robot is doing. One exclusive
//! lock guards every mission field; the two [`AckRecord`]s carry their own
//! lock/condvar pairs so ACK delivery never contends with mission updates.
//!
//! # Lock ordering
//!
//! An ACK waiter holds its record lock while briefly taking the state lock
//! (to check the stop flag). Nothing takes a record lock while holding the
//! state lock, so the two orders cannot deadlock.

use super::ack::{AckRecord, Completion};
use super::types::{Command, MissionPhase, MissionRequest, Pose, Route};
use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Fields guarded by the context lock
#[derive(Default)]
struct MissionState {
    phase: MissionPhase,
    stop_requested: bool,
    new_mission: bool,
    request: MissionRequest,
    route: Route,
    snap_cursor: usize,
}

/// What woke the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Work {
    /// A new arena to plan; phase is now Pathfinding
    Mission(MissionRequest),
    /// A stop was consumed; phase is Idle
    Stopped,
}

/// Shared state between the listener loops, the executor and capture tasks
pub struct MissionContext {
    state: Mutex<MissionState>,
    /// Signalled on new mission, stop and shutdown
    work_signal: Condvar,
    motion_ack: AckRecord<u32>,
    capture_ack: AckRecord<Completion>,
    /// Shared by the mission pipeline and direct motion commands
    next_command_id: AtomicU32,
    shutdown: AtomicBool,
}

impl MissionContext {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MissionState::default()),
            work_signal: Condvar::new(),
            motion_ack: AckRecord::new(),
            capture_ack: AckRecord::new(),
            next_command_id: AtomicU32::new(0),
            shutdown: AtomicBool::new(false),
        }
    }

    // ========================================================================
    // Listener side
    // ========================================================================

    /// Store a new arena and wake the executor
    ///
    /// Rejected with [`Error::Busy`] while a mission is running or one is
    /// already waiting to be picked up; stored data is left untouched.
    pub fn submit_mission(&self, request: MissionRequest) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.phase != MissionPhase::Idle || state.new_mission {
                return Err(Error::Busy);
            }
            state.request = request;
            state.new_mission = true;
        }
        self.work_signal.notify_all();
        Ok(())
    }

    /// Request a stop
    ///
    /// Returns `false` when there was nothing to stop (phase Idle, nothing
    /// pending). Otherwise raises the flag and wakes every waiter.
    pub fn request_stop(&self) -> bool {
        {
            let mut state = self.state.lock();
            if state.phase == MissionPhase::Idle && !state.new_mission {
                return false;
            }
            state.stop_requested = true;
        }
        self.wake_all();
        true
    }

    /// Record a motion-controller ACK
    pub fn record_motion_ack(&self, id: u32) {
        self.motion_ack.record(id);
    }

    /// Record capture completion for a snapshot
    pub fn record_capture(&self, completion: Completion) {
        self.capture_ack.record(completion);
    }

    /// Allocate the next motion command id (starts at 1, wraps past 0)
    pub fn next_command_id(&self) -> u32 {
        loop {
            let id = self
                .next_command_id
                .fetch_add(1, Ordering::Relaxed)
                .wrapping_add(1);
            if id != 0 {
                return id;
            }
        }
    }

    // ========================================================================
    // Executor side
    // ========================================================================

    /// Block until a new mission or a stop arrives
    ///
    /// A stop wins over a pending mission and discards it. Returns `None`
    /// on shutdown.
    pub fn wait_for_work(&self) -> Option<Work> {
        let mut state = self.state.lock();
        loop {
            if self.should_shutdown() {
                return None;
            }
            if state.stop_requested {
                state.stop_requested = false;
                state.new_mission = false;
                state.phase = MissionPhase::Idle;
                return Some(Work::Stopped);
            }
            if state.new_mission {
                state.new_mission = false;
                state.phase = MissionPhase::Pathfinding;
                return Some(Work::Mission(state.request.clone()));
            }
            self.work_signal.wait(&mut state);
        }
    }

    /// Install a planned route and enter Navigating
    ///
    /// Returns `false` (phase Idle, stop consumed) if a stop arrived while
    /// the route was being planned.
    pub fn begin_navigation(&self, route: Route) -> bool {
        let mut state = self.state.lock();
        if state.stop_requested {
            state.stop_requested = false;
            state.phase = MissionPhase::Idle;
            return false;
        }
        state.route = route;
        state.snap_cursor = 0;
        state.phase = MissionPhase::Navigating;
        true
    }

    /// Consume a pending stop, returning to Idle
    pub fn take_stop(&self) -> bool {
        let mut state = self.state.lock();
        if state.stop_requested {
            state.stop_requested = false;
            state.phase = MissionPhase::Idle;
            true
        } else {
            false
        }
    }

    /// Return to Idle at the end of a mission (completed or aborted)
    pub fn finish_mission(&self) {
        let mut state = self.state.lock();
        state.stop_requested = false;
        state.phase = MissionPhase::Idle;
    }

    /// Pose for the next snapshot; the cursor advances on every call
    ///
    /// `None` once the recorded poses are exhausted.
    pub fn next_snapshot_pose(&self) -> Option<Pose> {
        let mut state = self.state.lock();
        let pose = state.route.snap_positions.get(state.snap_cursor).copied();
        state.snap_cursor += 1;
        pose
    }

    pub fn motion_ack(&self) -> &AckRecord<u32> {
        &self.motion_ack
    }

    pub fn capture_ack(&self) -> &AckRecord<Completion> {
        &self.capture_ack
    }

    /// Interrupt predicate for ACK waits
    pub fn is_interrupted(&self) -> bool {
        self.should_shutdown() || self.state.lock().stop_requested
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn phase(&self) -> MissionPhase {
        self.state.lock().phase
    }

    pub fn is_stop_requested(&self) -> bool {
        self.state.lock().stop_requested
    }

    /// Copy of the stored arena
    pub fn mission_request(&self) -> MissionRequest {
        self.state.lock().request.clone()
    }

    /// Copy of the route being executed
    pub fn commands(&self) -> Vec<Command> {
        self.state.lock().route.commands.clone()
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Signal all loops to exit
    pub fn signal_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.wake_all();
    }

    pub fn should_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    fn wake_all(&self) {
        {
            // Taking the lock orders the notify after any in-progress predicate check
            let _state = self.state.lock();
            self.work_signal.notify_all();
        }
        self.motion_ack.wake();
        self.capture_ack.wake();
    }
}

impl Default for MissionContext {
    fn default() -> Self {
        Self::new()
    }
}
