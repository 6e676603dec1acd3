//! Mission data model
//!
//! All coordinates here are 0-indexed grid cells. The tablet link uses
//! 1-indexed cells; conversion happens in the protocol codecs only.

/// Maximum obstacles accepted in one arena
pub const MAX_OBSTACLES: usize = 20;

/// Maximum commands accepted in one route
pub const MAX_COMMANDS: usize = 100;

/// Maximum snapshot poses accepted in one route
pub const MAX_SNAP_POSITIONS: usize = 20;

/// Compass facing, encoded 0..=7 clockwise from north
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    North = 0,
    NorthEast = 1,
    East = 2,
    SouthEast = 3,
    South = 4,
    SouthWest = 5,
    West = 6,
    NorthWest = 7,
}

impl Direction {
    const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Internal 8-direction code
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: i64) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Tablet `robot_dir` (1=N, 2=E, 3=S, 4=W); anything else faces north
    pub fn from_android(code: i64) -> Self {
        match code {
            2 => Direction::East,
            3 => Direction::South,
            4 => Direction::West,
            _ => Direction::North,
        }
    }

    pub fn compass(self) -> &'static str {
        match self {
            Direction::North => "N",
            Direction::NorthEast => "NE",
            Direction::East => "E",
            Direction::SouthEast => "SE",
            Direction::South => "S",
            Direction::SouthWest => "SW",
            Direction::West => "W",
            Direction::NorthWest => "NW",
        }
    }

    pub fn from_compass(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.compass().eq_ignore_ascii_case(s))
    }
}

/// Robot pose on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pose {
    pub x: i32,
    pub y: i32,
    pub facing: Direction,
}

impl Pose {
    pub fn new(x: i32, y: i32, facing: Direction) -> Self {
        Self { x, y, facing }
    }
}

/// Obstacle block with an image on one face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Obstacle {
    pub id: i32,
    pub x: i32,
    pub y: i32,
    pub facing: Direction,
}

/// One step of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MoveForward(u32),
    MoveBackward(u32),
    TurnLeft(u32),
    TurnRight(u32),
    /// Photograph the obstacle with this id
    Snapshot(i32),
}

/// Maneuver kinds understood by the motion controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorAction {
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
}

impl MotorAction {
    pub fn wire_name(self) -> &'static str {
        match self {
            MotorAction::Forward => "FWD",
            MotorAction::Backward => "BWD",
            MotorAction::TurnLeft => "TURNL",
            MotorAction::TurnRight => "TURNR",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "FWD" => Some(MotorAction::Forward),
            "BWD" => Some(MotorAction::Backward),
            "TURNL" => Some(MotorAction::TurnLeft),
            "TURNR" => Some(MotorAction::TurnRight),
            _ => None,
        }
    }

    pub fn is_turn(self) -> bool {
        matches!(self, MotorAction::TurnLeft | MotorAction::TurnRight)
    }
}

/// Mission state machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissionPhase {
    #[default]
    Idle,
    Pathfinding,
    Navigating,
}

/// Arena submitted by the tablet
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MissionRequest {
    pub obstacles: Vec<Obstacle>,
    pub start: Pose,
}

/// Planned route returned by the pathfinding service
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Route {
    pub commands: Vec<Command>,
    /// Robot pose at each snapshot, in route order
    pub snap_positions: Vec<Pose>,
}
