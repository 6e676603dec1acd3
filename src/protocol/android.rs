//! Tablet link codec
//!
//! Inbound messages are single-line JSON envelopes tagged by `cat`:
//!
//! | `cat`       | `value`                                             |
//! |-------------|-----------------------------------------------------|
//! | `sendArena` | `{"obstacles":[{id,x,y,d}..],"robot_x","robot_y","robot_dir"}` |
//! | `stop`      | none                                                |
//! | `stm`       | `"id/MOTOR/ACTION/speed/value"`                     |
//!
//! Arena coordinates are 1-indexed on the wire. Replies echo the category:
//! `{"cat":"<cat>","status":"<message>"}`. Pose and target pushes are bare
//! JSON strings.

use super::scan;
use crate::error::{Error, Result};
use crate::mission::{
    Direction, MAX_OBSTACLES, MissionRequest, MotorAction, Obstacle, Pose,
};
use serde::Serialize;

pub const CAT_ARENA: &str = "sendArena";
pub const CAT_STOP: &str = "stop";
pub const CAT_MOTION: &str = "stm";
/// Notices not tied to a specific request
pub const CAT_STATUS: &str = "status";

/// Decoded tablet request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AndroidMessage {
    StartMission(MissionRequest),
    Stop,
    DirectMotion(DirectMotion),
}

/// Passthrough maneuver requested by the tablet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectMotion {
    pub action: MotorAction,
    pub speed: u8,
    pub value: u32,
}

/// Category tag of an envelope, if it has one
pub fn category(line: &str) -> Option<String> {
    scan::str_field(line, "cat")
}

/// Decode one inbound line
pub fn decode(line: &str) -> Result<AndroidMessage> {
    let cat = category(line).ok_or_else(|| Error::Decode("missing \"cat\"".to_string()))?;
    match cat.as_str() {
        CAT_ARENA => {
            let value = scan::field(line, "value")
                .ok_or_else(|| Error::Decode("sendArena without value".to_string()))?;
            decode_arena(value).map(AndroidMessage::StartMission)
        }
        CAT_STOP => Ok(AndroidMessage::Stop),
        CAT_MOTION => {
            let value = scan::str_field(line, "value")
                .ok_or_else(|| Error::Decode("stm without string value".to_string()))?;
            decode_direct_motion(&value).map(AndroidMessage::DirectMotion)
        }
        other => Err(Error::Decode(format!("unknown category {:?}", other))),
    }
}

/// Decode an arena payload into internal (0-indexed) coordinates
///
/// Obstacles with `id <= 0` are placeholders and skipped. An obstacle with
/// missing coordinates or an undecodable facing is logged and skipped.
pub fn decode_arena(value: &str) -> Result<MissionRequest> {
    let list = scan::field(value, "obstacles")
        .filter(|raw| raw.starts_with('['))
        .ok_or_else(|| Error::Decode("missing obstacles array".to_string()))?;

    let mut obstacles = Vec::new();
    for raw in scan::objects(list) {
        match decode_obstacle(raw) {
            Some(obstacle) if obstacle.id <= 0 => {
                log::debug!("Skipping placeholder obstacle {}", obstacle.id);
            }
            Some(obstacle) => {
                if obstacles.len() == MAX_OBSTACLES {
                    return Err(Error::CapacityExceeded {
                        what: "obstacles",
                        max: MAX_OBSTACLES,
                    });
                }
                obstacles.push(obstacle);
            }
            None => log::warn!("Skipping malformed obstacle: {}", raw),
        }
    }

    let robot_x = scan::int_field(value, "robot_x").unwrap_or(1);
    let robot_y = scan::int_field(value, "robot_y").unwrap_or(1);
    let facing = scan::field(value, "robot_dir")
        .or_else(|| scan::field(value, "robot_direction"))
        .map(|raw| match scan::as_int(raw) {
            Some(code) => Direction::from_android(code),
            None => scan::as_str(raw)
                .and_then(|s| Direction::from_compass(&s))
                .unwrap_or_default(),
        })
        .unwrap_or_default();

    Ok(MissionRequest {
        obstacles,
        start: Pose::new(to_internal(robot_x)?, to_internal(robot_y)?, facing),
    })
}

fn decode_obstacle(raw: &str) -> Option<Obstacle> {
    let id = i32::try_from(scan::int_field(raw, "id")?).ok()?;
    let x = to_internal(scan::int_field(raw, "x")?).ok()?;
    let y = to_internal(scan::int_field(raw, "y")?).ok()?;
    let facing = decode_facing(scan::field(raw, "d")?)?;
    Some(Obstacle { id, x, y, facing })
}

/// Facing as an internal code (0..=7) or a compass name
pub(crate) fn decode_facing(raw: &str) -> Option<Direction> {
    match scan::as_int(raw) {
        Some(code) => Direction::from_code(code),
        None => Direction::from_compass(&scan::as_str(raw)?),
    }
}

fn to_internal(wire: i64) -> Result<i32> {
    wire.checked_sub(1)
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| Error::Decode(format!("coordinate {} out of range", wire)))
}

/// Decode `id/MOTOR/ACTION/speed/value`
///
/// The tablet's id is ignored; the controller allocates its own.
pub fn decode_direct_motion(value: &str) -> Result<DirectMotion> {
    let body = value
        .trim()
        .trim_start_matches([':', '<'])
        .trim_end_matches([';', '>']);
    let parts: Vec<&str> = body.split('/').map(str::trim).collect();
    let [_, device, action, speed, amount] = parts.as_slice() else {
        return Err(Error::Decode(format!("bad motion command {:?}", value)));
    };
    if !device.eq_ignore_ascii_case("MOTOR") {
        return Err(Error::Decode(format!("unknown device {:?}", device)));
    }
    let action = MotorAction::from_wire(&action.to_ascii_uppercase())
        .ok_or_else(|| Error::Decode(format!("unknown action {:?}", action)))?;
    let speed = speed
        .parse::<u8>()
        .map_err(|_| Error::Decode(format!("bad speed {:?}", speed)))?;
    let value = amount
        .parse::<u32>()
        .map_err(|_| Error::Decode(format!("bad value {:?}", amount)))?;
    Ok(DirectMotion {
        action,
        speed,
        value,
    })
}

#[derive(Serialize)]
struct Reply<'a> {
    cat: &'a str,
    status: &'a str,
}

/// `{"cat":..,"status":..}` line
pub fn encode_reply(cat: &str, status: &str) -> Result<String> {
    let mut line = serde_json::to_string(&Reply { cat, status })?;
    line.push('\n');
    Ok(line)
}

/// `"ROBOT,x,y,DIR"` push with 1-indexed coordinates; unknown pose is `0,0,U`
pub fn encode_robot_pose(pose: Option<Pose>) -> Result<String> {
    let text = match pose {
        Some(p) => format!("ROBOT,{},{},{}", p.x + 1, p.y + 1, p.facing.compass()),
        None => "ROBOT,0,0,U".to_string(),
    };
    encode_push(&text)
}

/// `"TARGET,obstacle,target"` push
pub fn encode_target(obstacle_id: i32, target_id: i32) -> Result<String> {
    encode_push(&format!("TARGET,{},{}", obstacle_id, target_id))
}

fn encode_push(text: &str) -> Result<String> {
    let mut line = serde_json::to_string(text)?;
    line.push('\n');
    Ok(line)
}

/// Status texts sent to the tablet
pub mod status {
    pub const MAP_RECEIVED: &str = "Map received. Pathfinding...";
    pub const INVALID_MAP: &str = "Error: Invalid map format.";
    pub const BUSY: &str = "Error: Robot is busy. Cannot start new mission.";
    pub const STOP_RECEIVED: &str = "STOP command received.";
    pub const ROUTE_CALCULATED: &str = "Route calculated. Navigating.";
    pub const PATHFINDING_FAILED: &str = "Error: Pathfinding failed.";
    pub const NAVIGATION_COMPLETE: &str = "Navigation complete.";
    pub const COMMAND_TIMEOUT: &str = "Error: Command timed out.";
    pub const INVALID_COMMAND: &str = "Error: Invalid command format.";
    pub const CAPTURE_FAILED: &str = "Error: Image capture failed.";

    pub fn command_done(id: u32) -> String {
        format!("Command {} done.", id)
    }

    pub fn command_failed(id: u32) -> String {
        format!("Error: Command {} failed.", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO_A: &str = r#"{"cat":"sendArena","value":{"obstacles":[{"id":1,"x":2,"y":3,"d":0}],"robot_x":1,"robot_y":1,"robot_dir":1}}"#;

    #[test]
    fn test_decode_arena_shifts_coordinates() {
        let AndroidMessage::StartMission(request) = decode(SCENARIO_A).unwrap() else {
            panic!("expected StartMission");
        };
        assert_eq!(
            request.obstacles,
            vec![Obstacle {
                id: 1,
                x: 1,
                y: 2,
                facing: Direction::North
            }]
        );
        assert_eq!(request.start, Pose::new(0, 0, Direction::North));
    }

    #[test]
    fn test_arena_defaults_and_filtering() {
        let value = r#"{"obstacles":[
            {"id":0,"x":1,"y":1,"d":0},
            {"id":2,"x":5,"y":6,"d":"E"},
            {"id":3,"x":5,"d":2},
            {"id":4,"x":7,"y":8,"d":"UP"},
            {"id":5,"x":10,"y":11,"d":6}
        ],"robot_direction":3}"#;
        let request = decode_arena(value).unwrap();
        let ids: Vec<i32> = request.obstacles.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![2, 5]);
        assert_eq!(request.obstacles[0].facing, Direction::East);
        assert_eq!(request.obstacles[1].facing, Direction::West);
        assert_eq!(request.start, Pose::new(0, 0, Direction::South));
    }

    #[test]
    fn test_arena_capacity() {
        let obstacles: Vec<String> = (1..=MAX_OBSTACLES + 1)
            .map(|i| format!(r#"{{"id":{},"x":1,"y":1,"d":0}}"#, i))
            .collect();
        let value = format!(r#"{{"obstacles":[{}]}}"#, obstacles.join(","));
        assert!(matches!(
            decode_arena(&value),
            Err(Error::CapacityExceeded { max: MAX_OBSTACLES, .. })
        ));
    }

    #[test]
    fn test_arena_extreme_coordinates() {
        assert!(decode(
            r#"{"cat":"sendArena","value":{"obstacles":[],"robot_x":-9223372036854775808}}"#
        )
        .is_err());
        assert!(decode_arena(r#"{"obstacles":[],"robot_y":9223372036854775807}"#).is_err());

        // A bad obstacle coordinate only drops that obstacle
        let request = decode_arena(
            r#"{"obstacles":[{"id":1,"x":-9223372036854775808,"y":1,"d":0},{"id":2,"x":3,"y":4,"d":0}]}"#,
        )
        .unwrap();
        let ids: Vec<i32> = request.obstacles.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_arena_without_obstacles_is_invalid() {
        assert!(decode(r#"{"cat":"sendArena","value":{"robot_x":1}}"#).is_err());
        assert!(decode(r#"{"cat":"sendArena"}"#).is_err());
        assert_eq!(
            category(r#"{"cat":"sendArena","value":3}"#).as_deref(),
            Some(CAT_ARENA)
        );
    }

    #[test]
    fn test_decode_stop_and_unknown() {
        assert_eq!(decode(r#"{"cat":"stop"}"#).unwrap(), AndroidMessage::Stop);
        assert!(decode(r#"{"cat":"dance"}"#).is_err());
        assert!(decode("garbage").is_err());
    }

    #[test]
    fn test_decode_direct_motion() {
        let msg = decode(r#"{"cat":"stm","value":"5/MOTOR/TURNL/50/90"}"#).unwrap();
        assert_eq!(
            msg,
            AndroidMessage::DirectMotion(DirectMotion {
                action: MotorAction::TurnLeft,
                speed: 50,
                value: 90,
            })
        );
        assert_eq!(
            decode_direct_motion(":1/MOTOR/FWD/70/100;").unwrap().action,
            MotorAction::Forward
        );
        assert!(decode_direct_motion("1/MOTOR/JUMP/70/100").is_err());
        assert!(decode_direct_motion("1/LED/FWD/70/100").is_err());
        assert!(decode_direct_motion("1/MOTOR/FWD/70").is_err());
    }

    #[test]
    fn test_encode_reply() {
        assert_eq!(
            encode_reply(CAT_ARENA, status::MAP_RECEIVED).unwrap(),
            "{\"cat\":\"sendArena\",\"status\":\"Map received. Pathfinding...\"}\n"
        );
    }

    #[test]
    fn test_encode_pushes() {
        let pose = Pose::new(1, 2, Direction::NorthWest);
        assert_eq!(encode_robot_pose(Some(pose)).unwrap(), "\"ROBOT,2,3,NW\"\n");
        assert_eq!(encode_robot_pose(None).unwrap(), "\"ROBOT,0,0,U\"\n");
        assert_eq!(encode_target(1, 36).unwrap(), "\"TARGET,1,36\"\n");
    }
}
