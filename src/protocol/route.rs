//! Pathfinding service codec
//!
//! Request body (0-indexed cells, internal direction codes):
//!
//! ```json
//! {"obstacles":[{"id":1,"x":1,"y":2,"d":0}],"robot_x":0,"robot_y":0,"robot_dir":0,"retrying":false}
//! ```
//!
//! The response carries `commands` and `snap_positions`, normally under a
//! top-level `data` object. Some planner builds answer at the top level, or
//! send only the full `path` with snapshot points marked by `s != -1`.

use super::android::decode_facing;
use super::scan;
use crate::error::{Error, Result};
use crate::mission::{
    Command, MAX_COMMANDS, MAX_SNAP_POSITIONS, MissionRequest, Pose, Route,
};
use serde::Serialize;

#[derive(Serialize)]
struct ObstacleBody {
    id: i32,
    x: i32,
    y: i32,
    d: u8,
}

#[derive(Serialize)]
struct RouteRequestBody {
    obstacles: Vec<ObstacleBody>,
    robot_x: i32,
    robot_y: i32,
    robot_dir: u8,
    retrying: bool,
}

/// JSON body for a route request
pub fn encode_request(request: &MissionRequest) -> Result<String> {
    let body = RouteRequestBody {
        obstacles: request
            .obstacles
            .iter()
            .map(|o| ObstacleBody {
                id: o.id,
                x: o.x,
                y: o.y,
                d: o.facing.code(),
            })
            .collect(),
        robot_x: request.start.x,
        robot_y: request.start.y,
        robot_dir: request.start.facing.code(),
        retrying: false,
    };
    Ok(serde_json::to_string(&body)?)
}

/// One route token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Step(Command),
    Finish,
}

/// Parse `FW10`, `TR90`, `SP3`, `SNAP3_C`, `FIN`...
fn parse_token(token: &str) -> Option<Token> {
    let token = token.trim().to_ascii_uppercase();
    if token == "FIN" {
        return Some(Token::Finish);
    }

    let split = token.find(|c: char| !c.is_ascii_alphabetic())?;
    let (prefix, rest) = token.split_at(split);
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    let value: u32 = digits.parse().ok()?;

    let command = match prefix {
        "FW" => Command::MoveForward(value),
        "BW" => Command::MoveBackward(value),
        "FL" | "TL" => Command::TurnLeft(value),
        "FR" | "TR" => Command::TurnRight(value),
        "SP" | "SNAP" => Command::Snapshot(i32::try_from(value).ok()?),
        _ => return None,
    };
    Some(Token::Step(command))
}

/// Decode the planner's response into a route
pub fn decode_response(body: &str) -> Result<Route> {
    let container = scan::field(body, "data")
        .filter(|data| data.starts_with('{'))
        .unwrap_or(body);

    let tokens = scan::field(container, "commands")
        .filter(|raw| raw.starts_with('['))
        .ok_or_else(|| Error::Decode("route response without commands".to_string()))?;

    let mut commands = Vec::new();
    for raw in scan::array_items(tokens) {
        let Some(text) = scan::as_str(raw) else {
            log::warn!("Skipping non-string route token {}", raw);
            continue;
        };
        match parse_token(&text) {
            Some(Token::Finish) => break,
            Some(Token::Step(command)) => {
                if commands.len() == MAX_COMMANDS {
                    return Err(Error::CapacityExceeded {
                        what: "commands",
                        max: MAX_COMMANDS,
                    });
                }
                commands.push(command);
            }
            None => log::warn!("Skipping unknown route token {:?}", text),
        }
    }
    if commands.is_empty() {
        return Err(Error::Decode("route contains no commands".to_string()));
    }

    let mut snap_positions = match scan::field(container, "snap_positions") {
        Some(list) => decode_poses(list, false)?,
        None => Vec::new(),
    };
    if snap_positions.is_empty()
        && let Some(path) = scan::field(container, "path")
    {
        snap_positions = decode_poses(path, true)?;
    }

    Ok(Route {
        commands,
        snap_positions,
    })
}

/// Poses from an array of `{x,y,d}` objects
///
/// With `snapshots_only`, keep only path points whose `s` (or
/// `screenshot_id`) is present and not `-1`.
fn decode_poses(list: &str, snapshots_only: bool) -> Result<Vec<Pose>> {
    let mut poses = Vec::new();
    for raw in scan::objects(list) {
        if snapshots_only {
            let shot = scan::int_field(raw, "s").or_else(|| scan::int_field(raw, "screenshot_id"));
            if shot.is_none_or(|id| id == -1) {
                continue;
            }
        }
        let Some(pose) = decode_pose(raw) else {
            log::warn!("Skipping malformed snapshot pose {}", raw);
            continue;
        };
        if poses.len() == MAX_SNAP_POSITIONS {
            return Err(Error::CapacityExceeded {
                what: "snapshot positions",
                max: MAX_SNAP_POSITIONS,
            });
        }
        poses.push(pose);
    }
    Ok(poses)
}

fn decode_pose(raw: &str) -> Option<Pose> {
    let x = i32::try_from(scan::int_field(raw, "x")?).ok()?;
    let y = i32::try_from(scan::int_field(raw, "y")?).ok()?;
    let facing = decode_facing(scan::field(raw, "d")?)?;
    Some(Pose::new(x, y, facing))
}
