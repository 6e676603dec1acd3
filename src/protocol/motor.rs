//! Motion-controller frame codec
//!
//! Outbound: `:<id>/MOTOR/<FWD|BWD|TURNL|TURNR>/<speed%>/<value>;`
//! Inbound ACK: `!<id>/DONE;`

use crate::error::{Error, Result};
use crate::mission::MotorAction;

/// Inbound frame terminators; the controller also emits newline-ended debug lines
pub const FRAME_DELIMITERS: &[u8] = b";\n";

/// Encode a motion frame
pub fn encode_frame(id: u32, action: MotorAction, speed: u8, value: u32) -> String {
    format!(":{}/MOTOR/{}/{}/{};", id, action.wire_name(), speed, value)
}

/// Decode an ACK frame, returning the completed command id
///
/// Accepts the frame with or without its trailing delimiter.
pub fn decode_ack(frame: &str) -> Result<u32> {
    let body = frame
        .trim()
        .strip_prefix('!')
        .ok_or_else(|| Error::Decode(format!("not an ACK frame: {:?}", frame)))?;
    let body = body.strip_suffix(';').unwrap_or(body);

    match body.split_once('/') {
        Some((id, status)) if status.trim() == "DONE" => id
            .trim()
            .parse::<u32>()
            .map_err(|_| Error::Decode(format!("bad ACK id: {:?}", frame))),
        _ => Err(Error::Decode(format!("not an ACK frame: {:?}", frame))),
    }
}
