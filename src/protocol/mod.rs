//! Wire codecs
//!
//! - [`android`]: tablet requests, replies and pushes (newline framed JSON)
//! - [`motor`]: motion-controller frames and ACKs (`;` framed text)
//! - [`route`]: pathfinding request/response bodies
//! - [`vision`]: detection responses and the label table
//! - [`scan`]: the depth-aware field extraction the decoders share

pub mod android;
pub mod motor;
pub mod route;
pub mod scan;
pub mod vision;

pub use android::{AndroidMessage, DirectMotion};
pub use vision::Detection;
