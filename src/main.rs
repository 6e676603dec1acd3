//! Setu daemon entry point
//!
//! Opens both serial links, starts the listener and executor threads and
//! runs until Ctrl-C.

use setu::services::{CommandCamera, HttpPathPlanner, HttpVisionClassifier};
use setu::transport::{self, SerialTransport};
use setu::{Config, Error, MissionContext, Result, Services, spawn_threads};
use std::env;
use std::sync::Arc;

const DEFAULT_CONFIG_PATH: &str = "/etc/setu.toml";

/// Parse config path from command line arguments.
///
/// Supports:
/// - `setu <path>` (positional)
/// - `setu --config <path>` (flag-based)
/// - `setu -c <path>` (short flag)
///
/// Returns `None` when no path was given.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    args.get(1).filter(|arg| !arg.starts_with('-')).cloned()
}

fn main() -> Result<()> {
    // An explicitly named file must exist; the default location is optional
    let config = match parse_config_path() {
        Some(path) => Config::load(&path)?,
        None => Config::load_or_default(DEFAULT_CONFIG_PATH)?,
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("Setu v{} starting...", env!("CARGO_PKG_VERSION"));

    // Both links are mandatory; failing to open either is fatal
    let android =
        SerialTransport::open("android", &config.android.port, config.android.baud_rate)?;
    let motor = SerialTransport::open("motor", &config.motor.port, config.motor.baud_rate)?;

    let services = Services {
        planner: Arc::new(HttpPathPlanner::new(&config.services)?),
        vision: Arc::new(HttpVisionClassifier::new(&config.services)?),
        camera: Arc::new(CommandCamera::new(&config.camera)),
    };
    log::info!(
        "Planner: {}, vision: {}",
        config.services.pathfinding_url,
        config.services.vision_url
    );

    let context = Arc::new(MissionContext::new());

    let ctx = Arc::clone(&context);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        ctx.signal_shutdown();
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let handles = spawn_threads(
        &config,
        context,
        transport::shared(android),
        transport::shared(motor),
        services,
    )?;

    log::info!("Setu running. Press Ctrl-C to stop.");
    handles.join();

    log::info!("Setu stopped");
    Ok(())
}
