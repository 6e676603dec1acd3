//! Still capture through an external program
//!
//! Every capture overwrites the same file. The image is read back into
//! memory before returning, so a later capture cannot clobber bytes that
//! are still being uploaded.

use super::Camera;
use crate::config::CameraConfig;
use crate::error::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Command;

/// Placeholder in the argument list replaced by the output path
const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Runs e.g. `raspistill -n -t 200 -w 640 -h 480 -o capture.jpg`
pub struct CommandCamera {
    program: String,
    args: Vec<String>,
    output: PathBuf,
}

impl CommandCamera {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            output: PathBuf::from(&config.capture_path),
        }
    }

    fn expanded_args(&self) -> Vec<String> {
        let output = self.output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace(OUTPUT_PLACEHOLDER, &output))
            .collect()
    }
}

impl Camera for CommandCamera {
    fn capture(&self) -> Result<Vec<u8>> {
        // A stale file must never be mistaken for a fresh capture
        match fs::remove_file(&self.output) {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }

        let status = Command::new(&self.program)
            .args(self.expanded_args())
            .status()
            .map_err(|e| Error::Camera(format!("failed to run {}: {}", self.program, e)))?;
        if !status.success() {
            return Err(Error::Camera(format!("{} exited with {}", self.program, status)));
        }

        let image = fs::read(&self.output)?;
        if image.is_empty() {
            return Err(Error::Camera(format!("{} is empty", self.output.display())));
        }
        log::debug!("Captured {} bytes to {}", image.len(), self.output.display());
        Ok(image)
    }
}
