// transport/script.rs
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{DeviceCommand, Transport};
use crate::config::DeviceSettings;
use crate::error::StripError;

/// Runs the on-disk dispatch script once per command.
#[derive(Debug, Clone)]
pub struct ScriptTransport {
    script: PathBuf,
    address: String,
    timeout: Duration,
}

impl ScriptTransport {
    pub fn new(script: impl Into<PathBuf>, address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            script: script.into(),
            address: address.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &DeviceSettings) -> Self {
        Self::new(
            &settings.script,
            settings.address.clone(),
            Duration::from_millis(settings.timeout_ms),
        )
    }
}

#[async_trait]
impl Transport for ScriptTransport {
    async fn send(&self, command: &DeviceCommand) -> Result<String, StripError> {
        let mut process = Command::new(&self.script);
        process
            .arg(&self.address)
            .args(command.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command = command.name(), address = %self.address, "Dispatching");

        // Dropping the output future on timeout kills the child.
        let output = match tokio::time::timeout(self.timeout, process.output()).await {
            Ok(result) => result.map_err(|e| {
                StripError::TransportFailure(format!("failed to run {}: {e}", self.script.display()))
            })?,
            Err(_) => {
                warn!(command = command.name(), timeout = ?self.timeout, "Device timed out");
                return Err(StripError::TransportTimeout(self.timeout));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StripError::TransportFailure(format!(
                "{} exited with {}: {}",
                self.script.display(),
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| StripError::TransportFailure(format!("non UTF-8 output: {e}")))
    }
}
