// transport/fake.rs
//! In-memory strip used by the engine and queue tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use super::{DeviceCommand, Transport};
use crate::colour::Rgb;
use crate::error::StripError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Failure {
    Timeout,
    Broken,
}

#[derive(Debug, Default)]
struct Strip {
    on: bool,
    colour: Option<Rgb>,
    commands: Vec<DeviceCommand>,
    failure: Option<Failure>,
}

/// Cloning shares the same strip, so a test can keep a handle after the
/// transport has moved into an engine.
#[derive(Clone, Default)]
pub(crate) struct FakeStrip {
    strip: Arc<Mutex<Strip>>,
    gate: Option<Gate>,
}

#[derive(Clone)]
pub(crate) struct Gate {
    pub entered: Arc<Notify>,
    pub permits: Arc<Semaphore>,
}

impl FakeStrip {
    pub fn new(on: bool, colour: Option<Rgb>) -> Self {
        let strip = Strip {
            on,
            colour,
            ..Strip::default()
        };
        Self {
            strip: Arc::new(Mutex::new(strip)),
            gate: None,
        }
    }

    /// Every command waits for a permit after announcing itself.
    pub fn gated(mut self) -> (Self, Gate) {
        let gate = Gate {
            entered: Arc::new(Notify::new()),
            permits: Arc::new(Semaphore::new(0)),
        };
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn fail_with(&self, failure: Option<Failure>) {
        self.strip.lock().unwrap().failure = failure;
    }

    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.strip.lock().unwrap().commands.clone()
    }

    pub fn colour_writes(&self) -> Vec<Rgb> {
        self.commands()
            .into_iter()
            .filter_map(|command| match command {
                DeviceCommand::SetColour { rgb, .. } => Some(rgb),
                _ => None,
            })
            .collect()
    }

    pub fn power_writes(&self) -> Vec<bool> {
        self.commands()
            .into_iter()
            .filter_map(|command| match command {
                DeviceCommand::SetPower(on) => Some(on),
                _ => None,
            })
            .collect()
    }

    pub fn colour(&self) -> Option<Rgb> {
        self.strip.lock().unwrap().colour
    }

    pub fn clear_commands(&self) {
        self.strip.lock().unwrap().commands.clear();
    }
}

#[async_trait]
impl Transport for FakeStrip {
    async fn send(&self, command: &DeviceCommand) -> Result<String, StripError> {
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.permits
                .acquire()
                .await
                .map_err(|e| StripError::TransportFailure(e.to_string()))?
                .forget();
        }

        let mut strip = self.strip.lock().unwrap();
        strip.commands.push(command.clone());

        match strip.failure {
            Some(Failure::Timeout) => {
                return Err(StripError::TransportTimeout(Duration::from_secs(1)));
            }
            Some(Failure::Broken) => {
                return Err(StripError::TransportFailure("exit status: 1".to_string()));
            }
            None => {}
        }

        match command {
            DeviceCommand::Query => {
                let power = if strip.on { "ON" } else { "OFF" };
                Ok(match strip.colour {
                    Some(Rgb { r, g, b }) => format!("{power} ({r}, {g}, {b})\n"),
                    None => format!("{power}\n"),
                })
            }
            DeviceCommand::SetPower(on) => {
                strip.on = *on;
                Ok(String::new())
            }
            DeviceCommand::SetColour { rgb, .. } => {
                strip.colour = Some(*rgb);
                Ok(String::new())
            }
        }
    }
}
