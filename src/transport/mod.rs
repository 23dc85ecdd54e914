// transport/mod.rs
//! One device command per external invocation.
//!
//! Transports never retry. A failed call leaves the caller's view of the
//! device stale, it never guesses a replacement value.

mod script;
#[cfg(test)]
pub(crate) mod fake;

pub use script::ScriptTransport;

use async_trait::async_trait;
use tracing::warn;

use crate::colour::Rgb;
use crate::error::StripError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    Query,
    SetPower(bool),
    SetColour { profile: String, rgb: Rgb },
}

impl DeviceCommand {
    /// Arguments passed after the device address.
    pub fn arguments(&self) -> Vec<String> {
        match self {
            DeviceCommand::Query => vec!["-i".to_string()],
            DeviceCommand::SetPower(true) => vec!["--on".to_string()],
            DeviceCommand::SetPower(false) => vec!["--off".to_string()],
            DeviceCommand::SetColour { profile, rgb } => {
                vec!["-x".to_string(), profile.clone(), format!("-c{rgb}")]
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DeviceCommand::Query => "query",
            DeviceCommand::SetPower(_) => "set_power",
            DeviceCommand::SetColour { .. } => "set_colour",
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Run a single command and return the raw textual output.
    async fn send(&self, command: &DeviceCommand) -> Result<String, StripError>;

    async fn query_status(&self) -> Result<String, StripError> {
        self.send(&DeviceCommand::Query).await
    }

    async fn set_power(&self, on: bool) -> Result<String, StripError> {
        self.send(&DeviceCommand::SetPower(on)).await
    }

    async fn set_colour(&self, profile: &str, rgb: Rgb) -> Result<String, StripError> {
        self.send(&DeviceCommand::SetColour {
            profile: profile.to_string(),
            rgb,
        })
        .await
    }
}

/// Parsed output of a status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub on: bool,
    pub colour: Option<Rgb>,
}

impl StatusReport {
    pub fn parse(response: &str) -> Self {
        Self {
            on: response.contains("ON"),
            colour: parse_triple(response),
        }
    }
}

/// First parenthesized `(r, g, b)` group anywhere in the output; other
/// parenthesized text before it is skipped.
fn parse_triple(response: &str) -> Option<Rgb> {
    let mut rest = response;
    let mut rejected = None;

    while let Some(start) = rest.find('(') {
        rest = &rest[start + 1..];
        let Some(end) = rest.find(')') else {
            break;
        };
        let inner = &rest[..end];
        match parse_channels(inner) {
            Some(rgb) => return Some(rgb),
            None => {
                rejected.get_or_insert(inner);
            }
        }
    }

    if let Some(inner) = rejected {
        warn!(%inner, "status output has no well-formed colour triple");
    }
    None
}

fn parse_channels(inner: &str) -> Option<Rgb> {
    let channels: Vec<&str> = inner.split(", ").collect();
    let [r, g, b] = channels.as_slice() else {
        return None;
    };
    let channel = |text: &str| {
        if text.is_empty() || !text.bytes().all(|c| c.is_ascii_digit()) {
            return None;
        }
        text.parse::<u8>().ok()
    };
    Some(Rgb::new(channel(*r)?, channel(*g)?, channel(*b)?))
}
