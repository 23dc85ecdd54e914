// devices/engine.rs
//! Desired vs observed state reconciliation for a single strip.
//!
//! Every operation polls the strip, compares what callers asked for with
//! what the strip reports, and only sends a corrective command when the two
//! differ. Colour comparisons always happen after brightness scaling.
//! Transport failures never reach callers: the operation completes with a
//! [`Freshness::Stale`] outcome and `remote` keeps its last observed value.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};
use utoipa::ToSchema;

use super::state::{DeviceSnapshot, DeviceState, SyncStates};
use crate::colour::{Brightness, Colour};
use crate::error::StripError;
use crate::events::{AttributeClass, EngineEvent, EventSink, SyncState};
use crate::transport::{DeviceCommand, StatusReport, Transport};

/// Lightness given to the colour seeded from the first observation.
const SEED_LIGHTNESS: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    /// Every device call in the pass succeeded.
    Verified,
    /// At least one device call failed; the value may be out of date.
    Stale,
}

impl Freshness {
    pub fn and(self, other: Freshness) -> Freshness {
        match (self, other) {
            (Freshness::Verified, Freshness::Verified) => Freshness::Verified,
            _ => Freshness::Stale,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub value: T,
    pub freshness: Freshness,
}

impl<T> Outcome<T> {
    pub fn new(value: T, freshness: Freshness) -> Self {
        Self { value, freshness }
    }
}

pub struct ReconciliationEngine {
    transport: Box<dyn Transport>,
    events: Arc<dyn EventSink>,
    profile: String,
    state: DeviceState,
    sync: SyncStates,
}

impl ReconciliationEngine {
    pub fn new(
        transport: Box<dyn Transport>,
        profile: impl Into<String>,
        brightness: Brightness,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            transport,
            events,
            profile: profile.into(),
            state: DeviceState::new(brightness),
            sync: SyncStates::default(),
        }
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            state: self.state,
            sync: self.sync,
        }
    }

    // ── Attribute operations ─────────────────────────────────────

    pub async fn get_power(&mut self) -> Outcome<bool> {
        let freshness = self.refresh().await;
        Outcome::new(self.state.remote.on.unwrap_or(false), freshness)
    }

    pub async fn set_power(&mut self, on: bool) -> Outcome<()> {
        self.state.local.on = Some(on);
        Outcome::new((), self.converge_power().await)
    }

    pub async fn get_hue(&mut self) -> Outcome<f64> {
        let freshness = self.refresh().await;
        Outcome::new(self.state.reported_colour().to_hsl().h.round(), freshness)
    }

    pub async fn set_hue(&mut self, hue: f64) -> Result<Outcome<()>, StripError> {
        self.state.local.colour = self.intent_base()?.with_hue(hue)?;
        self.state.seeded = true;
        Ok(Outcome::new((), self.converge_colour().await))
    }

    pub async fn get_saturation(&mut self) -> Outcome<f64> {
        let freshness = self.refresh().await;
        Outcome::new(self.state.reported_colour().to_hsl().s.round(), freshness)
    }

    pub async fn set_saturation(&mut self, saturation: f64) -> Result<Outcome<()>, StripError> {
        self.state.local.colour = self.intent_base()?.with_saturation(saturation)?;
        self.state.seeded = true;
        Ok(Outcome::new((), self.converge_colour().await))
    }

    /// Brightness is never reported by the strip, the cached value is
    /// authoritative.
    pub fn get_brightness(&self) -> Outcome<u8> {
        Outcome::new(self.state.brightness.value(), Freshness::Verified)
    }

    pub async fn set_brightness(&mut self, brightness: Brightness) -> Outcome<()> {
        self.state.brightness = brightness;
        Outcome::new((), self.converge_colour().await)
    }

    // ── Reconciliation ───────────────────────────────────────────

    /// Poll once, then correct power (when a caller expressed intent) and
    /// colour. At most one command per attribute class, followed by a
    /// single re-poll.
    pub async fn reconcile(&mut self) -> Outcome<()> {
        let polled = self.refresh().await;
        if polled == Freshness::Stale {
            return Outcome::new((), polled);
        }

        let mut freshness = Freshness::Verified;
        let mut dispatched = false;

        if let (false, Some(on)) = (self.state.power_converged(), self.state.local.on) {
            freshness = freshness.and(self.dispatch(DeviceCommand::SetPower(on)).await);
            dispatched = true;
        }
        if !self.state.colour_converged() {
            let command = self.colour_command();
            freshness = freshness.and(self.dispatch(command).await);
            dispatched = true;
        }
        if dispatched {
            freshness = freshness.and(self.refresh().await);
        }

        Outcome::new((), freshness)
    }

    pub async fn converge_power(&mut self) -> Freshness {
        let polled = self.refresh().await;
        if polled == Freshness::Stale {
            return polled;
        }

        let Some(on) = self.state.local.on else {
            return Freshness::Verified;
        };
        if self.state.power_converged() {
            debug!(on, "Power already matches");
            return Freshness::Verified;
        }

        let dispatched = self.dispatch(DeviceCommand::SetPower(on)).await;
        dispatched.and(self.refresh().await)
    }

    /// Brightness is read when the pass runs, never captured earlier.
    pub async fn converge_colour(&mut self) -> Freshness {
        let polled = self.refresh().await;
        if polled == Freshness::Stale {
            return polled;
        }

        if self.state.colour_converged() {
            debug!("Colour already matches");
            return Freshness::Verified;
        }

        let command = self.colour_command();
        let dispatched = self.dispatch(command).await;
        dispatched.and(self.refresh().await)
    }

    /// Query the strip and fold the answer into `remote`.
    pub async fn refresh(&mut self) -> Freshness {
        let previous = self.sync;
        self.transition(AttributeClass::Power, SyncState::Syncing);
        self.transition(AttributeClass::Colour, SyncState::Syncing);

        let response = match self.transport.query_status().await {
            Ok(response) => response,
            Err(e) => {
                metrics::counter!("homestrip_poll_failures_total").increment(1);
                self.events.emit(EngineEvent::PollFailed {
                    error: e.to_string(),
                });
                self.transition(AttributeClass::Power, previous.power);
                self.transition(AttributeClass::Colour, previous.colour);
                return Freshness::Stale;
            }
        };

        let report = StatusReport::parse(&response);
        self.state.remote.on = Some(report.on);
        if let Some(rgb) = report.colour {
            let observed = Colour::Rgb(rgb);
            self.state.remote.colour = Some(observed);
            if !self.state.seeded {
                self.seed(observed);
            }
        }
        self.events.emit(EngineEvent::Polled {
            on: report.on,
            colour: report.colour,
        });

        self.evaluate();
        Freshness::Verified
    }

    // ── Internals ────────────────────────────────────────────────

    fn seed(&mut self, observed: Colour) {
        match observed.with_lightness(SEED_LIGHTNESS) {
            Ok(colour) => {
                self.state.local.colour = colour;
                self.state.seeded = true;
                self.events.emit(EngineEvent::Seeded {
                    colour: colour.to_hsl(),
                });
            }
            Err(e) => warn!(error = %e, "Could not seed colour from strip"),
        }
    }

    /// Colour a caller's hue or saturation is merged into. Before anything
    /// was seeded the zero colour has no lightness, so it gets the seed
    /// lightness instead.
    fn intent_base(&self) -> Result<Colour, StripError> {
        if self.state.seeded {
            Ok(self.state.local.colour)
        } else {
            self.state.local.colour.with_lightness(SEED_LIGHTNESS)
        }
    }

    fn colour_command(&self) -> DeviceCommand {
        DeviceCommand::SetColour {
            profile: self.profile.clone(),
            rgb: self.state.desired_colour().to_rgb(),
        }
    }

    async fn dispatch(&mut self, command: DeviceCommand) -> Freshness {
        match self.transport.send(&command).await {
            Ok(_) => {
                metrics::counter!("homestrip_dispatch_total", "command" => command.name())
                    .increment(1);
                self.events.emit(EngineEvent::Dispatched {
                    command: format!("{command:?}"),
                });
                Freshness::Verified
            }
            Err(e) => {
                metrics::counter!("homestrip_dispatch_failures_total", "command" => command.name())
                    .increment(1);
                self.events.emit(EngineEvent::DispatchFailed {
                    command: format!("{command:?}"),
                    error: e.to_string(),
                });
                Freshness::Stale
            }
        }
    }

    fn evaluate(&mut self) {
        let power = if self.state.power_converged() {
            SyncState::Converged
        } else {
            SyncState::Diverged
        };
        let colour = if self.state.colour_converged() {
            SyncState::Converged
        } else {
            SyncState::Diverged
        };
        self.transition(AttributeClass::Power, power);
        self.transition(AttributeClass::Colour, colour);
    }

    fn transition(&mut self, attribute: AttributeClass, to: SyncState) {
        let slot = match attribute {
            AttributeClass::Power => &mut self.sync.power,
            AttributeClass::Colour => &mut self.sync.colour,
        };
        let from = *slot;
        if from == to {
            return;
        }
        *slot = to;
        self.events.emit(EngineEvent::Transition { attribute, from, to });
    }
}
