// devices/state.rs
use serde::Serialize;
use utoipa::ToSchema;

use crate::colour::{Brightness, Colour};
use crate::events::SyncState;

/// What callers asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct LocalState {
    pub on: Option<bool>,
    pub colour: Colour,
}

/// What the strip last reported. Brightness is already applied to `colour`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct RemoteState {
    pub on: Option<bool>,
    pub colour: Option<Colour>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct DeviceState {
    pub local: LocalState,
    pub remote: RemoteState,
    pub brightness: Brightness,
    /// Set once `local.colour` has been seeded from the strip or written by
    /// a caller; seeding never happens after that.
    pub seeded: bool,
}

impl DeviceState {
    pub fn new(brightness: Brightness) -> Self {
        Self {
            brightness,
            ..Self::default()
        }
    }

    /// The colour the strip should display right now.
    pub fn desired_colour(&self) -> Colour {
        self.local.colour.scale_by_brightness(self.brightness)
    }

    /// Unknown remote colour compares as black.
    pub fn observed_colour(&self) -> Colour {
        self.remote.colour.unwrap_or_default()
    }

    /// Colour whose hue and saturation callers read back. Once the strip
    /// shows the scaled request, the request itself is reported, since a
    /// dim RGB triple cannot carry its hue and saturation exactly.
    pub fn reported_colour(&self) -> Colour {
        if self.seeded && self.colour_converged() {
            self.local.colour
        } else {
            self.observed_colour()
        }
    }

    pub fn colour_converged(&self) -> bool {
        self.desired_colour() == self.observed_colour()
    }

    /// No power intent yet counts as converged.
    pub fn power_converged(&self) -> bool {
        match self.local.on {
            Some(on) => self.remote.on == Some(on),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SyncStates {
    pub power: SyncState,
    pub colour: SyncState,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct DeviceSnapshot {
    pub state: DeviceState,
    pub sync: SyncStates,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_converged_against_nothing() {
        let state = DeviceState::new(Brightness::MAX);
        assert!(state.power_converged());
        assert!(state.colour_converged());
        assert!(!state.seeded);
    }

    #[test]
    fn colour_comparison_applies_brightness() {
        let mut state = DeviceState::new(Brightness::new(50).unwrap());
        state.local.colour = Colour::rgb(200, 100, 50);
        state.remote.colour = Some(Colour::rgb(200, 100, 50));
        assert!(!state.colour_converged());

        state.remote.colour = Some(Colour::rgb(100, 50, 25));
        assert!(state.colour_converged());
    }

    #[test]
    fn reported_colour_follows_the_strip_until_it_matches() {
        let mut state = DeviceState::new(Brightness::new(3).unwrap());
        state.local.colour = Colour::hsl(200.0, 60.0, 50.0).unwrap();
        state.seeded = true;
        state.remote.colour = Some(Colour::rgb(255, 0, 0));
        assert_eq!(state.reported_colour(), Colour::rgb(255, 0, 0));

        state.remote.colour = Some(state.desired_colour());
        let reported = state.reported_colour().to_hsl();
        assert_eq!((reported.h, reported.s), (200.0, 60.0));
    }

    #[test]
    fn power_intent_must_match_observation() {
        let mut state = DeviceState::default();
        state.local.on = Some(true);
        assert!(!state.power_converged());
        state.remote.on = Some(false);
        assert!(!state.power_converged());
        state.remote.on = Some(true);
        assert!(state.power_converged());
    }
}
