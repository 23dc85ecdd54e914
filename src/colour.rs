// colour.rs
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::StripError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

/// Hue in degrees (0..=360), saturation and lightness in percent (0..=100).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

/// Brightness percentage, 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "u8", into = "u8")]
pub struct Brightness(u8);

impl Brightness {
    pub const MAX: Brightness = Brightness(100);

    pub fn new(value: u8) -> Result<Self, StripError> {
        if value > 100 {
            return Err(StripError::InvalidBrightness(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Brightness {
    fn default() -> Self {
        Self::MAX
    }
}

impl TryFrom<u8> for Brightness {
    type Error = StripError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Brightness> for u8 {
    fn from(value: Brightness) -> Self {
        value.0
    }
}

/// A colour held in whichever representation it was built from.
///
/// HSL colours keep their exact components so that merging a new hue or
/// saturation never drifts through an RGB round trip. Equality is defined on
/// the rounded RGB triple only.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(tag = "space", rename_all = "snake_case")]
pub enum Colour {
    Rgb(Rgb),
    Hsl(Hsl),
}

impl Default for Colour {
    fn default() -> Self {
        Colour::Rgb(Rgb::default())
    }
}

impl PartialEq for Colour {
    fn eq(&self, other: &Self) -> bool {
        self.to_rgb() == other.to_rgb()
    }
}

impl Eq for Colour {}

impl Colour {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Colour::Rgb(Rgb::new(r, g, b))
    }

    pub fn hsl(h: f64, s: f64, l: f64) -> Result<Self, StripError> {
        Ok(Colour::Hsl(Hsl {
            h: check_hue(h)?,
            s: check_percent("saturation", s)?,
            l: check_percent("lightness", l)?,
        }))
    }

    pub fn to_rgb(&self) -> Rgb {
        match *self {
            Colour::Rgb(rgb) => rgb,
            Colour::Hsl(hsl) => hsl_to_rgb(hsl),
        }
    }

    pub fn to_hsl(&self) -> Hsl {
        match *self {
            Colour::Rgb(rgb) => rgb_to_hsl(rgb),
            Colour::Hsl(hsl) => hsl,
        }
    }

    pub fn with_hue(&self, h: f64) -> Result<Self, StripError> {
        let hsl = self.to_hsl();
        Colour::hsl(h, hsl.s, hsl.l)
    }

    pub fn with_saturation(&self, s: f64) -> Result<Self, StripError> {
        let hsl = self.to_hsl();
        Colour::hsl(hsl.h, s, hsl.l)
    }

    pub fn with_lightness(&self, l: f64) -> Result<Self, StripError> {
        let hsl = self.to_hsl();
        Colour::hsl(hsl.h, hsl.s, l)
    }

    /// Multiplies each RGB channel by `brightness / 100`, rounding to the
    /// nearest integer (ties away from zero).
    pub fn scale_by_brightness(&self, brightness: Brightness) -> Colour {
        let factor = f64::from(brightness.value()) / 100.0;
        let Rgb { r, g, b } = self.to_rgb();
        let scale = |channel: u8| to_channel(f64::from(channel) * factor);
        Colour::rgb(scale(r), scale(g), scale(b))
    }
}

pub fn check_hue(h: f64) -> Result<f64, StripError> {
    if !h.is_finite() || !(0.0..=360.0).contains(&h) {
        return Err(StripError::InvalidColour(format!("hue {h} outside 0..=360")));
    }
    Ok(h)
}

pub fn check_percent(component: &str, value: f64) -> Result<f64, StripError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(StripError::InvalidColour(format!(
            "{component} {value} outside 0..=100"
        )));
    }
    Ok(value)
}

fn to_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn rgb_to_hsl(Rgb { r, g, b }: Rgb) -> Hsl {
    let r = f64::from(r) / 255.0;
    let g = f64::from(g) / 255.0;
    let b = f64::from(b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return Hsl { h: 0.0, s: 0.0, l: l * 100.0 };
    }

    let d = max - min;
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    Hsl {
        h: h * 60.0,
        s: s * 100.0,
        l: l * 100.0,
    }
}

fn hsl_to_rgb(Hsl { h, s, l }: Hsl) -> Rgb {
    let h = (h % 360.0) / 360.0;
    let s = s / 100.0;
    let l = l / 100.0;

    if s == 0.0 {
        let v = to_channel(l * 255.0);
        return Rgb::new(v, v, v);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    Rgb::new(
        to_channel(hue_to_channel(p, q, h + 1.0 / 3.0) * 255.0),
        to_channel(hue_to_channel(p, q, h) * 255.0),
        to_channel(hue_to_channel(p, q, h - 1.0 / 3.0) * 255.0),
    )
}

fn hue_to_channel(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brightness(value: u8) -> Brightness {
        Brightness::new(value).unwrap()
    }

    #[test]
    fn primary_colours_convert_both_ways() {
        let green = Colour::hsl(120.0, 100.0, 50.0).unwrap();
        assert_eq!(green.to_rgb(), Rgb::new(0, 255, 0));

        let hsl = Colour::rgb(0, 0, 255).to_hsl();
        assert_eq!(hsl.h, 240.0);
        assert_eq!(hsl.s, 100.0);
        assert_eq!(hsl.l, 50.0);
    }

    #[test]
    fn hue_of_full_circle_wraps_to_red() {
        let red = Colour::hsl(360.0, 100.0, 50.0).unwrap();
        assert_eq!(red.to_rgb(), Rgb::new(255, 0, 0));
    }

    #[test]
    fn hue_and_saturation_survive_rgb_round_trip() {
        for hue in (0..360).step_by(7) {
            let colour = Colour::hsl(f64::from(hue), 100.0, 50.0).unwrap();
            let back = Colour::Rgb(colour.to_rgb()).to_hsl();
            assert_eq!(back.h.round(), f64::from(hue), "hue {hue}");
            assert_eq!(back.s.round(), 100.0);
        }
        for saturation in (0..=100).step_by(5) {
            let colour = Colour::hsl(200.0, f64::from(saturation), 50.0).unwrap();
            let back = Colour::Rgb(colour.to_rgb()).to_hsl();
            assert_eq!(back.s.round(), f64::from(saturation), "saturation {saturation}");
        }
    }

    #[test]
    fn scaling_rounds_half_away_from_zero() {
        // 255 * 0.5 = 127.5, 1 * 0.5 = 0.5, 3 * 0.5 = 1.5
        let scaled = Colour::rgb(255, 1, 3).scale_by_brightness(brightness(50));
        assert_eq!(scaled.to_rgb(), Rgb::new(128, 1, 2));
    }

    #[test]
    fn scaling_stays_in_channel_range() {
        let colours = [
            Colour::rgb(255, 255, 255),
            Colour::rgb(0, 0, 0),
            Colour::rgb(200, 100, 50),
            Colour::hsl(33.3, 71.0, 50.0).unwrap(),
        ];
        for colour in colours {
            for b in 0..=100 {
                let Rgb { r, g, b: blue } = colour.scale_by_brightness(brightness(b)).to_rgb();
                let original = colour.to_rgb();
                assert!(r <= original.r && g <= original.g && blue <= original.b);
            }
        }
        assert_eq!(
            Colour::rgb(9, 9, 9).scale_by_brightness(brightness(0)).to_rgb(),
            Rgb::default()
        );
        assert_eq!(
            Colour::rgb(9, 9, 9).scale_by_brightness(Brightness::MAX).to_rgb(),
            Rgb::new(9, 9, 9)
        );
    }

    #[test]
    fn equality_is_exact_on_rgb() {
        let a = Colour::rgb(10, 20, 30);
        let b = Colour::rgb(10, 20, 31);
        assert_eq!(a, a);
        assert_ne!(a, b);
        assert_ne!(b, a);

        let red_hsl = Colour::hsl(0.0, 100.0, 50.0).unwrap();
        let red_rgb = Colour::rgb(255, 0, 0);
        assert_eq!(red_hsl, red_rgb);
        assert_eq!(red_rgb, red_hsl);
    }

    #[test]
    fn merging_keeps_other_components() {
        let base = Colour::hsl(10.0, 40.0, 50.0).unwrap();
        let merged = base.with_hue(200.0).unwrap().to_hsl();
        assert_eq!((merged.h, merged.s, merged.l), (200.0, 40.0, 50.0));

        let merged = base.with_saturation(90.0).unwrap().to_hsl();
        assert_eq!((merged.h, merged.s, merged.l), (10.0, 90.0, 50.0));
    }

    #[test]
    fn malformed_components_are_rejected() {
        assert!(matches!(
            Colour::hsl(361.0, 50.0, 50.0),
            Err(StripError::InvalidColour(_))
        ));
        assert!(matches!(
            Colour::hsl(f64::NAN, 50.0, 50.0),
            Err(StripError::InvalidColour(_))
        ));
        assert!(matches!(
            Colour::default().with_saturation(-1.0),
            Err(StripError::InvalidColour(_))
        ));
        assert!(matches!(
            Brightness::new(101),
            Err(StripError::InvalidBrightness(101))
        ));
    }
}
