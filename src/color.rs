//! Track colours
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 8-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Sentinel for objects that belong to no (visible) track
    pub const GRAY: Color = Color {
        r: 128,
        g: 128,
        b: 128,
    };
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }
}

/// Jet gradient: dark blue at 0, through cyan, yellow, to dark red at 1.
/// Values outside [0, 1] are clamped.
pub fn jet(position: f64) -> Color {
    let t = if position.is_nan() {
        0.0
    } else {
        position.clamp(0.0, 1.0)
    };
    let channel = |offset: f64| -> u8 {
        let v = (1.5 - (4.0 * t - offset).abs()).clamp(0.0, 1.0);
        (v * 255.0).round() as u8
    };
    Color::new(channel(3.0), channel(2.0), channel(1.0))
}

/// Gradient position of the i-th of `count` tracks: `i / (count - 1)`, 0 when count is 1
pub fn gradient_position(i: usize, count: usize) -> f64 {
    i as f64 / usize::max(1, count.saturating_sub(1)) as f64
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("colour '{}' is not #rrggbb", s));
        }
        let part = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("colour '{}': {}", s, e))
        };
        Ok(Color::new(part(0)?, part(2)?, part(4)?))
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jet_endpoints() {
        assert_eq!(jet(0.0), Color::new(0, 0, 128));
        assert_eq!(jet(0.5), Color::new(128, 255, 128));
        assert_eq!(jet(1.0), Color::new(128, 0, 0));
        assert_eq!(jet(-3.0), jet(0.0));
        assert_eq!(jet(f64::NAN), jet(0.0));
    }

    #[test]
    fn test_gradient_position() {
        assert_eq!(gradient_position(0, 1), 0.0);
        assert_eq!(gradient_position(0, 0), 0.0);
        assert_eq!(gradient_position(2, 5), 0.5);
        assert_eq!(gradient_position(4, 5), 1.0);
    }

    #[test]
    fn test_hex() {
        assert_eq!(Color::GRAY.to_string(), "#808080");
        assert_eq!("#00ff7f".parse::<Color>().unwrap(), Color::new(0, 255, 127));
        assert!("#12345".parse::<Color>().is_err());
    }
}
