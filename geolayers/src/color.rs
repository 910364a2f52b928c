use serde::{Deserialize, Serialize};

/// Color representation.
///
/// In configuration a color can be given as a CSS string (`#rgb`, `#rrggbb`, `#rrggbbaa`,
/// `rgb(..)`, `rgba(..)` or one of a few common names) or as an array of 3 or 4 channel values
/// in the `0..=255` range.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr", into = "String")]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Css(String),
    Channels(Vec<f64>),
}

impl TryFrom<ColorRepr> for Color {
    type Error = String;

    fn try_from(value: ColorRepr) -> Result<Self, Self::Error> {
        match value {
            ColorRepr::Css(s) => Self::try_from_css(&s).ok_or_else(|| format!("invalid color: {s}")),
            ColorRepr::Channels(channels) => Self::try_from_channels(&channels)
                .ok_or_else(|| format!("invalid color channels: {channels:?}")),
        }
    }
}

impl From<Color> for String {
    fn from(val: Color) -> Self {
        val.to_hex()
    }
}

impl Color {
    /// Transparent color: `#00000000`
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    /// Red color: `#FF0000FF`
    pub const RED: Color = Color::rgba(255, 0, 0, 255);
    /// Green color: `#00FF00FF`
    pub const GREEN: Color = Color::rgba(0, 255, 0, 255);
    /// Blue color: `#0000FFFF`
    pub const BLUE: Color = Color::rgba(0, 0, 255, 255);
    /// White color: `#FFFFFFFF`
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    /// Black color: `#000000FF`
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    /// Gray color: `#808080FF`
    pub const GRAY: Color = Color::rgba(128, 128, 128, 255);

    /// Constructs color from its RGBA channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Converts the color into u8 array (RGBA).
    pub fn to_u8_array(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Converts the color into HEX8 string: `#RRGGBBAA`.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }

    /// Converts the color into a CSS string understood by map engines. Opaque colors are
    /// written as `#RRGGBB`, others as `rgba(r, g, b, a)`.
    pub fn to_css(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            let alpha = (self.a as f64 / 255.0 * 1000.0).round() / 1000.0;
            format!("rgba({}, {}, {}, {alpha})", self.r, self.g, self.b)
        }
    }

    /// Parses a color from the hex string. Hex string can be HEX3 (`#RGB`), HEX6 (`#RRGGBB`) or
    /// HEX8 (`#RRGGBBAA`).
    pub fn try_from_hex(hex_string: &str) -> Option<Self> {
        let digits = hex_string.strip_prefix('#')?;
        if !digits.is_ascii() {
            return None;
        }

        if digits.len() == 3 {
            let mut channels = [0u8; 3];
            for (channel, c) in channels.iter_mut().zip(digits.chars()) {
                let v = c.to_digit(16)? as u8;
                *channel = v * 16 + v;
            }
            return Some(Self::rgba(channels[0], channels[1], channels[2], 255));
        }

        if digits.len() != 6 && digits.len() != 8 {
            return None;
        }

        let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
        let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
        let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
        let a = if digits.len() == 8 {
            u8::from_str_radix(&digits[6..8], 16).ok()?
        } else {
            255
        };

        Some(Self { r, g, b, a })
    }

    /// Parses any CSS color form supported in layer configuration.
    pub fn try_from_css(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.starts_with('#') {
            return Self::try_from_hex(value);
        }

        let lower = value.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts: Vec<&str> = args.split(',').map(str::trim).collect();
            if parts.len() != 3 && parts.len() != 4 {
                return None;
            }

            let mut channels = [0u8; 3];
            for (channel, part) in channels.iter_mut().zip(&parts) {
                *channel = clamp_channel(part.parse::<f64>().ok()?);
            }
            let a = match parts.get(3) {
                Some(alpha) => clamp_channel(alpha.parse::<f64>().ok()? * 255.0),
                None => 255,
            };

            return Some(Self::rgba(channels[0], channels[1], channels[2], a));
        }

        match lower.as_str() {
            "transparent" => Some(Self::TRANSPARENT),
            "black" => Some(Self::BLACK),
            "white" => Some(Self::WHITE),
            "red" => Some(Self::RED),
            "green" => Some(Self::rgba(0, 128, 0, 255)),
            "lime" => Some(Self::GREEN),
            "blue" => Some(Self::BLUE),
            "gray" | "grey" => Some(Self::GRAY),
            "yellow" => Some(Self::rgba(255, 255, 0, 255)),
            "orange" => Some(Self::rgba(255, 165, 0, 255)),
            "purple" => Some(Self::rgba(128, 0, 128, 255)),
            _ => None,
        }
    }

    /// Builds a color from 3 (opaque) or 4 channel values.
    pub fn try_from_channels(channels: &[f64]) -> Option<Self> {
        match *channels {
            [r, g, b] => Some(Self::rgba(
                clamp_channel(r),
                clamp_channel(g),
                clamp_channel(b),
                255,
            )),
            [r, g, b, a] => Some(Self::rgba(
                clamp_channel(r),
                clamp_channel(g),
                clamp_channel(b),
                clamp_channel(a),
            )),
            _ => None,
        }
    }

    /// Returns a new color instance, copied from the base one but with the given alpha channel.
    pub fn with_alpha(&self, a: u8) -> Self {
        Self { a, ..*self }
    }

    /// Returns true if the color is fully transparent (`a == 0`).
    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Red component of the color in RGBA space.
    pub fn r(&self) -> u8 {
        self.r
    }

    /// Green component of the color in RGBA space.
    pub fn g(&self) -> u8 {
        self.g
    }

    /// Blue component of the color in RGBA space.
    pub fn b(&self) -> u8 {
        self.b
    }

    /// Opacity component of the color.
    pub fn a(&self) -> u8 {
        self.a
    }

    /// Linear interpolation of every channel between `self` (`k = 0`) and `other` (`k = 1`).
    pub fn lerp(&self, other: Color, k: f64) -> Color {
        let k = k.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| clamp_channel(a as f64 + (b as f64 - a as f64) * k);

        Color {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }
}

fn clamp_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_serialization() {
        let hex = "#FF1000AA";
        let color = Color::try_from_hex(hex).unwrap();
        assert_eq!(&color.to_hex(), hex);
    }

    #[test]
    fn parses_css_forms() {
        assert_eq!(Color::try_from_css("#f00"), Some(Color::RED));
        assert_eq!(Color::try_from_css("#0000ff"), Some(Color::BLUE));
        assert_eq!(
            Color::try_from_css("rgba(10, 20, 30, 0.5)"),
            Some(Color::rgba(10, 20, 30, 128))
        );
        assert_eq!(
            Color::try_from_css("rgb(10,20,30)"),
            Some(Color::rgba(10, 20, 30, 255))
        );
        assert_eq!(Color::try_from_css("White"), Some(Color::WHITE));
        assert_eq!(Color::try_from_css("#12345"), None);
        assert_eq!(Color::try_from_css("not a color"), None);
    }

    #[test]
    fn deserializes_strings_and_arrays() {
        let color: Color = serde_json::from_str("\"#00FF00\"").unwrap();
        assert_eq!(color, Color::GREEN);

        let color: Color = serde_json::from_str("[255, 0, 0, 128]").unwrap();
        assert_eq!(color, Color::rgba(255, 0, 0, 128));

        let color: Color = serde_json::from_str("[1, 2, 3]").unwrap();
        assert_eq!(color, Color::rgba(1, 2, 3, 255));

        assert!(serde_json::from_str::<Color>("[1, 2]").is_err());
    }

    #[test]
    fn css_output() {
        assert_eq!(Color::RED.to_css(), "#FF0000");
        assert_eq!(Color::rgba(0, 0, 0, 0).to_css(), "rgba(0, 0, 0, 0)");
    }

    #[test]
    fn lerp_midpoint() {
        let mid = Color::BLACK.lerp(Color::WHITE, 0.5);
        assert_eq!(mid, Color::rgba(128, 128, 128, 255));
    }
}
