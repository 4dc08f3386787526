//! Foundational color type used throughout vizfield.
//!
//! Colors travel through the pipeline as CSS strings; `Color` is the
//! parsed form used for palette interpolation and for normalizing cached
//! display values to a fixed hex representation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error produced when a CSS color string cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("unsupported color syntax: {0}")]
    UnsupportedSyntax(String),
    #[error("invalid hex color: {0}")]
    InvalidHex(String),
}

/// RGBA color with alpha channel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
            a: a as f64 / 255.0,
        }
    }

    pub fn to_rgba8(&self) -> (u8, u8, u8, u8) {
        (
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8,
            (self.a * 255.0).round() as u8,
        )
    }

    /// Parse a CSS color string: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`,
    /// `rgb(r, g, b)` or `rgba(r, g, b, a)`.
    pub fn from_css(s: &str) -> Result<Self, ColorParseError> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return Self::from_hex(hex).ok_or_else(|| ColorParseError::InvalidHex(s.to_string()));
        }
        if let Some(body) = s
            .strip_prefix("rgba(")
            .or_else(|| s.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts: Vec<&str> = body.split(',').map(str::trim).collect();
            if parts.len() == 3 || parts.len() == 4 {
                let parse = |p: &str| p.parse::<f64>().ok();
                if let (Some(r), Some(g), Some(b)) =
                    (parse(parts[0]), parse(parts[1]), parse(parts[2]))
                {
                    let a = if parts.len() == 4 {
                        parse(parts[3]).unwrap_or(1.0)
                    } else {
                        1.0
                    };
                    return Ok(Self::new(r / 255.0, g / 255.0, b / 255.0, a));
                }
            }
        }
        Err(ColorParseError::UnsupportedSyntax(s.to_string()))
    }

    fn from_hex(hex: &str) -> Option<Self> {
        let expand = |c: u8| -> Option<u8> {
            let d = (c as char).to_digit(16)? as u8;
            Some(d << 4 | d)
        };
        let bytes = hex.as_bytes();
        match bytes.len() {
            3 | 4 => {
                let r = expand(bytes[0])?;
                let g = expand(bytes[1])?;
                let b = expand(bytes[2])?;
                let a = if bytes.len() == 4 {
                    expand(bytes[3])?
                } else {
                    255
                };
                Some(Self::from_rgba8(r, g, b, a))
            }
            6 | 8 => {
                let pair =
                    |i: usize| -> Option<u8> { u8::from_str_radix(hex.get(i..i + 2)?, 16).ok() };
                let r = pair(0)?;
                let g = pair(2)?;
                let b = pair(4)?;
                let a = if bytes.len() == 8 { pair(6)? } else { 255 };
                Some(Self::from_rgba8(r, g, b, a))
            }
            _ => None,
        }
    }

    /// Render as `#rrggbb`, or `#rrggbbaa` when the alpha channel is not
    /// fully opaque. The fixed-length forms let consumers test for alpha
    /// with a simple length check instead of re-parsing.
    pub fn to_hex_string(&self) -> String {
        let (r, g, b, a) = self.to_rgba8();
        if a == 255 {
            format!("#{:02x}{:02x}{:02x}", r, g, b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
        }
    }

    /// Linear interpolation between two colors, `t` in 0.0..=1.0.
    pub fn lerp(&self, other: &Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        Color::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }
}
