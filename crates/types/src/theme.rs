//! Theme color resolution.
//!
//! Field configs reference colors by name ("red", "semi-dark-green") so a
//! dashboard can re-skin without rewriting every panel. The theme resolves
//! those names to concrete hex values and owns the palettes used by the
//! classic and continuous color modes. Strings the theme does not know
//! (raw hex, rgb() syntax) pass through unchanged.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::FieldColorMode;

/// Base hue ladder: for each hue, [super-light, light, base, semi-dark, dark].
const HUES: &[(&str, [&str; 5])] = &[
    ("red", ["#FFA6B0", "#FF7383", "#F2495C", "#E02F44", "#C4162A"]),
    ("green", ["#C8F2C2", "#96D98D", "#73BF69", "#56A64B", "#37872D"]),
    ("blue", ["#C0D8FF", "#8AB8FF", "#5794F2", "#3274D9", "#1F60C4"]),
    ("yellow", ["#FFF899", "#FFEE52", "#FADE2A", "#F2CC0C", "#E0B400"]),
    ("orange", ["#FFCB7D", "#FFB357", "#FF9830", "#FF780A", "#FA6400"]),
    ("purple", ["#DEB6F2", "#CA95E5", "#B877D9", "#A352CC", "#8F3BB8"]),
];

static NAMED_COLORS: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (hue, shades) in HUES {
        map.insert(format!("super-light-{hue}"), shades[0]);
        map.insert(format!("light-{hue}"), shades[1]);
        map.insert(hue.to_string(), shades[2]);
        map.insert(format!("semi-dark-{hue}"), shades[3]);
        map.insert(format!("dark-{hue}"), shades[4]);
    }
    map.insert("white".to_string(), "#FFFFFF");
    map.insert("black".to_string(), "#000000");
    map.insert("gray".to_string(), "#808080");
    map.insert("transparent".to_string(), "#00000000");
    map
});

/// Series palette for the classic (index-based) color mode.
const PALETTE_CLASSIC: &[&str] = &[
    "#73BF69", "#FADE2A", "#5794F2", "#FF9830", "#F2495C", "#B877D9", "#37872D", "#E0B400",
    "#1F60C4", "#FA6400", "#C4162A", "#8F3BB8",
];

const PALETTE_GR_YL_RD: &[&str] = &["#73BF69", "#FADE2A", "#F2495C"];
const PALETTE_RD_YL_GR: &[&str] = &["#F2495C", "#FADE2A", "#73BF69"];
const PALETTE_BLUES: &[&str] = &["#C0D8FF", "#5794F2", "#1F60C4"];
const PALETTE_REDS: &[&str] = &["#FFA6B0", "#F2495C", "#C4162A"];
const PALETTE_GREENS: &[&str] = &["#C8F2C2", "#73BF69", "#37872D"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ThemeMode {
    #[serde(rename = "dark")]
    #[default]
    Dark,
    #[serde(rename = "light")]
    Light,
}

/// Named-color and palette lookup for the display pipeline.
#[derive(Debug, Clone, Default)]
pub struct Theme {
    pub mode: ThemeMode,
    /// Host-registered names, consulted before the built-in table.
    custom: HashMap<String, String>,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            mode: ThemeMode::Dark,
            custom: HashMap::new(),
        }
    }

    pub fn light() -> Self {
        Self {
            mode: ThemeMode::Light,
            custom: HashMap::new(),
        }
    }

    /// Register (or shadow) a named color.
    pub fn with_color(mut self, name: impl Into<String>, css: impl Into<String>) -> Self {
        self.custom.insert(name.into(), css.into());
        self
    }

    /// The default foreground color, used as the fallback threshold color.
    pub fn text_color(&self) -> &'static str {
        match self.mode {
            ThemeMode::Dark => "#CCCCDC",
            ThemeMode::Light => "#24292E",
        }
    }

    /// Resolve a color name to a CSS color string. Unknown names (raw hex,
    /// rgb() syntax, host-specific strings) pass through unchanged.
    pub fn get_color_by_name(&self, name: &str) -> String {
        if let Some(css) = self.custom.get(name) {
            return css.clone();
        }
        if name == "text" {
            return self.text_color().to_string();
        }
        match NAMED_COLORS.get(name) {
            Some(css) => (*css).to_string(),
            None => name.to_string(),
        }
    }

    /// The series palette for the classic color mode.
    pub fn palette_classic(&self) -> &'static [&'static str] {
        PALETTE_CLASSIC
    }

    /// The gradient stops for a continuous color mode, `None` for modes
    /// that are not continuous.
    pub fn continuous_palette(&self, mode: FieldColorMode) -> Option<&'static [&'static str]> {
        match mode {
            FieldColorMode::ContinuousGrYlRd => Some(PALETTE_GR_YL_RD),
            FieldColorMode::ContinuousRdYlGr => Some(PALETTE_RD_YL_GR),
            FieldColorMode::ContinuousBlues => Some(PALETTE_BLUES),
            FieldColorMode::ContinuousReds => Some(PALETTE_REDS),
            FieldColorMode::ContinuousGreens => Some(PALETTE_GREENS),
            _ => None,
        }
    }
}
