//! Per-field configuration and the override-rule source types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::mappings::ValueMapping;
use crate::thresholds::ThresholdsConfig;

/// How a field's color is derived.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum FieldColorMode {
    #[serde(rename = "thresholds")]
    #[default]
    Thresholds,
    #[serde(rename = "fixed")]
    Fixed,
    #[serde(rename = "palette-classic")]
    PaletteClassic,
    #[serde(rename = "continuous-gr-yl-rd")]
    ContinuousGrYlRd,
    #[serde(rename = "continuous-rd-yl-gr")]
    ContinuousRdYlGr,
    #[serde(rename = "continuous-blues")]
    ContinuousBlues,
    #[serde(rename = "continuous-reds")]
    ContinuousReds,
    #[serde(rename = "continuous-greens")]
    ContinuousGreens,
}

impl FieldColorMode {
    /// Continuous modes interpolate a palette at the value's percent and
    /// bypass thresholds entirely.
    pub fn is_continuous(self) -> bool {
        matches!(
            self,
            FieldColorMode::ContinuousGrYlRd
                | FieldColorMode::ContinuousRdYlGr
                | FieldColorMode::ContinuousBlues
                | FieldColorMode::ContinuousReds
                | FieldColorMode::ContinuousGreens
        )
    }
}

/// Color section of a field config. `mode` may be absent in hand-edited
/// configs; validation drops the whole section in that case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FieldColorConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<FieldColorMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_color: Option<String>,
}

impl FieldColorConfig {
    pub fn mode(mode: FieldColorMode) -> Self {
        Self {
            mode: Some(mode),
            fixed_color: None,
        }
    }
}

/// A context link attached to a field's values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DataLink {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub target_blank: bool,
}

/// Per-field configuration: everything the display pipeline needs to turn
/// a raw value into a display tuple.
///
/// `min > max` is tolerated on input and swapped during validation. The
/// `custom` map carries plugin-defined properties that the core registry
/// does not interpret.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FieldConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// `None` means automatic decimal selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Placeholder text when a value stringifies to nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<ThresholdsConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mappings: Vec<ValueMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<FieldColorConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<DataLink>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom: Map<String, JsonValue>,
}

/// Selects the fields an override rule applies to. `options` is
/// matcher-specific and interpreted by the matcher factory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatcherConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub options: JsonValue,
}

impl MatcherConfig {
    pub fn new(id: impl Into<String>, options: JsonValue) -> Self {
        Self {
            id: id.into(),
            options,
        }
    }
}

/// One property write carried by an override rule. A `null` value unsets
/// the property on matching fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DynamicConfigValue {
    pub id: String,
    #[serde(default)]
    pub value: JsonValue,
}

impl DynamicConfigValue {
    pub fn new(id: impl Into<String>, value: JsonValue) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }
}

/// A matcher plus the ordered property writes it applies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigOverrideRule {
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub properties: Vec<DynamicConfigValue>,
}

/// Panel-level field configuration: defaults merged into every field,
/// plus matcher-gated override rules applied in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FieldConfigSource {
    #[serde(default)]
    pub defaults: FieldConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<ConfigOverrideRule>,
}
