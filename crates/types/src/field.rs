//! Fields and data frames: named, typed columns of values plus their
//! configuration and, once resolved, their display processor.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::FieldConfig;
use crate::display::{NumericRange, SharedDisplayProcessor};
use crate::value::FieldValue;

/// Type of data a field contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FieldType {
    /// Epoch-millisecond timestamps
    #[serde(rename = "time")]
    Time,
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "string")]
    String,
    #[serde(rename = "boolean")]
    Boolean,
    /// Unknown; resolution tries to guess a real type from the values
    #[serde(rename = "other")]
    #[default]
    Other,
}

impl FieldType {
    /// Guess a concrete type from the first non-null value.
    pub fn guess_from_values(values: &[FieldValue]) -> Option<FieldType> {
        for value in values {
            match value {
                FieldValue::Null => continue,
                FieldValue::Number(_) => return Some(FieldType::Number),
                FieldValue::Bool(_) => return Some(FieldType::Boolean),
                FieldValue::String(s) => {
                    return Some(if FieldValue::from(s.as_str()).is_numeric() {
                        FieldType::Number
                    } else {
                        FieldType::String
                    });
                }
                FieldValue::Array(_) | FieldValue::Object(_) => return Some(FieldType::Other),
            }
        }
        None
    }
}

/// Runtime state attached to a field during override resolution. Never
/// serialized; rebuilt on every `apply_field_overrides` call.
#[derive(Clone, Default)]
pub struct FieldState {
    /// Resolved numeric range (field config bounds filled from the
    /// dataset-wide scan where absent).
    pub range: Option<NumericRange>,
    /// Position of this field among the call's non-time fields.
    pub series_index: Option<usize>,
    /// The display processor wired up for this field.
    pub display: Option<SharedDisplayProcessor>,
}

impl fmt::Debug for FieldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldState")
            .field("range", &self.range)
            .field("series_index", &self.series_index)
            .field("display", &self.display.is_some())
            .finish()
    }
}

/// A named, typed column of values plus its configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub config: FieldConfig,
    #[serde(default)]
    pub values: Vec<FieldValue>,
    #[serde(skip)]
    pub state: FieldState,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType, values: Vec<FieldValue>) -> Self {
        Self {
            name: name.into(),
            field_type,
            config: FieldConfig::default(),
            values,
            state: FieldState::default(),
        }
    }

    pub fn with_config(mut self, config: FieldConfig) -> Self {
        self.config = config;
        self
    }

    /// The name rules and consumers match against: the configured display
    /// name when set, the field name otherwise. Override rules that rename
    /// a field affect how later rules match it.
    pub fn display_name(&self) -> &str {
        self.config
            .display_name
            .as_deref()
            .unwrap_or(&self.name)
    }

    /// Run the resolved display processor, if one has been attached.
    pub fn display(&self, value: &FieldValue) -> Option<crate::display::DisplayValue> {
        self.state.display.as_ref().map(|p| p.process(value))
    }
}

/// An ordered set of fields sharing the same row count.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DataFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl DataFrame {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            name: None,
            ref_id: None,
            fields,
        }
    }

    pub fn named(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: Some(name.into()),
            ref_id: None,
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_field_type() {
        assert_eq!(
            FieldType::guess_from_values(&[FieldValue::Null, FieldValue::from(1.5)]),
            Some(FieldType::Number)
        );
        assert_eq!(
            FieldType::guess_from_values(&[FieldValue::from("3.14")]),
            Some(FieldType::Number)
        );
        assert_eq!(
            FieldType::guess_from_values(&[FieldValue::from("hello")]),
            Some(FieldType::String)
        );
        assert_eq!(
            FieldType::guess_from_values(&[FieldValue::from(true)]),
            Some(FieldType::Boolean)
        );
        assert_eq!(FieldType::guess_from_values(&[FieldValue::Null]), None);
        assert_eq!(FieldType::guess_from_values(&[]), None);
    }

    #[test]
    fn test_display_name_prefers_config() {
        let mut field = Field::new("value", FieldType::Number, vec![]);
        assert_eq!(field.display_name(), "value");
        field.config.display_name = Some("Kittens".to_string());
        assert_eq!(field.display_name(), "Kittens");
    }

    #[test]
    fn test_field_serialization_skips_state() {
        let field = Field::new("x", FieldType::Number, vec![FieldValue::from(1.0)]);
        let json = serde_json::to_string(&field).unwrap();
        assert!(json.contains("\"type\":\"number\""));
        assert!(!json.contains("state"));

        let back: Field = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "x");
        assert!(back.state.display.is_none());
    }
}
