//! Value mapping rule types.
//!
//! Mappings translate specific raw values, numeric ranges, regex matches
//! or special values (null, NaN, booleans, empty) into display text and/or
//! color before generic unit formatting runs. They are evaluated strictly
//! in list order; the first matching rule wins.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The text/color a matching rule contributes. A result carrying only
/// `color` leaves text to the formatting pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ValueMappingResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ValueMappingResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            color: None,
        }
    }

    pub fn color(color: impl Into<String>) -> Self {
        Self {
            text: None,
            color: Some(color.into()),
        }
    }
}

/// Options for a numeric range rule; bounds are inclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RangeMapOptions {
    pub from: f64,
    pub to: f64,
    pub result: ValueMappingResult,
}

/// Options for a regex rule. The replacement text may use capture group
/// references (`$1`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegexMapOptions {
    pub pattern: String,
    pub result: ValueMappingResult,
}

/// Options for a special-value rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecialMapOptions {
    #[serde(rename = "match")]
    pub match_on: SpecialValueMatch,
    pub result: ValueMappingResult,
}

/// Non-scalar conditions a special-value rule can match on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SpecialValueMatch {
    #[serde(rename = "true")]
    True,
    #[serde(rename = "false")]
    False,
    #[serde(rename = "null")]
    Null,
    #[serde(rename = "nan")]
    NaN,
    #[serde(rename = "null+nan")]
    NullAndNaN,
    #[serde(rename = "empty")]
    Empty,
}

/// One ordered value-mapping rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "options", rename_all = "lowercase")]
pub enum ValueMapping {
    /// Exact match on the value's display string. Keys never match by
    /// numeric coercion: `"1000"` does not match the key `"1"`.
    Value(HashMap<String, ValueMappingResult>),
    Range(RangeMapOptions),
    Regex(RegexMapOptions),
    Special(SpecialMapOptions),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_serialization_shape() {
        let mapping = ValueMapping::Range(RangeMapOptions {
            from: 1.0,
            to: 9.0,
            result: ValueMappingResult::text("1-9"),
        });
        let json = serde_json::to_string(&mapping).unwrap();
        assert!(json.contains("\"type\":\"range\""));
        assert!(json.contains("\"options\""));

        let back: ValueMapping = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mapping);
    }

    #[test]
    fn test_special_match_wire_names() {
        let mapping = ValueMapping::Special(SpecialMapOptions {
            match_on: SpecialValueMatch::NullAndNaN,
            result: ValueMappingResult::text("missing"),
        });
        let json = serde_json::to_string(&mapping).unwrap();
        assert!(json.contains("\"match\":\"null+nan\""));
    }
}
