//! Raw field values and their canonical conversions.
//!
//! Datasources hand the pipeline arbitrary scalars, arrays and objects.
//! `FieldValue` models that space while keeping `NaN`/`Infinity`
//! representable (JSON cannot hold them, float columns can), and owns the
//! conversions everything downstream agrees on: numeric coercion and the
//! JS-compatible display/raw stringifications.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// A single raw value in a field's value vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<FieldValue>),
    Object(Map<String, JsonValue>),
}

impl FieldValue {
    /// Coerce any raw value to a number. Never fails; unmappable inputs
    /// become `NaN`.
    ///
    /// Rules: null is `NaN`, booleans are 1/0, numbers pass through
    /// (including `NaN`/`Infinity`), strings parse as a whole or become
    /// `NaN` (empty and whitespace-only included), arrays and objects are
    /// `NaN`.
    pub fn to_numeric(&self) -> f64 {
        match self {
            FieldValue::Null => f64::NAN,
            FieldValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            FieldValue::Number(n) => *n,
            FieldValue::String(s) => parse_numeric_text(s),
            FieldValue::Array(_) | FieldValue::Object(_) => f64::NAN,
        }
    }

    /// True when the value can participate in numeric range comparisons:
    /// a non-NaN number (infinities count) or a string that parses fully.
    pub fn is_numeric(&self) -> bool {
        match self {
            FieldValue::Number(n) => !n.is_nan(),
            FieldValue::String(s) => {
                !s.trim().is_empty() && !parse_numeric_text(s).is_nan()
            }
            _ => false,
        }
    }

    /// The display stringification used by the formatting pipeline.
    ///
    /// Null renders as the empty string, arrays join their elements with
    /// commas (recursively) and plain objects render as
    /// `[object Object]`. These outputs are contractual; downstream
    /// consumers rely on them exactly.
    pub fn display_string(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            _ => self.stringify(),
        }
    }

    /// The raw stringification used by the passthrough processor.
    /// Identical to [`display_string`](Self::display_string) except that
    /// null renders as the literal `"null"`.
    pub fn raw_string(&self) -> String {
        match self {
            FieldValue::Null => "null".to_string(),
            _ => self.stringify(),
        }
    }

    fn stringify(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Number(n) => format_number_text(*n),
            FieldValue::String(s) => s.clone(),
            FieldValue::Array(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.display_string()).collect();
                parts.join(",")
            }
            FieldValue::Object(_) => "[object Object]".to_string(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<JsonValue> for FieldValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => FieldValue::Null,
            JsonValue::Bool(b) => FieldValue::Bool(b),
            JsonValue::Number(n) => FieldValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => FieldValue::String(s),
            JsonValue::Array(items) => {
                FieldValue::Array(items.into_iter().map(FieldValue::from).collect())
            }
            JsonValue::Object(map) => FieldValue::Object(map),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

/// Parse a string the way `Number()` would: trimmed, whole-string only,
/// with `0x` hex accepted. Partial parses like `"20whatever"` yield `NaN`.
fn parse_numeric_text(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return f64::NAN;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return i64::from_str_radix(hex, 16)
            .map(|v| v as f64)
            .unwrap_or(f64::NAN);
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Render a number the way the display stringification expects: integral
/// values without a decimal point, `NaN`/`Infinity` spelled out.
pub fn format_number_text(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    // Integral values inside the exactly-representable window print as
    // integers; everything else uses the shortest round-trip form.
    if value.fract() == 0.0 && value.abs() < 9.007_199_254_740_992e15 {
        return format!("{}", value as i64);
    }
    format!("{}", value)
}
