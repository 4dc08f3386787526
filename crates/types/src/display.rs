//! Display output types and the processor interface.

use serde::{Deserialize, Serialize};
use std::rc::Rc;

use crate::value::FieldValue;

/// The resolved display tuple for one raw value.
///
/// `text` is always set (possibly empty). The formatting pipeline always
/// sets `numeric` to `Some` (possibly NaN); only the raw passthrough
/// processor leaves it `None`. `color`/`percent` are present once a scale
/// calculation ran for the value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DisplayValue {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
}

impl DisplayValue {
    /// Concatenate prefix, text and suffix into the final rendered string.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(prefix) = &self.prefix {
            out.push_str(prefix);
        }
        out.push_str(&self.text);
        if let Some(suffix) = &self.suffix {
            out.push_str(suffix);
        }
        out
    }
}

/// Turns one raw value into its resolved display tuple.
///
/// Processors are built once per field and invoked per value. The
/// caching wrapper uses interior mutability with no locking; a processor
/// belongs to one field and must not be shared across threads.
pub trait DisplayProcessor {
    fn process(&self, value: &FieldValue) -> DisplayValue;
}

/// Shared handle to a field's display processor.
pub type SharedDisplayProcessor = Rc<dyn DisplayProcessor>;

/// Numeric bounds over a dataset. `min`/`max` are `None` when no numeric
/// data exists; `delta` falls back through the missing bounds so percent
/// computations degrade to zero instead of dividing by nothing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub delta: f64,
}

impl NumericRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min,
            max,
            delta: max.unwrap_or(0.0) - min.unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_concatenates_parts() {
        let value = DisplayValue {
            text: "1.20".to_string(),
            numeric: Some(1200.0),
            prefix: Some("$".to_string()),
            suffix: Some(" K".to_string()),
            ..Default::default()
        };
        assert_eq!(value.render(), "$1.20 K");
    }

    #[test]
    fn test_numeric_range_delta() {
        assert_eq!(NumericRange::new(Some(-20.0), Some(80.0)).delta, 100.0);
        assert_eq!(NumericRange::new(None, None).delta, 0.0);
        assert_eq!(NumericRange::new(None, Some(10.0)).delta, 10.0);
    }
}
