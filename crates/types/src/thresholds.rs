//! Threshold step configuration.
//!
//! A threshold ladder is an ascending sequence of `(value, color)` steps.
//! The first step is the base step: its value is `-Infinity` so that every
//! input, including the `-Infinity` fallback probe, selects exactly one
//! step. JSON cannot represent `-Infinity`, so the base step serializes
//! its value as `null`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How step values are interpreted against the incoming number.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ThresholdsMode {
    #[serde(rename = "absolute")]
    #[default]
    Absolute,
    /// Step values are percentages of the field's min/max range.
    #[serde(rename = "percentage")]
    Percentage,
}

/// A single `(value, color)` threshold step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdStep {
    #[serde(
        serialize_with = "serialize_step_value",
        deserialize_with = "deserialize_step_value",
        default = "neg_infinity"
    )]
    pub value: f64,
    pub color: String,
}

impl ThresholdStep {
    pub fn new(value: f64, color: impl Into<String>) -> Self {
        Self {
            value,
            color: color.into(),
        }
    }

    /// The always-matching base step.
    pub fn base(color: impl Into<String>) -> Self {
        Self::new(f64::NEG_INFINITY, color)
    }
}

fn neg_infinity() -> f64 {
    f64::NEG_INFINITY
}

fn serialize_step_value<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_none()
    }
}

fn deserialize_step_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value: Option<f64> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or(f64::NEG_INFINITY))
}

/// Threshold ladder configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdsConfig {
    #[serde(default)]
    pub mode: ThresholdsMode,
    #[serde(default)]
    pub steps: Vec<ThresholdStep>,
}

impl ThresholdsConfig {
    pub fn new(mode: ThresholdsMode, steps: Vec<ThresholdStep>) -> Self {
        Self { mode, steps }
    }

    /// The active step for a value: the last step whose `value <= input`.
    /// The first step matches unconditionally, which makes selection total
    /// even for `-Infinity` probes. Returns `None` only for an empty ladder.
    pub fn active_step(&self, value: f64) -> Option<&ThresholdStep> {
        let mut active = self.steps.first()?;
        for step in &self.steps {
            if value >= step.value {
                active = step;
            } else {
                break;
            }
        }
        Some(active)
    }

    /// Restore the ascending-order invariant after external edits.
    pub fn sort_steps(&mut self) {
        self.steps
            .sort_by(|a, b| a.value.partial_cmp(&b.value).unwrap_or(std::cmp::Ordering::Equal));
    }
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            mode: ThresholdsMode::Absolute,
            steps: vec![ThresholdStep::base("green"), ThresholdStep::new(80.0, "red")],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder() -> ThresholdsConfig {
        ThresholdsConfig::new(
            ThresholdsMode::Absolute,
            vec![
                ThresholdStep::base("#000"),
                ThresholdStep::new(0.0, "#100"),
                ThresholdStep::new(100.0, "#200"),
            ],
        )
    }

    #[test]
    fn test_active_step_walks_ascending() {
        let t = ladder();
        assert_eq!(t.active_step(-25.0).unwrap().color, "#000");
        assert_eq!(t.active_step(0.0).unwrap().color, "#100");
        assert_eq!(t.active_step(50.0).unwrap().color, "#100");
        assert_eq!(t.active_step(100.0).unwrap().color, "#200");
        assert_eq!(t.active_step(1e9).unwrap().color, "#200");
    }

    #[test]
    fn test_negative_infinity_selects_base() {
        let t = ladder();
        assert_eq!(t.active_step(f64::NEG_INFINITY).unwrap().color, "#000");
    }

    #[test]
    fn test_selection_is_total_even_below_first_value() {
        // A malformed ladder without a -inf base still yields its first step.
        let t = ThresholdsConfig::new(
            ThresholdsMode::Absolute,
            vec![ThresholdStep::new(10.0, "#abc")],
        );
        assert_eq!(t.active_step(-5.0).unwrap().color, "#abc");
        assert!(ThresholdsConfig::new(ThresholdsMode::Absolute, vec![])
            .active_step(1.0)
            .is_none());
    }

    #[test]
    fn test_base_step_serializes_as_null() {
        let t = ladder();
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("\"value\":null"));

        let back: ThresholdsConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.steps[0].value, f64::NEG_INFINITY);
        assert_eq!(back, t);
    }

    #[test]
    fn test_sort_steps() {
        let mut t = ThresholdsConfig::new(
            ThresholdsMode::Absolute,
            vec![
                ThresholdStep::new(50.0, "b"),
                ThresholdStep::base("a"),
                ThresholdStep::new(10.0, "c"),
            ],
        );
        t.sort_steps();
        let order: Vec<&str> = t.steps.iter().map(|s| s.color.as_str()).collect();
        assert_eq!(order, vec!["a", "c", "b"]);
    }
}
