//! Scale calculation: numeric value to color and percent.
//!
//! A calculator is resolved once per field (color mode, range,
//! thresholds) and then queried per value. Probing with `-Infinity`
//! deterministically selects the base threshold step; this is the
//! fallback used for values that never produced a color (null/NaN).

use vizfield_types::{
    Color, Field, FieldColorMode, FieldType, FieldValue, NumericRange, Theme, ThresholdsConfig,
    ThresholdsMode,
};

/// Result of scaling one numeric value.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleResult {
    pub color: String,
    pub percent: f64,
}

enum ColorSource {
    /// Color of the active threshold step, resolved through the theme
    ActiveStep,
    /// Pre-resolved constant (fixed color or classic palette pick)
    Fixed(String),
    /// Interpolate a gradient palette at the value's percent
    Continuous(&'static [&'static str]),
}

enum ScaleKind {
    /// Boolean fields color by truthiness, percent 0/1
    Boolean {
        true_color: String,
        false_color: String,
    },
    Standard {
        thresholds: Option<ThresholdsConfig>,
        color: ColorSource,
        min: Option<f64>,
        delta: f64,
    },
}

/// Maps a numeric value to `{color, percent}` for one field.
pub struct ScaleCalculator {
    kind: ScaleKind,
    theme: Theme,
}

impl ScaleCalculator {
    pub fn new(field: &Field, theme: &Theme) -> Self {
        let mode = field
            .config
            .color
            .as_ref()
            .and_then(|color| color.mode)
            .unwrap_or(FieldColorMode::Thresholds);

        if field.field_type == FieldType::Boolean {
            let (true_color, false_color) = match theme.continuous_palette(mode) {
                Some(palette) => (
                    palette[palette.len() - 1].to_string(),
                    palette[0].to_string(),
                ),
                None => (
                    theme.get_color_by_name("green"),
                    theme.get_color_by_name("red"),
                ),
            };
            return Self {
                kind: ScaleKind::Boolean {
                    true_color,
                    false_color,
                },
                theme: theme.clone(),
            };
        }

        let range = field.state.range.unwrap_or_else(|| resolve_range(field));

        let color = if let Some(palette) = theme.continuous_palette(mode) {
            ColorSource::Continuous(palette)
        } else {
            match mode {
                FieldColorMode::Fixed => {
                    let name = field
                        .config
                        .color
                        .as_ref()
                        .and_then(|color| color.fixed_color.as_deref())
                        .unwrap_or("gray");
                    ColorSource::Fixed(theme.get_color_by_name(name))
                }
                FieldColorMode::PaletteClassic => {
                    let palette = theme.palette_classic();
                    let index = field.state.series_index.unwrap_or(0) % palette.len();
                    ColorSource::Fixed(palette[index].to_string())
                }
                _ => ColorSource::ActiveStep,
            }
        };

        Self {
            kind: ScaleKind::Standard {
                thresholds: field.config.thresholds.clone(),
                color,
                min: range.min,
                delta: range.delta,
            },
            theme: theme.clone(),
        }
    }

    pub fn scale(&self, value: f64) -> ScaleResult {
        match &self.kind {
            ScaleKind::Boolean {
                true_color,
                false_color,
            } => {
                // Truthiness mirrors the raw value: nonzero (including
                // the -Infinity fallback probe) is true, 0/NaN is false.
                if value != 0.0 && !value.is_nan() {
                    ScaleResult {
                        color: true_color.clone(),
                        percent: 1.0,
                    }
                } else {
                    ScaleResult {
                        color: false_color.clone(),
                        percent: 0.0,
                    }
                }
            }
            ScaleKind::Standard {
                thresholds,
                color,
                min,
                delta,
            } => {
                let percent = if value == f64::NEG_INFINITY || *delta <= 0.0 {
                    0.0
                } else {
                    let raw = (value - min.unwrap_or(0.0)) / delta;
                    if raw.is_nan() {
                        0.0
                    } else {
                        raw.clamp(0.0, 1.0)
                    }
                };

                let color = match color {
                    ColorSource::Fixed(css) => css.clone(),
                    ColorSource::Continuous(palette) => interpolate_palette(palette, percent),
                    ColorSource::ActiveStep => {
                        let probe = match thresholds.as_ref().map(|t| t.mode) {
                            // -Infinity must still select the base step in
                            // percentage mode
                            Some(ThresholdsMode::Percentage)
                                if value != f64::NEG_INFINITY =>
                            {
                                percent * 100.0
                            }
                            _ => value,
                        };
                        match thresholds.as_ref().and_then(|t| t.active_step(probe)) {
                            Some(step) => self.theme.get_color_by_name(&step.color),
                            None => self.theme.text_color().to_string(),
                        }
                    }
                };

                ScaleResult { color, percent }
            }
        }
    }
}

/// Range for fields resolved outside `apply_field_overrides` (which
/// fills ranges dataset-wide): config bounds first, then the field's own
/// values, then the 0..100 default. Non-numeric fields always scale
/// against 0..100.
fn resolve_range(field: &Field) -> NumericRange {
    if field.field_type != FieldType::Number {
        return NumericRange::new(Some(0.0), Some(100.0));
    }
    let mut min = field.config.min;
    let mut max = field.config.max;
    if min.is_none() || max.is_none() {
        let scanned = local_numeric_range(&field.values);
        min = min.or(scanned.min).or(Some(0.0));
        max = max.or(scanned.max).or(Some(100.0));
    }
    NumericRange::new(min, max)
}

fn local_numeric_range(values: &[FieldValue]) -> NumericRange {
    let mut min: Option<f64> = None;
    let mut max: Option<f64> = None;
    for value in values {
        let numeric = value.to_numeric();
        if numeric.is_nan() {
            continue;
        }
        min = Some(min.map_or(numeric, |m| m.min(numeric)));
        max = Some(max.map_or(numeric, |m| m.max(numeric)));
    }
    NumericRange::new(min, max)
}

fn interpolate_palette(palette: &[&str], percent: f64) -> String {
    match palette.len() {
        0 => String::new(),
        1 => palette[0].to_string(),
        len => {
            let position = percent.clamp(0.0, 1.0) * (len - 1) as f64;
            let index = position.floor() as usize;
            let fraction = position - index as f64;
            if fraction == 0.0 || index + 1 >= len {
                return palette[index].to_string();
            }
            let start = Color::from_css(palette[index]).unwrap_or_default();
            let end = Color::from_css(palette[index + 1]).unwrap_or_default();
            start.lerp(&end, fraction).to_hex_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vizfield_types::{FieldColorConfig, ThresholdStep};

    fn number_field(min: Option<f64>, max: Option<f64>) -> Field {
        let mut field = Field::new("value", FieldType::Number, vec![]);
        field.config.min = min;
        field.config.max = max;
        field.state.range = Some(NumericRange::new(min, max));
        field
    }

    fn steps() -> ThresholdsConfig {
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
    fn test_absolute_threshold_colors() {
        let mut field = number_field(Some(0.0), Some(100.0));
        field.config.thresholds = Some(steps());
        let calc = ScaleCalculator::new(&field, &Theme::dark());

        assert_eq!(calc.scale(-10.0).color, "#000");
        assert_eq!(calc.scale(50.0).color, "#100");
        assert_eq!(calc.scale(150.0).color, "#200");
    }

    #[test]
    fn test_negative_infinity_selects_base_step() {
        let mut field = number_field(Some(0.0), Some(100.0));
        field.config.thresholds = Some(steps());
        let calc = ScaleCalculator::new(&field, &Theme::dark());

        let result = calc.scale(f64::NEG_INFINITY);
        assert_eq!(result.color, "#000");
        assert_eq!(result.percent, 0.0);
    }

    #[test]
    fn test_percentage_mode_normalizes_against_range() {
        let mut field = number_field(Some(0.0), Some(200.0));
        field.config.thresholds = Some(ThresholdsConfig::new(
            ThresholdsMode::Percentage,
            vec![ThresholdStep::base("low"), ThresholdStep::new(50.0, "high")],
        ));
        let calc = ScaleCalculator::new(&field, &Theme::dark());

        // 60 of 0..200 is 30 percent, below the 50 percent step
        assert_eq!(calc.scale(60.0).color, Theme::dark().get_color_by_name("low"));
        assert_eq!(calc.scale(150.0).color, Theme::dark().get_color_by_name("high"));
        // the fallback probe still lands on the base step
        assert_eq!(
            calc.scale(f64::NEG_INFINITY).color,
            Theme::dark().get_color_by_name("low")
        );
    }

    #[test]
    fn test_percent_is_clamped() {
        let mut field = number_field(Some(0.0), Some(100.0));
        field.config.thresholds = Some(steps());
        let calc = ScaleCalculator::new(&field, &Theme::dark());

        assert_eq!(calc.scale(50.0).percent, 0.5);
        assert_eq!(calc.scale(500.0).percent, 1.0);
        assert_eq!(calc.scale(-500.0).percent, 0.0);
    }

    #[test]
    fn test_degenerate_range_gives_zero_percent() {
        let field = number_field(None, None);
        let calc = ScaleCalculator::new(&field, &Theme::dark());
        assert_eq!(calc.scale(42.0).percent, 0.0);
    }

    #[test]
    fn test_missing_thresholds_use_text_color() {
        let field = number_field(Some(0.0), Some(100.0));
        let calc = ScaleCalculator::new(&field, &Theme::dark());
        assert_eq!(calc.scale(50.0).color, Theme::dark().text_color());
    }

    #[test]
    fn test_fixed_color_mode() {
        let mut field = number_field(Some(0.0), Some(100.0));
        field.config.color = Some(FieldColorConfig {
            mode: Some(FieldColorMode::Fixed),
            fixed_color: Some("red".to_string()),
        });
        let calc = ScaleCalculator::new(&field, &Theme::dark());
        assert_eq!(calc.scale(10.0).color, "#F2495C");
    }

    #[test]
    fn test_classic_palette_uses_series_index() {
        let theme = Theme::dark();
        let mut field = number_field(Some(0.0), Some(100.0));
        field.config.color = Some(FieldColorConfig::mode(FieldColorMode::PaletteClassic));

        field.state.series_index = Some(0);
        let calc = ScaleCalculator::new(&field, &theme);
        assert_eq!(calc.scale(10.0).color, "#73BF69");

        field.state.series_index = Some(1);
        let calc = ScaleCalculator::new(&field, &theme);
        assert_eq!(calc.scale(10.0).color, "#FADE2A");
    }

    #[test]
    fn test_continuous_palette_interpolates() {
        let mut field = number_field(Some(0.0), Some(100.0));
        field.config.color = Some(FieldColorConfig::mode(FieldColorMode::ContinuousGrYlRd));
        let calc = ScaleCalculator::new(&field, &Theme::dark());

        assert_eq!(calc.scale(0.0).color, "#73BF69");
        assert_eq!(calc.scale(50.0).color, "#FADE2A");
        assert_eq!(calc.scale(100.0).color, "#F2495C");
        // midpoints interpolate between the stops
        let mid = calc.scale(25.0).color;
        assert!(mid.starts_with('#') && mid.len() == 7);
    }

    #[test]
    fn test_boolean_scale() {
        let field = Field::new("ok", FieldType::Boolean, vec![]);
        let calc = ScaleCalculator::new(&field, &Theme::dark());

        let truthy = calc.scale(1.0);
        assert_eq!(truthy.color, "#73BF69");
        assert_eq!(truthy.percent, 1.0);

        let falsy = calc.scale(0.0);
        assert_eq!(falsy.color, "#F2495C");
        assert_eq!(falsy.percent, 0.0);

        // the -Infinity fallback probe counts as truthy, NaN does not
        assert_eq!(calc.scale(f64::NEG_INFINITY).percent, 1.0);
        assert_eq!(calc.scale(f64::NAN).percent, 0.0);
    }

    #[test]
    fn test_local_range_from_values() {
        let field = Field::new(
            "v",
            FieldType::Number,
            vec![
                FieldValue::from(10.0),
                FieldValue::Null,
                FieldValue::from(-5.0),
                FieldValue::from(20.0),
            ],
        );
        let calc = ScaleCalculator::new(&field, &Theme::dark());
        // -5..20, value 7.5 is exactly halfway
        assert_eq!(calc.scale(7.5).percent, 0.5);
    }
}
