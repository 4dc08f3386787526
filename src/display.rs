//! Display processors.
//!
//! A processor is built once per field and turns raw values into
//! `DisplayValue` tuples. The pipeline runs a fixed step order per value:
//! date promotion, numeric coercion, value mappings, unit formatting,
//! scale lookup, stringification fallback and finally the base-color
//! fallback for values that never produced a color.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use vizfield_core::scale::ScaleCalculator;
use vizfield_core::value_format::{
    is_boolean_unit, is_date_unit, parse_date_text, DisplayTimeZone, UnitFormat,
};
use vizfield_core::mappings::get_value_mapping_result;
use vizfield_types::{
    Color, DisplayProcessor, DisplayValue, Field, FieldConfig, FieldType, FieldValue,
    SharedDisplayProcessor, Theme,
};

/// Capacity of the per-field display cache.
pub const DISPLAY_CACHE_SIZE: usize = 2500;

/// Options for building a display processor.
pub struct DisplayProcessorOptions<'a> {
    /// The resolved field; `None` builds the stringify-shortcut processor.
    pub field: Option<&'a Field>,
    pub theme: &'a Theme,
    /// Zone used by date units; defaults to the environment's local zone.
    pub time_zone: DisplayTimeZone,
}

/// Build the display processor for a field.
pub fn get_display_processor(options: DisplayProcessorOptions) -> SharedDisplayProcessor {
    let Some(field) = options.field else {
        return Rc::new(StringProcessor);
    };

    let config = &field.config;
    let mut unit = config.unit.clone();
    let mut has_date_unit = unit.as_deref().is_some_and(is_date_unit);
    let mut show_ms = false;

    if field.field_type == FieldType::Time && !has_date_unit {
        unit = Some("dateTimeAsSystem".to_string());
        has_date_unit = true;
        // Sub-second digits only help when the display window is a minute
        // or less.
        if field.values.len() > 1 {
            let window = |value: &FieldValue| -> Option<f64> {
                match value {
                    FieldValue::String(s) => parse_date_text(s).map(|ms| ms / 1e3),
                    other => {
                        let n = other.to_numeric();
                        (!n.is_nan()).then_some(n / 1e3)
                    }
                }
            };
            if let (Some(start), Some(end)) = (
                window(&field.values[0]),
                window(&field.values[field.values.len() - 1]),
            ) {
                show_ms = end - start < 60.0;
            }
        }
    } else if field.field_type == FieldType::Boolean
        && !unit.as_deref().is_some_and(is_boolean_unit)
    {
        unit = Some("bool".to_string());
    }

    let unit_id = unit.as_deref().unwrap_or("none");
    Rc::new(PipelineProcessor {
        config: config.clone(),
        unit_is_string: unit_id == "string",
        has_date_unit,
        show_ms,
        format: UnitFormat::resolve(unit_id),
        scale: ScaleCalculator::new(field, options.theme),
        theme: options.theme.clone(),
        time_zone: options.time_zone,
    })
}

/// Debug/raw passthrough: stringifies the underlying value and reports no
/// numeric at all, bypassing the entire pipeline.
pub fn get_raw_display_processor() -> SharedDisplayProcessor {
    Rc::new(RawProcessor)
}

/// The shortcut processor used when no formatting metadata exists.
struct StringProcessor;

impl DisplayProcessor for StringProcessor {
    fn process(&self, value: &FieldValue) -> DisplayValue {
        DisplayValue {
            text: value.display_string(),
            numeric: Some(value.to_numeric()),
            ..Default::default()
        }
    }
}

struct RawProcessor;

impl DisplayProcessor for RawProcessor {
    fn process(&self, value: &FieldValue) -> DisplayValue {
        DisplayValue {
            text: value.raw_string(),
            numeric: None,
            ..Default::default()
        }
    }
}

struct PipelineProcessor {
    config: FieldConfig,
    unit_is_string: bool,
    has_date_unit: bool,
    show_ms: bool,
    format: UnitFormat,
    scale: ScaleCalculator,
    theme: Theme,
    time_zone: DisplayTimeZone,
}

impl DisplayProcessor for PipelineProcessor {
    fn process(&self, raw: &FieldValue) -> DisplayValue {
        // Date units accept textual timestamps; the parsed epoch replaces
        // the raw value for everything downstream, mappings included.
        let parsed_date;
        let value = if self.has_date_unit {
            match raw.as_str().and_then(parse_date_text) {
                Some(epoch_ms) => {
                    parsed_date = FieldValue::Number(epoch_ms);
                    &parsed_date
                }
                None => raw,
            }
        } else {
            raw
        };

        let numeric = if self.unit_is_string {
            f64::NAN
        } else {
            value.to_numeric()
        };

        let mut text: Option<String> = None;
        let mut prefix: Option<String> = None;
        let mut suffix: Option<String> = None;
        let mut color: Option<String> = None;
        let mut percent: Option<f64> = None;

        if !self.config.mappings.is_empty() {
            if let Some(result) = get_value_mapping_result(&self.config.mappings, value) {
                text = result.text;
                color = result.color.map(|name| self.theme.get_color_by_name(&name));
            }
        }

        if !numeric.is_nan() {
            if text.is_none() && !matches!(value, FieldValue::Bool(_)) {
                let formatted = self.format.format(
                    numeric,
                    self.config.decimals,
                    self.time_zone,
                    self.show_ms,
                );
                text = Some(formatted.text);
                prefix = formatted.prefix;
                suffix = formatted.suffix;
            }

            if color.is_none() {
                let scaled = self.scale.scale(numeric);
                color = Some(scaled.color);
                percent = Some(scaled.percent);
            }
        }

        if text.is_none() {
            let fallback = value.display_string();
            text = Some(if fallback.is_empty() {
                self.config.no_value.clone().unwrap_or_default()
            } else {
                fallback
            });
        }

        if color.is_none() {
            let scaled = self.scale.scale(f64::NEG_INFINITY);
            color = Some(scaled.color);
            percent = Some(scaled.percent);
        }

        DisplayValue {
            text: text.unwrap_or_default(),
            numeric: Some(numeric),
            color,
            prefix,
            suffix,
            percent,
        }
    }
}

/// Cache key over primitive raw values. Composite values (arrays,
/// objects) bypass the cache; their identity never repeats across
/// streaming packets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Null,
    Bool(bool),
    Number(u64),
    Text(String),
}

impl CacheKey {
    fn from_value(value: &FieldValue) -> Option<CacheKey> {
        match value {
            FieldValue::Null => Some(CacheKey::Null),
            FieldValue::Bool(b) => Some(CacheKey::Bool(*b)),
            FieldValue::Number(n) => Some(CacheKey::Number(n.to_bits())),
            FieldValue::String(s) => Some(CacheKey::Text(s.clone())),
            FieldValue::Array(_) | FieldValue::Object(_) => None,
        }
    }
}

/// Bounded memoization wrapper around a display processor.
///
/// Streaming re-renders reprocess every buffered value per update; the
/// cache makes that a lookup. On overflow the whole map is cleared before
/// inserting, not LRU-evicted. Colors are normalized to fixed hex form
/// before caching so downstream consumers can test for alpha with a
/// string-length check.
pub struct CachingProcessor {
    inner: SharedDisplayProcessor,
    capacity: usize,
    cache: RefCell<HashMap<CacheKey, DisplayValue>>,
}

impl CachingProcessor {
    pub fn new(inner: SharedDisplayProcessor, capacity: usize) -> Self {
        Self {
            inner,
            capacity: capacity.max(1),
            cache: RefCell::new(HashMap::new()),
        }
    }

    fn compute(&self, value: &FieldValue) -> DisplayValue {
        let mut display = self.inner.process(value);
        if let Some(css) = &display.color {
            if let Ok(color) = Color::from_css(css) {
                display.color = Some(color.to_hex_string());
            }
        }
        display
    }
}

impl DisplayProcessor for CachingProcessor {
    fn process(&self, value: &FieldValue) -> DisplayValue {
        let Some(key) = CacheKey::from_value(value) else {
            return self.compute(value);
        };

        if let Some(hit) = self.cache.borrow().get(&key) {
            return hit.clone();
        }

        let display = self.compute(value);
        let mut cache = self.cache.borrow_mut();
        if cache.len() >= self.capacity {
            cache.clear();
        }
        cache.insert(key, display.clone());
        display
    }
}

/// Wrap a processor with the bounded display cache.
pub fn caching_display_processor(
    inner: SharedDisplayProcessor,
    capacity: usize,
) -> SharedDisplayProcessor {
    Rc::new(CachingProcessor::new(inner, capacity))
}
