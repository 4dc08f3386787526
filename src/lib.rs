//! vizfield: field display-value resolution for dashboard panels.
//!
//! This library turns raw field values into `{text, numeric, color,
//! prefix, suffix, percent}` display tuples, and resolves per-field
//! configuration by merging datasource configs, panel defaults and
//! matcher-gated override rules:
//! - Display processing: numeric coercion, value mappings, unit
//!   formatting and threshold/palette scaling in a fixed step order
//! - Override resolution: defaults merge, rule application and numeric
//!   range auto-fill over deep copies of the input frames
//! - Bounded per-field display caching for streaming re-renders

pub mod display;
pub mod overrides;

// Re-export commonly used types
pub use display::{
    caching_display_processor, get_display_processor, get_raw_display_processor,
    DisplayProcessorOptions, DISPLAY_CACHE_SIZE,
};
pub use overrides::{
    apply_field_overrides, apply_raw_field_overrides, find_numeric_field_min_max,
    set_dynamic_config_value, set_field_config_defaults, validate_field_config,
    ApplyFieldOverridesOptions,
};
pub use vizfield_core::{
    field_matchers, standard_property_registry, value_matchers, ConfigProperty,
    ConfigPropertyRegistry, CustomProperty, DisplayTimeZone, FieldMatcher, FieldMatcherRegistry,
    MatchContext, ScaleCalculator, UnitFormat, ValueMatcher, ValueMatcherRegistry,
};
pub use vizfield_types::{
    ConfigOverrideRule, DataFrame, DataLink, DisplayProcessor, DisplayValue, DynamicConfigValue,
    Field, FieldColorConfig, FieldColorMode, FieldConfig, FieldConfigSource, FieldType,
    FieldValue, MatcherConfig, NumericRange, SharedDisplayProcessor, Theme, ThresholdStep,
    ThresholdsConfig, ThresholdsMode, ValueMapping, ValueMappingResult,
};
