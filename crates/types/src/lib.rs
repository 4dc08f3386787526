//! vizfield-types: Shared data types for the vizfield display pipeline.
//!
//! This crate contains pure data types (field configs, value mappings,
//! thresholds, display tuples, theme colors) that are shared across all
//! vizfield crates. These types have no engine dependencies, making them
//! suitable as a foundation layer.

pub mod color;
pub mod config;
pub mod display;
pub mod field;
pub mod mappings;
pub mod theme;
pub mod thresholds;
pub mod value;

// Re-export commonly used types at the crate root for convenience
pub use color::{Color, ColorParseError};
pub use config::{
    ConfigOverrideRule, DataLink, DynamicConfigValue, FieldColorConfig, FieldColorMode,
    FieldConfig, FieldConfigSource, MatcherConfig,
};
pub use display::{DisplayProcessor, DisplayValue, NumericRange, SharedDisplayProcessor};
pub use field::{DataFrame, Field, FieldState, FieldType};
pub use mappings::{SpecialValueMatch, ValueMapping, ValueMappingResult};
pub use theme::{Theme, ThemeMode};
pub use thresholds::{ThresholdStep, ThresholdsConfig, ThresholdsMode};
pub use value::FieldValue;
