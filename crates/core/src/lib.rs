//! vizfield-core: Registries and algorithms for the vizfield display
//! pipeline.
//!
//! This crate contains the unit formatters, scale calculation, value
//! mapping evaluation, the field/value matcher registries and the config
//! property registry. The display-processor orchestration and override
//! resolution that tie these together live in the `vizfield` crate.

pub mod mappings;
pub mod matchers;
pub mod properties;
pub mod scale;
pub mod value_format;
pub mod value_matchers;

pub use mappings::get_value_mapping_result;
pub use matchers::{
    field_matchers, BoxedFieldMatcher, FieldMatcher, FieldMatcherFactory, FieldMatcherRegistry,
    MatchContext,
};
pub use properties::{
    standard_property_registry, BoxedConfigProperty, ConfigProperty, ConfigPropertyRegistry,
    CustomProperty,
};
pub use scale::{ScaleCalculator, ScaleResult};
pub use value_format::{
    is_boolean_unit, is_date_unit, parse_date_text, DecimalCount, DisplayTimeZone, FormattedValue,
    UnitFormat,
};
pub use value_matchers::{
    value_matchers, BoxedValueMatcher, ValueMatcher, ValueMatcherFactory, ValueMatcherRegistry,
};
