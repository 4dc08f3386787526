//! Field config override resolution.
//!
//! Merges per-datasource field configs, panel-level defaults and
//! matcher-gated override rules into the final per-field configuration,
//! then wires up each field's display processor. Inputs are never
//! mutated; the resolver works on deep copies and hands them back.

use anyhow::Result;

use crate::display::{
    caching_display_processor, get_display_processor, get_raw_display_processor,
    DisplayProcessorOptions, DISPLAY_CACHE_SIZE,
};
use vizfield_core::matchers::{field_matchers, BoxedFieldMatcher, MatchContext};
use vizfield_core::properties::{standard_property_registry, ConfigPropertyRegistry};
use vizfield_core::value_format::DisplayTimeZone;
use vizfield_types::{
    ConfigOverrideRule, DataFrame, DynamicConfigValue, FieldColorConfig, FieldColorMode,
    FieldConfig, FieldConfigSource, FieldType, NumericRange, Theme,
};

/// Options for [`apply_field_overrides`].
pub struct ApplyFieldOverridesOptions<'a> {
    pub frames: &'a [DataFrame],
    pub field_config: &'a FieldConfigSource,
    /// Property registry; the standard table when `None`.
    pub registry: Option<&'a ConfigPropertyRegistry>,
    pub theme: &'a Theme,
    pub time_zone: DisplayTimeZone,
}

/// Resolve every field's configuration and attach display processors.
///
/// Returns deep copies; the input frames are untouched. Per field, in
/// order: defaults merge, override rules (in list order, properties in
/// their own order), type guessing, numeric range fill from the lazily
/// computed dataset-wide min/max, series indexing and processor
/// construction. The only hard failure is an override rule referencing an
/// unknown matcher id.
pub fn apply_field_overrides(options: ApplyFieldOverridesOptions) -> Result<Vec<DataFrame>> {
    let registry: &ConfigPropertyRegistry = match options.registry {
        Some(registry) => registry,
        None => standard_property_registry(),
    };

    // Resolve the matchers up front: an unknown matcher id is a
    // configuration bug and must fail the call, not silently no-op.
    let rules: Vec<(BoxedFieldMatcher, &ConfigOverrideRule)> = options
        .field_config
        .overrides
        .iter()
        .map(|rule| Ok((field_matchers().resolve(&rule.matcher)?, rule)))
        .collect::<Result<_>>()?;

    // The dataset-wide min/max scan is shared by every field resolved in
    // this call and computed at most once.
    let mut global_range: Option<NumericRange> = None;
    let mut series_index = 0usize;

    let mut resolved_frames = Vec::with_capacity(options.frames.len());
    for frame in options.frames {
        let mut resolved = frame.clone();
        let ref_id = resolved.ref_id.clone();

        for index in 0..resolved.fields.len() {
            let field = &mut resolved.fields[index];

            set_field_config_defaults(
                &mut field.config,
                &options.field_config.defaults,
                field.field_type,
                registry,
            );

            let ctx = MatchContext {
                field_index: index,
                frame_ref_id: ref_id.as_deref(),
            };
            for (matcher, rule) in &rules {
                if matcher.matches(field, &ctx) {
                    log::debug!(
                        "override rule {:?} matched field {:?}",
                        rule.matcher.id,
                        field.name
                    );
                    for property in &rule.properties {
                        set_dynamic_config_value(&mut field.config, property, registry);
                    }
                }
            }

            if field.field_type == FieldType::Other {
                if let Some(guessed) = FieldType::guess_from_values(&field.values) {
                    field.field_type = guessed;
                }
            }

            if field.field_type == FieldType::Number {
                if (field.config.min.is_none() || field.config.max.is_none())
                    && global_range.is_none()
                {
                    global_range = Some(find_numeric_field_min_max(options.frames));
                }
                let fallback = global_range.unwrap_or_default();
                field.state.range = Some(NumericRange::new(
                    field.config.min.or(fallback.min),
                    field.config.max.or(fallback.max),
                ));
            }

            field.state.series_index = Some(series_index);
            if field.field_type != FieldType::Time {
                series_index += 1;
            }

            let processor = get_display_processor(DisplayProcessorOptions {
                field: Some(field),
                theme: options.theme,
                time_zone: options.time_zone,
            });
            // Relative time output changes with the clock and must not
            // be cached.
            field.state.display =
                Some(if field.config.unit.as_deref() == Some("dateTimeFromNow") {
                    processor
                } else {
                    caching_display_processor(processor, DISPLAY_CACHE_SIZE)
                });
        }

        resolved_frames.push(resolved);
    }

    Ok(resolved_frames)
}

/// Return copies of the frames with every field's processor replaced by
/// the raw passthrough, for showing unformatted underlying values.
pub fn apply_raw_field_overrides(frames: &[DataFrame]) -> Vec<DataFrame> {
    let processor = get_raw_display_processor();
    frames
        .iter()
        .map(|frame| {
            let mut resolved = frame.clone();
            for field in &mut resolved.fields {
                field.state.display = Some(processor.clone());
            }
            resolved
        })
        .collect()
}

/// Fill unset config properties from the defaults config.
///
/// A property is adopted only when the field has no value at it, its
/// `should_apply` gate passes for the field's type, and the processed
/// default is valid; invalid defaults (unparseable numbers, malformed
/// structures) never override anything. Ends by enforcing the config's
/// internal invariants.
pub fn set_field_config_defaults(
    config: &mut FieldConfig,
    defaults: &FieldConfig,
    field_type: FieldType,
    registry: &ConfigPropertyRegistry,
) {
    for property in registry.iter() {
        if property.get(config).is_some() || !property.should_apply(field_type) {
            continue;
        }
        let Some(raw) = property.get(defaults) else {
            continue;
        };
        if let Some(value) = property.process(&raw) {
            property.set(config, value);
        }
    }
    validate_field_config(config);
}

/// Apply one override-rule property write.
///
/// Unknown property ids are a logged no-op (plugins may define properties
/// this bundle does not know about). A processed result of `None` removes
/// the property, letting rules unset values. Unlike defaults processing,
/// `should_apply` is not consulted: an explicit rule applies wherever its
/// matcher said it does.
pub fn set_dynamic_config_value(
    config: &mut FieldConfig,
    property_value: &DynamicConfigValue,
    registry: &ConfigPropertyRegistry,
) {
    let Some(property) = registry.get(&property_value.id) else {
        log::debug!(
            "skipping unknown config property {:?} in override rule",
            property_value.id
        );
        return;
    };
    match property.process(&property_value.value) {
        Some(value) => property.set(config, value),
        None => property.unset(config),
    }
}

/// Enforce config invariants after a merge: thresholds without a color
/// section imply threshold coloring, a color section without a mode is
/// dropped entirely, and inverted min/max are swapped.
pub fn validate_field_config(config: &mut FieldConfig) {
    match &config.color {
        None => {
            if config.thresholds.is_some() {
                config.color = Some(FieldColorConfig::mode(FieldColorMode::Thresholds));
            }
        }
        Some(color) => {
            if color.mode.is_none() {
                config.color = None;
            }
        }
    }

    if let (Some(min), Some(max)) = (config.min, config.max) {
        if min > max {
            config.min = Some(max);
            config.max = Some(min);
        }
    }
}

/// Scan all frames' numeric fields for the dataset-wide min/max. Null and
/// non-numeric values are ignored; all-null data yields `{None, None, 0}`
/// so downstream percent computation sees "no determinable range" instead
/// of dividing by zero.
pub fn find_numeric_field_min_max(frames: &[DataFrame]) -> NumericRange {
    let mut min: Option<f64> = None;
    let mut max: Option<f64> = None;

    for frame in frames {
        for field in &frame.fields {
            if field.field_type != FieldType::Number {
                continue;
            }
            for value in &field.values {
                let numeric = value.to_numeric();
                if numeric.is_nan() {
                    continue;
                }
                min = Some(min.map_or(numeric, |m| m.min(numeric)));
                max = Some(max.map_or(numeric, |m| m.max(numeric)));
            }
        }
    }

    NumericRange::new(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vizfield_core::properties::CustomProperty;
    use vizfield_types::{Field, FieldValue};

    fn number_field(name: &str, values: Vec<f64>) -> Field {
        Field::new(
            name,
            FieldType::Number,
            values.into_iter().map(FieldValue::from).collect(),
        )
    }

    /// Three-column frame: title (string), value and value2 (numbers).
    fn sample_frame() -> DataFrame {
        let mut frame = DataFrame::new(vec![
            Field::new(
                "title",
                FieldType::String,
                vec!["AAA".into(), "BBB".into(), "CCC".into()],
            ),
            number_field("value", vec![100.0, -20.0, 200.0]),
            Field::new(
                "value2",
                FieldType::Number,
                vec![FieldValue::from(1234.0), FieldValue::Null, FieldValue::from(1000.0)],
            ),
        ]);
        frame.fields[1].config.max = Some(0.0);
        frame.fields[1].config.decimals = Some(6);
        frame.fields[1].config.custom.insert("value".to_string(), json!(1));
        frame
    }

    fn sample_source() -> FieldConfigSource {
        serde_json::from_value(json!({
            "defaults": { "unit": "xyz", "decimals": 2 },
            "overrides": [
                {
                    "matcher": { "id": "numeric" },
                    "properties": [
                        { "id": "decimals", "value": 1 },
                        { "id": "display_name", "value": "Kittens" }
                    ]
                }
            ]
        }))
        .unwrap()
    }

    fn custom_registry() -> ConfigPropertyRegistry {
        let mut registry = ConfigPropertyRegistry::with_standard();
        registry.register(Box::new(CustomProperty::new("property1")));
        registry.register(Box::new(CustomProperty::new("property2")));
        registry.register(Box::new(CustomProperty::new("property3.nested")));
        registry
    }

    fn apply(
        frames: &[DataFrame],
        source: &FieldConfigSource,
        registry: Option<&ConfigPropertyRegistry>,
    ) -> Vec<DataFrame> {
        apply_field_overrides(ApplyFieldOverridesOptions {
            frames,
            field_config: source,
            registry,
            theme: &Theme::dark(),
            time_zone: DisplayTimeZone::Utc,
        })
        .unwrap()
    }

    #[test]
    fn test_find_global_min_max() {
        let range = find_numeric_field_min_max(&[sample_frame()]);
        assert_eq!(range.min, Some(-20.0));
        assert_eq!(range.max, Some(1234.0));
    }

    #[test]
    fn test_find_global_min_max_all_zero() {
        let frame = DataFrame::new(vec![
            number_field("value", vec![0.0, 0.0]),
            number_field("value2", vec![0.0, 0.0]),
        ]);
        let range = find_numeric_field_min_max(&[frame]);
        assert_eq!(range.min, Some(0.0));
        assert_eq!(range.max, Some(0.0));
    }

    #[test]
    fn test_find_global_min_max_all_null() {
        let frame = DataFrame::new(vec![
            Field::new("time", FieldType::Time, vec![FieldValue::from(1.0)]),
            Field::new("value", FieldType::Number, vec![FieldValue::Null]),
        ]);
        let range = find_numeric_field_min_max(&[frame]);
        assert_eq!(range.min, None);
        assert_eq!(range.max, None);
        assert_eq!(range.delta, 0.0);
    }

    #[test]
    fn test_find_global_min_max_across_frames() {
        let a = DataFrame::new(vec![number_field("v", vec![1.0, 2.0])]);
        let b = DataFrame::new(vec![number_field("v", vec![0.0, 0.0])]);
        let range = find_numeric_field_min_max(&[a, b]);
        assert_eq!(range.min, Some(0.0));
        assert_eq!(range.max, Some(2.0));
    }

    #[test]
    fn test_defaults_merge_keeps_valid_field_values() {
        // Defaults carry an unparseable max and a null min; neither may
        // override the field's own valid bounds.
        let mut field = number_field("x", vec![]);
        field.config.min = Some(0.0);
        field.config.max = Some(100.0);
        let frame = DataFrame::new(vec![field]);

        let defaults: FieldConfig = serde_json::from_value(json!({
            "unit": "ms",
            "display_name": "newTitle"
        }))
        .unwrap();
        let mut defaults = defaults;
        defaults.max = Some(f64::NAN); // parseFloat('NOPE')
        defaults.min = None;

        let source = FieldConfigSource {
            defaults,
            overrides: vec![],
        };
        let resolved = apply(&[frame], &source, None);
        let config = &resolved[0].fields[0].config;

        assert_eq!(config.min, Some(0.0));
        assert_eq!(config.max, Some(100.0));
        assert_eq!(config.unit.as_deref(), Some("ms"));
        assert_eq!(resolved[0].fields[0].display_name(), "newTitle");
    }

    #[test]
    fn test_overrides_apply_to_matching_fields() {
        let registry = custom_registry();
        let resolved = apply(&[sample_frame()], &sample_source(), Some(&registry));
        let config = &resolved[0].fields[1].config;

        // Field's own max survives, min is not auto-written into config
        assert_eq!(config.max, Some(0.0));
        assert_eq!(config.min, None);
        // The default applied
        assert_eq!(config.unit.as_deref(), Some("xyz"));
        // The override applied over the field's own decimals
        assert_eq!(config.decimals, Some(1));
        assert_eq!(config.display_name.as_deref(), Some("Kittens"));

        // The string field is untouched by the numeric-matcher rule, and
        // the decimals default does not apply to non-numeric fields
        let title = &resolved[0].fields[0].config;
        assert_eq!(title.decimals, None);
        assert_eq!(title.display_name, None);
        assert_eq!(title.unit.as_deref(), Some("xyz"));
    }

    #[test]
    fn test_range_fills_missing_bounds_from_dataset() {
        let resolved = apply(&[sample_frame()], &sample_source(), None);
        let range = resolved[0].fields[1].state.range.unwrap();

        // max comes from the field's own config, min from the global scan
        assert_eq!(range.max, Some(0.0));
        assert_eq!(range.min, Some(-20.0));
    }

    #[test]
    fn test_inputs_are_never_mutated() {
        let input = vec![sample_frame()];
        let resolved = apply(&input, &sample_source(), None);

        // the originals kept their configs
        assert_eq!(input[0].fields[1].config.decimals, Some(6));
        assert_eq!(input[0].fields[1].config.display_name, None);
        assert!(input[0].fields[1].state.display.is_none());

        // and the copies are deep: custom maps diverge independently
        assert_eq!(resolved[0].fields[1].config.custom["value"], json!(1));
        let mut resolved = resolved;
        resolved[0].fields[1]
            .config
            .custom
            .insert("value".to_string(), json!(2));
        assert_eq!(input[0].fields[1].config.custom["value"], json!(1));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let input = vec![sample_frame()];
        let source = sample_source();
        let first = apply(&input, &source, None);
        let second = apply(&input, &source, None);
        assert_eq!(
            first[0].fields[1].config,
            second[0].fields[1].config
        );
    }

    #[test]
    fn test_display_name_renames_are_observed_by_later_rules() {
        let source: FieldConfigSource = serde_json::from_value(json!({
            "defaults": {},
            "overrides": [
                {
                    "matcher": { "id": "by_name", "options": "value" },
                    "properties": [ { "id": "display_name", "value": "Kittens" } ]
                },
                {
                    "matcher": { "id": "by_name", "options": "Kittens" },
                    "properties": [ { "id": "display_name", "value": "Kittens improved" } ]
                }
            ]
        }))
        .unwrap();

        let resolved = apply(&[sample_frame()], &source, None);
        assert_eq!(
            resolved[0].fields[1].config.display_name.as_deref(),
            Some("Kittens improved")
        );
    }

    #[test]
    fn test_unknown_matcher_fails_the_call() {
        let source: FieldConfigSource = serde_json::from_value(json!({
            "defaults": {},
            "overrides": [
                { "matcher": { "id": "no_such_matcher" }, "properties": [] }
            ]
        }))
        .unwrap();

        let err = apply_field_overrides(ApplyFieldOverridesOptions {
            frames: &[sample_frame()],
            field_config: &source,
            registry: None,
            theme: &Theme::dark(),
            time_zone: DisplayTimeZone::Utc,
        })
        .unwrap_err();
        assert!(err.to_string().contains("Unknown field matcher"));
    }

    #[test]
    fn test_unknown_property_is_a_no_op() {
        let source: FieldConfigSource = serde_json::from_value(json!({
            "defaults": {},
            "overrides": [
                {
                    "matcher": { "id": "numeric" },
                    "properties": [
                        { "id": "from_an_uninstalled_plugin", "value": 1 },
                        { "id": "decimals", "value": 3 }
                    ]
                }
            ]
        }))
        .unwrap();

        let resolved = apply(&[sample_frame()], &source, None);
        assert_eq!(resolved[0].fields[1].config.decimals, Some(3));
    }

    #[test]
    fn test_defaults_for_custom_properties() {
        let registry = custom_registry();
        let mut config = FieldConfig::default();
        config.custom.insert("property1".to_string(), json!(10));

        let mut defaults = FieldConfig::default();
        defaults.custom.insert("property1".to_string(), json!(20));
        defaults.custom.insert("property2".to_string(), json!(10));

        set_field_config_defaults(&mut config, &defaults, FieldType::Number, &registry);

        assert_eq!(config.custom["property1"], json!(10));
        assert_eq!(config.custom["property2"], json!(10));
    }

    #[test]
    fn test_defaults_respect_existing_values() {
        let registry = custom_registry();
        let mut config: FieldConfig = serde_json::from_value(json!({
            "decimals": 2, "min": 0.0, "max": 100.0
        }))
        .unwrap();
        let defaults: FieldConfig = serde_json::from_value(json!({
            "decimals": 1, "min": 10.0, "max": 50.0, "unit": "km"
        }))
        .unwrap();

        set_field_config_defaults(&mut config, &defaults, FieldType::Number, &registry);

        assert_eq!(config.decimals, Some(2));
        assert_eq!(config.min, Some(0.0));
        assert_eq!(config.max, Some(100.0));
        assert_eq!(config.unit.as_deref(), Some("km"));
    }

    #[test]
    fn test_dynamic_value_writes_and_removes() {
        let registry = custom_registry();
        let mut config = FieldConfig {
            display_name: Some("test".to_string()),
            ..Default::default()
        };

        set_dynamic_config_value(
            &mut config,
            &DynamicConfigValue::new("display_name", json!("applied")),
            &registry,
        );
        assert_eq!(config.display_name.as_deref(), Some("applied"));

        set_dynamic_config_value(
            &mut config,
            &DynamicConfigValue::new("display_name", json!(null)),
            &registry,
        );
        assert_eq!(config.display_name, None);
    }

    #[test]
    fn test_dynamic_custom_values_and_nested_paths() {
        let registry = custom_registry();
        let mut config = FieldConfig::default();
        config.custom.insert("property1".to_string(), json!(1));
        config
            .custom
            .insert("property3".to_string(), json!({ "nested": 1 }));

        set_dynamic_config_value(
            &mut config,
            &DynamicConfigValue::new("custom.property1", json!("applied")),
            &registry,
        );
        assert_eq!(config.custom["property1"], json!("applied"));

        set_dynamic_config_value(
            &mut config,
            &DynamicConfigValue::new("custom.property3.nested", json!("applied")),
            &registry,
        );
        assert_eq!(config.custom["property3"]["nested"], json!("applied"));

        set_dynamic_config_value(
            &mut config,
            &DynamicConfigValue::new("custom.property3.nested", json!(null)),
            &registry,
        );
        assert_eq!(config.custom["property3"], json!({}));
    }

    #[test]
    fn test_validate_defaults_color_mode_from_thresholds() {
        let mut config: FieldConfig = serde_json::from_value(json!({
            "thresholds": { "mode": "absolute", "steps": [ { "value": null, "color": "green" } ] }
        }))
        .unwrap();
        validate_field_config(&mut config);
        assert_eq!(
            config.color.as_ref().and_then(|c| c.mode),
            Some(FieldColorMode::Thresholds)
        );
    }

    #[test]
    fn test_validate_drops_modeless_color_and_swaps_bounds() {
        let mut config = FieldConfig {
            color: Some(FieldColorConfig::default()),
            min: Some(100.0),
            max: Some(0.0),
            ..Default::default()
        };
        validate_field_config(&mut config);
        assert_eq!(config.color, None);
        assert_eq!(config.min, Some(0.0));
        assert_eq!(config.max, Some(100.0));
    }

    #[test]
    fn test_series_index_skips_time_fields() {
        let frame = DataFrame::new(vec![
            Field::new("t", FieldType::Time, vec![]),
            number_field("a", vec![1.0]),
            number_field("b", vec![2.0]),
        ]);
        let resolved = apply(&[frame], &FieldConfigSource::default(), None);
        assert_eq!(resolved[0].fields[0].state.series_index, Some(0));
        assert_eq!(resolved[0].fields[1].state.series_index, Some(0));
        assert_eq!(resolved[0].fields[2].state.series_index, Some(1));
    }

    #[test]
    fn test_resolved_fields_can_display() {
        let resolved = apply(&[sample_frame()], &sample_source(), None);
        let field = &resolved[0].fields[1];
        let display = field.display(&field.values[0]).unwrap();
        // decimals 1 from the override rule
        assert_eq!(display.text, "100.0");
        assert_eq!(display.numeric, Some(100.0));
    }

    #[test]
    fn test_other_typed_fields_are_guessed() {
        let frame = DataFrame::new(vec![Field::new(
            "x",
            FieldType::Other,
            vec![FieldValue::from(1.5), FieldValue::from(2.5)],
        )]);
        let resolved = apply(&[frame], &FieldConfigSource::default(), None);
        assert_eq!(resolved[0].fields[0].field_type, FieldType::Number);
    }

    #[test]
    fn test_raw_overrides_attach_raw_processor() {
        let input = vec![sample_frame()];
        let raw = apply_raw_field_overrides(&input);

        let field = &raw[0].fields[1];
        let display = field.display(&field.values[0]).unwrap();
        assert_eq!(display.text, "100");
        assert_eq!(display.numeric, None);

        // originals untouched
        assert!(input[0].fields[1].state.display.is_none());
    }

    #[test]
    fn test_matching_uses_frame_ref_id() {
        let mut frame_a = DataFrame::new(vec![number_field("v", vec![1.0])]);
        frame_a.ref_id = Some("A".to_string());
        let mut frame_b = DataFrame::new(vec![number_field("v", vec![1.0])]);
        frame_b.ref_id = Some("B".to_string());

        let source: FieldConfigSource = serde_json::from_value(json!({
            "defaults": {},
            "overrides": [
                {
                    "matcher": { "id": "by_frame_ref_id", "options": "B" },
                    "properties": [ { "id": "unit", "value": "short" } ]
                }
            ]
        }))
        .unwrap();

        let resolved = apply(&[frame_a, frame_b], &source, None);
        assert_eq!(resolved[0].fields[0].config.unit, None);
        assert_eq!(resolved[1].fields[0].config.unit.as_deref(), Some("short"));
    }
}
