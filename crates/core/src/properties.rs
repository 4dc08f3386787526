//! Config property registry.
//!
//! Every mergeable field-config property is described by a `ConfigProperty`:
//! a typed processor that normalizes an incoming dynamic value (or rejects
//! it), plus accessors over the typed `FieldConfig`. Standard properties
//! are a sealed table; plugin-defined properties register as custom
//! entries writing dot-separated paths under `config.custom`.

use once_cell::sync::Lazy;
use serde_json::{Map, Value as JsonValue};

use vizfield_types::value::format_number_text;
use vizfield_types::{
    DataLink, FieldColorConfig, FieldConfig, FieldType, FieldValue, ThresholdsConfig, ValueMapping,
};

/// One mergeable config property.
///
/// `process` turns a raw dynamic value into the normalized form written to
/// the config; `None` means the value is invalid/absent and, for override
/// rules, that the property should be removed. `should_apply` gates
/// defaults only; override rules write unconditionally once their matcher
/// selected a field.
pub trait ConfigProperty: Send + Sync {
    fn id(&self) -> &str;

    fn is_custom(&self) -> bool {
        false
    }

    fn should_apply(&self, _field_type: FieldType) -> bool {
        true
    }

    fn process(&self, value: &JsonValue) -> Option<JsonValue>;

    /// Read the current value from a config, `None` when unset.
    fn get(&self, config: &FieldConfig) -> Option<JsonValue>;

    /// Write a processed value into a config.
    fn set(&self, config: &mut FieldConfig, value: JsonValue);

    /// Remove the property from a config.
    fn unset(&self, config: &mut FieldConfig);
}

/// Type-erased config property for dynamic dispatch
pub type BoxedConfigProperty = Box<dyn ConfigProperty>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StandardPropertyId {
    DisplayName,
    Unit,
    Decimals,
    Min,
    Max,
    NoValue,
    Thresholds,
    Mappings,
    Color,
    Links,
}

/// A property backed by a typed `FieldConfig` field.
struct StandardProperty {
    id: StandardPropertyId,
}

impl StandardProperty {
    fn text_from(value: &JsonValue) -> Option<JsonValue> {
        match value {
            JsonValue::String(s) => Some(JsonValue::String(s.clone())),
            JsonValue::Number(n) => Some(JsonValue::String(format_number_text(
                n.as_f64().unwrap_or(f64::NAN),
            ))),
            _ => None,
        }
    }

    fn number_from(value: &JsonValue) -> Option<f64> {
        let numeric = match value {
            JsonValue::Number(n) => n.as_f64()?,
            JsonValue::String(s) => FieldValue::from(s.as_str()).to_numeric(),
            _ => return None,
        };
        // Non-finite values (parseFloat failures upstream) never merge.
        numeric.is_finite().then_some(numeric)
    }

    fn json_number(value: f64) -> Option<JsonValue> {
        serde_json::Number::from_f64(value).map(JsonValue::Number)
    }
}

impl ConfigProperty for StandardProperty {
    fn id(&self) -> &str {
        match self.id {
            StandardPropertyId::DisplayName => "display_name",
            StandardPropertyId::Unit => "unit",
            StandardPropertyId::Decimals => "decimals",
            StandardPropertyId::Min => "min",
            StandardPropertyId::Max => "max",
            StandardPropertyId::NoValue => "no_value",
            StandardPropertyId::Thresholds => "thresholds",
            StandardPropertyId::Mappings => "mappings",
            StandardPropertyId::Color => "color",
            StandardPropertyId::Links => "links",
        }
    }

    fn should_apply(&self, field_type: FieldType) -> bool {
        match self.id {
            StandardPropertyId::Min | StandardPropertyId::Max | StandardPropertyId::Decimals => {
                field_type == FieldType::Number
            }
            _ => true,
        }
    }

    fn process(&self, value: &JsonValue) -> Option<JsonValue> {
        match self.id {
            StandardPropertyId::DisplayName
            | StandardPropertyId::Unit
            | StandardPropertyId::NoValue => Self::text_from(value),
            StandardPropertyId::Min | StandardPropertyId::Max => {
                Self::number_from(value).and_then(Self::json_number)
            }
            StandardPropertyId::Decimals => {
                let numeric = Self::number_from(value)?;
                Some(JsonValue::from(numeric.max(0.0).floor() as u64))
            }
            StandardPropertyId::Thresholds => {
                let mut thresholds: ThresholdsConfig =
                    deserialize_or_skip(self.id(), value.clone())?;
                thresholds.sort_steps();
                serde_json::to_value(thresholds).ok()
            }
            StandardPropertyId::Mappings => {
                let mappings: Vec<ValueMapping> = deserialize_or_skip(self.id(), value.clone())?;
                serde_json::to_value(mappings).ok()
            }
            StandardPropertyId::Color => {
                let color: FieldColorConfig = deserialize_or_skip(self.id(), value.clone())?;
                serde_json::to_value(color).ok()
            }
            StandardPropertyId::Links => {
                let links: Vec<DataLink> = deserialize_or_skip(self.id(), value.clone())?;
                serde_json::to_value(links).ok()
            }
        }
    }

    fn get(&self, config: &FieldConfig) -> Option<JsonValue> {
        match self.id {
            StandardPropertyId::DisplayName => {
                config.display_name.as_ref().map(|s| JsonValue::from(s.clone()))
            }
            StandardPropertyId::Unit => config.unit.as_ref().map(|s| JsonValue::from(s.clone())),
            StandardPropertyId::Decimals => config.decimals.map(JsonValue::from),
            StandardPropertyId::Min => config.min.and_then(Self::json_number),
            StandardPropertyId::Max => config.max.and_then(Self::json_number),
            StandardPropertyId::NoValue => {
                config.no_value.as_ref().map(|s| JsonValue::from(s.clone()))
            }
            StandardPropertyId::Thresholds => config
                .thresholds
                .as_ref()
                .and_then(|t| serde_json::to_value(t).ok()),
            StandardPropertyId::Mappings => (!config.mappings.is_empty())
                .then(|| serde_json::to_value(&config.mappings).ok())
                .flatten(),
            StandardPropertyId::Color => config
                .color
                .as_ref()
                .and_then(|c| serde_json::to_value(c).ok()),
            StandardPropertyId::Links => (!config.links.is_empty())
                .then(|| serde_json::to_value(&config.links).ok())
                .flatten(),
        }
    }

    fn set(&self, config: &mut FieldConfig, value: JsonValue) {
        match self.id {
            StandardPropertyId::DisplayName => {
                config.display_name = value.as_str().map(str::to_string);
            }
            StandardPropertyId::Unit => config.unit = value.as_str().map(str::to_string),
            StandardPropertyId::Decimals => {
                config.decimals = value.as_u64().map(|d| d as u32);
            }
            StandardPropertyId::Min => config.min = value.as_f64(),
            StandardPropertyId::Max => config.max = value.as_f64(),
            StandardPropertyId::NoValue => config.no_value = value.as_str().map(str::to_string),
            StandardPropertyId::Thresholds => {
                config.thresholds = serde_json::from_value(value).ok();
            }
            StandardPropertyId::Mappings => {
                config.mappings = serde_json::from_value(value).unwrap_or_default();
            }
            StandardPropertyId::Color => config.color = serde_json::from_value(value).ok(),
            StandardPropertyId::Links => {
                config.links = serde_json::from_value(value).unwrap_or_default();
            }
        }
    }

    fn unset(&self, config: &mut FieldConfig) {
        match self.id {
            StandardPropertyId::DisplayName => config.display_name = None,
            StandardPropertyId::Unit => config.unit = None,
            StandardPropertyId::Decimals => config.decimals = None,
            StandardPropertyId::Min => config.min = None,
            StandardPropertyId::Max => config.max = None,
            StandardPropertyId::NoValue => config.no_value = None,
            StandardPropertyId::Thresholds => config.thresholds = None,
            StandardPropertyId::Mappings => config.mappings.clear(),
            StandardPropertyId::Color => config.color = None,
            StandardPropertyId::Links => config.links.clear(),
        }
    }
}

fn deserialize_or_skip<T: serde::de::DeserializeOwned>(id: &str, value: JsonValue) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            log::debug!("ignoring malformed value for config property {id:?}: {err}");
            None
        }
    }
}

/// A plugin-defined property stored under `config.custom`, addressed by a
/// dot-separated path. Values pass through unprocessed.
pub struct CustomProperty {
    id: String,
    path: String,
}

impl CustomProperty {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: format!("custom.{path}"),
            path,
        }
    }
}

impl ConfigProperty for CustomProperty {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_custom(&self) -> bool {
        true
    }

    fn process(&self, value: &JsonValue) -> Option<JsonValue> {
        match value {
            JsonValue::Null => None,
            other => Some(other.clone()),
        }
    }

    fn get(&self, config: &FieldConfig) -> Option<JsonValue> {
        path_get(&config.custom, &self.path).cloned()
    }

    fn set(&self, config: &mut FieldConfig, value: JsonValue) {
        path_set(&mut config.custom, &self.path, value);
    }

    fn unset(&self, config: &mut FieldConfig) {
        path_unset(&mut config.custom, &self.path);
    }
}

/// Read a nested value from a custom map by dot-separated path.
pub fn path_get<'a>(map: &'a Map<String, JsonValue>, path: &str) -> Option<&'a JsonValue> {
    let mut parts = path.split('.');
    let mut current = map.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Write a nested value, creating intermediate objects as needed.
pub fn path_set(map: &mut Map<String, JsonValue>, path: &str, value: JsonValue) {
    let mut parts: Vec<&str> = path.split('.').collect();
    let last = parts.pop().expect("path is never empty");
    let mut current = map;
    for part in parts {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| JsonValue::Object(Map::new()));
        if !entry.is_object() {
            *entry = JsonValue::Object(Map::new());
        }
        current = entry.as_object_mut().expect("just ensured an object");
    }
    current.insert(last.to_string(), value);
}

/// Remove a nested value; missing intermediate segments are a no-op.
pub fn path_unset(map: &mut Map<String, JsonValue>, path: &str) {
    match path.split_once('.') {
        None => {
            map.remove(path);
        }
        Some((head, rest)) => {
            if let Some(JsonValue::Object(inner)) = map.get_mut(head) {
                path_unset(inner, rest);
            }
        }
    }
}

/// Ordered registry of config properties.
pub struct ConfigPropertyRegistry {
    items: Vec<BoxedConfigProperty>,
}

impl ConfigPropertyRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Create a registry holding the standard property table
    pub fn with_standard() -> Self {
        let mut registry = Self::new();
        for id in [
            StandardPropertyId::DisplayName,
            StandardPropertyId::Unit,
            StandardPropertyId::Decimals,
            StandardPropertyId::Min,
            StandardPropertyId::Max,
            StandardPropertyId::NoValue,
            StandardPropertyId::Thresholds,
            StandardPropertyId::Mappings,
            StandardPropertyId::Color,
            StandardPropertyId::Links,
        ] {
            registry.register(Box::new(StandardProperty { id }));
        }
        registry
    }

    /// Register a property
    pub fn register(&mut self, property: BoxedConfigProperty) {
        self.items.push(property);
    }

    /// Look up a property by id
    pub fn get(&self, id: &str) -> Option<&dyn ConfigProperty> {
        self.items
            .iter()
            .find(|p| p.id() == id)
            .map(Box::as_ref)
    }

    /// Iterate properties in registration order
    pub fn iter(&self) -> impl Iterator<Item = &dyn ConfigProperty> {
        self.items.iter().map(Box::as_ref)
    }
}

impl Default for ConfigPropertyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The standard property registry used when a caller supplies none.
pub fn standard_property_registry() -> &'static ConfigPropertyRegistry {
    static REGISTRY: Lazy<ConfigPropertyRegistry> =
        Lazy::new(ConfigPropertyRegistry::with_standard);
    &REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_standard_registry_lookup() {
        let registry = standard_property_registry();
        assert!(registry.get("unit").is_some());
        assert!(registry.get("thresholds").is_some());
        assert!(registry.get("bogus").is_none());
    }

    #[test]
    fn test_number_property_rejects_invalid() {
        let registry = standard_property_registry();
        let max = registry.get("max").unwrap();
        assert_eq!(max.process(&json!(100)), Some(json!(100.0)));
        assert_eq!(max.process(&json!("25")), Some(json!(25.0)));
        assert_eq!(max.process(&JsonValue::Null), None);
        assert_eq!(max.process(&json!("NOPE")), None);
    }

    #[test]
    fn test_min_max_apply_to_numbers_only() {
        let registry = standard_property_registry();
        let min = registry.get("min").unwrap();
        assert!(min.should_apply(FieldType::Number));
        assert!(!min.should_apply(FieldType::String));
        assert!(registry.get("unit").unwrap().should_apply(FieldType::String));
    }

    #[test]
    fn test_standard_get_set_roundtrip() {
        let registry = standard_property_registry();
        let mut config = FieldConfig::default();

        let unit = registry.get("unit").unwrap();
        assert_eq!(unit.get(&config), None);
        unit.set(&mut config, json!("ms"));
        assert_eq!(config.unit.as_deref(), Some("ms"));
        assert_eq!(unit.get(&config), Some(json!("ms")));
        unit.unset(&mut config);
        assert_eq!(config.unit, None);
    }

    #[test]
    fn test_thresholds_property_sorts_steps() {
        let registry = standard_property_registry();
        let thresholds = registry.get("thresholds").unwrap();
        let processed = thresholds
            .process(&json!({
                "mode": "absolute",
                "steps": [
                    { "value": 80, "color": "red" },
                    { "value": null, "color": "green" }
                ]
            }))
            .unwrap();
        let mut config = FieldConfig::default();
        thresholds.set(&mut config, processed);
        let steps = &config.thresholds.as_ref().unwrap().steps;
        assert_eq!(steps[0].value, f64::NEG_INFINITY);
        assert_eq!(steps[1].value, 80.0);
    }

    #[test]
    fn test_custom_property_nested_paths() {
        let property = CustomProperty::new("axis.width");
        assert_eq!(property.id(), "custom.axis.width");

        let mut config = FieldConfig::default();
        property.set(&mut config, json!(250));
        assert_eq!(path_get(&config.custom, "axis.width"), Some(&json!(250)));
        assert_eq!(property.get(&config), Some(json!(250)));

        property.unset(&mut config);
        assert_eq!(property.get(&config), None);
        // the intermediate object survives, matching path-unset semantics
        assert!(config.custom.contains_key("axis"));
    }

    #[test]
    fn test_custom_property_null_processes_to_none() {
        let property = CustomProperty::new("width");
        assert_eq!(property.process(&JsonValue::Null), None);
        assert_eq!(property.process(&json!(7)), Some(json!(7)));
    }
}
