//! Field matcher registry.
//!
//! Override rules select fields through matchers resolved by id from this
//! registry. Resolution of an unknown id is the pipeline's one hard
//! failure: a rule referencing a matcher that does not exist is a caller
//! configuration bug and must not silently apply to the wrong fields.

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use vizfield_types::{Field, FieldType, MatcherConfig};

/// Frame-level context for a match, extracted before the field is handed
/// to the matcher so resolution can keep mutating the field's config.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchContext<'a> {
    /// Position of the field inside its frame.
    pub field_index: usize,
    /// The owning frame's query ref id, if any.
    pub frame_ref_id: Option<&'a str>,
}

/// Predicate over fields, built from a `MatcherConfig`.
pub trait FieldMatcher: std::fmt::Debug {
    fn matches(&self, field: &Field, ctx: &MatchContext) -> bool;
}

/// Type-erased field matcher for dynamic dispatch
pub type BoxedFieldMatcher = Box<dyn FieldMatcher>;

/// Function that creates a field matcher from its options
pub type FieldMatcherFactory = fn(&JsonValue) -> Result<BoxedFieldMatcher>;

/// Registry of field matcher factories keyed by id.
pub struct FieldMatcherRegistry {
    factories: HashMap<String, FieldMatcherFactory>,
}

impl FieldMatcherRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with all built-in matchers registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("by_name", by_name);
        registry.register("by_names", by_names);
        registry.register("by_regexp", by_regexp);
        registry.register("by_type", by_type);
        registry.register("by_frame_ref_id", by_frame_ref_id);
        registry.register("numeric", numeric);
        registry.register("time", time);
        registry.register("first", first);
        registry
    }

    /// Register a matcher factory
    pub fn register(&mut self, id: &str, factory: FieldMatcherFactory) {
        self.factories.insert(id.to_string(), factory);
    }

    /// Resolve a matcher from its config. Fails for unregistered ids.
    pub fn resolve(&self, config: &MatcherConfig) -> Result<BoxedFieldMatcher> {
        let factory = self
            .factories
            .get(&config.id)
            .ok_or_else(|| anyhow!("Unknown field matcher: {}", config.id))?;
        factory(&config.options)
    }

    /// List all registered matcher IDs
    pub fn list(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

impl Default for FieldMatcherRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The built-in matcher registry.
pub fn field_matchers() -> &'static FieldMatcherRegistry {
    static REGISTRY: Lazy<FieldMatcherRegistry> = Lazy::new(FieldMatcherRegistry::with_defaults);
    &REGISTRY
}

#[derive(Debug)]
struct ByName {
    name: String,
}

impl FieldMatcher for ByName {
    fn matches(&self, field: &Field, _ctx: &MatchContext) -> bool {
        // Matches the effective display name, so rules observe renames
        // applied by earlier rules in the same resolution pass.
        field.display_name() == self.name
    }
}

fn by_name(options: &JsonValue) -> Result<BoxedFieldMatcher> {
    Ok(Box::new(ByName {
        name: options.as_str().unwrap_or_default().to_string(),
    }))
}

#[derive(Debug)]
struct ByNames {
    names: Vec<String>,
}

impl FieldMatcher for ByNames {
    fn matches(&self, field: &Field, _ctx: &MatchContext) -> bool {
        self.names.iter().any(|n| n == field.display_name())
    }
}

fn by_names(options: &JsonValue) -> Result<BoxedFieldMatcher> {
    let list = options
        .get("names")
        .or(Some(options))
        .and_then(JsonValue::as_array);
    let names = list
        .map(|items| {
            items
                .iter()
                .filter_map(JsonValue::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Ok(Box::new(ByNames { names }))
}

#[derive(Debug)]
struct ByRegexp {
    regex: Option<Regex>,
}

impl FieldMatcher for ByRegexp {
    fn matches(&self, field: &Field, _ctx: &MatchContext) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(field.display_name()),
            None => false,
        }
    }
}

fn by_regexp(options: &JsonValue) -> Result<BoxedFieldMatcher> {
    let pattern = options.as_str().unwrap_or_default();
    let regex = match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(err) => {
            log::warn!("invalid pattern {:?} in by_regexp matcher: {}", pattern, err);
            None
        }
    };
    Ok(Box::new(ByRegexp { regex }))
}

#[derive(Debug)]
struct ByType {
    field_type: Option<FieldType>,
}

impl FieldMatcher for ByType {
    fn matches(&self, field: &Field, _ctx: &MatchContext) -> bool {
        self.field_type == Some(field.field_type)
    }
}

fn by_type(options: &JsonValue) -> Result<BoxedFieldMatcher> {
    Ok(Box::new(ByType {
        field_type: serde_json::from_value(options.clone()).ok(),
    }))
}

#[derive(Debug)]
struct ByFrameRefId {
    ref_id: String,
}

impl FieldMatcher for ByFrameRefId {
    fn matches(&self, _field: &Field, ctx: &MatchContext) -> bool {
        ctx.frame_ref_id == Some(self.ref_id.as_str())
    }
}

fn by_frame_ref_id(options: &JsonValue) -> Result<BoxedFieldMatcher> {
    Ok(Box::new(ByFrameRefId {
        ref_id: options.as_str().unwrap_or_default().to_string(),
    }))
}

#[derive(Debug)]
struct Numeric;

impl FieldMatcher for Numeric {
    fn matches(&self, field: &Field, _ctx: &MatchContext) -> bool {
        field.field_type == FieldType::Number
    }
}

fn numeric(_options: &JsonValue) -> Result<BoxedFieldMatcher> {
    Ok(Box::new(Numeric))
}

#[derive(Debug)]
struct Time;

impl FieldMatcher for Time {
    fn matches(&self, field: &Field, _ctx: &MatchContext) -> bool {
        field.field_type == FieldType::Time
    }
}

fn time(_options: &JsonValue) -> Result<BoxedFieldMatcher> {
    Ok(Box::new(Time))
}

#[derive(Debug)]
struct First;

impl FieldMatcher for First {
    fn matches(&self, _field: &Field, ctx: &MatchContext) -> bool {
        ctx.field_index == 0
    }
}

fn first(_options: &JsonValue) -> Result<BoxedFieldMatcher> {
    Ok(Box::new(First))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(name: &str, field_type: FieldType) -> Field {
        Field::new(name, field_type, vec![])
    }

    fn resolve(id: &str, options: JsonValue) -> BoxedFieldMatcher {
        field_matchers()
            .resolve(&MatcherConfig::new(id, options))
            .unwrap()
    }

    #[test]
    fn test_unknown_matcher_is_an_error() {
        let err = field_matchers()
            .resolve(&MatcherConfig::new("nope", JsonValue::Null))
            .unwrap_err();
        assert!(err.to_string().contains("Unknown field matcher: nope"));
    }

    #[test]
    fn test_by_name_uses_display_name() {
        let matcher = resolve("by_name", json!("Kittens"));
        let ctx = MatchContext::default();

        let mut f = field("value", FieldType::Number);
        assert!(!matcher.matches(&f, &ctx));

        f.config.display_name = Some("Kittens".to_string());
        assert!(matcher.matches(&f, &ctx));
    }

    #[test]
    fn test_by_names_accepts_plain_array() {
        let matcher = resolve("by_names", json!(["a", "b"]));
        let ctx = MatchContext::default();
        assert!(matcher.matches(&field("a", FieldType::String), &ctx));
        assert!(matcher.matches(&field("b", FieldType::String), &ctx));
        assert!(!matcher.matches(&field("c", FieldType::String), &ctx));
    }

    #[test]
    fn test_by_regexp() {
        let matcher = resolve("by_regexp", json!("^cpu_\\d+$"));
        let ctx = MatchContext::default();
        assert!(matcher.matches(&field("cpu_0", FieldType::Number), &ctx));
        assert!(!matcher.matches(&field("cpu", FieldType::Number), &ctx));
    }

    #[test]
    fn test_invalid_regexp_matches_nothing() {
        let matcher = resolve("by_regexp", json!("(unclosed"));
        let ctx = MatchContext::default();
        assert!(!matcher.matches(&field("anything", FieldType::Number), &ctx));
    }

    #[test]
    fn test_by_type_and_numeric() {
        let ctx = MatchContext::default();
        let matcher = resolve("by_type", json!("number"));
        assert!(matcher.matches(&field("x", FieldType::Number), &ctx));
        assert!(!matcher.matches(&field("x", FieldType::String), &ctx));

        let matcher = resolve("numeric", JsonValue::Null);
        assert!(matcher.matches(&field("x", FieldType::Number), &ctx));
        assert!(!matcher.matches(&field("x", FieldType::Time), &ctx));
    }

    #[test]
    fn test_frame_scoped_matchers() {
        let matcher = resolve("by_frame_ref_id", json!("A"));
        let f = field("x", FieldType::Number);
        assert!(matcher.matches(
            &f,
            &MatchContext {
                field_index: 3,
                frame_ref_id: Some("A"),
            }
        ));
        assert!(!matcher.matches(
            &f,
            &MatchContext {
                field_index: 3,
                frame_ref_id: Some("B"),
            }
        ));

        let matcher = resolve("first", JsonValue::Null);
        assert!(matcher.matches(&f, &MatchContext::default()));
        assert!(!matcher.matches(
            &f,
            &MatchContext {
                field_index: 1,
                frame_ref_id: None,
            }
        ));
    }
}
