//! Value matcher registry.
//!
//! Predicates over individual raw values, used by consumers that filter
//! or transform rows. Same registry contract as the field matchers:
//! resolving an unknown id is a hard failure.

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use vizfield_types::{FieldValue, MatcherConfig};

/// Predicate over raw values, built from a `MatcherConfig`.
pub trait ValueMatcher: std::fmt::Debug {
    fn matches(&self, value: &FieldValue) -> bool;
}

/// Type-erased value matcher for dynamic dispatch
pub type BoxedValueMatcher = Box<dyn ValueMatcher>;

/// Function that creates a value matcher from its options
pub type ValueMatcherFactory = fn(&JsonValue) -> Result<BoxedValueMatcher>;

/// Registry of value matcher factories keyed by id.
pub struct ValueMatcherRegistry {
    factories: HashMap<String, ValueMatcherFactory>,
}

impl ValueMatcherRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with all built-in matchers registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("is_null", is_null);
        registry.register("is_not_null", is_not_null);
        registry.register("equal", equal);
        registry.register("not_equal", not_equal);
        registry.register("greater", greater);
        registry.register("greater_or_equal", greater_or_equal);
        registry.register("lower", lower);
        registry.register("lower_or_equal", lower_or_equal);
        registry.register("range", range);
        registry.register("regex", regex);
        registry
    }

    /// Register a matcher factory
    pub fn register(&mut self, id: &str, factory: ValueMatcherFactory) {
        self.factories.insert(id.to_string(), factory);
    }

    /// Resolve a matcher from its config. Fails for unregistered ids.
    pub fn resolve(&self, config: &MatcherConfig) -> Result<BoxedValueMatcher> {
        let factory = self
            .factories
            .get(&config.id)
            .ok_or_else(|| anyhow!("Unknown value matcher: {}", config.id))?;
        factory(&config.options)
    }

    /// List all registered matcher IDs
    pub fn list(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

impl Default for ValueMatcherRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The built-in value matcher registry.
pub fn value_matchers() -> &'static ValueMatcherRegistry {
    static REGISTRY: Lazy<ValueMatcherRegistry> = Lazy::new(ValueMatcherRegistry::with_defaults);
    &REGISTRY
}

fn option_value(options: &JsonValue) -> FieldValue {
    FieldValue::from(options.get("value").cloned().unwrap_or(JsonValue::Null))
}

fn option_number(options: &JsonValue, key: &str) -> f64 {
    options
        .get(key)
        .and_then(JsonValue::as_f64)
        .unwrap_or(f64::NAN)
}

#[derive(Debug)]
struct IsNull;

impl ValueMatcher for IsNull {
    fn matches(&self, value: &FieldValue) -> bool {
        value.is_null()
    }
}

fn is_null(_options: &JsonValue) -> Result<BoxedValueMatcher> {
    Ok(Box::new(IsNull))
}

#[derive(Debug)]
struct IsNotNull;

impl ValueMatcher for IsNotNull {
    fn matches(&self, value: &FieldValue) -> bool {
        !value.is_null()
    }
}

fn is_not_null(_options: &JsonValue) -> Result<BoxedValueMatcher> {
    Ok(Box::new(IsNotNull))
}

/// Loose equality: numeric comparison when both sides are numeric,
/// display-string comparison otherwise (so `"5"` equals `5`).
fn loosely_equal(a: &FieldValue, b: &FieldValue) -> bool {
    if a.is_numeric() && b.is_numeric() {
        return a.to_numeric() == b.to_numeric();
    }
    a.display_string() == b.display_string() && a.is_null() == b.is_null()
}

#[derive(Debug)]
struct Equal {
    target: FieldValue,
    negate: bool,
}

impl ValueMatcher for Equal {
    fn matches(&self, value: &FieldValue) -> bool {
        loosely_equal(value, &self.target) != self.negate
    }
}

fn equal(options: &JsonValue) -> Result<BoxedValueMatcher> {
    Ok(Box::new(Equal {
        target: option_value(options),
        negate: false,
    }))
}

fn not_equal(options: &JsonValue) -> Result<BoxedValueMatcher> {
    Ok(Box::new(Equal {
        target: option_value(options),
        negate: true,
    }))
}

#[derive(Clone, Copy)]
#[derive(Debug)]
enum Comparison {
    Greater,
    GreaterOrEqual,
    Lower,
    LowerOrEqual,
}

#[derive(Debug)]
struct Compare {
    target: f64,
    comparison: Comparison,
}

impl ValueMatcher for Compare {
    fn matches(&self, value: &FieldValue) -> bool {
        let numeric = value.to_numeric();
        if numeric.is_nan() {
            return false;
        }
        match self.comparison {
            Comparison::Greater => numeric > self.target,
            Comparison::GreaterOrEqual => numeric >= self.target,
            Comparison::Lower => numeric < self.target,
            Comparison::LowerOrEqual => numeric <= self.target,
        }
    }
}

fn greater(options: &JsonValue) -> Result<BoxedValueMatcher> {
    Ok(Box::new(Compare {
        target: option_number(options, "value"),
        comparison: Comparison::Greater,
    }))
}

fn greater_or_equal(options: &JsonValue) -> Result<BoxedValueMatcher> {
    Ok(Box::new(Compare {
        target: option_number(options, "value"),
        comparison: Comparison::GreaterOrEqual,
    }))
}

fn lower(options: &JsonValue) -> Result<BoxedValueMatcher> {
    Ok(Box::new(Compare {
        target: option_number(options, "value"),
        comparison: Comparison::Lower,
    }))
}

fn lower_or_equal(options: &JsonValue) -> Result<BoxedValueMatcher> {
    Ok(Box::new(Compare {
        target: option_number(options, "value"),
        comparison: Comparison::LowerOrEqual,
    }))
}

#[derive(Debug)]
struct Range {
    from: f64,
    to: f64,
}

impl ValueMatcher for Range {
    fn matches(&self, value: &FieldValue) -> bool {
        let numeric = value.to_numeric();
        !numeric.is_nan() && numeric >= self.from && numeric <= self.to
    }
}

fn range(options: &JsonValue) -> Result<BoxedValueMatcher> {
    Ok(Box::new(Range {
        from: option_number(options, "from"),
        to: option_number(options, "to"),
    }))
}

#[derive(Debug)]
struct RegexMatch {
    regex: Option<Regex>,
}

impl ValueMatcher for RegexMatch {
    fn matches(&self, value: &FieldValue) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(&value.display_string()),
            None => false,
        }
    }
}

fn regex(options: &JsonValue) -> Result<BoxedValueMatcher> {
    let pattern = options
        .as_str()
        .or_else(|| options.get("pattern").and_then(JsonValue::as_str))
        .unwrap_or_default();
    let regex = match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(err) => {
            log::warn!("invalid pattern {:?} in regex value matcher: {}", pattern, err);
            None
        }
    };
    Ok(Box::new(RegexMatch { regex }))
}
