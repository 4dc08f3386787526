//! Value mapping evaluation.
//!
//! Rules run strictly in list order against the raw (pre-coercion) value;
//! the first match wins and unmatched lists leave formatting to the
//! default pipeline. The mapping list itself is never mutated.

use regex::Regex;

use vizfield_types::{FieldValue, SpecialValueMatch, ValueMapping, ValueMappingResult};

/// Evaluate an ordered mapping list against a raw value. Returns `None`
/// when no rule matches; the caller falls through to standard formatting.
pub fn get_value_mapping_result(
    mappings: &[ValueMapping],
    value: &FieldValue,
) -> Option<ValueMappingResult> {
    for mapping in mappings {
        match mapping {
            ValueMapping::Value(options) => {
                if value.is_null() {
                    continue;
                }
                // Exact key equality on the display string: "1000" must
                // never match the key "1".
                if let Some(result) = options.get(&value.display_string()) {
                    return Some(result.clone());
                }
            }
            ValueMapping::Range(options) => {
                if value.is_null() {
                    continue;
                }
                let numeric = value.to_numeric();
                if !numeric.is_nan() && numeric >= options.from && numeric <= options.to {
                    return Some(options.result.clone());
                }
            }
            ValueMapping::Regex(options) => {
                if value.is_null() {
                    continue;
                }
                let regex = match Regex::new(&options.pattern) {
                    Ok(regex) => regex,
                    Err(err) => {
                        log::warn!(
                            "invalid pattern {:?} in regex value mapping: {}",
                            options.pattern,
                            err
                        );
                        continue;
                    }
                };
                let text = value.display_string();
                if !regex.is_match(&text) {
                    continue;
                }
                let mut result = options.result.clone();
                if let Some(replacement) = &options.result.text {
                    // Capture references ($1, ...) substitute into the
                    // replacement; an explicitly empty replacement empties
                    // the text, which is still a match.
                    result.text = Some(regex.replace(&text, replacement.as_str()).into_owned());
                }
                return Some(result);
            }
            ValueMapping::Special(options) => {
                let matched = match options.match_on {
                    SpecialValueMatch::True => matches!(value, FieldValue::Bool(true)),
                    SpecialValueMatch::False => matches!(value, FieldValue::Bool(false)),
                    SpecialValueMatch::Null => value.is_null(),
                    SpecialValueMatch::NaN => {
                        matches!(value, FieldValue::Number(n) if n.is_nan())
                    }
                    SpecialValueMatch::NullAndNaN => {
                        value.is_null() || matches!(value, FieldValue::Number(n) if n.is_nan())
                    }
                    SpecialValueMatch::Empty => {
                        matches!(value, FieldValue::String(s) if s.is_empty())
                    }
                };
                if matched {
                    return Some(options.result.clone());
                }
            }
        }
    }
    None
}
