//! Validator Registry
//!
//! A keyword -> validation-function table. Every entry is a pure function of
//! `(constraint, instance value, full keyword map)`. `type` always runs first;
//! the rest run in keyword order, and that order never changes the outcome.
//!
//! `format` is pluggable: [`ValidatorRegistry::register_format`] adds checkers,
//! and [`ValidatorRegistry::minimal`] builds a registry without `format`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, Mutex, OnceLock};

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::json::{as_number, canonical_string, json_eq, JsonKind};

/// One keyword validator
pub type ValidatorFn =
    Arc<dyn Fn(&Value, &Value, &Map<String, Value>) -> Result<(), ValidationError> + Send + Sync>;

/// One `format` checker
pub type FormatFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Keyword validation table
#[derive(Clone)]
pub struct ValidatorRegistry {
    validators: BTreeMap<String, ValidatorFn>,
    formats: HashMap<String, FormatFn>,
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("keywords", &self.validators.keys().collect::<Vec<_>>())
            .field("formats", &self.formats.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidatorRegistry {
    /// Full registry: every keyword plus the built-in formats
    pub fn new() -> Self {
        let mut registry = Self::minimal();
        for (name, check) in builtin_formats() {
            registry.formats.insert(name.to_string(), check);
        }
        registry.install_format_validator();
        registry
    }

    /// Registry without a `format` entry
    pub fn minimal() -> Self {
        let mut registry = Self {
            validators: BTreeMap::new(),
            formats: HashMap::new(),
        };

        registry.register("type", validate_type);
        registry.register("enum", validate_enum);
        registry.register("const", validate_const);
        registry.register("minimum", validate_minimum);
        registry.register("maximum", validate_maximum);
        registry.register("exclusiveMinimum", validate_exclusive_minimum);
        registry.register("exclusiveMaximum", validate_exclusive_maximum);
        registry.register("minLength", validate_min_length);
        registry.register("maxLength", validate_max_length);
        registry.register("multipleOf", validate_multiple_of);
        registry.register("minItems", validate_min_items);
        registry.register("maxItems", validate_max_items);
        registry.register("uniqueItems", validate_unique_items);

        let patterns: Arc<Mutex<HashMap<String, Regex>>> = Arc::default();
        registry.register("pattern", move |constraint, value, _| {
            validate_pattern(&patterns, constraint, value)
        });

        registry
    }

    /// Add or replace a keyword validator
    pub fn register<F>(&mut self, keyword: &str, validator: F)
    where
        F: Fn(&Value, &Value, &Map<String, Value>) -> Result<(), ValidationError>
            + Send
            + Sync
            + 'static,
    {
        self.validators.insert(keyword.to_string(), Arc::new(validator));
    }

    /// Add or replace a `format` checker (installs `format` if absent)
    pub fn register_format<F>(&mut self, name: &str, check: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.formats.insert(name.to_string(), Arc::new(check));
        self.install_format_validator();
    }

    fn install_format_validator(&mut self) {
        let formats = Arc::new(self.formats.clone());
        self.register("format", move |constraint, value, _| {
            let (Some(name), Some(s)) = (constraint.as_str(), value.as_str()) else {
                return Ok(());
            };
            match formats.get(name) {
                Some(check) if !check(s) => Err(ValidationError::new(format!(
                    "'{}' is not a valid {}",
                    s, name
                ))),
                _ => Ok(()),
            }
        });
    }

    pub fn get(&self, keyword: &str) -> Option<&ValidatorFn> {
        self.validators.get(keyword)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.validators.contains_key(keyword)
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.validators.keys().map(String::as_str)
    }

    pub fn has_format(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    /// Run every registered keyword in `keywords` against `value`
    ///
    /// `type` is checked first; keywords without a validator are ignored.
    pub fn validate(&self, keywords: &Map<String, Value>, value: &Value) -> Result<(), ValidationError> {
        if let (Some(constraint), Some(validator)) = (keywords.get("type"), self.get("type")) {
            validator(constraint, value, keywords)?;
        }

        for (keyword, constraint) in keywords {
            if keyword == "type" {
                continue;
            }
            if let Some(validator) = self.validators.get(keyword) {
                validator(constraint, value, keywords)?;
            }
        }

        Ok(())
    }
}

// =============================================================================
// Keyword validators
// =============================================================================

fn validate_type(
    constraint: &Value,
    value: &Value,
    _: &Map<String, Value>,
) -> Result<(), ValidationError> {
    let names: Vec<&str> = match constraint {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(|v| v.as_str()).collect(),
        _ => return Ok(()),
    };

    let conforms = names.iter().any(|name| match JsonKind::from_json_type(name) {
        Some(kind) => kind.matches(value),
        // "any" and unknown names do not constrain
        None => true,
    });

    if conforms || names.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(format!(
            "{} is not of type {}",
            value,
            names.join(" or ")
        )))
    }
}

fn validate_enum(
    constraint: &Value,
    value: &Value,
    _: &Map<String, Value>,
) -> Result<(), ValidationError> {
    let Some(options) = constraint.as_array() else {
        return Ok(());
    };
    if options.iter().any(|option| json_eq(option, value)) {
        Ok(())
    } else {
        Err(ValidationError::new(format!("{} is not one of {}", value, constraint)))
    }
}

fn validate_const(
    constraint: &Value,
    value: &Value,
    _: &Map<String, Value>,
) -> Result<(), ValidationError> {
    if json_eq(constraint, value) {
        Ok(())
    } else {
        Err(ValidationError::new(format!("{} is not the constant {}", value, constraint)))
    }
}

fn validate_minimum(
    constraint: &Value,
    value: &Value,
    keywords: &Map<String, Value>,
) -> Result<(), ValidationError> {
    let (Some(bound), Some(v)) = (as_number(constraint), as_number(value)) else {
        return Ok(());
    };
    let exclusive = keywords
        .get("exclusiveMinimum")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if exclusive && v <= bound {
        Err(ValidationError::new(format!("{} was less than or equal to {}", value, constraint)))
    } else if v < bound {
        Err(ValidationError::new(format!("{} was less than {}", value, constraint)))
    } else {
        Ok(())
    }
}

fn validate_maximum(
    constraint: &Value,
    value: &Value,
    keywords: &Map<String, Value>,
) -> Result<(), ValidationError> {
    let (Some(bound), Some(v)) = (as_number(constraint), as_number(value)) else {
        return Ok(());
    };
    let exclusive = keywords
        .get("exclusiveMaximum")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if exclusive && v >= bound {
        Err(ValidationError::new(format!("{} was greater than or equal to {}", value, constraint)))
    } else if v > bound {
        Err(ValidationError::new(format!("{} was greater than {}", value, constraint)))
    } else {
        Ok(())
    }
}

// Draft 6+ numeric form; the draft 4 boolean form is read by minimum/maximum
fn validate_exclusive_minimum(
    constraint: &Value,
    value: &Value,
    _: &Map<String, Value>,
) -> Result<(), ValidationError> {
    match (as_number(constraint), as_number(value)) {
        (Some(bound), Some(v)) if v <= bound => Err(ValidationError::new(format!(
            "{} was less than or equal to {}",
            value, constraint
        ))),
        _ => Ok(()),
    }
}

fn validate_exclusive_maximum(
    constraint: &Value,
    value: &Value,
    _: &Map<String, Value>,
) -> Result<(), ValidationError> {
    match (as_number(constraint), as_number(value)) {
        (Some(bound), Some(v)) if v >= bound => Err(ValidationError::new(format!(
            "{} was greater than or equal to {}",
            value, constraint
        ))),
        _ => Ok(()),
    }
}

fn validate_min_length(
    constraint: &Value,
    value: &Value,
    _: &Map<String, Value>,
) -> Result<(), ValidationError> {
    match (constraint.as_u64(), value.as_str()) {
        (Some(min), Some(s)) if (s.chars().count() as u64) < min => Err(ValidationError::new(
            format!("{} was fewer than {} characters", value, min),
        )),
        _ => Ok(()),
    }
}

fn validate_max_length(
    constraint: &Value,
    value: &Value,
    _: &Map<String, Value>,
) -> Result<(), ValidationError> {
    match (constraint.as_u64(), value.as_str()) {
        (Some(max), Some(s)) if (s.chars().count() as u64) > max => Err(ValidationError::new(
            format!("{} was longer than {} characters", value, max),
        )),
        _ => Ok(()),
    }
}

fn validate_multiple_of(
    constraint: &Value,
    value: &Value,
    _: &Map<String, Value>,
) -> Result<(), ValidationError> {
    if !value.is_number() {
        return Ok(());
    }

    let divisible = match (constraint.as_i64(), value.as_i64()) {
        (Some(0), _) => true,
        (Some(divisor), Some(v)) => v.checked_rem(divisor).map_or(true, |r| r == 0),
        _ => match (as_number(constraint), as_number(value)) {
            (Some(divisor), Some(v)) if divisor != 0.0 => {
                let quotient = v / divisor;
                (quotient - quotient.round()).abs() < 1e-9
            }
            _ => true,
        },
    };

    if divisible {
        Ok(())
    } else {
        Err(ValidationError::new(format!("{} was not a multiple of {}", value, constraint)))
    }
}

fn validate_pattern(
    cache: &Mutex<HashMap<String, Regex>>,
    constraint: &Value,
    value: &Value,
) -> Result<(), ValidationError> {
    let (Some(pattern), Some(s)) = (constraint.as_str(), value.as_str()) else {
        return Ok(());
    };

    let mut cache = cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if !cache.contains_key(pattern) {
        let regex = Regex::new(pattern)
            .map_err(|e| ValidationError::new(format!("invalid pattern {}: {}", constraint, e)))?;
        cache.insert(pattern.to_string(), regex);
    }

    // Search, not full match
    let matched = cache.get(pattern).map(|re| re.is_match(s)).unwrap_or(false);
    if matched {
        Ok(())
    } else {
        Err(ValidationError::new(format!("{} did not match {}", value, constraint)))
    }
}

fn validate_min_items(
    constraint: &Value,
    value: &Value,
    _: &Map<String, Value>,
) -> Result<(), ValidationError> {
    match (constraint.as_u64(), value.as_array()) {
        (Some(min), Some(items)) if (items.len() as u64) < min => Err(ValidationError::new(
            format!("array has {} items, fewer than minItems {}", items.len(), min),
        )),
        _ => Ok(()),
    }
}

fn validate_max_items(
    constraint: &Value,
    value: &Value,
    _: &Map<String, Value>,
) -> Result<(), ValidationError> {
    match (constraint.as_u64(), value.as_array()) {
        (Some(max), Some(items)) if (items.len() as u64) > max => Err(ValidationError::new(
            format!("array has {} items, more than maxItems {}", items.len(), max),
        )),
        _ => Ok(()),
    }
}

fn validate_unique_items(
    constraint: &Value,
    value: &Value,
    _: &Map<String, Value>,
) -> Result<(), ValidationError> {
    match (constraint.as_bool(), value.as_array()) {
        (Some(true), Some(items)) => check_unique(items),
        _ => Ok(()),
    }
}

/// Set-based uniqueness over canonical JSON
pub(crate) fn check_unique(items: &[Value]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(canonical_string(item)) {
            return Err(ValidationError::new(format!(
                "array items are not unique: {} appears more than once",
                item
            )));
        }
    }
    Ok(())
}

// =============================================================================
// Format checkers
// =============================================================================

fn cached_regex(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn is_email(s: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&EMAIL, r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
        .map(|re| re.is_match(s))
        .unwrap_or(false)
}

fn is_uri(s: &str) -> bool {
    static URI: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&URI, r"^[A-Za-z][A-Za-z0-9+.\-]*:\S*$")
        .map(|re| re.is_match(s))
        .unwrap_or(false)
}

fn is_date_time(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
}

fn is_date(s: &str) -> bool {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn is_time(s: &str) -> bool {
    chrono::NaiveTime::parse_from_str(s, "%H:%M:%S%.f").is_ok()
        || chrono::DateTime::parse_from_rfc3339(&format!("1970-01-01T{}", s)).is_ok()
}

fn is_hostname(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    !s.is_empty()
        && s.len() <= 253
        && s.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

fn format_fn(check: impl Fn(&str) -> bool + Send + Sync + 'static) -> FormatFn {
    Arc::new(check)
}

fn builtin_formats() -> Vec<(&'static str, FormatFn)> {
    vec![
        ("email", format_fn(is_email)),
        ("date-time", format_fn(is_date_time)),
        ("date", format_fn(is_date)),
        ("time", format_fn(is_time)),
        ("ipv4", format_fn(|s| s.parse::<Ipv4Addr>().is_ok())),
        ("ipv6", format_fn(|s| s.parse::<Ipv6Addr>().is_ok())),
        ("uri", format_fn(is_uri)),
        ("uuid", format_fn(|s| uuid::Uuid::parse_str(s).is_ok())),
        ("hostname", format_fn(is_hostname)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keywords(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_type_is_strict_about_booleans() {
        let registry = ValidatorRegistry::new();
        let kw = keywords(json!({"type": "integer"}));
        assert!(registry.validate(&kw, &json!(3)).is_ok());
        assert!(registry.validate(&kw, &json!(true)).is_err());
        assert!(registry.validate(&kw, &json!(3.5)).is_err());

        let kw = keywords(json!({"type": ["string", "null"]}));
        assert!(registry.validate(&kw, &Value::Null).is_ok());
        assert!(registry.validate(&kw, &json!(1)).is_err());
    }

    #[test]
    fn test_bounds() {
        let registry = ValidatorRegistry::new();
        let kw = keywords(json!({"type": "integer", "minimum": 0, "maximum": 10}));
        assert!(registry.validate(&kw, &json!(0)).is_ok());
        assert!(registry.validate(&kw, &json!(10)).is_ok());
        let err = registry.validate(&kw, &json!(-1)).unwrap_err();
        assert_eq!(err.message, "-1 was less than 0");

        let draft4 = keywords(json!({"minimum": 0, "exclusiveMinimum": true}));
        assert!(registry.validate(&draft4, &json!(0)).is_err());

        let draft6 = keywords(json!({"exclusiveMaximum": 5}));
        assert!(registry.validate(&draft6, &json!(5)).is_err());
        assert!(registry.validate(&draft6, &json!(4.9)).is_ok());
    }

    #[test]
    fn test_pattern_is_a_search() {
        let registry = ValidatorRegistry::new();
        let kw = keywords(json!({"pattern": "b+"}));
        assert!(registry.validate(&kw, &json!("abbbc")).is_ok());
        assert!(registry.validate(&kw, &json!("ac")).is_err());
        // Non-strings are left to `type`
        assert!(registry.validate(&kw, &json!(12)).is_ok());
    }

    #[test]
    fn test_lengths_count_characters() {
        let registry = ValidatorRegistry::new();
        let kw = keywords(json!({"minLength": 2, "maxLength": 3}));
        assert!(registry.validate(&kw, &json!("héé")).is_ok());
        assert!(registry.validate(&kw, &json!("h")).is_err());
        assert!(registry.validate(&kw, &json!("hell")).is_err());
    }

    #[test]
    fn test_multiple_of() {
        let registry = ValidatorRegistry::new();
        let kw = keywords(json!({"multipleOf": 3}));
        assert!(registry.validate(&kw, &json!(9)).is_ok());
        assert!(registry.validate(&kw, &json!(10)).is_err());

        let kw = keywords(json!({"multipleOf": 0.1}));
        assert!(registry.validate(&kw, &json!(0.3)).is_ok());
        assert!(registry.validate(&kw, &json!(0.35)).is_err());
    }

    #[test]
    fn test_multiple_of_negative_divisor_at_integer_bounds() {
        let registry = ValidatorRegistry::new();
        let kw = keywords(json!({"type": "integer", "multipleOf": -1}));
        assert!(registry.validate(&kw, &json!(i64::MIN)).is_ok());

        let kw = keywords(json!({"multipleOf": -4}));
        assert!(registry.validate(&kw, &json!(i64::MIN)).is_ok());
        assert!(registry.validate(&kw, &json!(6)).is_err());
    }

    #[test]
    fn test_enum_and_const_compare_numerically() {
        let registry = ValidatorRegistry::new();
        let kw = keywords(json!({"enum": [1, "two", null]}));
        assert!(registry.validate(&kw, &json!(1.0)).is_ok());
        assert!(registry.validate(&kw, &Value::Null).is_ok());
        assert!(registry.validate(&kw, &json!("three")).is_err());

        let kw = keywords(json!({"const": {"a": 1}}));
        assert!(registry.validate(&kw, &json!({"a": 1.0})).is_ok());
    }

    #[test]
    fn test_array_keywords() {
        let registry = ValidatorRegistry::new();
        let kw = keywords(json!({"minItems": 1, "maxItems": 2, "uniqueItems": true}));
        assert!(registry.validate(&kw, &json!(["a", "b"])).is_ok());
        assert!(registry.validate(&kw, &json!([])).is_err());
        assert!(registry.validate(&kw, &json!(["a", "b", "c"])).is_err());
        assert!(registry.validate(&kw, &json!([1, 1.0])).is_err());
    }

    #[test]
    fn test_formats() {
        let registry = ValidatorRegistry::new();
        let check = |format: &str, value: &str| {
            registry
                .validate(&keywords(json!({"format": format})), &json!(value))
                .is_ok()
        };
        assert!(check("email", "a@b.io"));
        assert!(!check("email", "nope"));
        assert!(check("date-time", "2024-01-02T03:04:05Z"));
        assert!(!check("date", "2024-13-01"));
        assert!(check("time", "10:20:30"));
        assert!(check("ipv4", "10.0.0.1"));
        assert!(!check("ipv6", "10.0.0.1"));
        assert!(check("uuid", "67e55044-10b1-426f-9247-bb680e5fe0c8"));
        assert!(check("hostname", "api.example.com"));
        assert!(!check("hostname", "-bad-.com"));
        assert!(check("uri", "https://example.com/x"));
        // Unknown formats pass
        assert!(check("color", "mauve"));
    }

    #[test]
    fn test_minimal_registry_has_no_format() {
        let mut registry = ValidatorRegistry::minimal();
        assert!(!registry.contains("format"));
        let kw = keywords(json!({"format": "email"}));
        assert!(registry.validate(&kw, &json!("nope")).is_ok());

        registry.register_format("even", |s| s.len() % 2 == 0);
        assert!(registry.contains("format"));
        let kw = keywords(json!({"format": "even"}));
        assert!(registry.validate(&kw, &json!("ab")).is_ok());
        assert!(registry.validate(&kw, &json!("abc")).is_err());
    }

    #[test]
    fn test_keyword_order_does_not_change_outcome() {
        let registry = ValidatorRegistry::new();
        let a = keywords(json!({"type": "string", "pattern": "^x", "maxLength": 2}));
        let mut b = Map::new();
        b.insert("maxLength".into(), json!(2));
        b.insert("pattern".into(), json!("^x"));
        b.insert("type".into(), json!("string"));
        for value in [json!("xy"), json!("xyz"), json!("ab"), json!(7)] {
            assert_eq!(
                registry.validate(&a, &value).is_ok(),
                registry.validate(&b, &value).is_ok()
            );
        }
    }
}
