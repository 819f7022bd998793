//! Prop Validation
//!
//! Resolves the value of one declared prop from the data a parent passed in:
//! Boolean casting, defaults, and the required/type/validator checks.
//!
//! Defaults are made reactive even when the caller has suspended conversion,
//! because a default value is fresh data owned by the receiving component.

use std::fmt;
use std::rc::Rc;

use tracing::warn;

use crate::error::{ReactiveError, Result};
use crate::observer::{observe, ConversionGuard, ReactiveObject, Value};

/// A type a prop may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl PropType {
    pub fn name(self) -> &'static str {
        match self {
            PropType::String => "String",
            PropType::Number => "Number",
            PropType::Boolean => "Boolean",
            PropType::Object => "Object",
            PropType::Array => "Array",
        }
    }

    /// Whether `value` is of this type.
    pub fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (PropType::String, Value::String(_))
                | (PropType::Number, Value::Number(_))
                | (PropType::Boolean, Value::Bool(_))
                | (PropType::Object, Value::Object(_))
                | (PropType::Array, Value::Array(_))
        )
    }
}

impl fmt::Display for PropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A prop's default value.
#[derive(Clone)]
pub enum PropDefault {
    /// Used as is. Object and array literals would be shared between every
    /// instance, so they draw a warning.
    Value(Value),
    /// Called once per resolution.
    Factory(Rc<dyn Fn() -> Value>),
}

impl PropDefault {
    fn resolve(&self, key: &str) -> Value {
        match self {
            PropDefault::Value(value) => {
                if value.is_container() {
                    warn!(
                        prop = key,
                        "props with type Object/Array must use a factory function to return the default value"
                    );
                }
                value.clone()
            }
            PropDefault::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for PropDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropDefault::Value(value) => f.debug_tuple("Value").field(value).finish(),
            PropDefault::Factory(_) => f.write_str("Factory"),
        }
    }
}

/// The declaration of one prop.
#[derive(Clone, Default)]
pub struct PropOptions {
    /// Accepted types. Empty accepts anything.
    pub types: Vec<PropType>,
    pub default: Option<PropDefault>,
    pub required: bool,
    pub validator: Option<Rc<dyn Fn(&Value) -> bool>>,
}

impl PropOptions {
    /// A prop accepting a single type.
    pub fn of(ty: PropType) -> Self {
        Self {
            types: vec![ty],
            ..Default::default()
        }
    }

    /// A prop accepting any of `types`.
    pub fn any_of(types: impl IntoIterator<Item = PropType>) -> Self {
        Self {
            types: types.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(PropDefault::Value(value.into()));
        self
    }

    pub fn default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + 'static,
    {
        self.default = Some(PropDefault::Factory(Rc::new(factory)));
        self
    }

    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value) -> bool + 'static,
    {
        self.validator = Some(Rc::new(validator));
        self
    }

    fn accepts(&self, ty: PropType) -> bool {
        self.types.contains(&ty)
    }
}

impl fmt::Debug for PropOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropOptions")
            .field("types", &self.types)
            .field("default", &self.default)
            .field("required", &self.required)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

/// Resolve the value of prop `key` from `props_data`.
///
/// Failed checks are logged, not returned; the value is used either way.
pub fn validate_prop(key: &str, options: &PropOptions, props_data: &ReactiveObject) -> Value {
    let mut value = props_data.get_untracked(key);
    let absent = value.is_none();

    if options.accepts(PropType::Boolean) {
        if absent && options.default.is_none() {
            value = Some(Value::Bool(false));
        } else if !options.accepts(PropType::String) && is_boolean_attribute(key, value.as_ref()) {
            value = Some(Value::Bool(true));
        }
    }

    let value = match value {
        Some(value) => value,
        None => {
            let value = options
                .default
                .as_ref()
                .map(|default| default.resolve(key))
                .unwrap_or_default();
            let _conversion = ConversionGuard::set(true);
            observe(&value, false);
            value
        }
    };

    if let Err(err) = assert_prop(key, options, &value, absent) {
        warn!(prop = key, error = %err, "prop validation failed");
    }
    value
}

/// A Boolean prop passed as `""` or as its own hyphenated name means `true`.
fn is_boolean_attribute(key: &str, value: Option<&Value>) -> bool {
    match value.and_then(Value::as_str) {
        Some(s) => s.is_empty() || s == hyphenate(key),
        None => false,
    }
}

/// Check `value` against the declaration of prop `name`.
pub fn assert_prop(name: &str, options: &PropOptions, value: &Value, absent: bool) -> Result<()> {
    let invalid = |reason: String| ReactiveError::InvalidProp {
        name: name.to_string(),
        reason,
    };

    if options.required && absent {
        return Err(invalid("missing required prop".to_string()));
    }
    if value.is_null() && !options.required {
        return Ok(());
    }

    if !options.types.is_empty() && !options.types.iter().any(|ty| ty.matches(value)) {
        let expected: Vec<&str> = options.types.iter().map(|ty| ty.name()).collect();
        return Err(invalid(format!(
            "type check failed, expected {}, got {}",
            expected.join(", "),
            value.type_name()
        )));
    }

    if let Some(validator) = &options.validator {
        if !validator(value) {
            return Err(invalid("custom validator check failed".to_string()));
        }
    }
    Ok(())
}

/// `camelCase` to `kebab-case`.
pub fn hyphenate(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::with_conversion;
    use serde_json::json;

    fn data(json: serde_json::Value) -> ReactiveObject {
        Value::from(json).as_object().cloned().unwrap()
    }

    #[test]
    fn absent_boolean_without_default_is_false() {
        let options = PropOptions::of(PropType::Boolean);
        assert_eq!(validate_prop("disabled", &options, &data(json!({}))), Value::Bool(false));
    }

    #[test]
    fn boolean_attribute_forms_mean_true() {
        let options = PropOptions::of(PropType::Boolean);
        let props = data(json!({ "isOpen": "", "showAll": "show-all" }));

        assert_eq!(validate_prop("isOpen", &options, &props), Value::Bool(true));
        assert_eq!(validate_prop("showAll", &options, &props), Value::Bool(true));

        // A String alternative keeps the raw string.
        let either = PropOptions::any_of([PropType::Boolean, PropType::String]);
        assert_eq!(validate_prop("isOpen", &either, &props), Value::from(""));
    }

    #[test]
    fn literal_default_is_used_when_absent() {
        let options = PropOptions::of(PropType::Number).default_value(3);
        assert_eq!(validate_prop("size", &options, &data(json!({}))), Value::from(3));

        let passed = data(json!({ "size": 9 }));
        assert_eq!(validate_prop("size", &options, &passed), Value::from(9));
    }

    #[test]
    fn factory_default_is_observed_even_with_conversion_off() {
        let options = PropOptions::of(PropType::Object)
            .default_factory(|| Value::from(json!({ "nested": { "x": 1 } })));

        let value = with_conversion(false, || validate_prop("config", &options, &data(json!({}))));
        assert!(value.observer().is_some());
        let nested = value.as_object().and_then(|o| o.get_untracked("nested")).unwrap();
        assert!(nested.observer().is_some());

        // Each resolution builds a fresh value.
        let again = validate_prop("config", &options, &data(json!({})));
        assert!(!again.same(&value));
    }

    #[test]
    fn conversion_setting_is_restored_after_default() {
        let options = PropOptions::default().default_value(1);
        with_conversion(false, || {
            validate_prop("n", &options, &data(json!({})));
            assert!(!crate::observer::should_convert());
        });
    }

    #[test]
    fn assert_prop_reports_each_failure() {
        let required = PropOptions::of(PropType::String).required();
        assert!(matches!(
            assert_prop("title", &required, &Value::Null, true),
            Err(ReactiveError::InvalidProp { reason, .. }) if reason == "missing required prop"
        ));

        let typed = PropOptions::any_of([PropType::String, PropType::Number]);
        let err = assert_prop("title", &typed, &Value::Bool(true), false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid prop \"title\": type check failed, expected String, Number, got Boolean"
        );

        let positive = PropOptions::of(PropType::Number)
            .validator(|v| v.as_f64().is_some_and(|n| n > 0.0));
        assert!(assert_prop("count", &positive, &Value::from(2), false).is_ok());
        assert!(assert_prop("count", &positive, &Value::from(-1), false).is_err());
    }

    #[test]
    fn null_passes_when_not_required() {
        let options = PropOptions::of(PropType::Number);
        assert!(assert_prop("n", &options, &Value::Null, false).is_ok());
    }

    #[test]
    fn invalid_values_are_still_returned() {
        let options = PropOptions::of(PropType::Number);
        let props = data(json!({ "n": "oops" }));
        assert_eq!(validate_prop("n", &options, &props), Value::from("oops"));
    }

    #[test]
    fn hyphenates_camel_case() {
        assert_eq!(hyphenate("showAll"), "show-all");
        assert_eq!(hyphenate("aBC"), "a-b-c");
        assert_eq!(hyphenate("plain"), "plain");
    }
}
