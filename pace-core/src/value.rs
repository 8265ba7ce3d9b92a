//! Dynamic value type carried between chain stages.
//!
//! Stages pass a single [`Value`] from one handler to the next. It wraps
//! `serde_json::Value`, so results can be logged, compared in tests and
//! handed to external collaborators without conversion.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// Dynamic value passed through a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(pub JsonValue);

impl Value {
    /// Create a null value.
    pub fn null() -> Self {
        Self(JsonValue::Null)
    }

    /// Create a boolean value.
    pub fn bool(v: bool) -> Self {
        Self(JsonValue::Bool(v))
    }

    /// Create an integer value.
    pub fn int(v: i64) -> Self {
        Self(JsonValue::Number(v.into()))
    }

    /// Create a floating-point value. Non-finite numbers become null.
    pub fn float(v: f64) -> Self {
        Self(serde_json::Number::from_f64(v).map_or(JsonValue::Null, JsonValue::Number))
    }

    /// Create a string value.
    pub fn string(v: impl Into<String>) -> Self {
        Self(JsonValue::String(v.into()))
    }

    /// Create an array value.
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Self(JsonValue::Array(
            items.into_iter().map(Value::into_inner).collect(),
        ))
    }

    /// Create an object value; later duplicate keys win.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self(JsonValue::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into_inner()))
                .collect::<Map<String, JsonValue>>(),
        ))
    }

    /// Check if the value is null.
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// Truthiness used by predicates such as `filter`, `every` and `some`.
    ///
    /// Null, `false`, zero, NaN and the empty string are falsy. Arrays and
    /// objects are truthy even when empty.
    pub fn is_truthy(&self) -> bool {
        match &self.0 {
            JsonValue::Null => false,
            JsonValue::Bool(b) => *b,
            JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            JsonValue::String(s) => !s.is_empty(),
            JsonValue::Array(_) | JsonValue::Object(_) => true,
        }
    }

    /// Name of the value's kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match &self.0 {
            JsonValue::Null => "null",
            JsonValue::Bool(_) => "boolean",
            JsonValue::Number(_) => "number",
            JsonValue::String(_) => "string",
            JsonValue::Array(_) => "array",
            JsonValue::Object(_) => "object",
        }
    }

    /// Look up a key of an object value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.get(key).cloned().map(Value)
    }

    /// Look up an element of an array value.
    pub fn at(&self, index: usize) -> Option<Value> {
        self.0.get(index).cloned().map(Value)
    }

    /// Try to get as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }

    /// Try to get as a string; numbers and booleans are rendered.
    pub fn as_string(&self) -> Option<String> {
        match &self.0 {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            JsonValue::Bool(b) => Some(b.to_string()),
            JsonValue::Null => None,
            _ => Some(self.0.to_string()),
        }
    }

    /// Try to get as an integer. Floats with no fractional part convert.
    pub fn as_i64(&self) -> Option<i64> {
        match &self.0 {
            JsonValue::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            _ => None,
        }
    }

    /// Try to get as a float. Numeric strings are parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match &self.0 {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to get as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        self.0.as_bool()
    }

    /// Borrow the elements of an array value.
    pub fn as_array(&self) -> Option<&Vec<JsonValue>> {
        self.0.as_array()
    }

    /// Borrow the entries of an object value.
    pub fn as_object(&self) -> Option<&Map<String, JsonValue>> {
        self.0.as_object()
    }

    /// Split an array value of exactly `N` elements into separate values.
    ///
    /// Handlers use this to bind several positional arguments set with
    /// `Chain::set_args`.
    pub fn destructure<const N: usize>(self) -> Option<[Value; N]> {
        match self.0 {
            JsonValue::Array(items) if items.len() == N => {
                let values: Vec<Value> = items.into_iter().map(Value).collect();
                values.try_into().ok()
            }
            _ => None,
        }
    }

    /// Access the inner serde_json::Value.
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Convert into the inner serde_json::Value.
    pub fn into_inner(self) -> JsonValue {
        self.0
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        Self(v)
    }
}

impl From<Value> for JsonValue {
    fn from(v: Value) -> Self {
        v.0
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Self::null()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::string(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::float(n)
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Self(JsonValue::from(n))
                }
            }
        )*
    };
}

value_from_int!(i32, i64, u32, u64, usize);

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or_else(Self::null, Into::into)
    }
}
