//! Iterable sources and shape-preserving output.

use super::control::Key;
use pace_core::{ChainError, Result, Value};
use serde_json::{Map, Value as JsonValue};

/// Whether results are collected into an array or an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Positional output.
    Array,
    /// Keyed output.
    Object,
}

/// A snapshot of the items in a value.
///
/// Arrays yield their elements, objects their entries, strings their
/// characters, and null nothing. Other values cannot be iterated.
#[derive(Debug, Clone)]
pub struct Source {
    shape: Shape,
    entries: Vec<(Key, Value)>,
}

impl Source {
    /// Snapshot the items of `value`.
    pub fn from_value(value: &Value) -> Result<Self> {
        let (shape, entries) = match value.inner() {
            JsonValue::Null => (Shape::Array, Vec::new()),
            JsonValue::Array(items) => (
                Shape::Array,
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (Key::Index(i), Value(v.clone())))
                    .collect(),
            ),
            JsonValue::Object(map) => (
                Shape::Object,
                map.iter()
                    .map(|(k, v)| (Key::Name(k.clone()), Value(v.clone())))
                    .collect(),
            ),
            JsonValue::String(s) => (
                Shape::Array,
                s.chars()
                    .enumerate()
                    .map(|(i, c)| (Key::Index(i), Value::string(c)))
                    .collect(),
            ),
            other => {
                return Err(ChainError::NotIterable {
                    kind: Value(other.clone()).kind().to_string(),
                });
            }
        };
        Ok(Self { shape, entries })
    }

    /// A positional source over `values`.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            shape: Shape::Array,
            entries: values
                .into_iter()
                .enumerate()
                .map(|(i, v)| (Key::Index(i), v))
                .collect(),
        }
    }

    /// Output shape for `map` and `filter`.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no items.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume into `(key, item)` pairs in source order.
    pub fn into_entries(self) -> Vec<(Key, Value)> {
        self.entries
    }
}

/// Collects results in the shape of their source.
#[derive(Debug)]
pub(crate) struct Collector {
    shape: Shape,
    items: Vec<(Key, Value)>,
}

impl Collector {
    pub(crate) fn new(shape: Shape) -> Self {
        Self {
            shape,
            items: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, key: Key, value: Value) {
        self.items.push((key, value));
    }

    pub(crate) fn finish(&mut self) -> Value {
        let items = std::mem::take(&mut self.items);
        match self.shape {
            Shape::Array => Value::array(items.into_iter().map(|(_, v)| v)),
            Shape::Object => Value(JsonValue::Object(
                items
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.into_inner()))
                    .collect::<Map<String, JsonValue>>(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn arrays_objects_strings_null() {
        let array = Source::from_value(&Value(json!([1, 2]))).unwrap();
        assert_eq!(array.shape(), Shape::Array);
        assert_eq!(array.len(), 2);

        let object = Source::from_value(&Value(json!({"a": 1}))).unwrap();
        assert_eq!(object.shape(), Shape::Object);
        assert_eq!(
            object.into_entries(),
            vec![(Key::Name("a".into()), Value::int(1))]
        );

        let chars = Source::from_value(&Value::from("hé")).unwrap();
        assert_eq!(
            chars.into_entries(),
            vec![
                (Key::Index(0), Value::from("h")),
                (Key::Index(1), Value::from("é"))
            ]
        );

        assert!(Source::from_value(&Value::null()).unwrap().is_empty());
    }

    #[test]
    fn scalars_are_not_iterable() {
        let err = Source::from_value(&Value::int(3)).unwrap_err();
        assert_eq!(
            err,
            ChainError::NotIterable {
                kind: "number".into()
            }
        );
        assert!(Source::from_value(&Value::bool(true)).is_err());
    }

    #[test]
    fn collector_keeps_shape() {
        let mut c = Collector::new(Shape::Object);
        c.push(Key::Name("x".into()), Value::int(1));
        assert_eq!(c.finish(), Value(json!({"x": 1})));

        let mut c = Collector::new(Shape::Array);
        c.push(Key::Index(3), Value::int(9));
        assert_eq!(c.finish(), Value(json!([9])));
    }
}
