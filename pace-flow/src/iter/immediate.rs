//! Immediate iteration: every operation runs to completion in the caller's
//! turn.
//!
//! Callbacks return `Result<LoopControl<T>>`. `Break` ends the loop and the
//! operation returns what it has so far; an `Err` aborts the loop and is
//! returned as is.

use super::control::{Key, LoopControl};
use super::range::Repeat;
use super::source::{Collector, Source};
use pace_core::{ChainError, Result, Value};

/// Call `f` for each item. Returns how many items continued.
pub fn for_each<F>(source: &Value, mut f: F) -> Result<usize>
where
    F: FnMut(&Value, &Key) -> Result<LoopControl<()>>,
{
    let mut done = 0;
    for (key, item) in Source::from_value(source)?.into_entries() {
        if f(&item, &key)?.is_break() {
            break;
        }
        done += 1;
    }
    Ok(done)
}

/// Transform each item, keeping the source's shape.
pub fn map<F>(source: &Value, mut f: F) -> Result<Value>
where
    F: FnMut(&Value, &Key) -> Result<LoopControl<Value>>,
{
    let source = Source::from_value(source)?;
    let mut out = Collector::new(source.shape());
    for (key, item) in source.into_entries() {
        match f(&item, &key)? {
            LoopControl::Continue(v) => out.push(key, v),
            LoopControl::Break => break,
        }
    }
    Ok(out.finish())
}

/// Keep the items for which `f` is true, keeping the source's shape and keys.
pub fn filter<F>(source: &Value, mut f: F) -> Result<Value>
where
    F: FnMut(&Value, &Key) -> Result<LoopControl<bool>>,
{
    let source = Source::from_value(source)?;
    let mut out = Collector::new(source.shape());
    for (key, item) in source.into_entries() {
        match f(&item, &key)? {
            LoopControl::Continue(true) => out.push(key, item),
            LoopControl::Continue(false) => {}
            LoopControl::Break => break,
        }
    }
    Ok(out.finish())
}

/// Fold the items into one value.
///
/// Without a seed, the first item is the seed and folding starts at the
/// second; an empty source then fails with `InvalidArgument`.
pub fn reduce<F>(source: &Value, seed: Option<Value>, mut f: F) -> Result<Value>
where
    F: FnMut(Value, &Value, &Key) -> Result<LoopControl<Value>>,
{
    let mut entries = Source::from_value(source)?.into_entries().into_iter();
    let mut acc = match seed {
        Some(seed) => seed,
        None => entries.next().map(|(_, v)| v).ok_or_else(empty_reduce)?,
    };
    for (key, item) in entries {
        match f(acc.clone(), &item, &key)? {
            LoopControl::Continue(next) => acc = next,
            LoopControl::Break => break,
        }
    }
    Ok(acc)
}

pub(crate) fn empty_reduce() -> ChainError {
    ChainError::InvalidArgument {
        operation: "reduce",
        cause: "empty source with no seed".to_string(),
    }
}

/// Check that `f` holds for every item; stops at the first failure.
pub fn every<F>(source: &Value, mut f: F) -> Result<bool>
where
    F: FnMut(&Value, &Key) -> Result<LoopControl<bool>>,
{
    for (key, item) in Source::from_value(source)?.into_entries() {
        match f(&item, &key)? {
            LoopControl::Continue(true) => {}
            LoopControl::Continue(false) => return Ok(false),
            LoopControl::Break => break,
        }
    }
    Ok(true)
}

/// Check that `f` holds for some item; stops at the first success.
pub fn some<F>(source: &Value, mut f: F) -> Result<bool>
where
    F: FnMut(&Value, &Key) -> Result<LoopControl<bool>>,
{
    for (key, item) in Source::from_value(source)?.into_entries() {
        match f(&item, &key)? {
            LoopControl::Continue(true) => return Ok(true),
            LoopControl::Continue(false) => {}
            LoopControl::Break => break,
        }
    }
    Ok(false)
}

/// Pair up items by position, truncating to the shortest source.
pub fn zip(sources: &[Value]) -> Result<Value> {
    zip_with(sources, |row, _| Ok(LoopControl::Continue(row.clone())))
}

/// Like [`zip`], passing each row (an array) through `f`.
pub fn zip_with<F>(sources: &[Value], mut f: F) -> Result<Value>
where
    F: FnMut(&Value, &Key) -> Result<LoopControl<Value>>,
{
    let mut out = Collector::new(super::source::Shape::Array);
    for (key, row) in zip_rows(sources)? {
        match f(&row, &key)? {
            LoopControl::Continue(v) => out.push(key, v),
            LoopControl::Break => break,
        }
    }
    Ok(out.finish())
}

pub(crate) fn zip_rows(sources: &[Value]) -> Result<Vec<(Key, Value)>> {
    let columns = sources
        .iter()
        .map(|s| Source::from_value(s).map(|src| src.into_entries()))
        .collect::<Result<Vec<_>>>()?;
    let len = columns.iter().map(Vec::len).min().unwrap_or(0);
    Ok((0..len)
        .map(|i| {
            let row = columns.iter().map(|column| column[i].1.clone());
            (Key::Index(i), Value::array(row))
        })
        .collect())
}

/// Call `f` with each number of a count or range. Returns how many continued.
pub fn repeat<F>(times: impl Into<Repeat>, mut f: F) -> Result<usize>
where
    F: FnMut(i64) -> Result<LoopControl<()>>,
{
    let mut done = 0;
    for n in times.into().iter()? {
        if f(n)?.is_break() {
            break;
        }
        done += 1;
    }
    Ok(done)
}

/// Call `f` with 0, 1, 2, ... until it breaks or fails.
pub fn for_ever<F>(mut f: F) -> Result<usize>
where
    F: FnMut(u64) -> Result<LoopControl<()>>,
{
    let mut done = 0usize;
    for n in 0u64.. {
        if f(n)?.is_break() {
            break;
        }
        done += 1;
    }
    Ok(done)
}

/// Drive any iterator of values. Returns how many items continued.
pub fn iterate<I, F>(items: I, mut f: F) -> Result<usize>
where
    I: IntoIterator<Item = Value>,
    F: FnMut(&Value, usize) -> Result<LoopControl<()>>,
{
    let mut done = 0;
    for (i, item) in items.into_iter().enumerate() {
        if f(&item, i)?.is_break() {
            break;
        }
        done += 1;
    }
    Ok(done)
}

/// The numbers of a count or range, as an array value.
pub fn range(spec: impl Into<Repeat>) -> Result<Value> {
    Ok(Value::array(spec.into().iter()?.map(Value::int)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iter::range::RangeSpec;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value(json)
    }

    #[test]
    fn for_each_early_exit_counts_side_effects() {
        let source = v(json!([1, 2, 3, 4, 5]));
        for n in 0..=5 {
            let mut effects = 0;
            let done = for_each(&source, |_, key| {
                if key.as_index() == Some(n) {
                    return Ok(LoopControl::Break);
                }
                effects += 1;
                Ok(LoopControl::Continue(()))
            })
            .unwrap();
            assert_eq!(effects, n);
            assert_eq!(done, n);
        }
    }

    #[test]
    fn map_preserves_shape() {
        let doubled = map(&v(json!([1, 2, 3])), |x, _| {
            Ok(LoopControl::Continue(Value::int(x.as_i64().unwrap_or(0) * 2)))
        })
        .unwrap();
        assert_eq!(doubled, v(json!([2, 4, 6])));

        let keyed = map(&v(json!({"a": 1, "b": 2})), |x, key| {
            Ok(LoopControl::Continue(Value::string(format!("{key}={x}"))))
        })
        .unwrap();
        assert_eq!(keyed, v(json!({"a": "a=1", "b": "b=2"})));
    }

    #[test]
    fn filter_keeps_original_keys() {
        let kept = filter(&v(json!({"a": 1, "b": 2, "c": 3})), |x, _| {
            Ok(LoopControl::Continue(x.as_i64().unwrap_or(0) % 2 == 1))
        })
        .unwrap();
        assert_eq!(kept, v(json!({"a": 1, "c": 3})));

        let chars = filter(&Value::from("a1b2"), |c, _| {
            Ok(LoopControl::Continue(
                c.as_str().is_some_and(|s| s.chars().all(char::is_alphabetic)),
            ))
        })
        .unwrap();
        assert_eq!(chars, v(json!(["a", "b"])));
    }

    #[test]
    fn reduce_seeds_from_first_element() {
        let sum = |acc: Value, x: &Value, _: &Key| {
            Ok(LoopControl::Continue(Value::int(
                acc.as_i64().unwrap_or(0) + x.as_i64().unwrap_or(0),
            )))
        };
        let source = v(json!([1, 2, 3, 4]));
        assert_eq!(reduce(&source, None, sum).unwrap(), Value::int(10));
        assert_eq!(reduce(&source, Some(Value::int(100)), sum).unwrap(), Value::int(110));

        let mut calls = 0;
        reduce(&source, None, |acc, _, _| {
            calls += 1;
            Ok(LoopControl::Continue(acc))
        })
        .unwrap();
        assert_eq!(calls, 3);
    }

    #[test]
    fn reduce_empty_without_seed_fails() {
        let err = reduce(&v(json!([])), None, |acc, _, _| Ok(LoopControl::Continue(acc)))
            .unwrap_err();
        assert_eq!(err.code(), "E402");
        assert_eq!(
            reduce(&v(json!([])), Some(Value::int(1)), |a, _, _| Ok(LoopControl::Continue(a)))
                .unwrap(),
            Value::int(1)
        );
    }

    #[test]
    fn every_and_some_short_circuit() {
        let source = v(json!([2, 4, 5, 6]));
        let mut seen = 0;
        let all_even = every(&source, |x, _| {
            seen += 1;
            Ok(LoopControl::Continue(x.as_i64().unwrap_or(0) % 2 == 0))
        })
        .unwrap();
        assert!(!all_even);
        assert_eq!(seen, 3);

        let any_odd = some(&source, |x, _| {
            Ok(LoopControl::Continue(x.as_i64().unwrap_or(0) % 2 == 1))
        })
        .unwrap();
        assert!(any_odd);
        assert!(every(&v(json!([])), |_, _| Ok(LoopControl::Continue(false))).unwrap());
        assert!(!some(&v(json!([])), |_, _| Ok(LoopControl::Continue(true))).unwrap());
    }

    #[test]
    fn zip_truncates_to_shortest() {
        let zipped = zip(&[v(json!([1, 2, 3])), v(json!(["a", "b"])), Value::from("xyz")]).unwrap();
        assert_eq!(zipped, v(json!([[1, "a", "x"], [2, "b", "y"]])));

        let sums = zip_with(&[v(json!([1, 2])), v(json!([10, 20]))], |row, _| {
            let total: i64 = row
                .as_array()
                .map(|r| r.iter().filter_map(serde_json::Value::as_i64).sum())
                .unwrap_or(0);
            Ok(LoopControl::Continue(Value::int(total)))
        })
        .unwrap();
        assert_eq!(sums, v(json!([11, 22])));
        assert_eq!(zip(&[]).unwrap(), v(json!([])));
    }

    #[test]
    fn repeat_count_and_descriptor() {
        let mut seen = Vec::new();
        let done = repeat(3usize, |n| {
            seen.push(n);
            Ok(LoopControl::Continue(()))
        })
        .unwrap();
        assert_eq!(done, 3);
        assert_eq!(seen, vec![0, 1, 2]);

        let mut seen = Vec::new();
        repeat(RangeSpec::new(10, 0).step(-4), |n| {
            seen.push(n);
            Ok(LoopControl::Continue(()))
        })
        .unwrap();
        assert_eq!(seen, vec![10, 6, 2]);
    }

    #[test]
    fn for_ever_until_break() {
        let done = for_ever(|n| {
            Ok(if n == 7 {
                LoopControl::Break
            } else {
                LoopControl::Continue(())
            })
        })
        .unwrap();
        assert_eq!(done, 7);
    }

    #[test]
    fn iterate_any_iterator() {
        let mut total = 0;
        let done = iterate((1..=4).map(Value::int), |x, _| {
            total += x.as_i64().unwrap_or(0);
            Ok(LoopControl::Continue(()))
        })
        .unwrap();
        assert_eq!((done, total), (4, 10));
    }

    #[test]
    fn errors_abort_loop() {
        let mut effects = 0;
        let err = for_each(&v(json!([1, 2, 3])), |x, _| {
            if x.as_i64() == Some(2) {
                return Err(ChainError::failed("bad item"));
            }
            effects += 1;
            Ok(LoopControl::Continue(()))
        })
        .unwrap_err();
        assert_eq!(err.message(), "bad item");
        assert_eq!(effects, 1);
    }

    #[test]
    fn nested_break_only_ends_inner_loop() {
        let mut pairs = 0;
        let outer = for_each(&v(json!([1, 2, 3])), |_, _| {
            for_each(&v(json!([1, 2, 3])), |y, _| {
                if y.as_i64() == Some(2) {
                    return Ok(LoopControl::Break);
                }
                pairs += 1;
                Ok(LoopControl::Continue(()))
            })?;
            Ok(LoopControl::Continue(()))
        })
        .unwrap();
        assert_eq!(outer, 3);
        assert_eq!(pairs, 3);
    }

    #[test]
    fn range_values() {
        assert_eq!(range(RangeSpec::new(1, 4)).unwrap(), v(json!([1, 2, 3])));
        assert!(range(RangeSpec::new(1, 4).step(0)).is_err());
        assert!(for_each(&Value::int(1), |_, _| Ok(LoopControl::Continue(()))).is_err());
    }
}
