//! Deferred iteration: the same operations as the immediate family, spread
//! over scheduler turns.
//!
//! Every operation returns a begun [`Chain`] that resolves to the
//! operation's value. The driver inserts one tick stage at a time ahead of
//! anything the caller appends, so the caller's stages see the final value.
//! A tick handles up to the speed's chunk size of items, then yields through
//! the chain's deferral. A callback may return a nested chain; it is
//! flattened before the next item.
//!
//! Argument errors (a non-iterable source, a zero step, an empty `reduce`
//! without a seed) are raised into the returned chain.

use super::control::{Key, LoopControl};
use super::immediate::{empty_reduce, zip_rows};
use super::range::Repeat;
use super::source::{Collector, Shape, Source};
use pace_core::{Chain, ChainOptions, Flow, Result, Scheduler, Speed, Value};
use std::cell::RefCell;
use std::iter::Peekable;
use std::rc::Rc;

type Items = Box<dyn Iterator<Item = (Key, Value)>>;
type Callback = Box<dyn FnMut(&Value, &Key, &Chain) -> Result<LoopControl<Flow>>>;

/// Runs iteration operations on chains at a fixed speed.
///
/// # Example
///
/// ```
/// use pace_core::prelude::*;
/// use pace_flow::prelude::*;
///
/// let (scheduler, clock) = Scheduler::manual();
/// let chain = Stepper::new(&scheduler)
///     .speed(Speed::Slow)
///     .map(&Value::from(vec![Value::int(1), Value::int(2)]), |x, _, _| {
///         Ok(LoopControl::Continue(x.as_i64().unwrap_or(0) * 10))
///     });
/// clock.run_until_idle();
/// assert_eq!(chain.result(), Some(Value::from(vec![Value::int(10), Value::int(20)])));
/// ```
#[derive(Debug, Clone)]
pub struct Stepper {
    scheduler: Scheduler,
    speed: Speed,
}

impl Stepper {
    /// A stepper at the scheduler's default speed.
    pub fn new(scheduler: &Scheduler) -> Self {
        Self {
            scheduler: scheduler.clone(),
            speed: scheduler.config().default_speed,
        }
    }

    /// Run at `speed` instead.
    pub fn speed(mut self, speed: Speed) -> Self {
        self.speed = speed;
        self
    }

    /// The speed operations run at.
    pub fn current_speed(&self) -> Speed {
        self.speed
    }

    /// Call `f` for each item. Resolves to how many items continued.
    pub fn for_each<F, R>(&self, source: &Value, f: F) -> Chain
    where
        F: FnMut(&Value, &Key, &Chain) -> Result<LoopControl<R>> + 'static,
        R: Into<Flow>,
    {
        let items = Source::from_value(source).map(entries);
        self.launch(items, Count::default(), boxed(f))
    }

    /// Transform each item, keeping the source's shape.
    pub fn map<F, R>(&self, source: &Value, f: F) -> Chain
    where
        F: FnMut(&Value, &Key, &Chain) -> Result<LoopControl<R>> + 'static,
        R: Into<Flow>,
    {
        match Source::from_value(source) {
            Ok(source) => {
                let fold = Collect(Collector::new(source.shape()));
                self.launch(Ok(entries(source)), fold, boxed(f))
            }
            Err(error) => self.launch(Err(error), Count::default(), noop()),
        }
    }

    /// Keep the items whose callback result is truthy.
    pub fn filter<F, R>(&self, source: &Value, f: F) -> Chain
    where
        F: FnMut(&Value, &Key, &Chain) -> Result<LoopControl<R>> + 'static,
        R: Into<Flow>,
    {
        match Source::from_value(source) {
            Ok(source) => {
                let fold = Keep(Collector::new(source.shape()));
                self.launch(Ok(entries(source)), fold, boxed(f))
            }
            Err(error) => self.launch(Err(error), Count::default(), noop()),
        }
    }

    /// Fold the items into one value.
    ///
    /// The callback gets the accumulator first. Without a seed the first
    /// item seeds it.
    pub fn reduce<F, R>(&self, source: &Value, seed: Option<Value>, mut f: F) -> Chain
    where
        F: FnMut(Value, &Value, &Key, &Chain) -> Result<LoopControl<R>> + 'static,
        R: Into<Flow>,
    {
        let prepared = Source::from_value(source).and_then(|source| {
            let mut items = entries(source);
            let acc = match seed {
                Some(seed) => seed,
                None => items.next().map(|(_, v)| v).ok_or_else(empty_reduce)?,
            };
            Ok((items, acc))
        });
        match prepared {
            Ok((items, acc)) => {
                let acc = Rc::new(RefCell::new(acc));
                let current = acc.clone();
                let step = boxed(move |item: &Value, key: &Key, chain: &Chain| {
                    let prior = current.borrow().clone();
                    f(prior, item, key, chain)
                });
                self.launch(Ok(items), Reduce(acc), step)
            }
            Err(error) => self.launch(Err(error), Count::default(), noop()),
        }
    }

    /// Resolve to whether every callback result is truthy.
    pub fn every<F, R>(&self, source: &Value, f: F) -> Chain
    where
        F: FnMut(&Value, &Key, &Chain) -> Result<LoopControl<R>> + 'static,
        R: Into<Flow>,
    {
        let items = Source::from_value(source).map(entries);
        self.launch(items, All(true), boxed(f))
    }

    /// Resolve to whether some callback result is truthy.
    pub fn some<F, R>(&self, source: &Value, f: F) -> Chain
    where
        F: FnMut(&Value, &Key, &Chain) -> Result<LoopControl<R>> + 'static,
        R: Into<Flow>,
    {
        let items = Source::from_value(source).map(entries);
        self.launch(items, Any(false), boxed(f))
    }

    /// Pass each positional row through `f`, truncating to the shortest
    /// source. Resolves to the array of results.
    pub fn zip<F, R>(&self, sources: &[Value], f: F) -> Chain
    where
        F: FnMut(&Value, &Key, &Chain) -> Result<LoopControl<R>> + 'static,
        R: Into<Flow>,
    {
        let rows = zip_rows(sources).map(|rows| -> Items { Box::new(rows.into_iter()) });
        let fold = Collect(Collector::new(Shape::Array));
        self.launch(rows, fold, boxed(f))
    }

    /// Call `f` with each number of a count or range. Resolves to how many
    /// continued.
    pub fn repeat<F, R>(&self, times: impl Into<Repeat>, mut f: F) -> Chain
    where
        F: FnMut(i64, &Chain) -> Result<LoopControl<R>> + 'static,
        R: Into<Flow>,
    {
        let items = times.into().iter().map(|numbers| -> Items {
            Box::new(
                numbers
                    .enumerate()
                    .map(|(i, n)| (Key::Index(i), Value::int(n))),
            )
        });
        self.launch(
            items,
            Count::default(),
            boxed(move |n: &Value, _: &Key, chain: &Chain| f(n.as_i64().unwrap_or_default(), chain)),
        )
    }

    /// Call `f` with 0, 1, 2, ... until it breaks or fails.
    pub fn for_ever<F, R>(&self, mut f: F) -> Chain
    where
        F: FnMut(u64, &Chain) -> Result<LoopControl<R>> + 'static,
        R: Into<Flow>,
    {
        let items: Items = Box::new((0usize..).map(|i| (Key::Index(i), Value::null())));
        self.launch(
            Ok(items),
            Count::default(),
            boxed(move |_: &Value, key: &Key, chain: &Chain| {
                let n = key.as_index().unwrap_or_default() as u64;
                f(n, chain)
            }),
        )
    }

    /// Drive any iterator of values. Resolves to how many items continued.
    pub fn iterate<I, F, R>(&self, items: I, mut f: F) -> Chain
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: 'static,
        F: FnMut(&Value, usize, &Chain) -> Result<LoopControl<R>> + 'static,
        R: Into<Flow>,
    {
        let items: Items = Box::new(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (Key::Index(i), v)),
        );
        self.launch(
            Ok(items),
            Count::default(),
            boxed(move |item: &Value, key: &Key, chain: &Chain| {
                f(item, key.as_index().unwrap_or_default(), chain)
            }),
        )
    }

    fn launch<F: Fold>(&self, items: Result<Items>, fold: F, step: Callback) -> Chain {
        let chain = self
            .scheduler
            .chain_with(ChainOptions::new().speed(self.speed));
        let started = match items {
            Err(error) => {
                tracing::debug!(chain = %chain.id(), error = %error, "Iteration rejected");
                chain.raise(error)
            }
            Ok(items) => {
                let walk = Rc::new(Walk {
                    step: RefCell::new(step),
                    state: RefCell::new(WalkState {
                        items: items.peekable(),
                        fold,
                        pending: None,
                    }),
                    chunk: self.scheduler.chunk_size(self.speed),
                });
                tracing::trace!(chain = %chain.id(), speed = %self.speed, chunk = walk.chunk, "Iteration started");
                walk.queue_tick(&chain);
                chain.begin(Value::null())
            }
        };
        if let Err(error) = started {
            tracing::warn!(chain = %chain.id(), error = %error, "Iteration chain did not start");
        }
        chain
    }
}

fn entries(source: Source) -> Items {
    Box::new(source.into_entries().into_iter())
}

fn boxed<F, R>(mut f: F) -> Callback
where
    F: FnMut(&Value, &Key, &Chain) -> Result<LoopControl<R>> + 'static,
    R: Into<Flow>,
{
    Box::new(move |item: &Value, key: &Key, chain: &Chain| {
        f(item, key, chain).map(|control| control.map(Into::into))
    })
}

fn noop() -> Callback {
    Box::new(|_: &Value, _: &Key, _: &Chain| Ok(LoopControl::Break))
}

/// Accumulates callback results into the operation's value.
trait Fold: 'static {
    /// Take one item's flattened result. Returns `false` to stop early.
    fn absorb(&mut self, key: Key, item: Value, result: Value) -> bool;

    fn finish(&mut self) -> Value;
}

#[derive(Default)]
struct Count(usize);

impl Fold for Count {
    fn absorb(&mut self, _: Key, _: Value, _: Value) -> bool {
        self.0 += 1;
        true
    }

    fn finish(&mut self) -> Value {
        Value::from(self.0)
    }
}

struct Collect(Collector);

impl Fold for Collect {
    fn absorb(&mut self, key: Key, _: Value, result: Value) -> bool {
        self.0.push(key, result);
        true
    }

    fn finish(&mut self) -> Value {
        self.0.finish()
    }
}

struct Keep(Collector);

impl Fold for Keep {
    fn absorb(&mut self, key: Key, item: Value, result: Value) -> bool {
        if result.is_truthy() {
            self.0.push(key, item);
        }
        true
    }

    fn finish(&mut self) -> Value {
        self.0.finish()
    }
}

struct All(bool);

impl Fold for All {
    fn absorb(&mut self, _: Key, _: Value, result: Value) -> bool {
        self.0 = result.is_truthy();
        self.0
    }

    fn finish(&mut self) -> Value {
        Value::bool(self.0)
    }
}

struct Any(bool);

impl Fold for Any {
    fn absorb(&mut self, _: Key, _: Value, result: Value) -> bool {
        self.0 = result.is_truthy();
        !self.0
    }

    fn finish(&mut self) -> Value {
        Value::bool(self.0)
    }
}

struct Reduce(Rc<RefCell<Value>>);

impl Fold for Reduce {
    fn absorb(&mut self, _: Key, _: Value, result: Value) -> bool {
        *self.0.borrow_mut() = result;
        true
    }

    fn finish(&mut self) -> Value {
        self.0.borrow().clone()
    }
}

/// One running iteration.
///
/// The callback lives apart from the rest of the state so that no borrow
/// of the state is held while it runs.
struct Walk<F> {
    step: RefCell<Callback>,
    state: RefCell<WalkState<F>>,
    chunk: usize,
}

struct WalkState<F> {
    items: Peekable<Items>,
    fold: F,
    /// Item whose nested chain is being waited on.
    pending: Option<(Key, Value)>,
}

impl<F: Fold> Walk<F> {
    fn queue_tick(self: &Rc<Self>, chain: &Chain) {
        let walk = self.clone();
        chain.then_next(move |_: Value, chain: &Chain| walk.tick(chain));
    }

    fn tick(self: Rc<Self>, chain: &Chain) -> Result<Flow> {
        for _ in 0..self.chunk {
            let next = self.state.borrow_mut().items.next();
            let Some((key, item)) = next else {
                return Ok(self.finish(chain));
            };
            let control = (&mut *self.step.borrow_mut())(&item, &key, chain)?;
            if chain.is_canceled() {
                return Ok(Flow::Value(Value::null()));
            }
            match control {
                LoopControl::Break => return Ok(self.finish(chain)),
                LoopControl::Continue(Flow::Value(result)) => {
                    if !self.state.borrow_mut().fold.absorb(key, item, result) {
                        return Ok(self.finish(chain));
                    }
                }
                LoopControl::Continue(Flow::Nested(child)) => {
                    self.state.borrow_mut().pending = Some((key, item));
                    let walk = self.clone();
                    chain.then_next(move |result: Value, chain: &Chain| walk.absorb_nested(result, chain));
                    return Ok(Flow::Nested(child));
                }
            }
        }
        self.next_tick(chain)
    }

    fn absorb_nested(self: Rc<Self>, result: Value, chain: &Chain) -> Result<Flow> {
        let pending = self.state.borrow_mut().pending.take();
        if let Some((key, item)) = pending {
            if !self.state.borrow_mut().fold.absorb(key, item, result) {
                return Ok(self.finish(chain));
            }
        }
        self.next_tick(chain)
    }

    /// Finish now if no items remain, otherwise queue another tick.
    fn next_tick(self: Rc<Self>, chain: &Chain) -> Result<Flow> {
        let exhausted = self.state.borrow_mut().items.peek().is_none();
        if exhausted {
            return Ok(self.finish(chain));
        }
        self.queue_tick(chain);
        Ok(Flow::Value(Value::null()))
    }

    fn finish(&self, chain: &Chain) -> Flow {
        let value = self.state.borrow_mut().fold.finish();
        tracing::trace!(chain = %chain.id(), "Iteration finished");
        Flow::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pace_core::Clock;
    use pace_core::ManualClock;
    use serde_json::json;
    use std::cell::Cell;

    fn stepper(speed: Speed) -> (Stepper, ManualClock) {
        let (scheduler, clock) = Scheduler::manual();
        (Stepper::new(&scheduler).speed(speed), clock)
    }

    #[test]
    fn defaults_to_configured_speed() {
        let (scheduler, _clock) = Scheduler::manual();
        assert_eq!(Stepper::new(&scheduler).current_speed(), Speed::Normal);
    }

    #[test]
    fn for_each_counts_continued_items() {
        let (stepper, clock) = stepper(Speed::Normal);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let chain = stepper.for_each(&Value(json!(["a", "b", "c"])), move |x, key, _| {
            log.borrow_mut().push(format!("{key}:{x}"));
            Ok(LoopControl::Continue(()))
        });
        clock.run_until_idle();
        assert_eq!(chain.result(), Some(Value::int(3)));
        assert_eq!(*seen.borrow(), vec!["0:\"a\"", "1:\"b\"", "2:\"c\""]);
    }

    #[test]
    fn slow_speed_yields_between_items() {
        let (stepper, clock) = stepper(Speed::Slow);
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let chain = stepper.for_each(&Value(json!([1, 2, 3, 4])), move |_, _, _| {
            counter.set(counter.get() + 1);
            Ok(LoopControl::Continue(()))
        });
        assert_eq!(calls.get(), 0);
        clock.advance(std::time::Duration::from_millis(16));
        assert_eq!(calls.get(), 1);
        clock.run_until_idle();
        assert_eq!(calls.get(), 4);
        assert!(chain.is_fired());
    }

    #[test]
    fn resolves_on_the_tick_that_takes_the_last_item() {
        let (stepper, clock) = stepper(Speed::Limp);
        let chain = stepper.for_each(&Value(json!([1])), |_, _, _| Ok(LoopControl::Continue(())));
        clock.advance(std::time::Duration::from_secs(1));
        assert_eq!(chain.result(), Some(Value::int(1)));
        clock.run_until_idle();
        assert_eq!(clock.now(), std::time::Duration::from_secs(1));

        let (stepper, clock) = self::stepper(Speed::Fast);
        let items = Value::array((0..64).map(Value::int));
        let chain = stepper.for_each(&items, |_, _, _| Ok(LoopControl::Continue(())));
        assert_eq!(clock.run_steps(2), 2);
        assert_eq!(chain.result(), Some(Value::int(64)));
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn ninja_runs_in_the_calling_turn() {
        let (stepper, _clock) = stepper(Speed::Ninja);
        let chain = stepper.map(&Value(json!({"a": 1, "b": 2})), |x, _, _| {
            Ok(LoopControl::Continue(x.as_i64().unwrap_or(0) + 1))
        });
        assert!(chain.is_fired());
        assert_eq!(chain.result(), Some(Value(json!({"a": 2, "b": 3}))));
    }

    #[test]
    fn break_stops_after_n_side_effects() {
        let (stepper, clock) = self::stepper(Speed::Fast);
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let chain = stepper.repeat(10usize, move |n, _| {
            if n == 4 {
                return Ok(LoopControl::Break);
            }
            counter.set(counter.get() + 1);
            Ok(LoopControl::Continue(()))
        });
        clock.run_until_idle();
        assert_eq!(calls.get(), 4);
        assert_eq!(chain.result(), Some(Value::int(4)));
    }

    #[test]
    fn nested_results_are_flattened() {
        let (scheduler, clock) = Scheduler::manual();
        let stepper = Stepper::new(&scheduler);
        let chain = stepper.map(&Value(json!([1, 2])), |x, _, chain| {
            let n = x.as_i64().unwrap_or(0);
            let nested = chain
                .scheduler()
                .chain()
                .wait(std::time::Duration::from_millis(5))
                .then(move |_, _| Ok(n * 100));
            Ok(LoopControl::Continue(nested))
        });
        clock.run_until_idle();
        assert_eq!(chain.result(), Some(Value(json!([100, 200]))));
        assert_eq!(clock.now(), std::time::Duration::from_millis(10));
    }

    #[test]
    fn caller_stages_see_final_value() {
        let (stepper, clock) = stepper(Speed::Normal);
        let chain = stepper
            .filter(&Value(json!([1, 2, 3, 4])), |x, _, _| {
                Ok(LoopControl::Continue(x.as_i64().unwrap_or(0) > 2))
            })
            .then(|kept, _| Ok(kept.as_array().map(Vec::len).unwrap_or(0)));
        clock.run_until_idle();
        assert_eq!(chain.result(), Some(Value::int(2)));
    }

    #[test]
    fn reduce_every_some() {
        let (stepper, clock) = stepper(Speed::Rapid);
        let sum = stepper.reduce(&Value(json!([1, 2, 3])), None, |acc, x, _, _| {
            Ok(LoopControl::Continue(
                acc.as_i64().unwrap_or(0) + x.as_i64().unwrap_or(0),
            ))
        });
        let all = stepper.every(&Value(json!([2, 4, 5])), |x, _, _| {
            Ok(LoopControl::Continue(x.as_i64().unwrap_or(0) % 2 == 0))
        });
        let any = stepper.some(&Value(json!([1, 3, 4])), |x, _, _| {
            Ok(LoopControl::Continue(x.as_i64().unwrap_or(0) % 2 == 0))
        });
        clock.run_until_idle();
        assert_eq!(sum.result(), Some(Value::int(6)));
        assert_eq!(all.result(), Some(Value::bool(false)));
        assert_eq!(any.result(), Some(Value::bool(true)));
    }

    #[test]
    fn argument_errors_are_raised_into_the_chain() {
        let (stepper, clock) = stepper(Speed::Normal);
        let not_iterable = stepper.for_each(&Value::int(5), |_, _, _| Ok(LoopControl::Continue(())));
        let empty = stepper.reduce(&Value(json!([])), None, |acc, _, _, _| Ok(LoopControl::Continue(acc)));
        clock.run_until_idle();
        assert_eq!(not_iterable.error().map(|e| e.code()), Some("E401"));
        assert_eq!(empty.error().map(|e| e.code()), Some("E402"));
    }

    #[test]
    fn cancel_from_callback_stops_iteration() {
        let (stepper, clock) = stepper(Speed::Slow);
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let chain = stepper.for_ever(move |n, chain| {
            counter.set(counter.get() + 1);
            if n == 2 {
                chain.cancel();
            }
            Ok(LoopControl::Continue(()))
        });
        clock.run_until_idle();
        assert_eq!(calls.get(), 3);
        assert!(chain.is_canceled());
    }
}
