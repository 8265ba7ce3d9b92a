//! One-line constructors for common chains. Each returns a begun chain.

use pace_core::{Chain, ChainError, Flow, Result, Scheduler, Value};
use std::time::Duration;

/// A chain that resolves to `value`.
pub fn succeed(scheduler: &Scheduler, value: impl Into<Value>) -> Chain {
    start(scheduler.chain(), Ok(value.into()))
}

/// A chain that ends holding `error`.
pub fn fail(scheduler: &Scheduler, error: ChainError) -> Chain {
    start(scheduler.chain(), Err(error))
}

/// A chain that resolves to null after `delay`.
pub fn wait(scheduler: &Scheduler, delay: Duration) -> Chain {
    start(scheduler.chain().wait(delay), Ok(Value::null()))
}

/// A chain that runs `f` after `delay` and resolves to what it returns.
pub fn later<F, R>(scheduler: &Scheduler, delay: Duration, f: F) -> Chain
where
    F: FnOnce(&Chain) -> Result<R> + 'static,
    R: Into<Flow>,
{
    let chain = scheduler
        .chain()
        .wait(delay)
        .then(move |_, chain: &Chain| f(chain));
    start(chain, Ok(Value::null()))
}

fn start(chain: Chain, seed: Result<Value>) -> Chain {
    let started = match seed {
        Ok(value) => chain.begin(value),
        Err(error) => chain.raise(error),
    };
    if let Err(error) = started {
        tracing::warn!(chain = %chain.id(), error = %error, "Chain did not start");
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use pace_core::Clock;

    #[test]
    fn shortcuts_settle() {
        let (scheduler, clock) = Scheduler::manual();
        let ok = succeed(&scheduler, 5);
        let err = fail(&scheduler, ChainError::failed("nope"));
        let slept = wait(&scheduler, Duration::from_millis(30));
        let deferred = later(&scheduler, Duration::from_millis(10), |_| Ok("late"));

        clock.advance(Duration::from_millis(10));
        assert_eq!(deferred.result(), Some(Value::from("late")));
        assert!(!slept.is_fired());

        clock.run_until_idle();
        assert_eq!(ok.result(), Some(Value::int(5)));
        assert_eq!(err.error().map(|e| e.message()), Some("nope".to_string()));
        assert!(slept.is_fired());
        assert_eq!(clock.now(), Duration::from_millis(30));
    }
}
