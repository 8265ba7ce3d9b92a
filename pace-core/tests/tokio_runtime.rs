//! Chains driven by the tokio clock on a `LocalSet`.

use pace_core::prelude::*;
use std::time::Duration;
use tokio::task::LocalSet;

#[tokio::test(start_paused = true)]
async fn settled_future_resolves_after_timers() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let scheduler = Scheduler::tokio();
            let chain = scheduler
                .chain()
                .wait(Duration::from_millis(500))
                .then(|v, _| Ok(v.as_i64().unwrap_or_default() * 3));
            chain.begin(14).unwrap();

            let settled = chain.settled().await;
            assert_eq!(settled, Settled::Fired(Ok(Value::int(42))));
            assert!(scheduler.now() >= Duration::from_millis(500));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn cancel_wakes_settled_future() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let scheduler = Scheduler::tokio();
            let chain = scheduler.chain().wait(Duration::from_secs(3600));
            chain.begin(()).unwrap();

            let pending = chain.settled();
            let canceller = chain.clone();
            scheduler
                .chain()
                .wait(Duration::from_millis(10))
                .then(move |_, _| Ok(canceller.cancel()))
                .begin(())
                .unwrap();

            assert!(pending.await.is_canceled());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn till_with_tokio_clock() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let scheduler = Scheduler::tokio();
            let started = scheduler.now();
            let gate = scheduler.clone();
            let chain = scheduler
                .chain()
                .till(move || gate.now() >= started + Duration::from_millis(95))
                .then(|_, _| Ok("open"));
            chain.begin(()).unwrap();

            let outcome = chain.settled().await.into_result();
            assert_eq!(outcome, Some(Ok(Value::from("open"))));
        })
        .await;
}
