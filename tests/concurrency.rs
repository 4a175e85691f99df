//! Concurrency integration tests: shared pools, progress delivery, and
//! cancellation followed by a fresh run.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use num_bigint::BigUint;

use picalc_core::calculator::{SeriesCalculator, SeriesError};
use picalc_core::formula::Formula;
use picalc_core::observers::{ChannelListener, CountingListener};
use picalc_core::precision::{Precision, RoundingPolicy};
use picalc_core::progress::ProgressEvent;
use picalc_core::registry::{CalculatorFactory, DefaultFactory};
use picalc_core::task::{Executor, TaskStatus};
use picalc_tests::pi_truncated;

#[test]
fn calculators_share_one_pool() {
    let factory = DefaultFactory::new(Executor::new(2).unwrap());
    let chudnovsky = factory.get("chudnovsky").unwrap();
    let bbp = factory.get("bbp").unwrap();
    let precision = Precision::new(50, RoundingPolicy::Down).unwrap();

    let a = chudnovsky.calculate_async_with(4, precision).unwrap();
    let b = bbp.calculate_async_with(45, precision).unwrap();
    let a = a.wait().unwrap().round(Precision::new(40, RoundingPolicy::Down).unwrap());
    let b = b.wait().unwrap().round(Precision::new(40, RoundingPolicy::Down).unwrap());
    assert_eq!(a.to_string(), pi_truncated(40));
    assert_eq!(b.to_string(), pi_truncated(40));
}

#[test]
fn every_term_reported_once() {
    let calc = SeriesCalculator::new(Formula::Chudnovsky, Executor::new(4).unwrap());
    let (tx, rx) = crossbeam_channel::unbounded();
    let listener = Arc::new(ChannelListener::new(tx));
    assert!(calc.add_listener(listener.clone()));

    calc.calculate(12).unwrap();
    calc.progress().flush();

    let mut iterations = BTreeSet::new();
    let mut nominators = 0;
    let mut constants = 0;
    for event in rx.try_iter() {
        match event {
            ProgressEvent::IterationCompleted { index, .. } => {
                assert!(iterations.insert(index), "index {index} reported twice");
            }
            ProgressEvent::NominatorReady { .. } => nominators += 1,
            ProgressEvent::ConstantReady { .. } => constants += 1,
            ProgressEvent::DenominatorReady { .. } => {}
        }
    }
    assert_eq!(iterations, (0..=12).collect());
    assert_eq!(nominators, 13);
    assert_eq!(constants, 1);
    assert!(calc.remove_listener(&listener));
}

#[test]
fn concurrent_callers_share_factorials() {
    let calc = Arc::new(SeriesCalculator::new(
        Formula::Chudnovsky,
        Executor::new(4).unwrap(),
    ));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let calc = Arc::clone(&calc);
            thread::spawn(move || calc.calculate(6).unwrap())
        })
        .collect();
    let values: Vec<String> = handles
        .into_iter()
        .map(|h| h.join().unwrap().to_string())
        .collect();
    assert!(values.windows(2).all(|w| w[0] == w[1]));

    let expected: BigUint = (1u32..=36).map(BigUint::from).product();
    assert_eq!(*calc.factorials().get(36), expected);
}

#[test]
fn cancel_then_fresh_pool() {
    let calc = SeriesCalculator::new(Formula::Chudnovsky, Executor::new(1).unwrap());
    let counter = Arc::new(CountingListener::new());
    calc.add_listener(counter.clone());

    let heavy = calc
        .calculate_async_with(3_000, Precision::new(40_000, RoundingPolicy::Down).unwrap())
        .unwrap();
    thread::sleep(Duration::from_millis(20));
    heavy.cancel_graph();
    match heavy.wait() {
        Err(SeriesError::Cancelled) | Ok(_) => {}
        Err(e) => panic!("unexpected error: {e}"),
    }
    assert!(matches!(
        heavy.status(),
        TaskStatus::Cancelled | TaskStatus::Completed
    ));

    calc.set_executor(Executor::new(2).unwrap());
    let value = calc
        .calculate_with(3, Precision::new(40, RoundingPolicy::Down).unwrap())
        .unwrap()
        .round(Precision::new(30, RoundingPolicy::Down).unwrap());
    assert_eq!(value.to_string(), pi_truncated(30));
    calc.progress().flush();
    assert!(counter.completed() >= 4);
}
