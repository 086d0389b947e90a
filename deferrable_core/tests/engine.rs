use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use deferrable_codec::{here, CallError, CallResult, Item, Value};
use deferrable_core::{Backend, Deferrable, EventObserver, RegisterOptions, RunOutcome};
use deferrable_debounce::MemoryDebounceStore;
use deferrable_queue::InMemoryQueue;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

type TestEngine = Deferrable<InMemoryQueue, InMemoryQueue, MemoryDebounceStore>;

fn engine_without_debounce() -> TestEngine {
    let backend = Backend::new(
        "test-group",
        InMemoryQueue::new(Duration::from_millis(50)),
        InMemoryQueue::new(Duration::from_millis(50)),
    );
    Deferrable::new(backend, Vec::new(), 1)
}

fn engine_with_debounce() -> TestEngine {
    let backend = Backend::new(
        "test-group",
        InMemoryQueue::new(Duration::from_millis(100)),
        InMemoryQueue::new(Duration::from_millis(50)),
    );
    Deferrable::new(backend, Vec::new(), 1).with_debounce_store(MemoryDebounceStore::new())
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn names(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl EventObserver for Recorder {
    fn on_push(&self, _item: &Item) {
        self.events.lock().push("push".to_string());
    }
    fn on_pop(&self, _item: &Item) {
        self.events.lock().push("pop".to_string());
    }
    fn on_empty(&self) {
        self.events.lock().push("empty".to_string());
    }
    fn on_complete(&self, _item: &Item) {
        self.events.lock().push("complete".to_string());
    }
    fn on_expire(&self, _item: &Item) {
        self.events.lock().push("expire".to_string());
    }
    fn on_retry(&self, _item: &Item) {
        self.events.lock().push("retry".to_string());
    }
    fn on_error(&self, _item: &Item) {
        self.events.lock().push("error".to_string());
    }
    fn on_debounce_hit(&self, _item: &Item) {
        self.events.lock().push("debounce_hit".to_string());
    }
    fn on_debounce_miss(&self, _item: &Item) {
        self.events.lock().push("debounce_miss".to_string());
    }
    fn on_debounce_error(&self, _item: &Item) {
        self.events.lock().push("debounce_error".to_string());
    }
}

fn counting_handler() -> (Arc<AtomicUsize>, Arc<Mutex<Option<(Vec<Value>, BTreeMap<String, Value>)>>>, impl Fn(&[Value], &BTreeMap<String, Value>) -> CallResult) {
    let calls = Arc::new(AtomicUsize::new(0));
    let last_call = Arc::new(Mutex::new(None));
    let calls_clone = calls.clone();
    let last_call_clone = last_call.clone();
    let handler = move |args: &[Value], kwargs: &BTreeMap<String, Value>| -> CallResult {
        calls_clone.fetch_add(1, Ordering::SeqCst);
        *last_call_clone.lock() = Some((args.to_vec(), kwargs.clone()));
        Ok(())
    };
    (calls, last_call, handler)
}

fn flaky_handler(raise_times: usize) -> (Arc<AtomicUsize>, impl Fn(&[Value], &BTreeMap<String, Value>) -> CallResult) {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    let handler = move |_: &[Value], _: &BTreeMap<String, Value>| -> CallResult {
        let attempt = calls_clone.fetch_add(1, Ordering::SeqCst);
        if attempt < raise_times {
            Err(CallError::new("ValueError", std::io::Error::other("flaky failure")))
        } else {
            Ok(())
        }
    };
    (calls, handler)
}

#[tokio::test]
async fn s1_simple_register_later_run_once() {
    let engine = engine_without_debounce();
    let recorder = Arc::new(Recorder::default());
    engine.register_observer(recorder.clone());

    let (calls, last_call, handler) = counting_handler();
    engine
        .register("f", here!(), handler, RegisterOptions::default())
        .unwrap();

    engine
        .later("f", vec![Value::Int(1)], [("b".to_string(), Value::Int(2))])
        .await
        .unwrap();

    let outcome = engine.run_once().await.unwrap();
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let (args, kwargs) = last_call.lock().clone().unwrap();
    assert_eq!(args, vec![Value::Int(1)]);
    assert_eq!(kwargs.get("b"), Some(&Value::Int(2)));

    let second = engine.run_once().await.unwrap();
    assert_eq!(second, RunOutcome::Empty);

    assert_eq!(recorder.names(), vec!["push", "pop", "complete", "empty"]);
}

#[tokio::test]
async fn s2_retry_then_recover() {
    let engine = engine_without_debounce();
    let recorder = Arc::new(Recorder::default());
    engine.register_observer(recorder.clone());

    let (calls, handler) = flaky_handler(2);
    engine
        .register(
            "g",
            here!(),
            handler,
            RegisterOptions {
                max_attempts: Some(3),
                error_classes: Some(vec!["ValueError".to_string()]),
                ..Default::default()
            },
        )
        .unwrap();

    engine.later("g", vec![Value::Bool(true)], []).await.unwrap();

    assert_eq!(engine.run_once().await.unwrap(), RunOutcome::Retried);
    assert_eq!(engine.run_once().await.unwrap(), RunOutcome::Retried);
    assert_eq!(engine.run_once().await.unwrap(), RunOutcome::Completed);
    assert_eq!(engine.run_once().await.unwrap(), RunOutcome::Empty);

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let names = recorder.names();
    assert_eq!(names.iter().filter(|event| *event == "retry").count(), 2);
    assert_eq!(names.iter().filter(|event| *event == "error").count(), 0);
}

#[tokio::test]
async fn s3_retry_exhausted_routes_to_error_queue() {
    let engine = engine_without_debounce();

    let (calls, handler) = flaky_handler(usize::MAX);
    engine
        .register(
            "g",
            here!(),
            handler,
            RegisterOptions {
                max_attempts: Some(3),
                error_classes: Some(vec!["ValueError".to_string()]),
                ..Default::default()
            },
        )
        .unwrap();

    engine.later("g", vec![Value::Bool(true)], []).await.unwrap();

    assert_eq!(engine.run_once().await.unwrap(), RunOutcome::Retried);
    assert_eq!(engine.run_once().await.unwrap(), RunOutcome::Retried);
    assert_eq!(engine.run_once().await.unwrap(), RunOutcome::Errored);

    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn s4_debounce_window_not_always_delay() {
    let engine = engine_with_debounce();
    let recorder = Arc::new(Recorder::default());
    engine.register_observer(recorder.clone());

    let (_calls, _last_call, handler) = counting_handler();
    engine
        .register(
            "f",
            here!(),
            handler,
            RegisterOptions {
                debounce_seconds: Some(1.into()),
                ..Default::default()
            },
        )
        .unwrap();

    engine.later("f", vec![], []).await.unwrap();
    engine.later("f", vec![], []).await.unwrap();
    engine.later("f", vec![], []).await.unwrap();

    let names = recorder.names();
    assert_eq!(names.iter().filter(|event| *event == "debounce_miss").count(), 2);
    assert_eq!(names.iter().filter(|event| *event == "debounce_hit").count(), 1);
}

#[tokio::test]
async fn s5_debounce_always_delay() {
    let engine = engine_with_debounce();
    let recorder = Arc::new(Recorder::default());
    engine.register_observer(recorder.clone());

    let (calls, _last_call, handler) = counting_handler();
    engine
        .register(
            "f",
            here!(),
            handler,
            RegisterOptions {
                debounce_seconds: Some(1.into()),
                debounce_always_delay: true,
                ..Default::default()
            },
        )
        .unwrap();

    engine.later("f", vec![], []).await.unwrap();
    engine.later("f", vec![], []).await.unwrap();

    let names = recorder.names();
    assert_eq!(names.iter().filter(|event| *event == "debounce_miss").count(), 1);
    assert_eq!(names.iter().filter(|event| *event == "debounce_hit").count(), 1);

    let popped_before_window = engine.run_once().await.unwrap();
    assert_eq!(popped_before_window, RunOutcome::Empty);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let popped_after_window = engine.run_once().await.unwrap();
    assert_eq!(popped_after_window, RunOutcome::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn s6_ttl_expiry_drops_without_executing() {
    let engine = engine_without_debounce();
    let recorder = Arc::new(Recorder::default());
    engine.register_observer(recorder.clone());

    let (calls, _last_call, handler) = counting_handler();
    engine
        .register(
            "f",
            here!(),
            handler,
            RegisterOptions {
                ttl_seconds: Some(1.into()),
                ..Default::default()
            },
        )
        .unwrap();

    engine.later("f", vec![], []).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let outcome = engine.run_once().await.unwrap();
    assert_eq!(outcome, RunOutcome::Expired);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.names(), vec!["pop", "expire", "complete"]);
}
