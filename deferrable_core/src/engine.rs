use std::collections::HashMap;
use std::sync::Arc;

use deferrable_codec::{decode_call, CallRegistry, Callable, ErrorInfo, Item, SourceLocation};
use deferrable_debounce::{DebounceController, DebounceStore, Strategy};
use deferrable_queue::Queue;
use deferrable_util::backoff::apply_exponential_backoff;
use deferrable_util::ttl::{is_expired, stamp_ttl};
use deferrable_util::now_seconds;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::error::EngineError;
use crate::events::EventRegistrar;
use crate::metadata::MetadataProducerConsumer;
use crate::options::{validate, OptionValue, RegisterOptions, RegistrationError};

struct ResolvedOptions {
    delay_seconds: Option<OptionValue<u32>>,
    debounce_seconds: Option<OptionValue<u32>>,
    debounce_always_delay: bool,
    ttl_seconds: Option<OptionValue<u32>>,
    max_attempts: u32,
    error_classes: Vec<String>,
    use_exponential_backoff: bool,
}

/// The outcome of one [`Deferrable::run_once`] call, for callers that want
/// to distinguish them (tests in particular).
#[derive(Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// No item was available to pop.
    Empty,
    /// The popped item had exceeded its TTL and was dropped unexecuted.
    Expired,
    /// The callable was invoked and returned successfully.
    Completed,
    /// A retriable failure caused the item to be re-pushed.
    Retried,
    /// A failure routed the item to the error queue.
    Errored,
}

/// Ties a [`Backend`], an optional [`DebounceStore`], the callable
/// registry, metadata pairs, and event observers into the producer/worker
/// API described in spec.md §4.7.
pub struct Deferrable<Q, E, D>
where
    Q: Queue,
    E: Queue,
    D: DebounceStore,
{
    backend: Backend<Q, E>,
    debounce: Option<DebounceController<D>>,
    default_error_classes: Vec<String>,
    default_max_attempts: u32,
    metadata_pairs: Vec<Box<dyn MetadataProducerConsumer>>,
    events: EventRegistrar,
    registry: CallRegistry,
    options: RwLock<HashMap<String, ResolvedOptions>>,
}

impl<Q, E, D> Deferrable<Q, E, D>
where
    Q: Queue,
    E: Queue,
    D: DebounceStore,
{
    /// Builds a new engine around `backend`, with no debounce store and
    /// the given defaults.
    pub fn new(backend: Backend<Q, E>, default_error_classes: Vec<String>, default_max_attempts: u32) -> Self {
        Self {
            backend,
            debounce: None,
            default_error_classes,
            default_max_attempts,
            metadata_pairs: Vec::new(),
            events: EventRegistrar::new(),
            registry: CallRegistry::new(),
            options: RwLock::new(HashMap::new()),
        }
    }

    /// Attaches a debounce store, enabling `debounce_seconds` registrations.
    pub fn with_debounce_store(mut self, store: D) -> Self {
        self.debounce = Some(DebounceController::new(store));
        self
    }

    /// Registers a metadata producer/consumer pair. Panics (at startup,
    /// before any items flow) if its namespace collides with one already
    /// registered.
    pub fn register_metadata_pair(&mut self, pair: Box<dyn MetadataProducerConsumer>) {
        let namespace = pair.namespace();
        assert!(
            !self.metadata_pairs.iter().any(|existing| existing.namespace() == namespace),
            "metadata namespace '{namespace}' is already registered",
        );
        self.metadata_pairs.push(pair);
    }

    /// Registers an event observer.
    pub fn register_observer(&self, observer: Arc<dyn crate::events::EventObserver>) {
        self.events.register(observer);
    }

    /// The event registrar, for callers that want to emit/inspect outside
    /// the normal `later`/`run_once` flow (mainly tests).
    pub fn events(&self) -> &EventRegistrar {
        &self.events
    }

    /// Registers `handler` under `name`, validating `options` per
    /// spec.md §4.7. On success, `name` becomes a valid first argument to
    /// [`Deferrable::later`].
    pub fn register(
        &self,
        name: impl Into<String>,
        location: SourceLocation,
        handler: impl Callable + 'static,
        options: RegisterOptions,
    ) -> Result<(), RegistrationError> {
        let name = name.into();
        validate(&options, self.debounce.is_some())?;

        self.registry
            .register(name.clone(), location, handler)
            .map_err(|_| RegistrationError::AlreadyRegistered(name.clone()))?;

        let resolved = ResolvedOptions {
            delay_seconds: options.delay_seconds,
            debounce_seconds: options.debounce_seconds,
            debounce_always_delay: options.debounce_always_delay,
            ttl_seconds: options.ttl_seconds,
            max_attempts: options.max_attempts.unwrap_or(self.default_max_attempts),
            error_classes: options.error_classes.unwrap_or_else(|| self.default_error_classes.clone()),
            use_exponential_backoff: options.use_exponential_backoff,
        };
        self.options.write().insert(name, resolved);
        Ok(())
    }

    /// Builds and pushes an envelope for the callable registered under
    /// `name`, following spec.md §4.7's `later` algorithm.
    pub async fn later(
        &self,
        name: &str,
        args: Vec<deferrable_codec::Value>,
        kwargs: impl IntoIterator<Item = (String, deferrable_codec::Value)>,
    ) -> Result<(), EngineError<Q::Error, E::Error>> {
        let (delay_seconds, debounce_seconds, debounce_always_delay, ttl_seconds, max_attempts, error_classes, use_exponential_backoff) = {
            let table = self.options.read();
            let resolved = table
                .get(name)
                .unwrap_or_else(|| panic!("'{name}' was never registered with Deferrable::register"));
            (
                resolved.delay_seconds.clone(),
                resolved.debounce_seconds.clone(),
                resolved.debounce_always_delay,
                resolved.ttl_seconds.clone(),
                resolved.max_attempts,
                resolved.error_classes.clone(),
                resolved.use_exponential_backoff,
            )
        };

        let now = now_seconds();
        let mut item = Item::new(name.to_string(), args, kwargs);
        item.group = self.backend.group.clone();
        item.error_classes = error_classes;
        item.max_attempts = max_attempts;
        item.first_push_time = now;
        item.last_push_time = now;
        item.use_exponential_backoff = use_exponential_backoff;

        if let Some(delay) = delay_seconds.as_ref() {
            item.original_delay_seconds = Some(delay.resolve() as u64);
        }
        if let Some(debounce) = debounce_seconds.as_ref() {
            item.original_debounce_seconds = Some(debounce.resolve() as u64);
        }
        item.original_debounce_always_delay = debounce_always_delay;

        if let Some(ttl) = ttl_seconds.as_ref() {
            stamp_ttl(&mut item, ttl.resolve() as u64);
        }

        if let Some(debounce) = debounce_seconds.as_ref() {
            let window_seconds = debounce.resolve() as u64;
            let fingerprint = item.fingerprint();
            let controller = self
                .debounce
                .as_ref()
                .expect("debounce_seconds was registered only because a store was present");

            match controller.decide(&fingerprint, window_seconds, debounce_always_delay).await {
                Ok(Strategy::Skip) => {
                    self.events.emit_debounce_hit(&item);
                    return Ok(());
                }
                Ok(strategy) => {
                    self.events.emit_debounce_miss(&item);
                    item.delay = Some(strategy.delay_seconds());
                }
                Err(error) => {
                    warn!(fingerprint, error = %error, "debounce store failed, falling back to immediate push");
                    self.events.emit_debounce_error(&item);
                    item.delay = Some(0);
                }
            }
        } else if let Some(delay) = delay_seconds.as_ref() {
            item.delay = Some(delay.resolve() as u64);
        }

        for pair in &self.metadata_pairs {
            item.metadata.insert(pair.namespace().to_string(), pair.produce_metadata());
        }

        self.backend.queue.push(item.clone()).await.map_err(EngineError::Queue)?;
        self.events.emit_push(&item);
        Ok(())
    }

    /// Pops, executes, and resolves exactly one item, following
    /// spec.md §4.7's `run_once` algorithm.
    pub async fn run_once(&self) -> Result<RunOutcome, EngineError<Q::Error, E::Error>> {
        let Some((envelope, mut item)) = self.backend.queue.pop().await.map_err(EngineError::Queue)? else {
            self.events.emit_empty();
            return Ok(RunOutcome::Empty);
        };
        self.events.emit_pop(&item);

        for pair in &self.metadata_pairs {
            let value = item.metadata.get(pair.namespace());
            pair.consume_metadata(value);
        }

        if is_expired(&item) {
            debug!(method = %item.method, "item expired before execution, dropping");
            self.events.emit_expire(&item);
            self.backend.queue.complete(envelope).await.map_err(EngineError::Queue)?;
            self.events.emit_complete(&item);
            return Ok(RunOutcome::Expired);
        }

        let outcome = match decode_call(&item, &self.registry) {
            Ok((handler, args, kwargs)) => handler.call(args, kwargs),
            Err(error) => Err(deferrable_codec::CallError::new("unresolved", error)),
        };

        match outcome {
            Ok(()) => {
                self.backend.queue.complete(envelope).await.map_err(EngineError::Queue)?;
                self.events.emit_complete(&item);
                Ok(RunOutcome::Completed)
            }
            Err(call_error) if item.is_retriable(call_error.kind()) && !item.attempts_exhausted() => {
                let now = now_seconds();
                item.attempts += 1;
                item.delay = None;
                item.last_push_time = now;
                apply_exponential_backoff(&mut item, now);

                self.backend.queue.push(item.clone()).await.map_err(EngineError::Queue)?;
                self.events.emit_retry(&item);
                self.backend.queue.complete(envelope).await.map_err(EngineError::Queue)?;
                self.events.emit_complete(&item);
                Ok(RunOutcome::Retried)
            }
            Err(call_error) => {
                let now = now_seconds();
                item.error = Some(ErrorInfo {
                    error_type: call_error.kind().to_string(),
                    error_text: call_error.message(),
                    traceback: String::new(),
                    hostname: hostname::get()
                        .ok()
                        .and_then(|name| name.into_string().ok())
                        .unwrap_or_else(|| "unknown".to_string()),
                    ts: now,
                    id: uuid::Uuid::new_v4().to_string(),
                });
                item.delay = None;
                item.last_push_time = now;

                self.backend
                    .error_queue
                    .push(item.clone())
                    .await
                    .map_err(EngineError::ErrorQueue)?;
                self.events.emit_error(&item);
                self.backend.queue.complete(envelope).await.map_err(EngineError::Queue)?;
                self.events.emit_complete(&item);
                Ok(RunOutcome::Errored)
            }
        }
    }
}
