use crate::registry::{Callable, CallRegistry, RegistryError, SourceLocation};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Information about the exception that routed an item to the error queue.
///
/// Mirrors the `error` key described in the item envelope: present only on
/// items that live in an error queue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// The error kind tag (e.g. the Rust type name of the failure).
    pub error_type: String,
    /// The human-readable error message.
    pub error_text: String,
    /// A formatted backtrace/traceback, if one was available.
    pub traceback: String,
    /// The hostname of the worker that recorded the failure.
    pub hostname: String,
    /// Seconds since the epoch at which the failure was recorded.
    pub ts: f64,
    /// A freshly generated id for this error record; used by backends (like
    /// the redis error hash) that key error entries by id.
    pub id: String,
}

/// The transport-neutral envelope carried by every backend.
///
/// Exactly the fields described in the specification's data model: required
/// keys are plain fields, optional keys are `Option`s, and `debounce_skip`
/// is never serialized (it is a transient in-process flag).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// The registered name of the target callable.
    pub method: String,
    /// The id of the receiver the method is bound to, if any (analogous to
    /// the original's `object` key).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub object: Option<String>,
    /// Encoded positional arguments.
    pub args: Vec<Value>,
    /// Encoded keyword arguments, always in sorted key order.
    pub kwargs: BTreeMap<String, Value>,

    /// How many times this item has been retried so far (0 at first push).
    pub attempts: u32,
    /// The maximum number of attempts before this item is routed to the
    /// error queue.
    pub max_attempts: u32,
    /// The set of error kind tags considered retriable for this item.
    pub error_classes: Vec<String>,

    /// The logical group (main/error queue pair) this item belongs to.
    pub group: String,
    /// Seconds since the epoch at which this item was first pushed.
    pub first_push_time: f64,
    /// Seconds since the epoch at which this item was most recently pushed.
    pub last_push_time: f64,

    /// The `delay_seconds` the caller originally configured, for observability.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub original_delay_seconds: Option<u64>,
    /// The `debounce_seconds` the caller originally configured, for observability.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub original_debounce_seconds: Option<u64>,
    /// Whether `debounce_always_delay` was set, for observability.
    #[serde(default)]
    pub original_debounce_always_delay: bool,

    /// Seconds to delay visibility of this push; `None`/`Some(0)` both mean
    /// immediate delivery.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub delay: Option<u64>,
    /// The item's TTL, in seconds, if one was configured.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ttl_seconds: Option<u64>,
    /// Seconds since the epoch at which the item was stamped with a TTL.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub item_queued_timestamp: Option<f64>,

    /// Namespaced side-channel values applied by registered metadata pairs.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub metadata: BTreeMap<String, Value>,

    /// Present only on items that live in an error queue.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<ErrorInfo>,

    /// Whether a retriable failure should apply exponential backoff before
    /// the retried push becomes visible.
    #[serde(default)]
    pub use_exponential_backoff: bool,

    /// Transient flag set by the debounce controller; never persisted to a
    /// queue, so it is excluded from (de)serialization.
    #[serde(skip)]
    pub debounce_skip: bool,
}

impl Item {
    /// Builds the base envelope for `method` called with `args`/`kwargs`,
    /// leaving every other field at its zero value. The engine
    /// (`deferrable_core`) fills in the remaining fields (`group`,
    /// `max_attempts`, timestamps, …) once it knows them.
    ///
    /// Keyword arguments are accepted as an unsorted iterator and stored
    /// sorted by key, which is what keeps [`Item::fingerprint`] stable
    /// across producer processes regardless of call-site ordering.
    pub fn new(
        method: impl Into<String>,
        args: Vec<Value>,
        kwargs: impl IntoIterator<Item = (String, Value)>,
    ) -> Self {
        Self {
            method: method.into(),
            object: None,
            args,
            kwargs: kwargs.into_iter().collect(),
            attempts: 0,
            max_attempts: 1,
            error_classes: Vec::new(),
            group: String::new(),
            first_push_time: 0.0,
            last_push_time: 0.0,
            original_delay_seconds: None,
            original_debounce_seconds: None,
            original_debounce_always_delay: false,
            delay: None,
            ttl_seconds: None,
            item_queued_timestamp: None,
            metadata: BTreeMap::new(),
            error: None,
            use_exponential_backoff: false,
            debounce_skip: false,
        }
    }

    /// Returns the effective delay in seconds, treating both absent and
    /// `Some(0)` as "no delay" (see `SPEC_FULL.md` open question 2).
    pub fn effective_delay(&self) -> u64 {
        self.delay.unwrap_or(0)
    }

    /// Whether `kind` is one of this item's configured retriable error kinds.
    pub fn is_retriable(&self, kind: &str) -> bool {
        self.error_classes.iter().any(|class| class == kind)
    }

    /// Whether this item has exhausted its retry budget: the next failure
    /// must route to the error queue rather than be retried.
    pub fn attempts_exhausted(&self) -> bool {
        self.attempts + 1 >= self.max_attempts
    }

    /// Computes this item's debounce fingerprint: `"{method}.{args}.{kwargs}"`
    /// over the encoded forms of each, so that equivalent calls made with
    /// kwargs in different orders still collide.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.method, &self.args, &self.kwargs)
    }
}

/// Computes the debounce fingerprint for a prospective call, before an
/// [`Item`] has necessarily been built.
pub fn fingerprint(method: &str, args: &[Value], kwargs: &BTreeMap<String, Value>) -> String {
    let args_repr = serde_json::to_string(args).unwrap_or_default();
    let kwargs_repr = serde_json::to_string(kwargs).unwrap_or_default();
    format!("{method}.{args_repr}.{kwargs_repr}")
}

/// Resolves `item.method` (and `item.object`, if present) to a registered
/// [`Callable`] along with references to the item's decoded arguments.
///
/// When `item.object` is set, `item.method` is resolved as a method bound to
/// that object id rather than as a top-level name, so that two registered
/// objects may expose methods of the same name without colliding.
pub fn decode_call<'a>(
    item: &'a Item,
    registry: &CallRegistry,
) -> Result<(Arc<dyn Callable>, &'a [Value], &'a BTreeMap<String, Value>), RegistryError> {
    let (handler, _location) = match item.object.as_deref() {
        Some(object) => registry.resolve_method(object, &item.method)?,
        None => registry.resolve(&item.method)?,
    };
    Ok((handler, &item.args, &item.kwargs))
}

/// Returns a short, structured description of `item`'s target, source
/// location (if registered), and arguments — used for logging dropped or
/// otherwise noteworthy items without dumping the full envelope.
pub fn pretty_describe(item: &Item, registry: &CallRegistry) -> String {
    match registry.resolve(&item.method) {
        Ok((_, location)) => format!(
            "{name}({object}) at {file}:{line} args={args:?} kwargs={kwargs:?}",
            name = item.method,
            object = item.object.as_deref().unwrap_or(""),
            file = location.file,
            line = location.line,
            args = item.args,
            kwargs = item.kwargs,
        ),
        Err(_) => format!(
            "{name}(<unregistered>) args={args:?} kwargs={kwargs:?}",
            name = item.method,
            args = item.args,
            kwargs = item.kwargs,
        ),
    }
}

/// Stands in for a [`SourceLocation`] when describing an item whose
/// callable could not be resolved.
pub const UNKNOWN_LOCATION: SourceLocation = SourceLocation {
    file: "<unknown>",
    line: 0,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::here;
    use crate::registry::CallError;
    use pretty_assertions::assert_eq;

    #[test]
    fn fingerprint_is_stable_across_kwargs_ordering() {
        let mut kwargs_a = BTreeMap::new();
        kwargs_a.insert("b".to_string(), Value::Int(2));
        kwargs_a.insert("a".to_string(), Value::Int(1));

        let mut kwargs_b = BTreeMap::new();
        kwargs_b.insert("a".to_string(), Value::Int(1));
        kwargs_b.insert("b".to_string(), Value::Int(2));

        let item_a = Item::new("f", vec![Value::Int(1)], kwargs_a);
        let item_b = Item::new("f", vec![Value::Int(1)], kwargs_b);

        assert_eq!(item_a.fingerprint(), item_b.fingerprint());
    }

    #[test]
    fn round_trips_through_json() {
        let item = Item::new("f", vec![Value::Int(1)], [("b".to_string(), Value::Bool(true))]);

        let encoded = serde_json::to_string(&item).unwrap();
        let decoded: Item = serde_json::from_str(&encoded).unwrap();

        assert_eq!(item, decoded);
    }

    #[test]
    fn decode_call_resolves_registered_method() {
        let registry = CallRegistry::new();
        registry
            .register("f", here!(), |_: &[Value], _: &BTreeMap<String, Value>| Ok(()))
            .unwrap();
        let item = Item::new("f", vec![Value::Int(1)], []);

        let (handler, args, _kwargs) = decode_call(&item, &registry).unwrap();
        handler.call(args, &item.kwargs).unwrap();
    }

    #[test]
    fn decode_call_dispatches_on_object_when_present() {
        let registry = CallRegistry::new();
        registry
            .register("greet", here!(), |_: &[Value], _: &BTreeMap<String, Value>| {
                Err(CallError::new("wrong-dispatch", std::io::Error::other("top-level greet called")))
            })
            .unwrap();
        registry
            .register_method("alice", "greet", here!(), |_: &[Value], _: &BTreeMap<String, Value>| Ok(()))
            .unwrap();

        let mut item = Item::new("greet", vec![], []);
        item.object = Some("alice".to_string());

        let (handler, args, kwargs) = decode_call(&item, &registry).unwrap();
        handler.call(args, kwargs).unwrap();
    }

    #[test]
    fn pretty_describe_handles_unregistered_methods() {
        let registry = CallRegistry::new();
        let item = Item::new("missing", vec![], []);

        let description = pretty_describe(&item, &registry);

        assert!(description.contains("missing"));
        assert!(description.contains("<unregistered>"));
    }
}
