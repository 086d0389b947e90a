use crate::value::Value;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// The error a registered callable returns when invoked.
///
/// This is boxed so that callers can report arbitrary domain errors; the
/// engine only cares whether the error's [kind](std::any::Any) belongs to
/// the item's configured retriable set, which is why callables also report
/// a [`kind`](CallError::kind) string alongside the boxed cause.
pub struct CallError {
    kind: String,
    cause: Box<dyn StdError + Send + Sync + 'static>,
}

impl CallError {
    /// Builds a new [`CallError`] tagged with the given kind.
    ///
    /// The `kind` is matched against an item's `error_classes` to decide
    /// whether the failure is retriable (see
    /// [`crate::item::Item::is_retriable`]).
    pub fn new(kind: impl Into<String>, cause: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            kind: kind.into(),
            cause: cause.into(),
        }
    }

    /// Returns the error kind tag, matched against `item.error_classes`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the human-readable error message of the underlying cause.
    pub fn message(&self) -> String {
        self.cause.to_string()
    }
}

impl fmt::Debug for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallError")
            .field("kind", &self.kind)
            .field("cause", &self.cause.to_string())
            .finish()
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.cause)
    }
}

impl StdError for CallError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.cause.as_ref())
    }
}

/// The outcome of invoking a registered callable against decoded arguments.
pub type CallResult = Result<(), CallError>;

/// A type-erased handler registered under a stable name.
///
/// Since Rust has no runtime reflection into arbitrary function pointers,
/// callables are registered once (typically at process start-up) and
/// referenced by name thereafter; `item.method` carries that name rather
/// than a pickled function, per the design note in the specification this
/// crate implements.
pub trait Callable: Send + Sync {
    /// Invokes the callable with decoded positional and keyword arguments.
    fn call(&self, args: &[Value], kwargs: &BTreeMap<String, Value>) -> CallResult;
}

impl<F> Callable for F
where
    F: Fn(&[Value], &BTreeMap<String, Value>) -> CallResult + Send + Sync,
{
    fn call(&self, args: &[Value], kwargs: &BTreeMap<String, Value>) -> CallResult {
        (self)(args, kwargs)
    }
}

/// Where a registered callable was defined, for [`crate::item::pretty_describe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    /// The source file the callable was registered from.
    pub file: &'static str,
    /// The line the callable was registered from.
    pub line: u32,
}

struct Entry {
    location: SourceLocation,
    handler: Arc<dyn Callable>,
}

/// A process-wide (or scoped, if you build more than one) table mapping
/// registered callable names to their handlers.
///
/// This is the Rust analogue of resolving `item['method']` back to a Python
/// function via `pickle.loads`: instead of deserializing a function pointer,
/// `decode_call` looks the name up here. Plain callables (no receiver) live
/// in `entries`, keyed by name alone; methods registered against an object
/// id (the `getattr(decode(item.object), item.method)` case) live in
/// `methods`, keyed by `(object, method)` so that two objects may expose
/// methods of the same name without colliding.
#[derive(Default)]
pub struct CallRegistry {
    entries: RwLock<BTreeMap<String, Entry>>,
    methods: RwLock<BTreeMap<(String, String), Entry>>,
}

/// Failure to resolve a registered callable.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A callable was already registered under this name.
    #[error("a callable is already registered under the name '{0}'")]
    AlreadyRegistered(String),
    /// No callable is registered under this name.
    #[error("no callable is registered under the name '{0}'")]
    Unresolved(String),
}

impl CallRegistry {
    /// Creates a new, empty [`CallRegistry`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, recording `location` for
    /// [`pretty_describe`](crate::item::pretty_describe).
    ///
    /// Returns [`RegistryError::AlreadyRegistered`] if `name` is already
    /// taken; names must be unique across the registry.
    pub fn register(
        &self,
        name: impl Into<String>,
        location: SourceLocation,
        handler: impl Callable + 'static,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let mut entries = self.entries.write();
        if entries.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        entries.insert(
            name,
            Entry {
                location,
                handler: Arc::new(handler),
            },
        );
        Ok(())
    }

    /// Resolves `name` to its registered handler and source location.
    pub fn resolve(&self, name: &str) -> Result<(Arc<dyn Callable>, SourceLocation), RegistryError> {
        self.entries
            .read()
            .get(name)
            .map(|entry| (Arc::clone(&entry.handler), entry.location))
            .ok_or_else(|| RegistryError::Unresolved(name.to_owned()))
    }

    /// Registers `handler` as the `method` attribute of the object
    /// identified by `object`, recording `location` for
    /// [`pretty_describe`](crate::item::pretty_describe).
    ///
    /// This is the Rust analogue of binding a method onto a registered
    /// object id: `decode_call` routes here whenever `item.object` is set,
    /// rather than treating `item.method` as a top-level name.
    pub fn register_method(
        &self,
        object: impl Into<String>,
        method: impl Into<String>,
        location: SourceLocation,
        handler: impl Callable + 'static,
    ) -> Result<(), RegistryError> {
        let key = (object.into(), method.into());
        let mut methods = self.methods.write();
        if methods.contains_key(&key) {
            return Err(RegistryError::AlreadyRegistered(format!("{}.{}", key.0, key.1)));
        }
        methods.insert(
            key,
            Entry {
                location,
                handler: Arc::new(handler),
            },
        );
        Ok(())
    }

    /// Resolves `method` on the object identified by `object` to its
    /// registered handler and source location.
    pub fn resolve_method(
        &self,
        object: &str,
        method: &str,
    ) -> Result<(Arc<dyn Callable>, SourceLocation), RegistryError> {
        self.methods
            .read()
            .get(&(object.to_owned(), method.to_owned()))
            .map(|entry| (Arc::clone(&entry.handler), entry.location))
            .ok_or_else(|| RegistryError::Unresolved(format!("{object}.{method}")))
    }

    /// Returns whether a callable is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Returns whether `method` is registered against `object`.
    pub fn contains_method(&self, object: &str, method: &str) -> bool {
        self.methods.read().contains_key(&(object.to_owned(), method.to_owned()))
    }
}

/// Builds a [`SourceLocation`] pointing at the call site.
#[macro_export]
macro_rules! here {
    () => {
        $crate::registry::SourceLocation {
            file: file!(),
            line: line!(),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_duplicate_names() {
        let registry = CallRegistry::new();
        registry
            .register("noop", here!(), |_: &[Value], _: &BTreeMap<String, Value>| Ok(()))
            .unwrap();

        let result = registry.register("noop", here!(), |_: &[Value], _: &BTreeMap<String, Value>| Ok(()));

        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(name)) if name == "noop"));
    }

    #[test]
    fn resolves_registered_callable() {
        let registry = CallRegistry::new();
        registry
            .register("echo", here!(), |args: &[Value], _: &BTreeMap<String, Value>| {
                assert_eq!(args.len(), 1);
                Ok(())
            })
            .unwrap();

        let (handler, _location) = registry.resolve("echo").unwrap();
        handler.call(&[Value::Int(1)], &BTreeMap::new()).unwrap();
    }

    #[test]
    fn unresolved_name_is_an_error() {
        let registry = CallRegistry::new();
        assert!(matches!(
            registry.resolve("missing"),
            Err(RegistryError::Unresolved(name)) if name == "missing"
        ));
    }

    #[test]
    fn methods_of_different_objects_do_not_collide() {
        let registry = CallRegistry::new();
        registry
            .register_method("alice", "greet", here!(), |_: &[Value], _: &BTreeMap<String, Value>| Ok(()))
            .unwrap();
        registry
            .register_method("bob", "greet", here!(), |_: &[Value], _: &BTreeMap<String, Value>| {
                Err(CallError::new("boom", std::io::Error::other("nope")))
            })
            .unwrap();

        let (alice_greet, _) = registry.resolve_method("alice", "greet").unwrap();
        alice_greet.call(&[], &BTreeMap::new()).unwrap();

        let (bob_greet, _) = registry.resolve_method("bob", "greet").unwrap();
        assert!(bob_greet.call(&[], &BTreeMap::new()).is_err());
    }

    #[test]
    fn unresolved_method_is_an_error() {
        let registry = CallRegistry::new();
        assert!(matches!(
            registry.resolve_method("alice", "greet"),
            Err(RegistryError::Unresolved(name)) if name == "alice.greet"
        ));
    }
}
