use std::sync::Arc;

use thiserror::Error;

/// A registration option that may be a fixed value or a zero-argument
/// producer evaluated at `later` time.
#[derive(Clone)]
pub enum OptionValue<T> {
    /// A value fixed at registration time.
    Fixed(T),
    /// A value computed fresh on every `later` call.
    Producer(Arc<dyn Fn() -> T + Send + Sync>),
}

impl<T: Copy> OptionValue<T> {
    /// Evaluates this option to a concrete value.
    pub fn resolve(&self) -> T {
        match self {
            OptionValue::Fixed(value) => *value,
            OptionValue::Producer(producer) => producer(),
        }
    }

    /// The fixed value, if this is [`OptionValue::Fixed`] — used for the
    /// validation that can run at registration time.
    pub fn fixed(&self) -> Option<T> {
        match self {
            OptionValue::Fixed(value) => Some(*value),
            OptionValue::Producer(_) => None,
        }
    }
}

impl<T> From<T> for OptionValue<T> {
    fn from(value: T) -> Self {
        OptionValue::Fixed(value)
    }
}

/// The cap on `delay_seconds`, `debounce_seconds`, and backoff delays.
pub const MAX_WINDOW_SECONDS: u32 = 900;

/// Options supplied when registering a callable.
#[derive(Clone, Default)]
pub struct RegisterOptions {
    /// Delay, in seconds, before a pushed item becomes visible.
    pub delay_seconds: Option<OptionValue<u32>>,
    /// The debounce window, in seconds. Mutually exclusive with `delay_seconds`.
    pub debounce_seconds: Option<OptionValue<u32>>,
    /// Whether every debounce miss should delay by the full window rather
    /// than push immediately on the first call. Requires `debounce_seconds`.
    pub debounce_always_delay: bool,
    /// This item's time-to-live, in seconds. If set, must be at least
    /// `delay_seconds`/`debounce_seconds`.
    pub ttl_seconds: Option<OptionValue<u32>>,
    /// Overrides the engine's default max attempts for this callable.
    pub max_attempts: Option<u32>,
    /// Overrides the engine's default retriable error-kind set for this callable.
    pub error_classes: Option<Vec<String>>,
    /// Whether a retriable failure should apply exponential backoff.
    pub use_exponential_backoff: bool,
}

/// A registration was rejected because its options were invalid.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// Both `delay_seconds` and `debounce_seconds` were set.
    #[error("delay_seconds and debounce_seconds are mutually exclusive")]
    DelayAndDebounceBothSet,
    /// A fixed `delay_seconds`/`debounce_seconds` exceeded [`MAX_WINDOW_SECONDS`].
    #[error("{field} of {value}s exceeds the {MAX_WINDOW_SECONDS}s cap")]
    WindowTooLarge {
        /// Which field was out of range.
        field: &'static str,
        /// The offending value.
        value: u32,
    },
    /// `debounce_always_delay` was set without `debounce_seconds`.
    #[error("debounce_always_delay requires debounce_seconds to be set")]
    AlwaysDelayRequiresWindow,
    /// A fixed `ttl_seconds` was shorter than the fixed delay/debounce window.
    #[error("ttl_seconds of {ttl}s is shorter than the {window}s delay/debounce window")]
    TtlShorterThanWindow {
        /// The configured TTL.
        ttl: u32,
        /// The configured delay or debounce window it was compared against.
        window: u32,
    },
    /// `debounce_seconds` was set but the engine has no debounce store.
    #[error("debounce_seconds requires a debounce store to be configured on the engine")]
    DebounceRequiresStore,
    /// A callable was already registered under this name.
    #[error("a callable is already registered under the name '{0}'")]
    AlreadyRegistered(String),
}

/// Validates `options` against the static (registration-time) rules in
/// spec.md §4.7. Producer-backed values are re-validated at `later` time,
/// since they aren't known yet.
pub fn validate(options: &RegisterOptions, has_debounce_store: bool) -> Result<(), RegistrationError> {
    if options.delay_seconds.is_some() && options.debounce_seconds.is_some() {
        return Err(RegistrationError::DelayAndDebounceBothSet);
    }

    if let Some(value) = options.delay_seconds.as_ref().and_then(OptionValue::fixed) {
        if value > MAX_WINDOW_SECONDS {
            return Err(RegistrationError::WindowTooLarge {
                field: "delay_seconds",
                value,
            });
        }
    }

    if let Some(value) = options.debounce_seconds.as_ref().and_then(OptionValue::fixed) {
        if value > MAX_WINDOW_SECONDS {
            return Err(RegistrationError::WindowTooLarge {
                field: "debounce_seconds",
                value,
            });
        }
    }

    if options.debounce_always_delay && options.debounce_seconds.is_none() {
        return Err(RegistrationError::AlwaysDelayRequiresWindow);
    }

    if options.debounce_seconds.is_some() && !has_debounce_store {
        return Err(RegistrationError::DebounceRequiresStore);
    }

    if let Some(ttl) = options.ttl_seconds.as_ref().and_then(OptionValue::fixed) {
        let window = options
            .delay_seconds
            .as_ref()
            .and_then(OptionValue::fixed)
            .or_else(|| options.debounce_seconds.as_ref().and_then(OptionValue::fixed));
        if let Some(window) = window {
            if ttl < window {
                return Err(RegistrationError::TtlShorterThanWindow { ttl, window });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_both_delay_and_debounce() {
        let options = RegisterOptions {
            delay_seconds: Some(1.into()),
            debounce_seconds: Some(1.into()),
            ..Default::default()
        };
        assert_eq!(validate(&options, true), Err(RegistrationError::DelayAndDebounceBothSet));
    }

    #[test]
    fn rejects_window_over_cap() {
        let options = RegisterOptions {
            delay_seconds: Some(901.into()),
            ..Default::default()
        };
        assert!(matches!(
            validate(&options, true),
            Err(RegistrationError::WindowTooLarge { field: "delay_seconds", value: 901 })
        ));
    }

    #[test]
    fn rejects_always_delay_without_window() {
        let options = RegisterOptions {
            debounce_always_delay: true,
            ..Default::default()
        };
        assert_eq!(validate(&options, true), Err(RegistrationError::AlwaysDelayRequiresWindow));
    }

    #[test]
    fn rejects_debounce_without_store() {
        let options = RegisterOptions {
            debounce_seconds: Some(10.into()),
            ..Default::default()
        };
        assert_eq!(validate(&options, false), Err(RegistrationError::DebounceRequiresStore));
    }

    #[test]
    fn rejects_ttl_shorter_than_window() {
        let options = RegisterOptions {
            delay_seconds: Some(10.into()),
            ttl_seconds: Some(5.into()),
            ..Default::default()
        };
        assert_eq!(
            validate(&options, true),
            Err(RegistrationError::TtlShorterThanWindow { ttl: 5, window: 10 })
        );
    }

    #[test]
    fn accepts_well_formed_options() {
        let options = RegisterOptions {
            debounce_seconds: Some(10.into()),
            ttl_seconds: Some(20.into()),
            ..Default::default()
        };
        assert_eq!(validate(&options, true), Ok(()));
    }
}
