/// The outcome of a debounce decision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Strategy {
    /// An identical item is already pending within the window; drop this push.
    Skip,
    /// No collision; push with no delay.
    PushNow,
    /// A prior push landed within the window; push delayed by this many
    /// seconds so it lands just outside it.
    PushDelayed(f64),
}

impl Strategy {
    /// The `item.delay` this strategy implies, in whole seconds.
    pub fn delay_seconds(&self) -> u64 {
        match self {
            Strategy::Skip | Strategy::PushNow => 0,
            Strategy::PushDelayed(seconds) => seconds.ceil().max(0.0) as u64,
        }
    }
}

/// Pure decision function, given the two debounce keys already read.
///
/// Exactly the algorithm in the specification: `debounce.F` present always
/// wins (SKIP), `always_delay` forces every miss to `PUSH_DELAYED`, and
/// otherwise the decision depends on how long ago `last_push.F` landed
/// relative to `window_seconds`.
pub fn decide(
    last_push_time: Option<f64>,
    debounce_time: Option<f64>,
    now: f64,
    window_seconds: f64,
    always_delay: bool,
) -> Strategy {
    if debounce_time.is_some() {
        return Strategy::Skip;
    }
    if always_delay {
        return Strategy::PushDelayed(window_seconds);
    }
    match last_push_time {
        None => Strategy::PushNow,
        Some(last_push_time) => {
            let age = now - last_push_time;
            if age > window_seconds {
                Strategy::PushNow
            } else {
                Strategy::PushDelayed(window_seconds - age)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn debounce_key_present_always_skips() {
        let strategy = decide(None, Some(100.0), 100.0, 10.0, false);
        assert_eq!(strategy, Strategy::Skip);
    }

    #[test]
    fn always_delay_forces_push_delayed_on_first_call() {
        let strategy = decide(None, None, 100.0, 10.0, true);
        assert_eq!(strategy, Strategy::PushDelayed(10.0));
    }

    #[test]
    fn absent_last_push_pushes_now() {
        let strategy = decide(None, None, 100.0, 10.0, false);
        assert_eq!(strategy, Strategy::PushNow);
    }

    #[test]
    fn stale_last_push_pushes_now() {
        let strategy = decide(Some(80.0), None, 100.0, 10.0, false);
        assert_eq!(strategy, Strategy::PushNow);
    }

    #[test]
    fn recent_last_push_delays_remaining_window() {
        let strategy = decide(Some(97.0), None, 100.0, 10.0, false);
        assert_eq!(strategy, Strategy::PushDelayed(7.0));
        assert_eq!(strategy.delay_seconds(), 7);
    }
}
