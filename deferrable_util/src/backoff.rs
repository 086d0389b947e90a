use deferrable_codec::Item;

/// The constant term of the backoff formula: `delay = CONSTANT + BASE^attempts`.
pub const BACKOFF_CONSTANT: f64 = 2.0;
/// The exponent base of the backoff formula.
pub const BACKOFF_BASE: f64 = 2.0;
/// The hard cap on any single delay or debounce window, in seconds.
pub const MAXIMUM_DELAY_SECONDS: u64 = 900;

/// Computes the exponential backoff delay for the given (post-increment)
/// attempt count, capped at [`MAXIMUM_DELAY_SECONDS`].
pub fn backoff_delay_seconds(attempts: u32) -> u64 {
    let delay = BACKOFF_CONSTANT + BACKOFF_BASE.powi(attempts as i32);
    (delay.round() as u64).min(MAXIMUM_DELAY_SECONDS)
}

/// Applies the exponential backoff delay to `item` in place, if
/// `item.use_exponential_backoff` is set.
///
/// `item.last_push_time` is shifted forward by the same delay so that
/// response-time metrics computed from it are not skewed by the backoff
/// wait, per the specification this implements.
pub fn apply_exponential_backoff(item: &mut Item, now: f64) {
    if !item.use_exponential_backoff {
        return;
    }

    let delay = backoff_delay_seconds(item.attempts);
    item.last_push_time = now + delay as f64;
    item.delay = Some(delay);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn delay_grows_exponentially_and_caps() {
        assert_eq!(backoff_delay_seconds(0), 3);
        assert_eq!(backoff_delay_seconds(1), 4);
        assert_eq!(backoff_delay_seconds(2), 6);
        assert_eq!(backoff_delay_seconds(10), 900);
    }

    #[test]
    fn no_op_when_backoff_is_disabled() {
        let mut item = Item::new("f", vec![], []);
        item.attempts = 1;
        item.delay = None;

        apply_exponential_backoff(&mut item, 1_000.0);

        assert_eq!(item.delay, None);
        assert_eq!(item.last_push_time, 0.0);
    }

    #[test]
    fn shifts_last_push_time_forward_by_the_delay() {
        let mut item = Item::new("f", vec![], []);
        item.attempts = 1;
        item.use_exponential_backoff = true;

        apply_exponential_backoff(&mut item, 1_000.0);

        assert_eq!(item.delay, Some(4));
        assert_eq!(item.last_push_time, 1_004.0);
    }
}
