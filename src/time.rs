//! Wall-clock and monotonic time helpers.

use chrono::Utc;
use std::time::Instant;

/// Nanoseconds elapsed since `i`, saturating.
pub fn elapsed_ns(i: Instant) -> u64 {
    let elapsed = i.elapsed();
    (elapsed.as_secs().saturating_mul(1_000_000_000))
        .saturating_add(u64::from(elapsed.subsec_nanos()))
}

/// Milliseconds elapsed since `i`, as a float for histogram updates.
pub fn elapsed_ms(i: Instant) -> f64 {
    elapsed_ns(i) as f64 / 1_000_000.0
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn elapsed_is_monotone() {
        let start = Instant::now();
        thread::sleep(Duration::from_millis(2));
        assert!(elapsed_ns(start) >= 2_000_000);
        assert!(elapsed_ms(start) >= 2.0);
    }

    #[test]
    fn now_is_after_2017() {
        assert!(now_ms() > 1_500_000_000_000);
    }
}
