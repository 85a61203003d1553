//! Timer rollups.
//!
//! A timer carries a basic digest of its durations, a per-second rate and a
//! CKMS percentile estimator. Merging never recomputes percentiles from
//! samples, it defers to the estimator's own merge.

use granularity::Range;
use quantiles::ckms::CKMS;
use rollup::basic::{self, BasicRollup};

/// Digest, rate and percentiles of a timer over some window.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TimerRollup {
    stats: BasicRollup,
    rate: f64,
    percentiles: CKMS<f64>,
}

impl TimerRollup {
    /// Summarize timing samples taken over `window_secs` seconds. `error` is
    /// the CKMS error bound. `None` if there are no samples.
    pub fn from_samples(samples: &[f64], error: f64, window_secs: f64) -> Option<TimerRollup> {
        let stats = basic::from_raw(samples.iter().cloned())?;
        let mut percentiles = CKMS::new(error);
        for sample in samples {
            percentiles.insert(*sample);
        }
        Some(TimerRollup {
            rate: rate(stats.count(), window_secs),
            stats: stats,
            percentiles: percentiles,
        })
    }

    /// Number of timings.
    pub fn count(&self) -> u64 {
        self.stats.count()
    }

    /// Sum of all timings.
    pub fn sum(&self) -> f64 {
        self.stats.sum()
    }

    /// The full digest of timings.
    pub fn stats(&self) -> &BasicRollup {
        &self.stats
    }

    /// Timings per second over the window.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Are the digest and rate finite?
    pub fn is_finite(&self) -> bool {
        self.stats.is_finite() && self.rate.is_finite()
    }

    /// Estimated timing at quantile `q`, `0.0 <= q <= 1.0`.
    pub fn percentile(&self, q: f64) -> Option<f64> {
        self.percentiles.query(q).map(|x| x.1)
    }
}

fn rate(count: u64, window_secs: f64) -> f64 {
    if window_secs > 0.0 {
        count as f64 / window_secs
    } else {
        0.0
    }
}

/// Merge timers into one covering `window`.
pub fn from_timers<'a, I>(timers: I, window: &Range) -> Option<TimerRollup>
where
    I: IntoIterator<Item = &'a TimerRollup>,
{
    let mut timers = timers.into_iter();
    let first = timers.next()?;
    let mut stats = first.stats.clone();
    let mut percentiles = first.percentiles.clone();
    for timer in timers {
        stats.merge(&timer.stats);
        percentiles += timer.percentiles.clone();
    }
    Some(TimerRollup {
        rate: rate(stats.count(), window.duration_secs()),
        stats: stats,
        percentiles: percentiles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(from: u32, to: u32) -> Vec<f64> {
        (from..to).map(f64::from).collect()
    }

    #[test]
    fn from_samples_summarizes() {
        let timer = TimerRollup::from_samples(&samples(1, 101), 0.001, 10.0).unwrap();
        assert_eq!(100, timer.count());
        assert_eq!(5050.0, timer.sum());
        assert_eq!(10.0, timer.rate());
        let top = timer.percentile(1.0).unwrap();
        assert!(top >= 99.0 && top <= 100.0, "top {}", top);
        assert!(TimerRollup::from_samples(&[], 0.001, 10.0).is_none());
    }

    #[test]
    fn merge_sums_counts_and_merges_percentiles() {
        let lhs = TimerRollup::from_samples(&samples(1, 501), 0.001, 60.0).unwrap();
        let rhs = TimerRollup::from_samples(&samples(501, 1001), 0.001, 60.0).unwrap();
        let merged = from_timers(vec![&lhs, &rhs], &Range::new(0, 300_000)).unwrap();

        assert_eq!(1000, merged.count());
        assert_eq!(500_500.0, merged.sum());
        assert_eq!(1.0, merged.stats().min());
        assert_eq!(1000.0, merged.stats().max());
        assert_eq!(1000.0 / 300.0, merged.rate());

        let median = merged.percentile(0.5).unwrap();
        assert!(median > 450.0 && median < 550.0, "median {}", median);
        let top = merged.percentile(1.0).unwrap();
        assert!(top >= 990.0 && top <= 1000.0, "top {}", top);
    }

    #[test]
    fn singleton_merge_keeps_digest() {
        let timer = TimerRollup::from_samples(&samples(1, 11), 0.001, 10.0).unwrap();
        let merged = from_timers(vec![&timer], &Range::new(0, 10_000)).unwrap();
        assert_eq!(timer.stats(), merged.stats());
        assert_eq!(timer.percentile(0.9), merged.percentile(0.9));
    }
}
