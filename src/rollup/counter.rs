//! Counter rollups.

use granularity::Range;

/// The total of a counter over some window and its per-second rate.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CounterRollup {
    count: f64,
    rate: f64,
    sample_count: u64,
}

impl CounterRollup {
    /// A counter observed to move by `count` over `window_secs` seconds,
    /// summarizing `sample_count` increments.
    pub fn new(count: f64, window_secs: f64, sample_count: u64) -> CounterRollup {
        CounterRollup {
            count: count,
            rate: rate(count, window_secs),
            sample_count: sample_count,
        }
    }

    /// Total over the window.
    pub fn count(&self) -> f64 {
        self.count
    }

    /// Per-second rate over the window.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Are the total and rate finite?
    pub fn is_finite(&self) -> bool {
        self.count.is_finite() && self.rate.is_finite()
    }

    /// Number of increments summarized.
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }
}

fn rate(count: f64, window_secs: f64) -> f64 {
    if window_secs > 0.0 {
        count / window_secs
    } else {
        0.0
    }
}

/// Merge counters into one covering `window`
///
/// Totals and sample counts add. The rate is not averaged from the inputs
/// but recomputed over the full window, so a quiet stretch with no inputs
/// lowers it.
pub fn from_counters<'a, I>(counters: I, window: &Range) -> Option<CounterRollup>
where
    I: IntoIterator<Item = &'a CounterRollup>,
{
    let mut counters = counters.into_iter();
    let first = counters.next()?;
    let mut count = first.count;
    let mut sample_count = first.sample_count;
    for counter in counters {
        count += counter.count;
        sample_count += counter.sample_count;
    }
    Some(CounterRollup::new(count, window.duration_secs(), sample_count))
}
