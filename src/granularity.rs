//! The granularity hierarchy and time ranges.
//!
//! Granularities are process-wide constants ordered from `Full`, the raw
//! ingestion resolution, up to `Min1440`. Every rollup reads points at one
//! granularity and writes a single summary one level coarser.

use std::error;
use std::fmt;

/// A time resolution in the rollup hierarchy.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord,
         Hash)]
pub enum Granularity {
    /// Raw ingestion resolution.
    Full,
    /// Five minute buckets.
    Min5,
    /// Twenty minute buckets.
    Min20,
    /// One hour buckets.
    Min60,
    /// Four hour buckets.
    Min240,
    /// One day buckets.
    Min1440,
}

const ALL: [Granularity; 6] = [
    Granularity::Full,
    Granularity::Min5,
    Granularity::Min20,
    Granularity::Min60,
    Granularity::Min240,
    Granularity::Min1440,
];

/// Errors raised when walking off either end of the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GranularityError {
    /// `coarser` was called on the coarsest granularity.
    Coarsest(Granularity),
    /// `finer` was called on `Full`.
    Finest(Granularity),
    /// No granularity has the given short name.
    UnknownName,
}

impl fmt::Display for GranularityError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            GranularityError::Coarsest(g) => {
                write!(f, "no granularity is coarser than {}", g.short_name())
            }
            GranularityError::Finest(g) => {
                write!(f, "no granularity is finer than {}", g.short_name())
            }
            GranularityError::UnknownName => write!(f, "unknown granularity name"),
        }
    }
}

impl error::Error for GranularityError {}

impl Granularity {
    /// All granularities, finest first.
    pub fn all() -> &'static [Granularity] {
        &ALL
    }

    /// The coarsest granularity.
    pub fn coarsest() -> Granularity {
        Granularity::Min1440
    }

    fn index(&self) -> usize {
        match *self {
            Granularity::Full => 0,
            Granularity::Min5 => 1,
            Granularity::Min20 => 2,
            Granularity::Min60 => 3,
            Granularity::Min240 => 4,
            Granularity::Min1440 => 5,
        }
    }

    /// The next coarser granularity
    ///
    /// Asking for something coarser than the coarsest granularity means a
    /// rollup was scheduled that has nowhere to go. That's a bug upstream and
    /// is reported as an error rather than wrapping around.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata::granularity::Granularity;
    ///
    /// assert_eq!(Ok(Granularity::Min5), Granularity::Full.coarser());
    /// assert!(Granularity::Min1440.coarser().is_err());
    /// ```
    pub fn coarser(&self) -> Result<Granularity, GranularityError> {
        ALL.get(self.index() + 1)
            .cloned()
            .ok_or(GranularityError::Coarsest(*self))
    }

    /// The next finer granularity, the mirror of `coarser`.
    pub fn finer(&self) -> Result<Granularity, GranularityError> {
        match self.index() {
            0 => Err(GranularityError::Finest(*self)),
            idx => Ok(ALL[idx - 1]),
        }
    }

    /// Is this the raw ingestion resolution?
    pub fn is_full(&self) -> bool {
        *self == Granularity::Full
    }

    /// Width of one bucket in milliseconds.
    pub fn milliseconds(&self) -> i64 {
        match *self {
            Granularity::Full => 1,
            Granularity::Min5 => 5 * 60 * 1000,
            Granularity::Min20 => 20 * 60 * 1000,
            Granularity::Min60 => 60 * 60 * 1000,
            Granularity::Min240 => 240 * 60 * 1000,
            Granularity::Min1440 => 1440 * 60 * 1000,
        }
    }

    /// Short name, used in logs and column family names.
    pub fn short_name(&self) -> &'static str {
        match *self {
            Granularity::Full => "full",
            Granularity::Min5 => "5m",
            Granularity::Min20 => "20m",
            Granularity::Min60 => "60m",
            Granularity::Min240 => "240m",
            Granularity::Min1440 => "1440m",
        }
    }

    /// Look a granularity up by its short name.
    pub fn from_short_name(name: &str) -> Result<Granularity, GranularityError> {
        ALL.iter()
            .find(|g| g.short_name() == name)
            .cloned()
            .ok_or(GranularityError::UnknownName)
    }

    /// Floor `millis` to the start of the bucket that contains it. The
    /// bucket holding `i64::MIN` starts at `i64::MIN`.
    pub fn snap_millis(&self, millis: i64) -> i64 {
        let width = self.milliseconds();
        millis.saturating_sub(millis.rem_euclid(width))
    }

    /// The bucket of this granularity containing `millis`. Buckets at the
    /// ends of the `i64` timeline are cut short rather than overflowing.
    pub fn range_for(&self, millis: i64) -> Range {
        let start = self.snap_millis(millis);
        Range::new(start, start.saturating_add(self.milliseconds()))
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

/// A half-open time interval `[start, stop)` in milliseconds.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    start: i64,
    stop: i64,
}

impl Range {
    /// Create a new Range. A `stop` before `start` is clamped to an empty
    /// range at `start`.
    pub fn new(start: i64, stop: i64) -> Range {
        Range {
            start: start,
            stop: if stop < start { start } else { stop },
        }
    }

    /// Inclusive start of the range.
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Exclusive end of the range.
    pub fn stop(&self) -> i64 {
        self.stop
    }

    /// Length of the range in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        self.stop.saturating_sub(self.start)
    }

    /// Length of the range in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms() as f64 / 1000.0
    }

    /// Does the range contain `millis`?
    pub fn contains(&self, millis: i64) -> bool {
        self.start <= millis && millis < self.stop
    }

    /// Every bucket of `granularity` overlapping `[from, to)`, ascending
    ///
    /// One range is allocated per bucket, so the caller bounds the
    /// interval: a day of 5m buckets is 288 ranges, a year is 105,120. The
    /// last bucket stops at `i64::MAX` if the timeline ends inside it.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata::granularity::{Granularity, Range};
    ///
    /// let ranges = Range::ranges_for_interval(Granularity::Min5, 1, 600_001);
    /// assert_eq!(3, ranges.len());
    /// assert_eq!(0, ranges[0].start());
    /// assert_eq!(900_000, ranges[2].stop());
    /// ```
    pub fn ranges_for_interval(granularity: Granularity, from: i64, to: i64) -> Vec<Range> {
        let mut ranges = Vec::new();
        if from >= to {
            return ranges;
        }
        let width = granularity.milliseconds();
        let mut start = granularity.snap_millis(from);
        while start < to {
            let stop = start.saturating_add(width);
            ranges.push(Range::new(start, stop));
            start = match start.checked_add(width) {
                Some(next) => next,
                None => break,
            };
        }
        ranges
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{QuickCheck, TestResult};

    #[test]
    fn coarser_walks_the_hierarchy() {
        let mut gran = Granularity::Full;
        let mut seen = vec![gran];
        while let Ok(next) = gran.coarser() {
            assert!(next > gran);
            seen.push(next);
            gran = next;
        }
        assert_eq!(Granularity::all(), &seen[..]);
        assert_eq!(Granularity::coarsest(), gran);
    }

    #[test]
    fn coarser_of_full_is_five_minutes() {
        assert_eq!(Ok(Granularity::Min5), Granularity::Full.coarser());
    }

    #[test]
    fn coarser_of_coarsest_is_error() {
        assert_eq!(
            Err(GranularityError::Coarsest(Granularity::Min1440)),
            Granularity::Min1440.coarser()
        );
    }

    #[test]
    fn finer_mirrors_coarser() {
        for g in Granularity::all() {
            if let Ok(c) = g.coarser() {
                assert_eq!(Ok(*g), c.finer());
            }
        }
        assert!(Granularity::Full.finer().is_err());
    }

    #[test]
    fn short_names_round_trip() {
        for g in Granularity::all() {
            assert_eq!(Ok(*g), Granularity::from_short_name(g.short_name()));
        }
        assert_eq!(
            Err(GranularityError::UnknownName),
            Granularity::from_short_name("3m")
        );
    }

    #[test]
    fn widths_nest() {
        for g in Granularity::all() {
            if let Ok(c) = g.coarser() {
                assert_eq!(0, c.milliseconds() % g.milliseconds());
            }
        }
    }

    #[test]
    fn range_for_contains_timestamp() {
        fn inner(millis: i64) -> TestResult {
            if millis > 1 << 50 || millis < -(1 << 50) {
                return TestResult::discard();
            }
            for g in Granularity::all() {
                let range = g.range_for(millis);
                assert!(range.contains(millis));
                assert_eq!(g.milliseconds(), range.duration_ms());
                assert_eq!(0, range.start().rem_euclid(g.milliseconds()));
            }
            TestResult::passed()
        }
        QuickCheck::new()
            .tests(1000)
            .max_tests(10000)
            .quickcheck(inner as fn(i64) -> TestResult);
    }

    #[test]
    fn snap_negative_millis() {
        assert_eq!(-300_000, Granularity::Min5.snap_millis(-1));
    }

    #[test]
    fn ranges_for_interval_cover() {
        let ranges = Range::ranges_for_interval(Granularity::Min20, 0, 3_600_000);
        assert_eq!(3, ranges.len());
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].stop(), pair[1].start());
        }
        assert!(Range::ranges_for_interval(Granularity::Min20, 10, 10).is_empty());
    }

    #[test]
    fn buckets_at_the_ends_of_time_do_not_overflow() {
        let last = Granularity::Min5.range_for(::std::i64::MAX);
        assert_eq!(::std::i64::MAX, last.stop());
        assert_eq!(0, last.start().rem_euclid(Granularity::Min5.milliseconds()));

        let first = Granularity::Min1440.range_for(::std::i64::MIN);
        assert_eq!(::std::i64::MIN, first.start());

        let ranges =
            Range::ranges_for_interval(Granularity::Min60, ::std::i64::MAX - 1, ::std::i64::MAX);
        assert_eq!(1, ranges.len());
        assert_eq!(::std::i64::MAX, ranges[0].stop());

        let wide = Range::new(::std::i64::MIN, ::std::i64::MAX);
        assert_eq!(::std::i64::MAX, wide.duration_ms());
    }

    #[test]
    fn backwards_range_is_empty() {
        let r = Range::new(10, 5);
        assert_eq!(0, r.duration_ms());
        assert!(!r.contains(10));
    }
}
