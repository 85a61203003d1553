//! Rollup types and the algorithms that produce them.
//!
//! A `Rollup` is the statistical summary of many finer points, stored one
//! granularity up. Which variant a series uses is determined by its
//! `StatType` and, for plain numeric series, by whether the source is raw
//! samples or earlier rollups. See `dispatch` for that mapping.

pub mod basic;
pub mod counter;
pub mod dispatch;
pub mod gauge;
pub mod set;
pub mod timer;

pub use self::basic::BasicRollup;
pub use self::counter::CounterRollup;
pub use self::dispatch::{aggregator_for, destination_column_family, representation_of,
                         source_column_family, Aggregator};
pub use self::gauge::GaugeRollup;
pub use self::set::SetRollup;
pub use self::timer::TimerRollup;

use granularity::Range;
use std::fmt;
use std::slice;

/// The statistical semantics of a series
///
/// Resolved once per series through the metadata cache. `Unknown` is a plain
/// numeric series, the default for anything ingested without a type.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatType {
    /// Monotone, additive totals.
    Counter,
    /// Durations with percentiles.
    Timer,
    /// Instantaneous state.
    Gauge,
    /// Distinct values. Never rolled up.
    Set,
    /// Plain numbers.
    Unknown,
}

impl StatType {
    /// The string recorded in the metadata store for this type.
    pub fn as_str(&self) -> &'static str {
        match *self {
            StatType::Counter => "counter",
            StatType::Timer => "timer",
            StatType::Gauge => "gauge",
            StatType::Set => "set",
            StatType::Unknown => "unknown",
        }
    }

    /// Parse a recorded type string.
    pub fn parse(s: &str) -> Option<StatType> {
        match s {
            "counter" => Some(StatType::Counter),
            "timer" => Some(StatType::Timer),
            "gauge" => Some(StatType::Gauge),
            "set" => Some(StatType::Set),
            "unknown" => Some(StatType::Unknown),
            _ => None,
        }
    }

    /// Interpret a metadata record
    ///
    /// A series that never had a type recorded, or whose record we do not
    /// understand, is treated as a plain number.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata::rollup::StatType;
    ///
    /// assert_eq!(StatType::Timer, StatType::from_record(Some("timer")));
    /// assert_eq!(StatType::Unknown, StatType::from_record(None));
    /// assert_eq!(StatType::Unknown, StatType::from_record(Some("histogram")));
    /// ```
    pub fn from_record(record: Option<&str>) -> StatType {
        match record {
            None => StatType::Unknown,
            Some(s) => match StatType::parse(s) {
                Some(t) => t,
                None => {
                    debug!("unrecognized stat type record {:?}, treating as unknown", s);
                    StatType::Unknown
                }
            },
        }
    }
}

impl fmt::Display for StatType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single raw sample. Only ever found at full resolution.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct SimpleNumber {
    /// The sampled value.
    pub value: f64,
}

impl SimpleNumber {
    /// Wrap a raw sample.
    pub fn new(value: f64) -> SimpleNumber {
        SimpleNumber { value: value }
    }
}

/// The tag of a `Rollup` variant, also naming how stored bytes are to be
/// interpreted on read.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RollupKind {
    /// `Rollup::Simple`
    SimpleNumber,
    /// `Rollup::Basic`
    Basic,
    /// `Rollup::Counter`
    Counter,
    /// `Rollup::Timer`
    Timer,
    /// `Rollup::Gauge`
    Gauge,
    /// `Rollup::Set`
    Set,
}

/// A computed or stored summary of some span of time.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Rollup {
    /// A raw sample.
    Simple(SimpleNumber),
    /// Generic numeric digest.
    Basic(BasicRollup),
    /// Counter totals and rate.
    Counter(CounterRollup),
    /// Timer digest with percentiles.
    Timer(TimerRollup),
    /// Gauge digest with latest value.
    Gauge(GaugeRollup),
    /// Distinct values.
    Set(SetRollup),
}

impl Rollup {
    /// The representation of this rollup.
    pub fn kind(&self) -> RollupKind {
        match *self {
            Rollup::Simple(_) => RollupKind::SimpleNumber,
            Rollup::Basic(_) => RollupKind::Basic,
            Rollup::Counter(_) => RollupKind::Counter,
            Rollup::Timer(_) => RollupKind::Timer,
            Rollup::Gauge(_) => RollupKind::Gauge,
            Rollup::Set(_) => RollupKind::Set,
        }
    }

    /// Does every numeric field hold a finite value?
    pub fn is_finite(&self) -> bool {
        match *self {
            Rollup::Simple(ref s) => s.value.is_finite(),
            Rollup::Basic(ref b) => b.is_finite(),
            Rollup::Counter(ref c) => c.is_finite(),
            Rollup::Timer(ref t) => t.is_finite(),
            Rollup::Gauge(ref g) => g.is_finite(),
            Rollup::Set(_) => true,
        }
    }
}

/// One input value and the time it was recorded at.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// Milliseconds since the epoch.
    pub timestamp: i64,
    /// The stored value.
    pub rollup: Rollup,
}

/// The input of an aggregation: every point read for one locator over one
/// range, ordered by timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Points {
    range: Range,
    points: Vec<Point>,
}

impl Points {
    /// An empty set of points for `range`.
    pub fn new(range: Range) -> Points {
        Points {
            range: range,
            points: Vec::new(),
        }
    }

    /// Build from unordered points. Points are sorted by timestamp.
    pub fn from_vec(range: Range, mut points: Vec<Point>) -> Points {
        points.sort_by_key(|p| p.timestamp);
        Points {
            range: range,
            points: points,
        }
    }

    /// Add a point, keeping timestamp order.
    pub fn add(mut self, timestamp: i64, rollup: Rollup) -> Points {
        let idx = match self.points.binary_search_by_key(&timestamp, |p| p.timestamp) {
            Ok(idx) | Err(idx) => idx,
        };
        self.points.insert(
            idx,
            Point {
                timestamp: timestamp,
                rollup: rollup,
            },
        );
        self
    }

    /// The range these points were read for.
    pub fn range(&self) -> &Range {
        &self.range
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Were no points read?
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate points in timestamp order.
    pub fn iter(&self) -> slice::Iter<Point> {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_type_strings_round_trip() {
        for t in &[
            StatType::Counter,
            StatType::Timer,
            StatType::Gauge,
            StatType::Set,
            StatType::Unknown,
        ] {
            assert_eq!(Some(*t), StatType::parse(t.as_str()));
            assert_eq!(*t, StatType::from_record(Some(t.as_str())));
        }
    }

    #[test]
    fn points_stay_ordered() {
        let points = Points::new(Range::new(0, 100))
            .add(30, Rollup::Simple(SimpleNumber::new(3.0)))
            .add(10, Rollup::Simple(SimpleNumber::new(1.0)))
            .add(20, Rollup::Simple(SimpleNumber::new(2.0)));
        let ts: Vec<i64> = points.iter().map(|p| p.timestamp).collect();
        assert_eq!(vec![10, 20, 30], ts);
        assert_eq!(3, points.len());
    }

    #[test]
    fn rollup_kind_matches_variant() {
        assert_eq!(
            RollupKind::SimpleNumber,
            Rollup::Simple(SimpleNumber::new(1.0)).kind()
        );
        assert_eq!(
            RollupKind::Basic,
            Rollup::Basic(BasicRollup::from_sample(1.0)).kind()
        );
        assert_eq!(RollupKind::Set, Rollup::Set(SetRollup::new()).kind());
    }
}
