//! Type driven dispatch
//!
//! Every decision the rollup task makes based on a series' statistical type
//! lives here as a pure lookup over (StatType, Granularity): how stored input
//! is to be interpreted, which aggregation applies, and which column
//! families are read and written. The task itself carries no type specific
//! logic.
//!
//! The representation and the aggregator must agree for any pair, since the
//! aggregator consumes exactly what the representation decodes.

use error::Error;
use granularity::Granularity;
use io::ColumnFamily;
use rollup::{basic, counter, gauge, timer};
use rollup::{Points, Rollup, RollupKind, StatType};

/// The representation points of type `stat_type` are stored in at
/// `granularity`.
pub fn representation_of(stat_type: StatType, granularity: Granularity) -> RollupKind {
    match stat_type {
        StatType::Counter => RollupKind::Counter,
        StatType::Timer => RollupKind::Timer,
        StatType::Set => RollupKind::Set,
        StatType::Gauge => RollupKind::Gauge,
        StatType::Unknown if granularity.is_full() => RollupKind::SimpleNumber,
        StatType::Unknown => RollupKind::Basic,
    }
}

/// The aggregation rolling `stat_type` up from `granularity`. Sets have
/// none.
pub fn aggregator_for(stat_type: StatType, granularity: Granularity) -> Result<Aggregator, Error> {
    match stat_type {
        StatType::Counter => Ok(Aggregator::CounterFromCounter),
        StatType::Timer => Ok(Aggregator::TimerFromTimer),
        StatType::Gauge => Ok(Aggregator::GaugeFromGauge),
        StatType::Unknown if granularity.is_full() => Ok(Aggregator::BasicFromRaw),
        StatType::Unknown => Ok(Aggregator::BasicFromBasic),
        StatType::Set => Err(Error::Dispatch {
            stat_type: stat_type,
            granularity: granularity,
        }),
    }
}

/// Where input for `stat_type` at `granularity` is read from. Plain numeric
/// series live in the basic column families, typed series in the
/// preaggregated ones.
pub fn source_column_family(stat_type: StatType, granularity: Granularity) -> ColumnFamily {
    match stat_type {
        StatType::Unknown => ColumnFamily::basic(granularity),
        _ => ColumnFamily::preaggregated(granularity),
    }
}

/// Where the rollup of `stat_type` from `granularity` is written: the same
/// family flavour as the source, one granularity coarser.
pub fn destination_column_family(
    stat_type: StatType,
    granularity: Granularity,
) -> Result<ColumnFamily, Error> {
    let coarser = granularity.coarser()?;
    Ok(source_column_family(stat_type, coarser))
}

/// The aggregation functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregator {
    /// Raw samples into a basic digest.
    BasicFromRaw,
    /// Basic digests into a basic digest.
    BasicFromBasic,
    /// Counters into a counter.
    CounterFromCounter,
    /// Timers into a timer.
    TimerFromTimer,
    /// Gauges into a gauge.
    GaugeFromGauge,
}

impl Aggregator {
    /// The representation this aggregator consumes.
    pub fn input_kind(&self) -> RollupKind {
        match *self {
            Aggregator::BasicFromRaw => RollupKind::SimpleNumber,
            Aggregator::BasicFromBasic => RollupKind::Basic,
            Aggregator::CounterFromCounter => RollupKind::Counter,
            Aggregator::TimerFromTimer => RollupKind::Timer,
            Aggregator::GaugeFromGauge => RollupKind::Gauge,
        }
    }

    /// The representation this aggregator produces.
    pub fn output_kind(&self) -> RollupKind {
        match *self {
            Aggregator::BasicFromRaw | Aggregator::BasicFromBasic => RollupKind::Basic,
            Aggregator::CounterFromCounter => RollupKind::Counter,
            Aggregator::TimerFromTimer => RollupKind::Timer,
            Aggregator::GaugeFromGauge => RollupKind::Gauge,
        }
    }

    /// Summarize `input`
    ///
    /// Every point must hold `input_kind()`, anything else is a malformed
    /// read and fails with `Error::Mismatch`. Empty input fails with
    /// `Error::EmptyInput`.
    pub fn compute(&self, input: &Points) -> Result<Rollup, Error> {
        let expected = self.input_kind();
        let window = input.range();
        let rollup = match *self {
            Aggregator::BasicFromRaw => {
                let samples = extract(input, expected, |r| match *r {
                    Rollup::Simple(ref s) => Some(s),
                    _ => None,
                })?;
                basic::from_raw(samples.into_iter().map(|s| s.value)).map(Rollup::Basic)
            }
            Aggregator::BasicFromBasic => {
                let digests = extract(input, expected, |r| match *r {
                    Rollup::Basic(ref b) => Some(b),
                    _ => None,
                })?;
                basic::from_rollups(digests).map(Rollup::Basic)
            }
            Aggregator::CounterFromCounter => {
                let counters = extract(input, expected, |r| match *r {
                    Rollup::Counter(ref c) => Some(c),
                    _ => None,
                })?;
                counter::from_counters(counters, window).map(Rollup::Counter)
            }
            Aggregator::TimerFromTimer => {
                let timers = extract(input, expected, |r| match *r {
                    Rollup::Timer(ref t) => Some(t),
                    _ => None,
                })?;
                timer::from_timers(timers, window).map(Rollup::Timer)
            }
            Aggregator::GaugeFromGauge => {
                let gauges = extract(input, expected, |r| match *r {
                    Rollup::Gauge(ref g) => Some(g),
                    _ => None,
                })?;
                gauge::from_gauges(gauges).map(Rollup::Gauge)
            }
        };
        match rollup {
            None => Err(Error::EmptyInput),
            Some(ref r) if !r.is_finite() => Err(Error::NonFinite(r.kind())),
            Some(r) => Ok(r),
        }
    }
}

fn extract<'a, T, F>(input: &'a Points, expected: RollupKind, pick: F) -> Result<Vec<&'a T>, Error>
where
    F: Fn(&'a Rollup) -> Option<&'a T>,
{
    input
        .iter()
        .map(|p| {
            pick(&p.rollup).ok_or_else(|| Error::Mismatch {
                expected: expected,
                found: p.rollup.kind(),
            })
        })
        .collect()
}
