//! Gauge rollups.
//!
//! Gauges are instantaneous state, not additive quantities. A gauge rollup
//! keeps the latest observed value alongside the usual digest.

use rollup::basic::BasicRollup;

/// Digest and latest value of a gauge.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GaugeRollup {
    stats: BasicRollup,
    latest_timestamp: i64,
    latest: f64,
}

impl GaugeRollup {
    /// A gauge observed once, at `timestamp`.
    pub fn from_sample(timestamp: i64, value: f64) -> GaugeRollup {
        GaugeRollup {
            stats: BasicRollup::from_sample(value),
            latest_timestamp: timestamp,
            latest: value,
        }
    }

    /// Fold in one more observation.
    pub fn insert(&mut self, timestamp: i64, value: f64) {
        self.stats.insert(value);
        if timestamp >= self.latest_timestamp {
            self.latest_timestamp = timestamp;
            self.latest = value;
        }
    }

    /// The most recently observed value.
    pub fn latest(&self) -> f64 {
        self.latest
    }

    /// When the most recent value was observed.
    pub fn latest_timestamp(&self) -> i64 {
        self.latest_timestamp
    }

    /// Are the digest and latest value finite?
    pub fn is_finite(&self) -> bool {
        self.stats.is_finite() && self.latest.is_finite()
    }

    /// Digest of all observed values.
    pub fn stats(&self) -> &BasicRollup {
        &self.stats
    }
}

/// Merge gauges. The latest value is taken from whichever input saw the
/// most recent observation; on a tie the later input wins.
pub fn from_gauges<'a, I>(gauges: I) -> Option<GaugeRollup>
where
    I: IntoIterator<Item = &'a GaugeRollup>,
{
    let mut gauges = gauges.into_iter();
    let mut merged = gauges.next()?.clone();
    for gauge in gauges {
        merged.stats.merge(&gauge.stats);
        if gauge.latest_timestamp >= merged.latest_timestamp {
            merged.latest_timestamp = gauge.latest_timestamp;
            merged.latest = gauge.latest;
        }
    }
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_follows_timestamp_not_input_order() {
        let gauges = vec![
            GaugeRollup::from_sample(300, 3.0),
            GaugeRollup::from_sample(100, 1.0),
            GaugeRollup::from_sample(200, 2.0),
        ];
        let merged = from_gauges(gauges.iter()).unwrap();
        assert_eq!(3.0, merged.latest());
        assert_eq!(300, merged.latest_timestamp());
        assert_eq!(3, merged.stats().count());
        assert_eq!(1.0, merged.stats().min());
        assert_eq!(2.0, merged.stats().mean());
    }

    #[test]
    fn nested_merge_matches_direct() {
        let gauges: Vec<GaugeRollup> = (0..9)
            .map(|i| GaugeRollup::from_sample(i64::from(i) * 10, f64::from(i % 4)))
            .collect();
        let direct = from_gauges(gauges.iter()).unwrap();
        let partials: Vec<GaugeRollup> = gauges
            .chunks(4)
            .map(|c| from_gauges(c.iter()).unwrap())
            .collect();
        let nested = from_gauges(partials.iter()).unwrap();
        assert_eq!(direct.latest(), nested.latest());
        assert_eq!(direct.latest_timestamp(), nested.latest_timestamp());
        assert_eq!(direct.stats().count(), nested.stats().count());
        assert_eq!(direct.stats().sum(), nested.stats().sum());
        assert_eq!(direct.stats().max(), nested.stats().max());
    }

    #[test]
    fn insert_tracks_latest() {
        let mut gauge = GaugeRollup::from_sample(10, 1.0);
        gauge.insert(5, 9.0);
        assert_eq!(1.0, gauge.latest());
        gauge.insert(20, 4.0);
        assert_eq!(4.0, gauge.latest());
        assert_eq!(9.0, gauge.stats().max());
    }
}
