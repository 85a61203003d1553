//! The generic numeric digest and its two aggregations.
//!
//! `from_raw` summarizes raw samples, `from_rollups` merges digests. Merging
//! is associative: a digest of digests agrees with the digest of all the
//! underlying samples on count, sum, min and max exactly and on variance up
//! to floating point error.

/// Count, sum, extrema and variance of a run of numbers.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BasicRollup {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    // sum of squared deviations from the mean
    m2: f64,
}

impl BasicRollup {
    /// The digest of a single sample.
    pub fn from_sample(value: f64) -> BasicRollup {
        BasicRollup {
            count: 1,
            sum: value,
            min: value,
            max: value,
            m2: 0.0,
        }
    }

    /// Number of samples summarized.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sum of all samples.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Smallest sample.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Largest sample.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Arithmetic mean of the samples.
    pub fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }

    /// Population variance of the samples.
    pub fn variance(&self) -> f64 {
        self.m2 / self.count as f64
    }

    /// Are all fields finite? Overflowing sums and NaN samples are not.
    pub fn is_finite(&self) -> bool {
        self.sum.is_finite() && self.min.is_finite() && self.max.is_finite() && self.m2.is_finite()
    }

    /// Fold one more sample into the digest.
    pub fn insert(&mut self, value: f64) {
        let prior_mean = self.mean();
        self.count += 1;
        self.sum += value;
        let delta = value - prior_mean;
        self.m2 += delta * (value - self.mean());
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    /// Fold another digest into this one.
    pub fn merge(&mut self, other: &BasicRollup) {
        let lhs_n = self.count as f64;
        let rhs_n = other.count as f64;
        let delta = other.mean() - self.mean();
        self.m2 += other.m2 + delta * delta * (lhs_n * rhs_n) / (lhs_n + rhs_n);
        self.count += other.count;
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

/// Summarize raw samples. `None` if there are none.
///
/// # Examples
///
/// ```
/// use strata::rollup::basic;
///
/// let digest = basic::from_raw(vec![1.0, 2.0, 3.0, 4.0]).unwrap();
/// assert_eq!(4, digest.count());
/// assert_eq!(10.0, digest.sum());
/// assert_eq!(2.5, digest.mean());
/// ```
pub fn from_raw<I>(samples: I) -> Option<BasicRollup>
where
    I: IntoIterator<Item = f64>,
{
    let mut samples = samples.into_iter();
    let mut digest = BasicRollup::from_sample(samples.next()?);
    for value in samples {
        digest.insert(value);
    }
    Some(digest)
}

/// Merge earlier digests. `None` if there are none. A single digest merges
/// to itself.
pub fn from_rollups<'a, I>(digests: I) -> Option<BasicRollup>
where
    I: IntoIterator<Item = &'a BasicRollup>,
{
    let mut digests = digests.into_iter();
    let mut merged = digests.next()?.clone();
    for digest in digests {
        merged.merge(digest);
    }
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{QuickCheck, TestResult};

    fn close(lhs: f64, rhs: f64) -> bool {
        (lhs - rhs).abs() <= 1e-6 * (1.0 + lhs.abs().max(rhs.abs()))
    }

    #[test]
    fn raw_digest_of_one_to_four() {
        let digest = from_raw(vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(4, digest.count());
        assert_eq!(10.0, digest.sum());
        assert_eq!(1.0, digest.min());
        assert_eq!(4.0, digest.max());
        assert_eq!(2.5, digest.mean());
        assert_eq!(1.25, digest.variance());
    }

    #[test]
    fn single_sample_is_trivial() {
        let digest = from_raw(vec![7.5]).unwrap();
        assert_eq!(BasicRollup::from_sample(7.5), digest);
        assert_eq!(0.0, digest.variance());
    }

    #[test]
    fn empty_input_has_no_digest() {
        assert!(from_raw(Vec::new()).is_none());
        assert!(from_rollups(Vec::new()).is_none());
    }

    #[test]
    fn singleton_merge_is_identity() {
        let digest = from_raw(vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(Some(digest.clone()), from_rollups(vec![&digest]));
    }

    #[test]
    fn merge_associativity() {
        fn inner(lhs: Vec<i16>, rhs: Vec<i16>) -> TestResult {
            if lhs.is_empty() || rhs.is_empty() {
                return TestResult::discard();
            }
            let lhs: Vec<f64> = lhs.into_iter().map(f64::from).collect();
            let rhs: Vec<f64> = rhs.into_iter().map(f64::from).collect();

            let direct = from_raw(lhs.iter().chain(rhs.iter()).cloned()).unwrap();
            let halves = vec![
                from_raw(lhs.iter().cloned()).unwrap(),
                from_raw(rhs.iter().cloned()).unwrap(),
            ];
            let merged = from_rollups(halves.iter()).unwrap();

            assert_eq!(direct.count(), merged.count());
            assert_eq!(direct.sum(), merged.sum());
            assert_eq!(direct.min(), merged.min());
            assert_eq!(direct.max(), merged.max());
            assert!(
                close(direct.variance(), merged.variance()),
                "{:?} != {:?}",
                direct,
                merged
            );
            TestResult::passed()
        }
        QuickCheck::new()
            .tests(1000)
            .max_tests(10000)
            .quickcheck(inner as fn(Vec<i16>, Vec<i16>) -> TestResult);
    }

    #[test]
    fn two_level_merge_matches_direct() {
        fn inner(samples: Vec<i16>, cut: usize) -> TestResult {
            if samples.len() < 4 {
                return TestResult::discard();
            }
            let samples: Vec<f64> = samples.into_iter().map(f64::from).collect();
            let cut = 1 + cut % (samples.len() - 2);
            let first: Vec<BasicRollup> = samples[..cut]
                .chunks(2)
                .map(|c| from_raw(c.iter().cloned()).unwrap())
                .collect();
            let second: Vec<BasicRollup> = samples[cut..]
                .chunks(3)
                .map(|c| from_raw(c.iter().cloned()).unwrap())
                .collect();
            let level_one = vec![
                from_rollups(first.iter()).unwrap(),
                from_rollups(second.iter()).unwrap(),
            ];
            let level_two = from_rollups(level_one.iter()).unwrap();
            let direct = from_raw(samples.iter().cloned()).unwrap();

            assert_eq!(direct.count(), level_two.count());
            assert_eq!(direct.sum(), level_two.sum());
            assert_eq!(direct.min(), level_two.min());
            assert_eq!(direct.max(), level_two.max());
            assert!(close(direct.variance(), level_two.variance()));
            TestResult::passed()
        }
        QuickCheck::new()
            .tests(500)
            .max_tests(5000)
            .quickcheck(inner as fn(Vec<i16>, usize) -> TestResult);
    }
}
