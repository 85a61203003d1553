//! Set rollups
//!
//! Sets are stored at full resolution only. Cardinality does not roll up
//! through a numeric pipeline so the rollup task skips set series entirely;
//! this type exists so stored sets can still be read and interpreted.

use std::collections::BTreeSet;

/// The distinct values seen for a set series.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct SetRollup {
    values: BTreeSet<i64>,
}

impl SetRollup {
    /// An empty set.
    pub fn new() -> SetRollup {
        SetRollup::default()
    }

    /// Record a value.
    pub fn insert(&mut self, value: i64) {
        self.values.insert(value);
    }

    /// Number of distinct values.
    pub fn cardinality(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_collapse() {
        let mut set = SetRollup::new();
        for v in &[1, 2, 2, 3, 1] {
            set.insert(*v);
        }
        assert_eq!(3, set.cardinality());
    }
}
