//! Storage seams
//!
//! The rollup pipeline never talks to a storage engine directly. It reads
//! points through `Reader`, persists rollups through `Writer` and looks up
//! series metadata through `MetadataStore`. Points live in column families,
//! one per granularity and flavour: plain numeric series in the basic
//! families, typed (counter, timer, gauge, set) series in the preaggregated
//! ones.

mod memory;

pub use self::memory::{MemoryMetadata, MemoryStore};

use granularity::{Granularity, Range};
use locator::Locator;
use rollup::{Points, Rollup, RollupKind};
use serde_json;
use std::error;
use std::fmt;

/// A named storage collection for one granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnFamily {
    granularity: Granularity,
    preaggregated: bool,
}

impl ColumnFamily {
    /// The family holding plain numeric series at `granularity`.
    pub fn basic(granularity: Granularity) -> ColumnFamily {
        ColumnFamily {
            granularity: granularity,
            preaggregated: false,
        }
    }

    /// The family holding typed series at `granularity`.
    pub fn preaggregated(granularity: Granularity) -> ColumnFamily {
        ColumnFamily {
            granularity: granularity,
            preaggregated: true,
        }
    }

    /// The granularity of points in this family.
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Does this family hold typed series?
    pub fn is_preaggregated(&self) -> bool {
        self.preaggregated
    }

    /// The family's storage name, e.g. `metrics_5m` or
    /// `metrics_preaggregated_full`.
    pub fn name(&self) -> String {
        if self.preaggregated {
            format!("metrics_preaggregated_{}", self.granularity.short_name())
        } else {
            format!("metrics_{}", self.granularity.short_name())
        }
    }
}

impl fmt::Display for ColumnFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Failures reported by storage and metadata backends.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The backend could not be reached or timed out.
    Unavailable(String),
    /// Stored bytes could not be interpreted as the requested representation.
    Malformed(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            StoreError::Unavailable(ref msg) => write!(f, "backend unavailable: {}", msg),
            StoreError::Malformed(ref msg) => write!(f, "malformed stored value: {}", msg),
        }
    }
}

impl error::Error for StoreError {}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> StoreError {
        StoreError::Malformed(e.to_string())
    }
}

/// Reads points for rolling up
///
/// Both methods return the points stored for `locator` within `range` in
/// column family `cf`, decoding each as `kind`. A series with nothing stored
/// yields empty `Points`, not an error.
pub trait Reader {
    /// Read full resolution input: raw samples for plain series,
    /// preaggregated full resolution rollups for typed ones.
    fn read_raw(
        &self,
        locator: &Locator,
        range: &Range,
        cf: ColumnFamily,
        kind: RollupKind,
    ) -> Result<Points, StoreError>;

    /// Read rollups previously written at a coarser-than-full granularity.
    fn read_rollups(
        &self,
        locator: &Locator,
        range: &Range,
        cf: ColumnFamily,
        kind: RollupKind,
    ) -> Result<Points, StoreError>;
}

/// Persists rollups.
pub trait Writer {
    /// Store `rollup` for `locator` at `timestamp` in `cf`.
    fn insert_rollup(
        &self,
        locator: &Locator,
        timestamp: i64,
        rollup: &Rollup,
        cf: ColumnFamily,
    ) -> Result<(), StoreError>;
}

/// The backing store of per-series metadata.
pub trait MetadataStore {
    /// Load the value recorded under `key` for `locator`. `Ok(None)` if
    /// nothing was ever recorded.
    fn load(&self, locator: &Locator, key: &str) -> Result<Option<String>, StoreError>;
}
