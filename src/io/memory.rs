//! In-memory storage and metadata backends.
//!
//! Rollups are kept as serialized bytes, exactly as a real backend would
//! keep them, and decoded on read according to the representation the caller
//! asks for. Reading bytes as the wrong representation fails the same way a
//! corrupt column would.

use super::{ColumnFamily, MetadataStore, Reader, StoreError, Writer};
use granularity::{Granularity, Range};
use locator::Locator;
use rollup::{Point, Points, Rollup, RollupKind, SimpleNumber};
use seahash::SeaHasher;
use serde_json;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

type HashMapSea<K, V> = HashMap<K, V, BuildHasherDefault<SeaHasher>>;

type Column = BTreeMap<i64, Vec<u8>>;

fn poisoned() -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".into())
}

fn encode(rollup: &Rollup) -> Result<Vec<u8>, StoreError> {
    // JSON has no infinity or NaN, they would read back as null
    if !rollup.is_finite() {
        return Err(StoreError::Malformed(format!(
            "refusing to store non-finite {:?}",
            rollup.kind()
        )));
    }
    let bytes = match *rollup {
        Rollup::Simple(ref r) => serde_json::to_vec(r),
        Rollup::Basic(ref r) => serde_json::to_vec(r),
        Rollup::Counter(ref r) => serde_json::to_vec(r),
        Rollup::Timer(ref r) => serde_json::to_vec(r),
        Rollup::Gauge(ref r) => serde_json::to_vec(r),
        Rollup::Set(ref r) => serde_json::to_vec(r),
    }?;
    Ok(bytes)
}

fn decode(kind: RollupKind, bytes: &[u8]) -> Result<Rollup, StoreError> {
    Ok(match kind {
        RollupKind::SimpleNumber => Rollup::Simple(serde_json::from_slice(bytes)?),
        RollupKind::Basic => Rollup::Basic(serde_json::from_slice(bytes)?),
        RollupKind::Counter => Rollup::Counter(serde_json::from_slice(bytes)?),
        RollupKind::Timer => Rollup::Timer(serde_json::from_slice(bytes)?),
        RollupKind::Gauge => Rollup::Gauge(serde_json::from_slice(bytes)?),
        RollupKind::Set => Rollup::Set(serde_json::from_slice(bytes)?),
    })
}

/// A `Reader` and `Writer` backed by process memory.
#[derive(Default)]
pub struct MemoryStore {
    columns: RwLock<HashMapSea<(ColumnFamily, Locator), Column>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Record a raw sample for a plain numeric series at full resolution.
    pub fn insert_sample(
        &self,
        locator: &Locator,
        timestamp: i64,
        value: f64,
    ) -> Result<(), StoreError> {
        self.store(
            locator,
            timestamp,
            &Rollup::Simple(SimpleNumber::new(value)),
            ColumnFamily::basic(Granularity::Full),
        )
    }

    /// Number of read calls served.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of rollups written through `Writer`.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of points stored for `locator` in `cf`.
    pub fn len(&self, locator: &Locator, cf: ColumnFamily) -> usize {
        match self.columns.read() {
            Ok(columns) => columns
                .get(&(cf, locator.clone()))
                .map(|c| c.len())
                .unwrap_or(0),
            Err(_) => 0,
        }
    }

    /// Is nothing stored for `locator` in `cf`?
    pub fn is_empty(&self, locator: &Locator, cf: ColumnFamily) -> bool {
        self.len(locator, cf) == 0
    }

    fn store(
        &self,
        locator: &Locator,
        timestamp: i64,
        rollup: &Rollup,
        cf: ColumnFamily,
    ) -> Result<(), StoreError> {
        let bytes = encode(rollup)?;
        let mut columns = self.columns.write().map_err(|_| poisoned())?;
        columns
            .entry((cf, locator.clone()))
            .or_insert_with(BTreeMap::new)
            .insert(timestamp, bytes);
        Ok(())
    }

    fn read(
        &self,
        locator: &Locator,
        range: &Range,
        cf: ColumnFamily,
        kind: RollupKind,
    ) -> Result<Points, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let columns = self.columns.read().map_err(|_| poisoned())?;
        let column = match columns.get(&(cf, locator.clone())) {
            Some(column) => column,
            None => return Ok(Points::new(*range)),
        };
        let mut points = Vec::new();
        for (ts, bytes) in column.range(range.start()..range.stop()) {
            points.push(Point {
                timestamp: *ts,
                rollup: decode(kind, bytes)?,
            });
        }
        trace!(
            "read {} points for {} from {} in {}",
            points.len(),
            locator,
            cf,
            range
        );
        Ok(Points::from_vec(*range, points))
    }
}

impl Reader for MemoryStore {
    fn read_raw(
        &self,
        locator: &Locator,
        range: &Range,
        cf: ColumnFamily,
        kind: RollupKind,
    ) -> Result<Points, StoreError> {
        self.read(locator, range, cf, kind)
    }

    fn read_rollups(
        &self,
        locator: &Locator,
        range: &Range,
        cf: ColumnFamily,
        kind: RollupKind,
    ) -> Result<Points, StoreError> {
        self.read(locator, range, cf, kind)
    }
}

impl Writer for MemoryStore {
    fn insert_rollup(
        &self,
        locator: &Locator,
        timestamp: i64,
        rollup: &Rollup,
        cf: ColumnFamily,
    ) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.store(locator, timestamp, rollup, cf)
    }
}

/// A `MetadataStore` backed by process memory.
#[derive(Default)]
pub struct MemoryMetadata {
    records: RwLock<HashMapSea<(Locator, String), String>>,
    loads: AtomicUsize,
}

impl MemoryMetadata {
    /// Create an empty metadata store.
    pub fn new() -> MemoryMetadata {
        MemoryMetadata::default()
    }

    /// Record `value` under `key` for `locator`.
    pub fn set<S>(&self, locator: &Locator, key: S, value: S) -> Result<(), StoreError>
    where
        S: Into<String>,
    {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        records.insert((locator.clone(), key.into()), value.into());
        Ok(())
    }

    /// Number of loads served.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl MetadataStore for MemoryMetadata {
    fn load(&self, locator: &Locator, key: &str) -> Result<Option<String>, StoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(&(locator.clone(), key.to_string())).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollup::{basic, BasicRollup};

    #[test]
    fn read_is_half_open() {
        let store = MemoryStore::new();
        let locator = Locator::new("t", "m");
        for ts in 0..10 {
            store.insert_sample(&locator, ts, ts as f64).unwrap();
        }
        let points = store
            .read_raw(
                &locator,
                &Range::new(2, 5),
                ColumnFamily::basic(Granularity::Full),
                RollupKind::SimpleNumber,
            )
            .unwrap();
        let ts: Vec<i64> = points.iter().map(|p| p.timestamp).collect();
        assert_eq!(vec![2, 3, 4], ts);
        assert_eq!(1, store.reads());
    }

    #[test]
    fn missing_series_reads_empty() {
        let store = MemoryStore::new();
        let points = store
            .read_rollups(
                &Locator::new("t", "nothing"),
                &Range::new(0, 300_000),
                ColumnFamily::basic(Granularity::Min5),
                RollupKind::Basic,
            )
            .unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn digest_survives_write_and_read() {
        let store = MemoryStore::new();
        let locator = Locator::new("t", "m");
        let cf = ColumnFamily::basic(Granularity::Min5);
        let digest = basic::from_raw(vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        store
            .insert_rollup(&locator, 0, &Rollup::Basic(digest.clone()), cf)
            .unwrap();
        assert_eq!(1, store.writes());

        let points = store
            .read_rollups(&locator, &Range::new(0, 1_200_000), cf, RollupKind::Basic)
            .unwrap();
        assert_eq!(1, points.len());
        let read: Vec<&BasicRollup> = points
            .iter()
            .filter_map(|p| match p.rollup {
                Rollup::Basic(ref b) => Some(b),
                _ => None,
            })
            .collect();
        assert_eq!(vec![&digest], read);
    }

    #[test]
    fn wrong_representation_is_malformed() {
        let store = MemoryStore::new();
        let locator = Locator::new("t", "m");
        store.insert_sample(&locator, 1, 1.0).unwrap();
        let res = store.read_raw(
            &locator,
            &Range::new(0, 10),
            ColumnFamily::basic(Granularity::Full),
            RollupKind::Counter,
        );
        match res {
            Err(StoreError::Malformed(_)) => {}
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn non_finite_rollups_are_refused() {
        let store = MemoryStore::new();
        let locator = Locator::new("t", "m");
        let mut digest = BasicRollup::from_sample(1e308);
        digest.insert(1e308);
        let res = store.insert_rollup(
            &locator,
            0,
            &Rollup::Basic(digest),
            ColumnFamily::basic(Granularity::Min5),
        );
        match res {
            Err(StoreError::Malformed(_)) => {}
            other => panic!("expected malformed, got {:?}", other),
        }
        assert!(store.is_empty(&locator, ColumnFamily::basic(Granularity::Min5)));
    }

    #[test]
    fn metadata_absent_is_none() {
        let meta = MemoryMetadata::new();
        let locator = Locator::new("t", "m");
        assert_eq!(Ok(None), meta.load(&locator, "statsd_type"));
        meta.set(&locator, "statsd_type", "timer").unwrap();
        assert_eq!(Ok(Some("timer".to_string())), meta.load(&locator, "statsd_type"));
        assert_eq!(2, meta.loads());
    }
}
