//! A module for caches
//!
//! Rollup tasks ask the same questions of slow backends over and over: every
//! task for a series needs that series' statistical type, and the answer
//! changes rarely if ever. `LoadingCache` memoizes such answers for a fixed
//! time-to-live and bounds how many loads may be in flight against the
//! backend at once.

mod metadata;

pub use self::metadata::{MetadataCache, MetadataLoader, TypeResolver};

use seahash::SeaHasher;
use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hash};
use std::sync::{Condvar, Mutex, RwLock};
use std::time::{Duration, Instant};

type HashMapSea<K, V> = HashMap<K, V, BuildHasherDefault<SeaHasher>>;

/// Fetches the value for a key on a cache miss.
pub trait Loader<K, V> {
    /// The failure of a load. Failures are handed to the caller and never
    /// cached.
    type Error;

    /// Load the current value for `key`.
    fn load(&self, key: &K) -> Result<V, Self::Error>;
}

struct Entry<V> {
    value: V,
    loaded_at: Instant,
}

struct Entries<K, V> {
    map: HashMapSea<K, Entry<V>>,
    swept_at: Instant,
}

struct Permits {
    total: usize,
    available: Mutex<usize>,
    freed: Condvar,
}

struct Permit<'a> {
    permits: &'a Permits,
}

impl Permits {
    fn new(total: usize) -> Permits {
        Permits {
            total: total,
            available: Mutex::new(total),
            freed: Condvar::new(),
        }
    }

    fn acquire(&self) -> Permit {
        let mut available = self.available.lock().unwrap_or_else(|e| e.into_inner());
        while *available == 0 {
            available = self.freed
                .wait(available)
                .unwrap_or_else(|e| e.into_inner());
        }
        *available -= 1;
        Permit { permits: self }
    }
}

impl<'a> Drop for Permit<'a> {
    fn drop(&mut self) {
        let mut available = self.permits
            .available
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *available += 1;
        self.permits.freed.notify_one();
    }
}

/// A read-through cache with a time-to-live
///
/// Values are loaded on first request through the `Loader` and served from
/// memory until `ttl` has passed since they were loaded. At most
/// `concurrency` loads run at once; a caller that had to wait for its turn
/// checks the cache again before loading, so a value another caller loaded
/// meanwhile is not fetched twice.
///
/// Expired entries are swept out on insert, at most once per `ttl`, so keys
/// that are never asked for again do not pile up.
pub struct LoadingCache<K, V, L> {
    loader: L,
    ttl: Duration,
    entries: RwLock<Entries<K, V>>,
    permits: Permits,
}

impl<K, V, L> LoadingCache<K, V, L>
where
    K: Eq + Hash + Clone,
    V: Clone,
    L: Loader<K, V>,
{
    /// Create a cache. A `concurrency` of zero is treated as one.
    pub fn new(loader: L, ttl: Duration, concurrency: usize) -> LoadingCache<K, V, L> {
        LoadingCache {
            loader: loader,
            ttl: ttl,
            entries: RwLock::new(Entries {
                map: HashMapSea::default(),
                swept_at: Instant::now(),
            }),
            permits: Permits::new(::std::cmp::max(1, concurrency)),
        }
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The most loads allowed in flight at once.
    pub fn concurrency(&self) -> usize {
        self.permits.total
    }

    fn fresh(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        match entries.map.get(key) {
            Some(entry) if entry.loaded_at.elapsed() < self.ttl => Some(entry.value.clone()),
            _ => None,
        }
    }

    /// Get the value for `key`, loading it if absent or expired.
    pub fn get(&self, key: &K) -> Result<V, L::Error> {
        if let Some(value) = self.fresh(key) {
            return Ok(value);
        }
        let _permit = self.permits.acquire();
        if let Some(value) = self.fresh(key) {
            return Ok(value);
        }
        let value = self.loader.load(key)?;
        self.put(key.clone(), value.clone());
        Ok(value)
    }

    /// Store `value` for `key`, resetting its time-to-live.
    pub fn put(&self, key: K, value: V) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.swept_at.elapsed() >= self.ttl {
            let ttl = self.ttl;
            let before = entries.map.len();
            entries.map.retain(|_, entry| entry.loaded_at.elapsed() < ttl);
            trace!("swept {} expired cache entries", before - entries.map.len());
            entries.swept_at = Instant::now();
        }
        entries.map.insert(
            key,
            Entry {
                value: value,
                loaded_at: Instant::now(),
            },
        );
    }

    /// Forget `key`. The next `get` will load it.
    pub fn invalidate(&self, key: &K) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.map.remove(key);
    }

    /// Number of entries held. Entries that expired since the last sweep
    /// are still counted.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .map
            .len()
    }

    /// Is the cache empty?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[derive(Default)]
    struct Counting {
        loads: AtomicUsize,
        fail: AtomicBool,
    }

    impl<'a> Loader<u64, String> for &'a Counting {
        type Error = String;

        fn load(&self, key: &u64) -> Result<String, String> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                Err("boom".into())
            } else {
                Ok(format!("value-{}", key))
            }
        }
    }

    #[test]
    fn hit_does_not_reload() {
        let loader = Counting::default();
        let cache = LoadingCache::new(&loader, Duration::from_secs(60), 1);
        assert_eq!(Ok("value-1".to_string()), cache.get(&1));
        assert_eq!(Ok("value-1".to_string()), cache.get(&1));
        assert_eq!(1, loader.loads.load(Ordering::SeqCst));
        assert_eq!(1, cache.len());
    }

    #[test]
    fn expired_entries_reload() {
        let loader = Counting::default();
        let cache = LoadingCache::new(&loader, Duration::from_millis(20), 1);
        cache.get(&7).unwrap();
        thread::sleep(Duration::from_millis(50));
        cache.get(&7).unwrap();
        assert_eq!(2, loader.loads.load(Ordering::SeqCst));
    }

    #[test]
    fn expired_entries_are_swept_on_insert() {
        let loader = Counting::default();
        let cache = LoadingCache::new(&loader, Duration::from_millis(20), 1);
        cache.get(&1).unwrap();
        cache.get(&2).unwrap();
        assert_eq!(2, cache.len());

        thread::sleep(Duration::from_millis(50));
        cache.get(&3).unwrap();
        assert_eq!(1, cache.len());
        assert_eq!(Ok("value-3".to_string()), cache.get(&3));
        assert_eq!(3, loader.loads.load(Ordering::SeqCst));
    }

    #[test]
    fn failures_are_not_cached() {
        let loader = Counting::default();
        loader.fail.store(true, Ordering::SeqCst);
        let cache = LoadingCache::new(&loader, Duration::from_secs(60), 1);
        assert_eq!(Err("boom".to_string()), cache.get(&3));
        assert!(cache.is_empty());

        loader.fail.store(false, Ordering::SeqCst);
        assert_eq!(Ok("value-3".to_string()), cache.get(&3));
        assert_eq!(2, loader.loads.load(Ordering::SeqCst));
    }

    #[test]
    fn put_and_invalidate() {
        let loader = Counting::default();
        let cache = LoadingCache::new(&loader, Duration::from_secs(60), 1);
        cache.put(2, "seeded".into());
        assert_eq!(Ok("seeded".to_string()), cache.get(&2));
        assert_eq!(0, loader.loads.load(Ordering::SeqCst));

        cache.invalidate(&2);
        assert_eq!(Ok("value-2".to_string()), cache.get(&2));
        assert_eq!(1, loader.loads.load(Ordering::SeqCst));
    }

    struct Slow {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Loader<u64, u64> for Arc<Slow> {
        type Error = ();

        fn load(&self, key: &u64) -> Result<u64, ()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(10));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(*key)
        }
    }

    #[test]
    fn loads_are_bounded() {
        let slow = Arc::new(Slow {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let cache = Arc::new(LoadingCache::new(slow.clone(), Duration::from_secs(60), 2));
        let mut joins = Vec::new();
        for key in 0..8 {
            let cache = Arc::clone(&cache);
            joins.push(thread::spawn(move || cache.get(&key)));
        }
        for (key, join) in joins.into_iter().enumerate() {
            assert_eq!(Ok(key as u64), join.join().unwrap());
        }
        assert!(slow.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(2, cache.concurrency());
        assert_eq!(8, cache.len());
    }
}
