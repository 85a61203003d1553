//! Library level constants

/// Metadata key under which a locator's statistical type is recorded.
pub const STAT_TYPE_CACHE_KEY: &str = "statsd_type";

/// Default number of rollup worker threads.
pub const DEFAULT_MAX_ROLLUP_THREADS: usize = 20;

/// Default lifetime of a metadata cache entry, in seconds. Two days.
pub const DEFAULT_METADATA_CACHE_TTL_SECS: u64 = 48 * 60 * 60;

/// Default error bound used when building a fresh timer percentile estimator.
pub const DEFAULT_TIMER_ERROR: f64 = 0.001;

/// Name of the shared timer covering the read and compute stages of a task.
pub const CALC_TIMER: &str = "rollup.read_and_calculate";

/// Name of the shared timer covering the write stage of a task.
pub const WRITE_TIMER: &str = "rollup.write";

/// Name of the histogram recording how long jobs queued before running.
pub const WAIT_HISTOGRAM: &str = "rollup.wait";

/// Name of the timer covering a task from start to completion.
pub const EXECUTE_TIMER: &str = "rollup.execute";
