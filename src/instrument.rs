//! Self-telemetry
//!
//! Rollup tasks report how long they waited in the queue and how long each of
//! their stages took. Reporting never fails and never blocks a task for longer
//! than a short mutex hold: a poisoned histogram silently drops the update.
//!
//! Named instruments are registered process-wide and shared, so every task
//! updating "rollup.write" updates the same timer.

use constants;
use quantiles::ckms::CKMS;
use seahash::SeaHasher;
use std::collections::HashMap;
use std::hash::BuildHasherDefault;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use time;

type HashMapSea<K, V> = HashMap<K, V, BuildHasherDefault<SeaHasher>>;

lazy_static! {
    static ref HISTOGRAMS: Mutex<HashMapSea<String, Arc<Histogram>>> = Mutex::default();
    static ref TIMERS: Mutex<HashMapSea<String, Arc<Timer>>> = Mutex::default();
}

/// The process-wide histogram called `name`, created on first use.
pub fn histogram(name: &str) -> Arc<Histogram> {
    let mut histograms = HISTOGRAMS.lock().unwrap_or_else(|e| e.into_inner());
    Arc::clone(
        histograms
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Histogram::new())),
    )
}

/// The process-wide timer called `name`, created on first use.
pub fn timer(name: &str) -> Arc<Timer> {
    let mut timers = TIMERS.lock().unwrap_or_else(|e| e.into_inner());
    Arc::clone(
        timers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Timer::new())),
    )
}

struct Summary {
    count: u64,
    sum: f64,
    quantiles: CKMS<f64>,
}

/// A distribution of observed values with approximate quantiles.
pub struct Histogram {
    inner: Mutex<Summary>,
}

impl Default for Histogram {
    fn default() -> Histogram {
        Histogram::new()
    }
}

impl Histogram {
    /// An empty histogram.
    pub fn new() -> Histogram {
        Histogram {
            inner: Mutex::new(Summary {
                count: 0,
                sum: 0.0,
                quantiles: CKMS::new(constants::DEFAULT_TIMER_ERROR),
            }),
        }
    }

    /// Record an observation.
    pub fn update(&self, value: f64) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.count += 1;
            inner.sum += value;
            inner.quantiles.insert(value);
        }
    }

    /// Number of observations.
    pub fn count(&self) -> u64 {
        self.inner.lock().map(|i| i.count).unwrap_or(0)
    }

    /// Sum of observations.
    pub fn sum(&self) -> f64 {
        self.inner.lock().map(|i| i.sum).unwrap_or(0.0)
    }

    /// Approximate value at quantile `q`. `None` if nothing was observed.
    pub fn query(&self, q: f64) -> Option<f64> {
        self.inner
            .lock()
            .ok()
            .and_then(|i| i.quantiles.query(q).map(|x| x.1))
    }
}

/// A histogram of durations in milliseconds.
#[derive(Default)]
pub struct Timer {
    durations: Histogram,
}

impl Timer {
    /// A timer with nothing recorded.
    pub fn new() -> Timer {
        Timer::default()
    }

    /// Open a timing scope. The elapsed time is recorded when the returned
    /// context is stopped or dropped.
    pub fn time(&self) -> TimerContext {
        TimerContext {
            timer: self,
            start: Instant::now(),
            live: true,
        }
    }

    /// Number of completed scopes.
    pub fn count(&self) -> u64 {
        self.durations.count()
    }

    /// The recorded durations.
    pub fn durations(&self) -> &Histogram {
        &self.durations
    }
}

/// An open timing scope.
pub struct TimerContext<'a> {
    timer: &'a Timer,
    start: Instant,
    live: bool,
}

impl<'a> TimerContext<'a> {
    /// Close the scope, recording the elapsed milliseconds.
    pub fn stop(mut self) -> f64 {
        self.record()
    }

    /// Close the scope without recording anything.
    pub fn discard(mut self) {
        self.live = false;
    }

    fn record(&mut self) -> f64 {
        let elapsed = time::elapsed_ms(self.start);
        if self.live {
            self.live = false;
            self.timer.durations.update(elapsed);
        }
        elapsed
    }
}

impl<'a> Drop for TimerContext<'a> {
    fn drop(&mut self) {
        self.record();
    }
}
