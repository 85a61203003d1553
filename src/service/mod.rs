//! Scheduling and running rollup tasks
//!
//! `RollupTask` is the unit of work. `RollupService` owns a pool of workers
//! and turns "roll these locators up over this interval" into one task per
//! locator per coarser bucket, waiting on an `ExecutionContext` for the
//! generation to finish.

mod context;
mod pool;
mod task;

pub use self::context::ExecutionContext;
pub use self::pool::WorkerPool;
pub use self::task::{RollupJob, RollupTask};

use cache::TypeResolver;
use config::RollupConfig;
use constants;
use error::Error;
use granularity::{Granularity, Range};
use instrument::{self, Histogram, Timer};
use io::{Reader, Writer};
use locator::Locator;
use std::io;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

/// How a rollup task ended.
#[derive(Debug)]
pub enum Outcome {
    /// A rollup was computed and persisted.
    Written,
    /// The series is a set. Nothing was read or written.
    ShortCircuited,
    /// There were no points to roll up. Nothing was written.
    Empty,
    /// The task failed. The error has already been logged.
    Failed(Error),
}

impl Outcome {
    /// Did the task fail?
    pub fn is_failure(&self) -> bool {
        match *self {
            Outcome::Failed(_) => true,
            _ => false,
        }
    }
}

/// Wall-clock time of the most recent successful rollup write, shared
/// between tasks and whoever reports liveness.
#[derive(Debug, Clone, Default)]
pub struct LastRollupTime {
    millis: Arc<AtomicI64>,
}

impl LastRollupTime {
    /// Nothing written yet.
    pub fn new() -> LastRollupTime {
        LastRollupTime::default()
    }

    /// Record a write at `millis` since the epoch.
    pub fn mark(&self, millis: i64) {
        self.millis.store(millis, Ordering::Relaxed);
    }

    /// The last recorded write, if any.
    pub fn get(&self) -> Option<i64> {
        match self.millis.load(Ordering::Relaxed) {
            0 => None,
            millis => Some(millis),
        }
    }
}

/// The collaborators every rollup task works through.
pub struct Pipeline {
    resolver: TypeResolver,
    reader: Arc<dyn Reader + Send + Sync>,
    writer: Arc<dyn Writer + Send + Sync>,
    calc_timer: Arc<Timer>,
    write_timer: Arc<Timer>,
    last_rollup: LastRollupTime,
}

impl Pipeline {
    /// Assemble a pipeline reporting to the process-wide calc and write
    /// timers.
    pub fn new(
        resolver: TypeResolver,
        reader: Arc<dyn Reader + Send + Sync>,
        writer: Arc<dyn Writer + Send + Sync>,
    ) -> Pipeline {
        Pipeline {
            resolver: resolver,
            reader: reader,
            writer: writer,
            calc_timer: instrument::timer(constants::CALC_TIMER),
            write_timer: instrument::timer(constants::WRITE_TIMER),
            last_rollup: LastRollupTime::new(),
        }
    }

    /// Report to the given timers instead.
    pub fn with_timers(mut self, calc: Arc<Timer>, write: Arc<Timer>) -> Pipeline {
        self.calc_timer = calc;
        self.write_timer = write;
        self
    }

    /// Publish successful writes to `last_rollup`.
    pub fn with_last_rollup(mut self, last_rollup: LastRollupTime) -> Pipeline {
        self.last_rollup = last_rollup;
        self
    }

    /// Resolves series types.
    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    /// Reads input points.
    pub fn reader(&self) -> &dyn Reader {
        &*self.reader
    }

    /// Persists rollups.
    pub fn writer(&self) -> &dyn Writer {
        &*self.writer
    }

    /// Times the read and compute stages.
    pub fn calc_timer(&self) -> &Timer {
        &self.calc_timer
    }

    /// Times the write stage.
    pub fn write_timer(&self) -> &Timer {
        &self.write_timer
    }

    /// Time of the most recent successful write.
    pub fn last_rollup(&self) -> &LastRollupTime {
        &self.last_rollup
    }
}

/// Tally of one generation of tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// The granularity rolled up from.
    pub source: Granularity,
    /// Tasks accepted by the pool.
    pub submitted: usize,
    /// Tasks that persisted a rollup.
    pub written: usize,
    /// Set series skipped.
    pub short_circuited: usize,
    /// Tasks that found nothing to roll up.
    pub empty: usize,
    /// Tasks that failed.
    pub failed: usize,
}

impl Report {
    /// An empty tally for `source`.
    pub fn new(source: Granularity) -> Report {
        Report {
            source: source,
            submitted: 0,
            written: 0,
            short_circuited: 0,
            empty: 0,
            failed: 0,
        }
    }

    /// Count `outcome`.
    pub fn record(&mut self, outcome: &Outcome) {
        match *outcome {
            Outcome::Written => self.written += 1,
            Outcome::ShortCircuited => self.short_circuited += 1,
            Outcome::Empty => self.empty += 1,
            Outcome::Failed(_) => self.failed += 1,
        }
    }

    /// Tasks that finished without reporting an outcome, having panicked.
    pub fn abandoned(&self) -> usize {
        self.submitted
            .saturating_sub(self.written + self.short_circuited + self.empty + self.failed)
    }
}

/// Runs rollup tasks on a bounded pool of workers.
pub struct RollupService {
    config: RollupConfig,
    pipeline: Arc<Pipeline>,
    pool: WorkerPool,
    wait_histogram: Arc<Histogram>,
    execute_timer: Arc<Timer>,
}

impl RollupService {
    /// Start `config.max_rollup_threads` workers running tasks through
    /// `pipeline`
    ///
    /// Build the pipeline's resolver with `TypeResolver::from_config` so the
    /// metadata cache matches `config`. A resolver that bounds metadata
    /// loads differently from the worker count, or ages records on a
    /// different TTL, is logged.
    pub fn new(config: RollupConfig, pipeline: Pipeline) -> io::Result<RollupService> {
        let cache = pipeline.resolver().cache();
        if cache.concurrency() != config.max_rollup_threads {
            warn!(
                "metadata loads bounded at {} with {} rollup threads",
                cache.concurrency(),
                config.max_rollup_threads
            );
        }
        if cache.ttl() != config.metadata_cache_ttl {
            warn!(
                "metadata cached for {:?} but configured for {:?}",
                cache.ttl(),
                config.metadata_cache_ttl
            );
        }
        let pool = WorkerPool::new("rollup", config.max_rollup_threads)?;
        info!("rollup service started with {} threads", config.max_rollup_threads);
        Ok(RollupService {
            config: config,
            pipeline: Arc::new(pipeline),
            pool: pool,
            wait_histogram: instrument::histogram(constants::WAIT_HISTOGRAM),
            execute_timer: instrument::timer(constants::EXECUTE_TIMER),
        })
    }

    /// Report job waits and executions to the given instruments instead of
    /// the process-wide ones.
    pub fn with_instruments(mut self, wait: Arc<Histogram>, execute: Arc<Timer>) -> RollupService {
        self.wait_histogram = wait;
        self.execute_timer = execute;
        self
    }

    /// The service's configuration.
    pub fn config(&self) -> &RollupConfig {
        &self.config
    }

    /// The pipeline tasks run through.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// How long jobs waited in the queue, in milliseconds.
    pub fn wait_histogram(&self) -> &Histogram {
        &self.wait_histogram
    }

    /// How long jobs took to run.
    pub fn execute_timer(&self) -> &Timer {
        &self.execute_timer
    }

    /// Queue `job` as part of the generation tracked by `context`. Its
    /// outcome is sent on `outcomes`
    ///
    /// The context is incremented for the job and decremented again if the
    /// pool refuses it.
    pub fn submit(
        &self,
        context: &Arc<ExecutionContext>,
        job: RollupJob,
        outcomes: &mpsc::Sender<Outcome>,
    ) -> Result<(), Error> {
        context.increment();
        let task = RollupTask::new(Arc::clone(context), job, Arc::clone(&self.pipeline));
        let outcomes = outcomes.clone();
        let res = self.pool.execute(move || {
            let _ = outcomes.send(task.run());
        });
        if let Err(e) = res {
            context.decrement();
            return Err(e);
        }
        Ok(())
    }

    /// Roll every locator up from `source` over each `source.coarser()`
    /// bucket overlapping `[from, to)` and wait for the generation to finish.
    pub fn roll_interval(
        &self,
        locators: &[Locator],
        source: Granularity,
        from: i64,
        to: i64,
    ) -> Result<Report, Error> {
        let coarser = source.coarser()?;
        let context = Arc::new(ExecutionContext::new(0));
        let (sender, receiver) = mpsc::channel();
        let mut report = Report::new(source);
        let mut refused = None;

        'submit: for range in Range::ranges_for_interval(coarser, from, to) {
            for locator in locators {
                let job = RollupJob::new(locator.clone(), source, range).with_instruments(
                    Arc::clone(&self.wait_histogram),
                    Arc::clone(&self.execute_timer),
                );
                if let Err(e) = self.submit(&context, job, &sender) {
                    refused = Some(e);
                    break 'submit;
                }
                report.submitted += 1;
            }
        }
        drop(sender);

        for outcome in receiver.iter() {
            report.record(&outcome);
        }
        context.wait();

        if let Some(e) = refused {
            return Err(e);
        }
        info!(
            "rolled up {} locators from {} over [{}, {}): \
             {} written, {} skipped, {} empty, {} failed",
            locators.len(),
            source,
            from,
            to,
            report.written,
            report.short_circuited,
            report.empty,
            report.failed
        );
        Ok(report)
    }

    /// Rebuild every level of rollups over `[from, to)`, finest first. Each
    /// level is a generation of its own and starts only once the previous
    /// one has finished.
    pub fn reroll(&self, locators: &[Locator], from: i64, to: i64) -> Result<Vec<Report>, Error> {
        let mut reports = Vec::new();
        for granularity in Granularity::all() {
            if *granularity == Granularity::coarsest() {
                break;
            }
            reports.push(self.roll_interval(locators, *granularity, from, to)?);
        }
        Ok(reports)
    }

    /// Stop accepting work and wait for queued tasks to finish.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}
