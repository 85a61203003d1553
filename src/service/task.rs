//! The rollup task
//!
//! A task rolls one locator up from one granularity over one range:
//!
//! ```text
//! queued -> resolving type -> short-circuited              -> completed
//!                          \-> reading -> computing -> writing -> completed
//! ```
//!
//! There is no retry. Whatever happens, including a panic somewhere below,
//! the task's execution context is decremented exactly once.

use constants;
use error::Error;
use granularity::{Granularity, Range};
use instrument::{self, Histogram, Timer, TimerContext};
use locator::Locator;
use rollup::{aggregator_for, destination_column_family, representation_of,
             source_column_family, StatType};
use service::{ExecutionContext, Outcome, Pipeline};
use std::sync::Arc;
use time;

/// What to roll up, and the instruments to report it to.
#[derive(Clone)]
pub struct RollupJob {
    locator: Locator,
    granularity: Granularity,
    range: Range,
    wait_start: i64,
    wait_histogram: Arc<Histogram>,
    execute_timer: Arc<Timer>,
}

impl RollupJob {
    /// Roll `locator` up from `granularity` over `range`. The job starts
    /// waiting now and reports to the process-wide wait histogram and
    /// execute timer.
    pub fn new(locator: Locator, granularity: Granularity, range: Range) -> RollupJob {
        RollupJob {
            locator: locator,
            granularity: granularity,
            range: range,
            wait_start: time::now_ms(),
            wait_histogram: instrument::histogram(constants::WAIT_HISTOGRAM),
            execute_timer: instrument::timer(constants::EXECUTE_TIMER),
        }
    }

    /// Report to the given instruments instead of the process-wide ones.
    pub fn with_instruments(mut self, wait: Arc<Histogram>, execute: Arc<Timer>) -> RollupJob {
        self.wait_histogram = wait;
        self.execute_timer = execute;
        self
    }

    /// Override when the job started waiting, in milliseconds since the
    /// epoch.
    pub fn waiting_since(mut self, wait_start: i64) -> RollupJob {
        self.wait_start = wait_start;
        self
    }

    /// The series rolled up.
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// The granularity rolled up from.
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// The range rolled up, one bucket of the next coarser granularity.
    pub fn range(&self) -> &Range {
        &self.range
    }
}

struct Completion<'a> {
    context: &'a ExecutionContext,
    _execute: TimerContext<'a>,
}

impl<'a> Drop for Completion<'a> {
    fn drop(&mut self) {
        self.context.decrement();
    }
}

/// One unit of rollup work.
pub struct RollupTask {
    context: Arc<ExecutionContext>,
    job: RollupJob,
    pipeline: Arc<Pipeline>,
}

impl RollupTask {
    /// A task that will decrement `context` when done.
    pub fn new(
        context: Arc<ExecutionContext>,
        job: RollupJob,
        pipeline: Arc<Pipeline>,
    ) -> RollupTask {
        RollupTask {
            context: context,
            job: job,
            pipeline: pipeline,
        }
    }

    /// Run the task to completion
    ///
    /// Failures are logged here and handed back as `Outcome::Failed`, they
    /// never escape as a panic or an error.
    pub fn run(self) -> Outcome {
        let waited = (time::now_ms() - self.job.wait_start).max(0);
        self.job.wait_histogram.update(waited as f64);

        let _completion = Completion {
            context: &*self.context,
            _execute: self.job.execute_timer.time(),
        };
        debug!(
            "rolling up {} from {} over {}",
            self.job.locator, self.job.granularity, self.job.range
        );

        match self.execute() {
            Ok(outcome) => outcome,
            Err(e) => {
                if e.is_defect() {
                    error!(
                        "[INTERNAL ERROR] rolling up {} from {} over {}: {}",
                        self.job.locator, self.job.granularity, self.job.range, e
                    );
                } else {
                    error!(
                        "{} failure rolling up {} from {} over {}: {}",
                        e.class(),
                        self.job.locator,
                        self.job.granularity,
                        self.job.range,
                        e
                    );
                }
                Outcome::Failed(e)
            }
        }
    }

    fn execute(&self) -> Result<Outcome, Error> {
        let pipeline = &*self.pipeline;
        let locator = &self.job.locator;
        let granularity = self.job.granularity;
        let range = &self.job.range;

        let calc = pipeline.calc_timer().time();
        let stat_type = pipeline
            .resolver()
            .resolve(locator)
            .map_err(Error::TypeResolution)?;
        if stat_type == StatType::Set {
            calc.discard();
            trace!("skipping set {}", locator);
            return Ok(Outcome::ShortCircuited);
        }

        let kind = representation_of(stat_type, granularity);
        let source = source_column_family(stat_type, granularity);
        let points = if granularity.is_full() {
            pipeline.reader().read_raw(locator, range, source, kind)
        } else {
            pipeline.reader().read_rollups(locator, range, source, kind)
        }.map_err(Error::Read)?;

        let destination = destination_column_family(stat_type, granularity)?;
        if points.is_empty() {
            warn!(
                "no points for {} in {} over {}, nothing rolled up",
                locator, source, range
            );
            return Ok(Outcome::Empty);
        }
        let rollup = aggregator_for(stat_type, granularity)?.compute(&points)?;
        calc.stop();

        {
            let _write = pipeline.write_timer().time();
            pipeline
                .writer()
                .insert_rollup(locator, range.start(), &rollup, destination)
                .map_err(Error::Write)?;
        }
        pipeline.last_rollup().mark(time::now_ms());
        Ok(Outcome::Written)
    }
}
