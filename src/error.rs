//! Crate level error type.

use granularity::{Granularity, GranularityError};
use io::StoreError;
use rollup::{RollupKind, StatType};
use std::error;
use std::fmt;

/// Everything that can make a rollup task fail
///
/// Every variant is caught at the task boundary. The pool and whoever
/// scheduled the task only ever see a logged failure and a decremented
/// execution context.
#[derive(Debug)]
pub enum Error {
    /// A statistical type and granularity pair that has no aggregation. This
    /// is a logic defect, not a data problem.
    Dispatch {
        /// The resolved type of the series.
        stat_type: StatType,
        /// The source granularity of the job.
        granularity: Granularity,
    },
    /// The job asked for a granularity beyond either end of the hierarchy.
    Granularity(GranularityError),
    /// The metadata store could not tell us the series type.
    TypeResolution(StoreError),
    /// Reading input points failed.
    Read(StoreError),
    /// Stored points did not hold the representation their type implies.
    Mismatch {
        /// The representation dispatch asked for.
        expected: RollupKind,
        /// The representation actually found.
        found: RollupKind,
    },
    /// An aggregation was asked to summarize nothing.
    EmptyInput,
    /// The computed rollup holds an infinite or NaN field, which no store
    /// can hand back to the next level.
    NonFinite(RollupKind),
    /// Persisting the computed rollup failed. The rollup is lost.
    Write(StoreError),
    /// The worker pool has shut down and refused the job.
    PoolClosed,
}

impl Error {
    /// Short taxonomy label used when logging
    pub fn class(&self) -> &'static str {
        match *self {
            Error::Dispatch { .. } | Error::Granularity(_) => "dispatch",
            Error::TypeResolution(_) => "metadata",
            Error::Read(_) => "read",
            Error::Mismatch { .. } | Error::EmptyInput | Error::NonFinite(_) => "compute",
            Error::Write(_) => "write",
            Error::PoolClosed => "pool",
        }
    }

    /// Does this error point at a bug in the pipeline itself rather than at
    /// the data or the backends?
    pub fn is_defect(&self) -> bool {
        match *self {
            Error::Dispatch { .. } | Error::Granularity(_) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Dispatch {
                stat_type,
                granularity,
            } => write!(
                f,
                "cannot compute rollups for {} from {}",
                stat_type, granularity
            ),
            Error::Granularity(ref e) => write!(f, "{}", e),
            Error::TypeResolution(ref e) => write!(f, "type resolution failed: {}", e),
            Error::Read(ref e) => write!(f, "read failed: {}", e),
            Error::Mismatch { expected, found } => write!(
                f,
                "expected {:?} points but found {:?}",
                expected, found
            ),
            Error::EmptyInput => write!(f, "no input points"),
            Error::NonFinite(kind) => write!(f, "{:?} rollup is not finite", kind),
            Error::Write(ref e) => write!(f, "write failed: {}", e),
            Error::PoolClosed => write!(f, "worker pool is closed"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Granularity(ref e) => Some(e),
            Error::TypeResolution(ref e) | Error::Read(ref e) | Error::Write(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<GranularityError> for Error {
    fn from(e: GranularityError) -> Error {
        Error::Granularity(e)
    }
}
