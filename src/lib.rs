//! Strata is the rollup core of a time-series metrics store. It turns
//! fine-grained measurements into progressively coarser statistical summaries
//! so that queries over long windows stay cheap.
//!
//! The unit of work is the `service::RollupTask`: given a locator, a range and
//! a source granularity the task resolves the series' statistical type, reads
//! the finer points, aggregates them with the algorithm appropriate to the
//! type and persists the result one granularity up. Tasks run on a bounded
//! worker pool and a failing task never disturbs its siblings or the
//! bookkeeping of the generation it belongs to.
//!
//! Storage and metadata backends are reached through the traits in `io`.
//! In-memory implementations are provided for embedding and testing.
#![allow(unknown_lints)]
#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]
#![warn(missing_docs)]
extern crate chrono;
extern crate crossbeam_channel;
extern crate fern;
extern crate quantiles;
extern crate seahash;
extern crate serde;
extern crate serde_json;
extern crate toml;

#[macro_use]
extern crate log;

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate serde_derive;

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
extern crate tempdir;

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod granularity;
pub mod instrument;
pub mod io;
pub mod locator;
pub mod logging;
pub mod rollup;
pub mod service;
pub mod time;

pub use error::Error;
