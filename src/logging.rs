//! Log output for embedders.

use chrono::Utc;
use fern;
use log;
use std::io;

/// Map a verbosity count to a level filter. Anything past 3 is trace.
pub fn level_for(verbose: u64) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Install a stdout logger at the level `verbose` maps to.
///
/// Fails if a logger is already installed.
pub fn init(verbose: u64) -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}][{}] {}",
                record.module_path().unwrap_or("-"),
                record.line().unwrap_or(0),
                Utc::now().to_rfc3339(),
                record.level(),
                message
            ))
        })
        .level(level_for(verbose))
        .chain(io::stdout())
        .apply()
}
