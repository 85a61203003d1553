//! Provides the configuration file parser
//!
//! Used to parse a TOML configuration file into a struct that the rollup
//! service can consume. Every key is optional:
//!
//! ```toml
//! max-rollup-threads = 20
//! metadata-cache-ttl = 172800         # seconds
//! metadata-cache-concurrency = 20     # defaults to max-rollup-threads
//! verbose = 0
//! ```

use constants;
use std::error;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;
use toml;

/// Configuration of a `RollupService`.
#[derive(Debug, Clone, PartialEq)]
pub struct RollupConfig {
    /// Number of worker threads running rollup tasks.
    pub max_rollup_threads: usize,
    /// How long a series' statistical type is cached.
    pub metadata_cache_ttl: Duration,
    /// Upper bound on concurrent metadata loads.
    pub metadata_cache_concurrency: usize,
    /// Log verbosity, 0 (errors only) through 4 (trace).
    pub verbose: u64,
}

impl Default for RollupConfig {
    fn default() -> Self {
        RollupConfig {
            max_rollup_threads: constants::DEFAULT_MAX_ROLLUP_THREADS,
            metadata_cache_ttl: Duration::from_secs(constants::DEFAULT_METADATA_CACHE_TTL_SECS),
            metadata_cache_concurrency: constants::DEFAULT_MAX_ROLLUP_THREADS,
            verbose: 0,
        }
    }
}

/// Failures to produce a `RollupConfig`.
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    Io(io::Error),
    /// The configuration file is not valid TOML.
    Parse(toml::de::Error),
    /// A key holds a value of the wrong type or out of range.
    Invalid {
        /// The offending key.
        key: &'static str,
        /// What was wrong with it.
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::Io(ref e) => write!(f, "could not read config file: {}", e),
            ConfigError::Parse(ref e) => write!(f, "could not parse config file: {}", e),
            ConfigError::Invalid { key, reason } => write!(f, "invalid {}: {}", key, reason),
        }
    }
}

impl error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            ConfigError::Io(ref e) => Some(e),
            ConfigError::Parse(ref e) => Some(e),
            ConfigError::Invalid { .. } => None,
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> ConfigError {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> ConfigError {
        ConfigError::Parse(e)
    }
}

fn integer(value: &toml::Value, key: &'static str) -> Result<Option<i64>, ConfigError> {
    match value.get(key) {
        None => Ok(None),
        Some(v) => v.as_integer().map(Some).ok_or(ConfigError::Invalid {
            key: key,
            reason: "must be an integer",
        }),
    }
}

fn positive(value: &toml::Value, key: &'static str) -> Result<Option<u64>, ConfigError> {
    match integer(value, key)? {
        None => Ok(None),
        Some(i) if i > 0 => Ok(Some(i as u64)),
        Some(_) => Err(ConfigError::Invalid {
            key: key,
            reason: "must be greater than zero",
        }),
    }
}

/// Parse the contents of a configuration file.
pub fn parse_config_file(buffer: &str) -> Result<RollupConfig, ConfigError> {
    let mut config = RollupConfig::default();
    let value: toml::Value = toml::from_str(buffer)?;

    config.max_rollup_threads = positive(&value, "max-rollup-threads")?
        .map(|t| t as usize)
        .unwrap_or(config.max_rollup_threads);

    config.metadata_cache_ttl = positive(&value, "metadata-cache-ttl")?
        .map(Duration::from_secs)
        .unwrap_or(config.metadata_cache_ttl);

    config.metadata_cache_concurrency = positive(&value, "metadata-cache-concurrency")?
        .map(|c| c as usize)
        .unwrap_or(config.max_rollup_threads);

    if config.metadata_cache_concurrency != config.max_rollup_threads {
        warn!(
            "metadata-cache-concurrency ({}) differs from max-rollup-threads ({})",
            config.metadata_cache_concurrency, config.max_rollup_threads
        );
    }

    config.verbose = match integer(&value, "verbose")? {
        None => config.verbose,
        Some(v) if v >= 0 => v as u64,
        Some(_) => {
            return Err(ConfigError::Invalid {
                key: "verbose",
                reason: "must not be negative",
            })
        }
    };

    Ok(config)
}

/// Read and parse the configuration file at `path`.
pub fn load_config_file<P: AsRef<Path>>(path: P) -> Result<RollupConfig, ConfigError> {
    let mut fp = File::open(path)?;
    let mut buffer = String::new();
    fp.read_to_string(&mut buffer)?;
    parse_config_file(&buffer)
}
