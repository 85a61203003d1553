//! Metric series identity.

use std::error;
use std::fmt;
use std::str::FromStr;
use std::sync;

/// The identity of one metric time series
///
/// A locator is a tenant id plus a metric name. It keys both the metadata
/// cache and every storage read and write. Locators are immutable and cheap
/// to clone.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Locator {
    tenant: sync::Arc<String>,
    metric: sync::Arc<String>,
}

/// Returned when a string cannot be parsed into a `Locator`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLocatorError(String);

impl fmt::Display for ParseLocatorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "malformed locator: {:?}", self.0)
    }
}

impl error::Error for ParseLocatorError {}

impl Locator {
    /// Create a locator from a tenant id and a metric name.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata::locator::Locator;
    ///
    /// let locator = Locator::new("ac1234", "cpu.idle");
    /// assert_eq!("ac1234.cpu.idle", locator.to_string());
    /// ```
    pub fn new<S>(tenant: S, metric: S) -> Locator
    where
        S: Into<String>,
    {
        Locator {
            tenant: sync::Arc::new(tenant.into()),
            metric: sync::Arc::new(metric.into()),
        }
    }

    /// The tenant that owns this series.
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// The metric name, without the tenant.
    pub fn metric(&self) -> &str {
        &self.metric
    }
}

impl FromStr for Locator {
    type Err = ParseLocatorError;

    /// Parse `<tenant>.<metric>`. The tenant ends at the first dot; metric
    /// names may contain further dots.
    fn from_str(s: &str) -> Result<Locator, ParseLocatorError> {
        match s.find('.') {
            Some(idx) if idx > 0 && idx + 1 < s.len() => {
                Ok(Locator::new(&s[..idx], &s[idx + 1..]))
            }
            _ => Err(ParseLocatorError(s.to_string())),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.tenant, self.metric)
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Locator({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_first_dot() {
        let locator: Locator = "ac1234.rackspace.monitoring.cpu".parse().unwrap();
        assert_eq!("ac1234", locator.tenant());
        assert_eq!("rackspace.monitoring.cpu", locator.metric());
        assert_eq!(Locator::new("ac1234", "rackspace.monitoring.cpu"), locator);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!("nodot".parse::<Locator>().is_err());
        assert!(".metric".parse::<Locator>().is_err());
        assert!("tenant.".parse::<Locator>().is_err());
    }

    #[test]
    fn display_round_trips() {
        let locator = Locator::new("t", "a.b");
        let again: Locator = locator.to_string().parse().unwrap();
        assert_eq!(locator, again);
    }
}
