//! Counter types and counters as the service sends and receives them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How counters of a given type behave. The service enforces it; the client
/// only passes it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CounterVersion {
    /// The counter value is kept between `k1` and `k2`.
    AbsoluteCounter,
    /// No more than `k1` accumulated value within each `k2` seconds window.
    FrequencyCounter,
}

impl CounterVersion {
    /// The name used on the wire, both in JSON and in the `wsb-mode` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterVersion::AbsoluteCounter => "AbsoluteCounter",
            CounterVersion::FrequencyCounter => "FrequencyCounter",
        }
    }
}

impl fmt::Display for CounterVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable counter type definition.
///
/// # Examples
///
/// ```
/// use billmyservices::{CounterType, CounterVersion};
///
/// let api_calls = CounterType::new("api-calls", "API calls per account", 0, -5, 5, CounterVersion::AbsoluteCounter);
/// assert_eq!(api_calls.code(), "api-calls");
/// assert_eq!(api_calls.k2(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterType {
    code: String,
    name: String,
    #[serde(rename = "value")]
    default_value: i64,
    k1: i64,
    k2: i64,
    version: CounterVersion,
}

impl CounterType {
    /// Creates a counter type.
    ///
    /// * `code` - your own unique code for this type
    /// * `name` - a name or description
    /// * `default_value` - the value new counters of this type start at
    /// * `k1`, `k2` - configuration values, their meaning depends on `version`
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        default_value: i64,
        k1: i64,
        k2: i64,
        version: CounterVersion,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            default_value,
            k1,
            k2,
            version,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The value new counters of this type start at.
    pub fn default_value(&self) -> i64 {
        self.default_value
    }

    pub fn k1(&self) -> i64 {
        self.k1
    }

    pub fn k2(&self) -> i64 {
        self.k2
    }

    pub fn version(&self) -> CounterVersion {
        self.version
    }
}

/// A counter value tracked by the service for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counter {
    code: String,
    time_ref: i64,
    value: i64,
}

impl Counter {
    /// Creates a counter. The client never sends counters, this exists for
    /// fakes and tests.
    pub fn new(code: impl Into<String>, time_ref: i64, value: i64) -> Self {
        Self {
            code: code.into(),
            time_ref,
            value,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Last update time, in seconds since the UNIX epoch.
    pub fn time_ref(&self) -> i64 {
        self.time_ref
    }

    pub fn value(&self) -> i64 {
        self.value
    }
}

/// A counter type together with all of its counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterTypeAndCounters {
    counter_type: CounterType,
    #[serde(default)]
    counters: Vec<Counter>,
}

impl CounterTypeAndCounters {
    pub fn new(counter_type: CounterType, counters: Vec<Counter>) -> Self {
        Self {
            counter_type,
            counters,
        }
    }

    pub fn counter_type(&self) -> &CounterType {
        &self.counter_type
    }

    pub fn counters(&self) -> &[Counter] {
        &self.counters
    }
}
