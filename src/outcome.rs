//! The success/failure value every client operation resolves to.
//!
//! An [`Outcome`] is what the service said, reduced to "it worked, here is the
//! value" or "it did not, here is why". It is deliberately not a
//! `std::result::Result`: a failure carries only a human readable message and
//! callers are expected to inspect it, chain [`guard`](Outcome::guard)s on it,
//! or convert it with [`into_result`](Outcome::into_result).

use std::fmt;

/// Either a success value or a failure message.
///
/// # Examples
///
/// ```
/// use billmyservices::Outcome;
///
/// let counters: Outcome<Vec<i64>> = Outcome::Success(vec![1, 2, 3]);
///
/// let checked = counters
///     .guard(|xs| !xs.is_empty(), "no counters")
///     .guard_with(|xs| xs.len() < 3, |xs| format!("too many counters: {}", xs.len()));
///
/// assert_eq!(checked.message(), "too many counters: 3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "an outcome may be a failure, which should be inspected"]
pub enum Outcome<T> {
    /// The operation succeeded with the given value.
    Success(T),
    /// The operation failed; the message describes why.
    Failure(String),
}

impl<T> Outcome<T> {
    /// Builds a failure from anything displayable.
    pub fn failure(message: impl fmt::Display) -> Self {
        Outcome::Failure(message.to_string())
    }

    /// Returns `true` if this is a [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Returns `true` if this is a [`Outcome::Failure`].
    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// Returns a reference to the success value.
    ///
    /// # Panics
    ///
    /// Panics if the outcome is a failure. Asking a failure for its value is a
    /// programming error.
    #[track_caller]
    pub fn value(&self) -> &T {
        match self {
            Outcome::Success(value) => value,
            Outcome::Failure(message) => {
                panic!("cannot get the success value of a failed outcome: {message}")
            }
        }
    }

    /// Consumes the outcome and returns the success value.
    ///
    /// # Panics
    ///
    /// Panics if the outcome is a failure.
    #[track_caller]
    pub fn into_value(self) -> T {
        match self {
            Outcome::Success(value) => value,
            Outcome::Failure(message) => {
                panic!("cannot get the success value of a failed outcome: {message}")
            }
        }
    }

    /// Returns the failure message.
    ///
    /// # Panics
    ///
    /// Panics if the outcome is a success.
    #[track_caller]
    pub fn message(&self) -> &str {
        match self {
            Outcome::Success(_) => {
                panic!("cannot get the failure message of a successful outcome")
            }
            Outcome::Failure(message) => message,
        }
    }

    /// Returns the success value, if any.
    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    /// Returns the failure message, if any.
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(message) => Some(message),
        }
    }

    /// Keeps a success only if `must_hold` accepts its value.
    ///
    /// A success that fails the check becomes `Failure(or_fail_with)`. A
    /// failure is returned unchanged without calling the predicate.
    pub fn guard<P>(self, must_hold: P, or_fail_with: impl Into<String>) -> Self
    where
        P: FnOnce(&T) -> bool,
    {
        match self {
            Outcome::Success(value) => {
                if must_hold(&value) {
                    Outcome::Success(value)
                } else {
                    Outcome::Failure(or_fail_with.into())
                }
            }
            failure => failure,
        }
    }

    /// Like [`guard`](Outcome::guard), but the failure message is derived from
    /// the rejected value.
    pub fn guard_with<P, M>(self, must_hold: P, or_fail_with: M) -> Self
    where
        P: FnOnce(&T) -> bool,
        M: FnOnce(&T) -> String,
    {
        match self {
            Outcome::Success(value) => {
                if must_hold(&value) {
                    Outcome::Success(value)
                } else {
                    Outcome::Failure(or_fail_with(&value))
                }
            }
            failure => failure,
        }
    }

    /// Maps the success value, leaving failures untouched.
    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Failure(message) => Outcome::Failure(message),
        }
    }

    /// Chains another fallible step on a success.
    pub fn and_then<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> Outcome<U>,
    {
        match self {
            Outcome::Success(value) => f(value),
            Outcome::Failure(message) => Outcome::Failure(message),
        }
    }

    /// Converts into a standard `Result`, with the message as the error.
    pub fn into_result(self) -> Result<T, String> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(message) => Err(message),
        }
    }
}

impl<T, E: fmt::Display> From<Result<T, E>> for Outcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(e) => Outcome::failure(e),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success(value) => write!(f, "success: {value}"),
            Outcome::Failure(message) => write!(f, "failure: {message}"),
        }
    }
}
