// ABOUTME: Error types for wick-core: aggregated fan-out failures, raw-output format errors, operation errors.
// ABOUTME: AggregateError renders one "- " line per failure and flattens nested aggregates.

use std::fmt;
use thiserror::Error;
use wick_auth::AuthError;
use wick_wamp::WampError;

/// Every failure of a fan-out batch, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateError {
    failures: Vec<String>,
}

impl AggregateError {
    pub fn new() -> Self {
        Self::default()
    }

    /// An aggregate holding a single failure.
    pub fn single(failure: impl fmt::Display) -> Self {
        let mut aggregate = Self::new();
        aggregate.push(failure);
        aggregate
    }

    pub fn push(&mut self, failure: impl fmt::Display) {
        self.failures.push(failure.to_string());
    }

    /// Absorb another aggregate's lines rather than nesting it.
    pub fn merge(&mut self, other: AggregateError) {
        self.failures.extend(other.failures);
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// `Ok(())` when nothing failed.
    pub fn into_result(self) -> Result<(), AggregateError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("got errors:")?;
        for failure in &self.failures {
            write!(f, "\n- {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Raw-output failures; they abort only the iteration that hit them.
#[derive(Error, Debug)]
pub enum FormatError {
    /// Requested argument index is out of range.
    #[error("index error: argument {index} requested but result has {len} argument(s)")]
    Index { index: i64, len: usize },

    /// Argument is neither a string, bytes nor nil.
    #[error("type error: argument is {kind}, expected string or bytes")]
    Type { kind: &'static str },

    /// Writing to the output failed.
    #[error("write error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single failed call/publish/register/subscribe iteration.
#[derive(Error, Debug)]
pub enum OperationError {
    #[error(transparent)]
    Wamp(#[from] WampError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Why a session pool could not be established.
#[derive(Error, Debug)]
pub enum EstablishError {
    /// Invalid URL, realm or credentials; no connection was attempted.
    #[error(transparent)]
    Config(#[from] AuthError),

    /// One or more connect attempts failed; every opened session was closed.
    #[error(transparent)]
    Connect(#[from] AggregateError),
}
