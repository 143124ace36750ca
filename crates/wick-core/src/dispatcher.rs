// ABOUTME: Repeats one operation N times under a concurrency bound with a per-iteration delay.
// ABOUTME: Shared by call and publish; failures are collected in submission order, never short-circuited.

use crate::error::AggregateError;
use crate::pool::fan_out;
use serde_json::Value;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use wick_wamp::{Dict, List};

/// A call or publish to repeat.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    /// Procedure or topic URI.
    pub target: String,
    pub args: List,
    pub kwargs: Dict,
    pub options: Dict,
    pub repeat: usize,
    pub concurrency: usize,
    /// Slept before every iteration, including the first.
    pub delay: Duration,
}

impl OperationRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            args: List::new(),
            kwargs: Dict::new(),
            options: Dict::new(),
            repeat: 1,
            concurrency: 1,
            delay: Duration::ZERO,
        }
    }

    pub fn with_args(mut self, args: List) -> Self {
        self.args = args;
        self
    }

    pub fn with_kwargs(mut self, kwargs: Dict) -> Self {
        self.kwargs = kwargs;
        self
    }

    pub fn with_options(mut self, options: Dict) -> Self {
        self.options = options;
        self
    }

    pub fn with_repeat(mut self, repeat: usize) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// True when `receive_progress` is set in the options.
    pub fn wants_progress(&self) -> bool {
        self.options.get("receive_progress") == Some(&Value::Bool(true))
    }
}

/// Outcome of a dispatcher run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedResult {
    /// Iterations that ran to completion, successful or not.
    pub completed: usize,
    /// Failure messages in submission order.
    pub errors: Vec<String>,
}

impl AggregatedResult {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), AggregateError> {
        let mut aggregate = AggregateError::new();
        for error in self.errors {
            aggregate.push(error);
        }
        aggregate.into_result()
    }
}

/// Run `perform(iteration)` `op.repeat` times on at most `op.concurrency` workers.
///
/// The delay occupies only the sleeping iteration's worker.
pub async fn run<F, Fut, E>(op: &OperationRequest, perform: F) -> AggregatedResult
where
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let delay = op.delay;
    let perform = Arc::new(perform);

    let outcomes = fan_out(op.repeat, op.concurrency, move |iteration| {
        let perform = Arc::clone(&perform);
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            (*perform)(iteration).await.map_err(|e| e.to_string())
        }
    })
    .await;

    let mut result = AggregatedResult::default();
    for (iteration, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Some(Ok(())) => result.completed += 1,
            Some(Err(e)) => {
                result.completed += 1;
                result.errors.push(e);
            }
            None => result
                .errors
                .push(format!("iteration {iteration} did not complete")),
        }
    }
    result
}
