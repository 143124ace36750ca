// ABOUTME: Call, publish, subscribe and register drivers that run on top of established sessions.
// ABOUTME: Calls and publishes repeat through the dispatcher; every session fans out through the pool.

use crate::dispatcher::{self, AggregatedResult, OperationRequest};
use crate::error::{AggregateError, FormatError, OperationError};
use crate::pool::fan_out;
use crate::render::{dump_raw, render, render_progress};
use serde_json::Value;
use std::future::Future;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use wick_wamp::{
    CallResult, Dict, Event, Invocation, InvocationFuture, InvocationHandler, ProgressHandler,
    Session, WampError,
};

/// Pause between the last allowed invocation and closing the session, so
/// the final YIELD reaches the router.
pub const INVOKE_LIMIT_GRACE: Duration = Duration::from_secs(1);

/// Run `task` once per session on at most `concurrency` workers and merge
/// every session's failures into one flat aggregate.
pub async fn across_sessions<F, Fut>(
    sessions: &[Arc<dyn Session>],
    concurrency: usize,
    task: F,
) -> Result<(), AggregateError>
where
    F: Fn(Arc<dyn Session>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), AggregateError>> + Send + 'static,
{
    let sessions: Arc<Vec<Arc<dyn Session>>> = Arc::new(sessions.to_vec());
    let count = sessions.len();

    let outcomes = fan_out(count, concurrency, move |index| task(Arc::clone(&sessions[index]))).await;

    let mut failures = AggregateError::new();
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Some(Ok(())) => {}
            Some(Err(e)) => failures.merge(e),
            None => failures.push(format!("session {index} task did not complete")),
        }
    }
    failures.into_result()
}

/// How a call result is written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallOutput {
    #[default]
    Rendered,
    /// Write result argument N verbatim.
    RawArg(i64),
}

/// Call `op.target` `op.repeat` times on one session.
pub async fn call(
    session: Arc<dyn Session>,
    op: &OperationRequest,
    output: CallOutput,
) -> AggregatedResult {
    let progress = op.wants_progress();
    let request = Arc::new(op.clone());

    dispatcher::run(op, move |_| {
        let session = Arc::clone(&session);
        let request = Arc::clone(&request);
        async move {
            let handler: Option<ProgressHandler> = progress.then(|| {
                Arc::new(|partial: CallResult| {
                    println!("{}", render_progress(&partial.args, &partial.kwargs))
                }) as ProgressHandler
            });
            let result = session
                .call(
                    &request.target,
                    request.options.clone(),
                    request.args.clone(),
                    request.kwargs.clone(),
                    handler,
                )
                .await?;
            print_result(&result, output)
        }
    })
    .await
}

fn print_result(result: &CallResult, output: CallOutput) -> Result<(), OperationError> {
    match output {
        CallOutput::Rendered => {
            println!("{}", render(&result.args, &result.kwargs, None));
            Ok(())
        }
        CallOutput::RawArg(index) => {
            let mut stdout = std::io::stdout().lock();
            dump_raw(&result.args, index, &mut stdout)?;
            stdout.flush().map_err(FormatError::from)?;
            Ok(())
        }
    }
}

/// Publish to `op.target` `op.repeat` times on one session.
pub async fn publish(session: Arc<dyn Session>, op: &OperationRequest) -> AggregatedResult {
    let request = Arc::new(op.clone());

    dispatcher::run(op, move |_| {
        let session = Arc::clone(&session);
        let request = Arc::clone(&request);
        async move {
            session
                .publish(
                    &request.target,
                    request.options.clone(),
                    request.args.clone(),
                    request.kwargs.clone(),
                )
                .await
        }
    })
    .await
}

/// Subscribe one session to `topic`, printing every event.
///
/// Each delivered event is also reported on `events` so the caller can stop
/// after a fixed number.
pub async fn subscribe(
    session: &Arc<dyn Session>,
    topic: &str,
    options: Dict,
    print_details: bool,
    events: Option<mpsc::UnboundedSender<()>>,
) -> Result<(), WampError> {
    let handler = Arc::new(move |event: Event| {
        let details = print_details.then_some(&event.details);
        println!("{}", render(&event.args, &event.kwargs, details));
        if let Some(events) = &events {
            let _ = events.send(());
        }
    });
    session.subscribe(topic, options, handler).await?;
    info!(session_id = session.id(), "Subscribed to topic '{topic}'");
    Ok(())
}

/// Unsubscribe `topic` on every session at once.
pub async fn unsubscribe_all(sessions: &[Arc<dyn Session>], topic: &str) -> Result<(), AggregateError> {
    let topic = Arc::new(topic.to_string());
    across_sessions(sessions, sessions.len(), move |session| {
        let topic = Arc::clone(&topic);
        async move {
            session
                .unsubscribe(&topic)
                .await
                .map_err(AggregateError::single)
        }
    })
    .await
}

/// What to register and how invocations are answered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegisterRequest {
    pub procedure: String,
    pub options: Dict,
    /// Shell command run through `bash -c`; its stdout becomes the result.
    pub command: Option<String>,
    /// Unregister and close the session after this many invocations.
    pub invoke_limit: Option<usize>,
    pub delay: Duration,
}

impl RegisterRequest {
    pub fn new(procedure: impl Into<String>) -> Self {
        Self {
            procedure: procedure.into(),
            ..Self::default()
        }
    }
}

/// Register `request.procedure` on one session.
pub async fn register(session: &Arc<dyn Session>, request: &RegisterRequest) -> Result<(), WampError> {
    if !request.delay.is_zero() {
        info!(
            "procedure will be registered after {} milliseconds.",
            request.delay.as_millis()
        );
        tokio::time::sleep(request.delay).await;
    }

    let handler = invocation_handler(Arc::downgrade(session), request);
    session
        .register(&request.procedure, request.options.clone(), handler)
        .await?;
    info!(session_id = session.id(), "Registered procedure '{}'", request.procedure);
    Ok(())
}

/// Unregister `procedure` on every session at once.
pub async fn unregister_all(
    sessions: &[Arc<dyn Session>],
    procedure: &str,
) -> Result<(), AggregateError> {
    let procedure = Arc::new(procedure.to_string());
    across_sessions(sessions, sessions.len(), move |session| {
        let procedure = Arc::clone(&procedure);
        async move {
            session
                .unregister(&procedure)
                .await
                .map_err(AggregateError::single)
        }
    })
    .await
}

fn invocation_handler(session: Weak<dyn Session>, request: &RegisterRequest) -> InvocationHandler {
    let procedure = Arc::new(request.procedure.clone());
    let command = request.command.clone().map(Arc::new);
    let remaining = request.invoke_limit.map(|limit| Arc::new(AtomicUsize::new(limit)));

    Arc::new(move |invocation: Invocation| -> InvocationFuture {
        println!("{}", render(&invocation.args, &invocation.kwargs, None));

        if let Some(remaining) = &remaining {
            if count_down(remaining) {
                spawn_retire(session.clone(), Arc::clone(&procedure));
            }
        }

        let command = command.clone();
        Box::pin(async move {
            let output = match command {
                Some(command) => run_command(&command).await,
                None => String::new(),
            };
            Ok(CallResult::new(vec![Value::String(output)], Dict::new()))
        })
    })
}

/// Decrement without wrapping; true only for the invocation that hits zero.
fn count_down(remaining: &AtomicUsize) -> bool {
    remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .map(|previous| previous == 1)
        .unwrap_or(false)
}

fn spawn_retire(session: Weak<dyn Session>, procedure: Arc<String>) {
    tokio::spawn(async move {
        let Some(session) = session.upgrade() else {
            return;
        };
        if let Err(e) = session.unregister(&procedure).await {
            warn!(procedure = %procedure, error = %e, "failed to unregister procedure");
        }
        tokio::time::sleep(INVOKE_LIMIT_GRACE).await;
        if let Err(e) = session.close().await {
            warn!(session_id = session.id(), error = %e, "failed to close session");
        }
    });
}

async fn run_command(command: &str) -> String {
    debug!(%command, "running invocation command");
    match Command::new("bash").arg("-c").arg(command).output().await {
        Ok(output) => {
            if !output.status.success() {
                error!(
                    %command,
                    status = %output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim_end(),
                    "invocation command failed"
                );
            }
            String::from_utf8_lossy(&output.stdout).into_owned()
        }
        Err(e) => {
            error!(%command, error = %e, "failed to run invocation command");
            String::new()
        }
    }
}
