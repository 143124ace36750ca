// ABOUTME: Supervises long-running sessions until an interrupt or until every session has ended.
// ABOUTME: Classifies why each session ended and tears the pool down with one close worker per session.

use crate::pool::fan_out;
use crate::session_pool::close_sessions;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use wick_wamp::{reason, Session};

/// Why a supervised session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Router said GOODBYE with `wamp.close.system_shutdown`.
    RouterShutdown,
    /// Router said GOODBYE with any other reason.
    Disconnected(String),
    /// No GOODBYE: local close or a dropped connection.
    Unexpected,
}

impl Termination {
    pub fn classify(goodbye_reason: Option<&str>) -> Self {
        match goodbye_reason {
            Some(reason::SYSTEM_SHUTDOWN) => Termination::RouterShutdown,
            Some(other) => Termination::Disconnected(other.to_string()),
            None => Termination::Unexpected,
        }
    }
}

/// Which side of the shutdown race fired first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    Interrupted,
    SessionsEnded,
}

/// Spawn one waiter per session. The handle resolves once every session has
/// terminated, with each session's classification in pool order.
pub fn supervise(sessions: &[Arc<dyn Session>]) -> JoinHandle<Vec<Termination>> {
    let sessions: Arc<Vec<Arc<dyn Session>>> = Arc::new(sessions.to_vec());
    let count = sessions.len();

    tokio::spawn(async move {
        fan_out(count, count, move |index| {
            let session = Arc::clone(&sessions[index]);
            async move {
                session.done().await;
                let termination = Termination::classify(session.goodbye_reason().as_deref());
                match &termination {
                    Termination::RouterShutdown => {
                        info!(session_id = session.id(), "Router gone, exiting")
                    }
                    Termination::Disconnected(reason) => {
                        info!(session_id = session.id(), %reason, "client disconnected")
                    }
                    Termination::Unexpected => {
                        warn!(session_id = session.id(), "client disconnected unexpectedly")
                    }
                }
                termination
            }
        })
        .await
        .into_iter()
        .map(|t| t.unwrap_or(Termination::Unexpected))
        .collect()
    })
}

/// Block until `interrupt` resolves or every session has ended.
pub async fn wait_for_shutdown<I>(sessions: &[Arc<dyn Session>], interrupt: I) -> ShutdownCause
where
    I: Future<Output = ()>,
{
    let mut all_done = supervise(sessions);

    let cause = tokio::select! {
        _ = interrupt => ShutdownCause::Interrupted,
        _ = &mut all_done => ShutdownCause::SessionsEnded,
    };
    // Sessions we are about to close are not disconnects worth reporting.
    all_done.abort();
    info!(?cause, sessions = sessions.len(), "shutting down");
    cause
}

/// [`wait_for_shutdown`], then close all sessions and wait for the closes
/// to finish.
pub async fn run_until_shutdown<I>(sessions: &[Arc<dyn Session>], interrupt: I) -> ShutdownCause
where
    I: Future<Output = ()>,
{
    let cause = wait_for_shutdown(sessions, interrupt).await;
    if let Err(e) = close_sessions(sessions).await {
        warn!(error = %e, "some sessions did not close cleanly");
    }
    cause
}
