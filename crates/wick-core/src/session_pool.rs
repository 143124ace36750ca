// ABOUTME: Establishes N independent sessions through the bounded worker pool.
// ABOUTME: Config errors are fatal up front; on any connect failure every opened session is closed.

use crate::error::{AggregateError, EstablishError};
use crate::pool::fan_out;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use wick_auth::{negotiate, validate_realm, validate_url, AuthError, ClientIdentity};
use wick_wamp::{ConnectConfig, Connector, Session, WampError};

/// Check the endpoint and credentials once, before any connect attempt.
pub fn preflight(identity: &ClientIdentity) -> Result<(), AuthError> {
    validate_url(&identity.url)?;
    validate_realm(&identity.realm)?;
    negotiate(identity)?;
    Ok(())
}

/// Open `count` sessions with at most `concurrency` connect attempts in flight.
///
/// Configuration errors are fatal and returned before anything connects.
/// After that every attempt negotiates credentials and connects on its own;
/// one failure never cancels the others. Either all `count` sessions come
/// back, or none do.
pub async fn establish(
    connector: Arc<dyn Connector>,
    identity: &ClientIdentity,
    count: usize,
    concurrency: usize,
    keepalive_secs: u64,
) -> Result<Vec<Arc<dyn Session>>, EstablishError> {
    preflight(identity)?;

    let started = Instant::now();
    let identity = Arc::new(identity.clone());

    let outcomes = fan_out(count, concurrency, move |attempt| {
        let connector = Arc::clone(&connector);
        let identity = Arc::clone(&identity);
        async move {
            let config = ConnectConfig::from_identity(&identity, keepalive_secs)?;
            let session = connector.connect(config).await?;
            let details = session.details();
            debug!(
                attempt,
                session_id = session.id(),
                authid = %details.authid,
                authrole = %details.authrole,
                authmethod = %details.authmethod,
                "session established"
            );
            Ok::<_, WampError>(session)
        }
    })
    .await;

    let mut sessions = Vec::with_capacity(count);
    let mut failures = AggregateError::new();
    for (attempt, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Some(Ok(session)) => sessions.push(session),
            Some(Err(e)) => {
                warn!(attempt, error = %e, "session failed to connect");
                failures.push(e);
            }
            None => failures.push(format!("connect attempt {attempt} did not complete")),
        }
    }

    if !failures.is_empty() {
        if let Err(close_failures) = close_sessions(&sessions).await {
            failures.merge(close_failures);
        }
        return Err(failures.into());
    }

    info!(
        sessions = sessions.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "sessions established"
    );
    Ok(sessions)
}

/// Close every session, one worker per session.
pub async fn close_sessions(sessions: &[Arc<dyn Session>]) -> Result<(), AggregateError> {
    let sessions: Arc<Vec<Arc<dyn Session>>> = Arc::new(sessions.to_vec());
    let count = sessions.len();

    let outcomes = fan_out(count, count, move |index| {
        let session = Arc::clone(&sessions[index]);
        async move {
            let id = session.id();
            let result = session.close().await;
            if let Err(e) = &result {
                warn!(session_id = id, error = %e, "failed to close session");
            }
            result
        }
    })
    .await;

    let mut failures = AggregateError::new();
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Some(Ok(())) => {}
            Some(Err(e)) => failures.push(e),
            None => failures.push(format!("closing session {index} did not complete")),
        }
    }
    failures.into_result()
}
