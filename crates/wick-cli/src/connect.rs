// ABOUTME: Turns connection flags into a validated ClientIdentity and opens the session pool.
// ABOUTME: All configuration errors surface here, before any network activity.

use crate::commands::{ConnectArgs, PoolArgs};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use wick_auth::{
    negotiate, validate_private_key, validate_realm, validate_url, AuthMethod, ClientIdentity,
    SerializerKind,
};
use wick_core::AggregateError;
use wick_wamp::{Connector, Session, WampConnector};

/// Validate every connection flag and build the identity sessions connect with.
pub fn identity(args: &ConnectArgs) -> Result<ClientIdentity> {
    validate_url(&args.url).context("invalid --url")?;
    validate_realm(&args.realm).context("invalid --realm")?;
    let serializer: SerializerKind = args.serializer.parse().context("invalid --serializer")?;
    let method: AuthMethod = args.authmethod.parse().context("invalid --authmethod")?;

    let mut identity = ClientIdentity::new(&args.url, &args.realm)
        .serializer(serializer)
        .auth_method(method);
    if let Some(authid) = non_empty(&args.authid) {
        identity = identity.authid(authid);
    }
    if let Some(authrole) = non_empty(&args.authrole) {
        identity = identity.authrole(authrole);
    }
    if let Some(ticket) = non_empty(&args.ticket) {
        identity = identity.ticket(ticket);
    }
    if let Some(secret) = non_empty(&args.secret) {
        identity = identity.secret(secret);
    }
    if let Some(private_key) = non_empty(&args.private_key) {
        validate_private_key(private_key).context("invalid --private-key")?;
        identity = identity.private_key(private_key);
    }

    let identity = identity.build().context("invalid credentials")?;
    // Surfaces missing credentials up front.
    negotiate(&identity).context("invalid credentials")?;
    Ok(identity)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Open `pool.parallel` sessions with the real connector.
pub async fn open_sessions(connect: &ConnectArgs, pool: &PoolArgs) -> Result<Vec<Arc<dyn Session>>> {
    let identity = identity(connect)?;
    let connector: Arc<dyn Connector> = Arc::new(WampConnector);

    let started = Instant::now();
    let sessions = wick_core::establish(
        connector,
        &identity,
        pool.sessions(),
        pool.concurrency(),
        pool.keepalive,
    )
    .await?;

    if pool.time {
        info!(
            "{} session(s) joined in {}ms",
            sessions.len(),
            started.elapsed().as_millis()
        );
    }
    Ok(sessions)
}

/// Close every session, then report operation and close failures together.
pub async fn close_and_report(
    sessions: &[Arc<dyn Session>],
    result: std::result::Result<(), AggregateError>,
) -> Result<()> {
    let mut failures = AggregateError::new();
    if let Err(e) = result {
        failures.merge(e);
    }
    if let Err(e) = wick_core::close_sessions(sessions).await {
        failures.merge(e);
    }
    Ok(failures.into_result()?)
}
