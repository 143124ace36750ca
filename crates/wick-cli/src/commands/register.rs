// ABOUTME: register command: register a procedure on every session and serve invocations
// ABOUTME: Runs until interrupted or until every session has ended (see --invoke-count)

use super::{ConnectArgs, RegisterArgs};
use crate::connect::{close_and_report, open_sessions};
use crate::shutdown_signal;
use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use wick_core::operations::{register, unregister_all};
use wick_core::{
    across_sessions, coerce_dict, wait_for_shutdown, AggregateError, RegisterRequest,
    ShutdownCause,
};

pub async fn run(connect: &ConnectArgs, args: RegisterArgs) -> Result<()> {
    let sessions = open_sessions(connect, &args.pool).await?;

    let request = Arc::new(RegisterRequest {
        procedure: args.procedure.clone(),
        options: coerce_dict(&args.options),
        command: args.command.filter(|c| !c.is_empty()),
        invoke_limit: args.invoke_count.map(|n| n as usize),
        delay: Duration::from_millis(args.delay),
    });

    let started = Instant::now();
    let registered = across_sessions(&sessions, args.pool.concurrency(), move |session| {
        let request = Arc::clone(&request);
        async move {
            register(&session, &request)
                .await
                .map_err(AggregateError::single)
        }
    })
    .await;
    if registered.is_err() {
        return close_and_report(&sessions, registered).await;
    }
    if args.pool.time {
        info!(
            "Registered procedure '{}' in {}ms",
            args.procedure,
            started.elapsed().as_millis()
        );
    }

    if wait_for_shutdown(&sessions, shutdown_signal()).await == ShutdownCause::Interrupted {
        if let Err(e) = unregister_all(&sessions, &args.procedure).await {
            warn!(error = %e, "failed to unregister");
        }
    }
    close_and_report(&sessions, Ok(())).await
}
