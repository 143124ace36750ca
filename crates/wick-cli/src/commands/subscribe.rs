// ABOUTME: subscribe command: subscribe every session to a topic and print events
// ABOUTME: Exits on interrupt, when all sessions end, or after --event-count events

use super::{ConnectArgs, SubscribeArgs};
use crate::connect::{close_and_report, open_sessions};
use crate::shutdown_signal;
use anyhow::Result;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};
use wick_core::operations::{subscribe, unsubscribe_all};
use wick_core::{across_sessions, coerce_dict, wait_for_shutdown, AggregateError, ShutdownCause};

pub async fn run(connect: &ConnectArgs, args: SubscribeArgs) -> Result<()> {
    let sessions = open_sessions(connect, &args.pool).await?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let options = coerce_dict(&args.options);
    let topic = args.topic.clone();
    let details = args.details;

    let started = Instant::now();
    let subscribed = across_sessions(&sessions, args.pool.concurrency(), move |session| {
        let topic = topic.clone();
        let options = options.clone();
        let events = events_tx.clone();
        async move {
            subscribe(&session, &topic, options, details, Some(events))
                .await
                .map_err(AggregateError::single)
        }
    })
    .await;
    if subscribed.is_err() {
        return close_and_report(&sessions, subscribed).await;
    }
    if args.pool.time {
        info!(
            "Subscribed to topic '{}' in {}ms",
            args.topic,
            started.elapsed().as_millis()
        );
    }

    let interrupt = async {
        tokio::select! {
            _ = shutdown_signal() => {}
            _ = count_events(events_rx, args.event_count) => {}
        }
    };
    if wait_for_shutdown(&sessions, interrupt).await == ShutdownCause::Interrupted {
        if let Err(e) = unsubscribe_all(&sessions, &args.topic).await {
            warn!(error = %e, "failed to unsubscribe");
        }
    }
    close_and_report(&sessions, Ok(())).await
}

/// Resolve once `limit` events have arrived; never when `limit` is zero.
async fn count_events(mut events: mpsc::UnboundedReceiver<()>, limit: u64) {
    let mut seen = 0u64;
    while events.recv().await.is_some() {
        seen += 1;
        if limit > 0 && seen >= limit {
            info!(events = seen, "event count reached");
            return;
        }
    }
    std::future::pending::<()>().await
}
