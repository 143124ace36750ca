// ABOUTME: publish command: publish to a topic on every session, optionally repeated
// ABOUTME: Every failed publish on every session is reported in one aggregate

use super::{ConnectArgs, PublishArgs};
use crate::connect::{close_and_report, open_sessions};
use anyhow::Result;
use std::time::{Duration, Instant};
use tracing::info;
use wick_core::{across_sessions, coerce_dict, coerce_list, operations, OperationRequest};

pub async fn run(connect: &ConnectArgs, args: PublishArgs) -> Result<()> {
    let sessions = open_sessions(connect, &args.pool).await?;

    let op = OperationRequest::new(args.topic)
        .with_args(coerce_list(&args.args))
        .with_kwargs(coerce_dict(&args.kwargs))
        .with_options(coerce_dict(&args.options))
        .with_repeat(args.repeat as usize)
        .with_concurrency(args.pool.concurrency())
        .with_delay(Duration::from_millis(args.delay));
    let log_time = args.pool.time;

    let result = across_sessions(&sessions, args.pool.concurrency(), move |session| {
        let op = op.clone();
        async move {
            let started = Instant::now();
            let result = operations::publish(session, &op).await;
            if log_time {
                info!("{} calls took {}ms", op.repeat, started.elapsed().as_millis());
            }
            result.into_result()
        }
    })
    .await;

    close_and_report(&sessions, result).await
}
