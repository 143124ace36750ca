// ABOUTME: call command: call a procedure on every session, optionally repeated
// ABOUTME: Results are rendered, or one argument is written raw with --raw-output-arg

use super::{CallArgs, ConnectArgs};
use crate::connect::{close_and_report, open_sessions};
use anyhow::Result;
use std::time::{Duration, Instant};
use tracing::info;
use wick_core::{
    across_sessions, coerce_dict, coerce_list, operations, CallOutput,
    OperationRequest,
};

pub async fn run(connect: &ConnectArgs, args: CallArgs) -> Result<()> {
    let sessions = open_sessions(connect, &args.pool).await?;

    let op = OperationRequest::new(args.procedure)
        .with_args(coerce_list(&args.args))
        .with_kwargs(coerce_dict(&args.kwargs))
        .with_options(coerce_dict(&args.options))
        .with_repeat(args.repeat as usize)
        .with_concurrency(args.pool.concurrency())
        .with_delay(Duration::from_millis(args.delay));
    let output = args
        .raw_output_arg
        .map_or(CallOutput::Rendered, CallOutput::RawArg);
    let log_time = args.pool.time;

    let result = across_sessions(&sessions, args.pool.concurrency(), move |session| {
        let op = op.clone();
        async move {
            let started = Instant::now();
            let result = operations::call(session, &op, output).await;
            if log_time {
                info!("{} calls took {}ms", op.repeat, started.elapsed().as_millis());
            }
            result.into_result()
        }
    })
    .await;

    close_and_report(&sessions, result).await
}
