// ABOUTME: join command: open sessions and hold them until interrupted or the router lets go
// ABOUTME: Logs each session's negotiated identity at join time

use super::{ConnectArgs, JoinArgs};
use crate::connect::open_sessions;
use crate::shutdown_signal;
use anyhow::Result;
use tracing::info;
use wick_core::run_until_shutdown;

pub async fn run(connect: &ConnectArgs, args: JoinArgs) -> Result<()> {
    let sessions = open_sessions(connect, &args.pool).await?;

    for session in &sessions {
        let details = session.details();
        info!(
            session_id = session.id(),
            realm = %details.realm,
            authid = %details.authid,
            authrole = %details.authrole,
            authmethod = %details.authmethod,
            broker = %details.features("broker"),
            dealer = %details.features("dealer"),
            "joined realm"
        );
    }

    run_until_shutdown(&sessions, shutdown_signal()).await;
    Ok(())
}
