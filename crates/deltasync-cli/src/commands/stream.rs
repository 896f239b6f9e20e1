//! Stream command - Follow the streaming change log
//!
//! Holds a `/delta/streaming` connection open and prints each change as it
//! arrives, until Ctrl+C, `--max` changes, the inactivity timeout, or the
//! server closing the connection.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use deltasync_core::domain::{SyncError, SyncSession};

use super::{print_delta, print_summary, spawn_ctrl_c, start_cursor, CommandContext, FilterArgs};

#[derive(Debug, Args)]
pub struct StreamCommand {
    /// Cursor to start after (defaults to the beginning of the log)
    #[arg(long, conflicts_with = "from_latest")]
    pub cursor: Option<String>,

    /// Start from the current head of the log
    #[arg(long)]
    pub from_latest: bool,

    /// Seconds without data before giving up (0 disables, overrides the config)
    #[arg(long, value_name = "SECS")]
    pub inactivity_timeout: Option<u64>,

    /// Stop after this many changes
    #[arg(long, value_name = "N")]
    pub max: Option<u64>,

    #[command(flatten)]
    pub filter: FilterArgs,
}

impl StreamCommand {
    fn inactivity_timeout(&self, configured: Option<Duration>) -> Option<Duration> {
        match self.inactivity_timeout {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => configured,
        }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let inbox = ctx.inbox()?;
        let filter = self.filter.delta_filter(ctx.config())?;
        let timeout = self.inactivity_timeout(ctx.config().stream_inactivity_timeout());

        let start = if self.from_latest {
            inbox
                .latest_cursor()
                .await
                .context("Failed to fetch the latest cursor")?
        } else {
            start_cursor(self.cursor.as_deref())?
        };

        info!(cursor = %start, timeout = ?timeout, max = ?self.max, "Opening change stream");
        formatter.info("Streaming changes. Press Ctrl+C to stop.");

        let mut session = SyncSession::new(start, filter);
        let stop = session.stop_handle();
        let ctrl_c = spawn_ctrl_c(stop.clone());

        let mut delivered = 0u64;
        let result = inbox
            .delta_stream(&mut session, timeout, |event, object| {
                print_delta(formatter.as_ref(), event, &object);
                delivered += 1;
                if self.max.is_some_and(|max| delivered >= max) {
                    stop.stop();
                }
            })
            .await;
        ctrl_c.abort();

        match result {
            Ok(summary) => print_summary(formatter.as_ref(), ctx.format(), &summary),
            Err(e) if is_inactive(&e) => {
                formatter.warn(&e.to_string());
                formatter.info(&format!("Resume from cursor: {}", session.cursor()));
                Err(e)
            }
            Err(e) => Err(e.context("Change stream failed")),
        }
    }
}

fn is_inactive(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<SyncError>(),
        Some(SyncError::StreamInactive { .. })
    )
}
