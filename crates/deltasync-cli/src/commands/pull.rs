//! Pull command - Fetch every change after a cursor
//!
//! Walks the paginated `/delta` endpoint until the log is exhausted and
//! prints each delivered change. The final cursor is reported so the next
//! run can resume from it.
//!
//! With `--lazy` the changes are drawn one at a time from the restartable
//! producer instead of the callback-mode session.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use deltasync_core::domain::{StopHandle, SyncSession};

use super::{print_delta, print_summary, spawn_ctrl_c, start_cursor, CommandContext, FilterArgs};

#[derive(Debug, Args)]
pub struct PullCommand {
    /// Cursor to start after (defaults to the beginning of the log)
    #[arg(long, conflicts_with = "from_latest")]
    pub cursor: Option<String>,

    /// Start from the current head of the log
    #[arg(long)]
    pub from_latest: bool,

    /// Draw changes one at a time instead of running a sync session
    #[arg(long)]
    pub lazy: bool,

    #[command(flatten)]
    pub filter: FilterArgs,
}

impl PullCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let inbox = ctx.inbox()?;
        let filter = self.filter.delta_filter(ctx.config())?;

        let start = if self.from_latest {
            inbox
                .latest_cursor()
                .await
                .context("Failed to fetch the latest cursor")?
        } else {
            start_cursor(self.cursor.as_deref())?
        };

        info!(cursor = %start, lazy = self.lazy, "Pulling changes");

        if self.lazy {
            let stop = StopHandle::new();
            let ctrl_c = spawn_ctrl_c(stop.clone());

            let deltas = inbox.deltas_iter(start, filter);
            let mut iter = deltas.iter();
            let mut delivered = 0u64;
            loop {
                let next = tokio::select! {
                    biased;
                    _ = stop.stopped() => break,
                    next = iter.next() => next.context("Failed to pull changes")?,
                };
                let Some((event, object)) = next else {
                    break;
                };
                print_delta(formatter.as_ref(), event, &object);
                delivered += 1;
            }
            ctrl_c.abort();

            if ctx.format().is_json() {
                formatter.record(
                    "",
                    &serde_json::json!({
                        "delivered": delivered,
                        "final_cursor": iter.cursor().as_str(),
                        "stopped": stop.is_stopped(),
                    }),
                );
            } else {
                formatter.success(&format!("{} changes delivered", delivered));
                formatter.info(&format!("Resume from cursor: {}", iter.cursor()));
            }
            return Ok(());
        }

        let mut session = SyncSession::new(start, filter);
        let ctrl_c = spawn_ctrl_c(session.stop_handle());

        let result = inbox
            .deltas(&mut session, |event, object| {
                print_delta(formatter.as_ref(), event, &object)
            })
            .await;
        ctrl_c.abort();

        let summary = result.context("Failed to pull changes")?;
        print_summary(formatter.as_ref(), ctx.format(), &summary)
    }
}
