//! Latest-cursor command - Print the head of the change log
//!
//! The printed cursor can be passed to `pull --cursor` or `stream --cursor`
//! later to receive only changes made after this point.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use super::CommandContext;

#[derive(Debug, Args)]
pub struct LatestCursorCommand {}

impl LatestCursorCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let inbox = ctx.inbox()?;

        info!(base_url = %inbox.client().base_url(), "Requesting latest cursor");

        let cursor = inbox
            .latest_cursor()
            .await
            .context("Failed to fetch the latest cursor")?;

        if ctx.format().is_json() {
            formatter.print_json(&serde_json::json!({ "cursor": cursor.as_str() }));
        } else {
            println!("{}", cursor);
        }

        Ok(())
    }
}
