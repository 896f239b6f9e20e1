//! CLI subcommands and the context they share

pub mod config;
pub mod latest_cursor;
pub mod pull;
pub mod stream;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::{json, Value};
use tokio::signal;
use tracing::{info, warn};

use deltasync_api::client::ApiClient;
use deltasync_api::inbox::Inbox;
use deltasync_api::models::DomainObject;
use deltasync_core::config::{Config, ConfigBuilder};
use deltasync_core::domain::{Cursor, DeltaFilter, EventKind, StopHandle, SyncSummary};

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Settings resolved from global flags and the configuration file
#[derive(Debug)]
pub struct CommandContext {
    config: Config,
    config_path: PathBuf,
    token: Option<String>,
    format: OutputFormat,
}

impl CommandContext {
    pub fn new(
        config: Config,
        config_path: PathBuf,
        token: Option<String>,
        base_url: Option<String>,
        format: OutputFormat,
    ) -> Self {
        let config = match base_url {
            Some(url) => ConfigBuilder::from_config(config).api_base_url(url).build(),
            None => config,
        };
        Self {
            config,
            config_path,
            token: token.filter(|t| !t.trim().is_empty()),
            format,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format)
    }

    /// Builds an Inbox for the configured host and access token
    pub fn inbox(&self) -> Result<Inbox> {
        let Some(token) = &self.token else {
            bail!("No access token given. Pass --token or set DELTASYNC_ACCESS_TOKEN");
        };

        let client = ApiClient::with_base_url(token.as_str(), self.config.api.base_url.as_str())
            .with_request_timeout(self.config.request_timeout());
        Ok(Inbox::from_client(client))
    }
}

/// Filter flags shared by `pull` and `stream`
///
/// Flags that are given override the `sync` section of the configuration.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Leave folder and label changes out
    #[arg(long)]
    pub exclude_folders: bool,

    /// Object types to leave out (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub exclude_types: Vec<String>,

    /// Only deliver these object types (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub include_types: Vec<String>,

    /// Deliver messages in their expanded form
    #[arg(long)]
    pub expanded: bool,
}

impl FilterArgs {
    /// Merges the flags into `config`
    pub fn apply(&self, config: &Config) -> Config {
        let mut builder = ConfigBuilder::from_config(config.clone());
        if self.exclude_folders {
            builder = builder.sync_exclude_folders(true);
        }
        if !self.exclude_types.is_empty() {
            builder = builder.sync_exclude_types(self.exclude_types.iter().map(|t| t.trim()));
        }
        if !self.include_types.is_empty() {
            builder = builder.sync_include_types(self.include_types.iter().map(|t| t.trim()));
        }
        if self.expanded {
            builder = builder.sync_expanded_view(true);
        }
        builder.build()
    }

    /// Builds the filter for a run
    pub fn delta_filter(&self, config: &Config) -> Result<DeltaFilter> {
        self.apply(config)
            .delta_filter()
            .context("Invalid type filter")
    }
}

/// Parses the `--cursor` flag, `0` when absent
pub fn start_cursor(cursor: Option<&str>) -> Result<Cursor> {
    match cursor {
        Some(value) => Cursor::new(value).context("Invalid start cursor"),
        None => Ok(Cursor::beginning()),
    }
}

/// JSON form of one delivered change
pub fn delta_json(event: EventKind, object: &DomainObject) -> Value {
    let mut value = json!({
        "event": event.as_str(),
        "object": object.type_tag(),
        "id": object.id(),
        "cursor": object.cursor().as_str(),
    });
    if event.carries_attributes() {
        value["attributes"] = Value::Object(object.resource().attributes().clone());
    }
    value
}

/// One-line human form of one delivered change
pub fn delta_line(event: EventKind, object: &DomainObject) -> String {
    match object.label() {
        Some(label) => format!(
            "{:<6} {:<9} {} ({}) @ {}",
            event,
            object.type_tag(),
            object.id(),
            label,
            object.cursor()
        ),
        None => format!(
            "{:<6} {:<9} {} @ {}",
            event,
            object.type_tag(),
            object.id(),
            object.cursor()
        ),
    }
}

pub fn print_delta(formatter: &dyn OutputFormatter, event: EventKind, object: &DomainObject) {
    formatter.record(&delta_line(event, object), &delta_json(event, object));
}

/// Reports how a callback-mode run ended
pub fn print_summary(
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
    summary: &SyncSummary,
) -> Result<()> {
    if format.is_json() {
        let value = serde_json::to_value(summary).context("Failed to serialize sync summary")?;
        formatter.record("", &json!({ "summary": value }));
        return Ok(());
    }

    let verb = if summary.stopped_by_consumer {
        "Stopped"
    } else {
        "Done"
    };
    formatter.success(&format!(
        "{}: {} change{} delivered, {} skipped",
        verb,
        summary.dispatched,
        if summary.dispatched == 1 { "" } else { "s" },
        summary.skipped
    ));
    if summary.pages > 0 {
        formatter.info(&format!("Pages:  {}", summary.pages));
    }
    if summary.chunks > 0 {
        formatter.info(&format!("Chunks: {}", summary.chunks));
    }
    formatter.info(&format!("Resume from cursor: {}", summary.final_cursor));
    Ok(())
}

/// Sets `stop` when Ctrl+C is received
pub fn spawn_ctrl_c(stop: StopHandle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, stopping after the current record");
                stop.stop();
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C signal"),
        }
    })
}
