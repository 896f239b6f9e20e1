//! Config command - View and manage deltasync configuration
//!
//! Provides the `deltasync config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use deltasync_core::config::Config;

use super::CommandContext;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "sync.exclude_types")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx),
            ConfigCommand::Set { key, value } => self.execute_set(ctx, key, value),
            ConfigCommand::Validate => self.execute_validate(ctx),
        }
    }

    fn execute_show(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config_path = ctx.config_path();

        info!(config_path = %config_path.display(), "Showing configuration");

        if ctx.format().is_json() {
            let json = serde_json::to_value(ctx.config())
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", config_path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(ctx.config())
                .context("Failed to serialize configuration to YAML")?;

            for line in yaml.lines() {
                formatter.info(line);
            }
        }

        Ok(())
    }

    fn execute_set(&self, ctx: &CommandContext, key: &str, value: &str) -> Result<()> {
        let formatter = ctx.formatter();
        let config_path = ctx.config_path();
        let mut config = Config::load_or_default(config_path);

        info!(key = %key, value = %value, "Setting configuration value");

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if ctx.format().is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{}': {}", key, e));
                formatter.info("");
                formatter.info("Supported keys:");
                for (name, description) in SUPPORTED_KEYS {
                    formatter.info(&format!("  {:<37}- {}", name, description));
                }
            }
            return Ok(());
        }

        let errors = config.validate();
        if !errors.is_empty() {
            let error_msgs: Vec<String> = errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();

            if ctx.format().is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "errors": error_msgs,
                }));
            } else {
                formatter.error(&format!(
                    "Invalid value for '{}': {}",
                    key,
                    error_msgs.join("; ")
                ));
            }
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
        }

        let yaml = serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
        std::fs::write(config_path, &yaml).context("Failed to write configuration file")?;

        if ctx.format().is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "value": value,
                "config_path": config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {} = {}", key, value));
            formatter.info(&format!("Saved to {}", config_path.display()));
        }

        Ok(())
    }

    fn execute_validate(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config_path = ctx.config_path();

        // Load explicitly so parse errors are reported instead of defaulted
        let config = match Config::load(config_path) {
            Ok(cfg) => cfg,
            Err(_) if !config_path.exists() => {
                if ctx.format().is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": ["Configuration file not found. Using defaults."],
                    }));
                } else {
                    formatter.info(&format!(
                        "Configuration file not found at {}",
                        config_path.display()
                    ));
                    formatter.info("Using default configuration. Run 'deltasync config set <key> <value>' to create one.");
                }
                return Ok(());
            }
            Err(e) => {
                if ctx.format().is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": [format!("Failed to parse configuration: {}", e)],
                    }));
                } else {
                    formatter.error(&format!("Failed to parse configuration: {}", e));
                    formatter.info(&format!("File: {}", config_path.display()));
                }
                return Ok(());
            }
        };

        info!(config_path = %config_path.display(), "Validating configuration");

        let errors = config.validate();

        if ctx.format().is_json() {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", config_path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {}", config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }

        Ok(())
    }
}

const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("api.base_url", "API host"),
    ("api.timeout_secs", "Request timeout for page calls (seconds)"),
    ("sync.exclude_folders", "true|false"),
    ("sync.exclude_types", "Comma-separated object types to leave out"),
    ("sync.include_types", "Comma-separated object types to keep"),
    ("sync.expanded_view", "true|false"),
    ("sync.stream_inactivity_timeout_secs", "Seconds without data (0 disables)"),
    ("logging.level", "trace|debug|info|warn|error"),
];

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- api ---
        "api.base_url" => {
            config.api.base_url = value.to_string();
        }
        "api.timeout_secs" => {
            config.api.timeout_secs = value
                .parse::<u64>()
                .context("Expected a positive integer for api.timeout_secs")?;
        }

        // --- sync ---
        "sync.exclude_folders" => {
            config.sync.exclude_folders = value
                .parse::<bool>()
                .context("Expected true or false")?;
        }
        "sync.exclude_types" => {
            config.sync.exclude_types = parse_list(value);
        }
        "sync.include_types" => {
            config.sync.include_types = parse_list(value);
        }
        "sync.expanded_view" => {
            config.sync.expanded_view = value
                .parse::<bool>()
                .context("Expected true or false")?;
        }
        "sync.stream_inactivity_timeout_secs" => {
            config.sync.stream_inactivity_timeout_secs = value
                .parse::<u64>()
                .context("Expected a non-negative integer")?;
        }

        // --- logging ---
        "logging.level" => {
            config.logging.level = value.to_string();
        }

        _ => {
            anyhow::bail!("Unknown configuration key: '{}'", key);
        }
    }

    Ok(())
}
