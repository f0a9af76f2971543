//! Utility functions for the CLI

use crate::error::{CliError, CliResult};
use colored::{ColoredString, Colorize};
use serde_json::{Map, Value as JsonValue};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize tracing on stderr; stdout carries the MCP channel.
pub fn init_tracing() -> CliResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| CliError::General(format!("Failed to set tracing subscriber: {}", e)))?;

    Ok(())
}

/// Utility for colored console output
pub struct ColoredOutput;

impl ColoredOutput {
    pub fn error(msg: &str) -> ColoredString {
        msg.red().bold()
    }

    pub fn dim(msg: &str) -> ColoredString {
        msg.dimmed()
    }
}

/// Parse `--args` into a tool argument object. Absent input is an empty object.
pub fn parse_tool_arguments(input: Option<&str>) -> CliResult<Map<String, JsonValue>> {
    let Some(input) = input else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<JsonValue>(input) {
        Ok(JsonValue::Object(map)) => Ok(map),
        Ok(other) => Err(CliError::InvalidArgument(format!(
            "Tool arguments must be a JSON object, got: {}",
            other
        ))),
        Err(e) => Err(CliError::InvalidArgument(format!("Invalid JSON input: {}", e))),
    }
}
