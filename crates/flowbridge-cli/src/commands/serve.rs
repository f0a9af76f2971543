//! MCP server command

use anyhow::Result;
use tracing::info;

use crate::cli::GlobalArgs;

pub async fn execute(global: &GlobalArgs) -> Result<()> {
    info!("Starting FlowBridge MCP server");
    let adapter = super::load_adapter(global).await?;
    flowbridge_mcp::serve_stdio(adapter).await?;
    Ok(())
}
