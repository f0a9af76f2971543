pub mod call;
pub mod serve;
pub mod tools;

use flowbridge_core::{
    resolve_config_path, BridgeConfig, FlowCatalog, NameCollisionPolicy, WorkflowClient,
    DEFAULT_BASE_URL,
};
use flowbridge_mcp::ToolAdapter;
use tracing::info;

use crate::{cli::GlobalArgs, error::CliResult};

// Re-export command handlers
pub use call::CallCommand;
pub use tools::ToolsCommand;

/// Base URL precedence: command line or environment, then the config file, then the default.
pub fn resolve_base_url(flag: Option<&str>, config: Option<&str>) -> String {
    flag.or(config).unwrap_or(DEFAULT_BASE_URL).to_string()
}

/// Load the flow configuration and build the catalog behind a tool adapter.
pub async fn load_adapter(global: &GlobalArgs) -> CliResult<ToolAdapter> {
    let path = resolve_config_path(global.config.clone())?;
    let config = BridgeConfig::load(&path)?;

    let base_url = resolve_base_url(global.base_url.as_deref(), config.base_url.as_deref());
    info!("Workflow service: {}", base_url);
    let client = WorkflowClient::new(base_url);

    let policy = if global.strict_names {
        NameCollisionPolicy::Reject
    } else {
        NameCollisionPolicy::LastWins
    };
    let catalog = FlowCatalog::build(config.flows, &client, policy).await?;
    info!("Registered {} tools", catalog.len());

    Ok(ToolAdapter::new(catalog, client))
}
