//! Tool listing command

use crate::{cli::GlobalArgs, error::CliResult};

pub struct ToolsCommand;

impl ToolsCommand {
    pub async fn run(global: &GlobalArgs) -> CliResult<()> {
        let adapter = super::load_adapter(global).await?;
        let tools = adapter.list_tools();
        println!("{}", serde_json::to_string_pretty(&tools)?);
        Ok(())
    }
}
