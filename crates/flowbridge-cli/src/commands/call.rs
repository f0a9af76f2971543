//! Single tool invocation command

use flowbridge_core::ChatMode;
use futures::StreamExt;
use tracing::{debug, info};

use crate::{
    cli::GlobalArgs,
    error::{CliError, CliResult},
    utils::{parse_tool_arguments, ColoredOutput},
};

pub struct CallCommand;

impl CallCommand {
    pub async fn run(
        global: &GlobalArgs,
        name: &str,
        args: Option<String>,
        no_stream: bool,
    ) -> CliResult<()> {
        let arguments = parse_tool_arguments(args.as_deref())?;
        let mode = if no_stream { ChatMode::Blocking } else { ChatMode::Streaming };

        let adapter = super::load_adapter(global).await?;
        info!("Calling tool: {}", name);

        let mut outputs = adapter.call_tool_with_mode(name, Some(arguments), mode).await?;
        let mut blocks = 0usize;
        let mut failed = false;
        while let Some(output) = outputs.next().await {
            blocks += 1;
            failed = output.is_error;
            if output.is_error {
                eprintln!("{}", ColoredOutput::error(output.block.as_text()));
            } else {
                println!("{}", output.block.as_text());
            }
        }
        debug!("{} produced {} blocks", name, blocks);
        if blocks == 0 {
            eprintln!("{}", ColoredOutput::dim("(no output)"));
        }

        if failed {
            return Err(CliError::ToolFailed(name.to_string()));
        }
        Ok(())
    }
}
