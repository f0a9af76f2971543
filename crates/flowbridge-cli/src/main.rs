//! FlowBridge CLI main entry point

use clap::Parser;
use flowbridge_cli::{
    cli::{Cli, Commands},
    commands::{CallCommand, ToolsCommand},
    error::CliResult,
    utils::{init_tracing, ColoredOutput},
};
use tracing::info;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {}", ColoredOutput::error("Error:"), e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    init_tracing()?;

    if cli.no_color {
        colored::control::set_override(false);
    }

    info!("FlowBridge v{}", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => flowbridge_cli::commands::serve::execute(&cli.global)
            .await
            .map_err(|e| e.into()),

        Commands::Tools => ToolsCommand::run(&cli.global).await,

        Commands::Call { name, args, no_stream } => {
            CallCommand::run(&cli.global, &name, args, no_stream).await
        }
    }
}
