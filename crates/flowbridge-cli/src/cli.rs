//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "flowbridge",
    about = "FlowBridge - expose remote workflows as MCP tools",
    version,
    author = "TRS Team"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub global: GlobalArgs,

    /// Disable colored output
    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,
}

/// Options shared by every command that builds the flow catalog.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Flow configuration file; falls back to $CONFIG_PATH
    #[arg(long, global = true, help = "Path to the flow configuration file (YAML or JSON)")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "FLOWBRIDGE_BASE_URL",
        help = "Base URL of the workflow service"
    )]
    pub base_url: Option<String>,

    /// Reject flows that resolve to an already registered tool name
    #[arg(long, global = true, help = "Fail on duplicate tool names instead of keeping the last one")]
    pub strict_names: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the MCP server on stdio (default)
    Serve,

    /// Print the tool descriptors as JSON
    Tools,

    /// Invoke a single tool and print its output
    Call {
        #[arg(help = "Tool name")]
        name: String,

        /// Tool arguments as a JSON object
        #[arg(long, help = "Tool arguments as a JSON object")]
        args: Option<String>,

        #[arg(long, help = "Wait for the complete answer instead of streaming")]
        no_stream: bool,
    },
}
