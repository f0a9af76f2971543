//! Maps MCP tool calls onto catalog flows.

use std::path::Path;

use flowbridge_core::{
    ChatFragment, ChatMode, CoreError, FlowCatalog, WorkflowClient, UPLOAD_TOOL_NAME,
};
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{McpError, McpResult};
use crate::mcp::{ContentBlock, Tool};

/// Argument carrying the local path for the upload tool.
pub const FILE_ARGUMENT: &str = "file";

/// A single block produced by a tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub block: ContentBlock,
    pub is_error: bool,
}

impl ToolOutput {
    fn text(text: impl Into<String>) -> Self {
        Self { block: ContentBlock::text(text), is_error: false }
    }

    fn error(text: impl Into<String>) -> Self {
        Self { block: ContentBlock::text(text), is_error: true }
    }
}

impl From<ChatFragment> for ToolOutput {
    fn from(fragment: ChatFragment) -> Self {
        let is_error = fragment.is_terminal_error();
        Self { block: ContentBlock::text(fragment.into_text()), is_error }
    }
}

pub type ToolOutputStream = BoxStream<'static, ToolOutput>;

pub struct ToolAdapter {
    catalog: FlowCatalog,
    client: WorkflowClient,
}

impl ToolAdapter {
    pub fn new(catalog: FlowCatalog, client: WorkflowClient) -> Self {
        Self { catalog, client }
    }

    pub fn catalog(&self) -> &FlowCatalog {
        &self.catalog
    }

    /// One descriptor per catalog flow, in catalog order.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.catalog
            .flows()
            .iter()
            .map(|flow| Tool {
                name: flow.name.clone(),
                description: Some(flow.description.clone()),
                input_schema: flow.input_schema.to_json(),
            })
            .collect()
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> McpResult<ToolOutputStream> {
        self.call_tool_with_mode(name, arguments, ChatMode::Streaming).await
    }

    /// Invoke a tool and return its output blocks as they are produced.
    ///
    /// Unknown tools, missing or malformed arguments and local file errors
    /// reject the call. Failures of the remote service are reported in-band
    /// as a single error block so the caller still receives a result.
    pub async fn call_tool_with_mode(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
        mode: ChatMode,
    ) -> McpResult<ToolOutputStream> {
        let flow = self.catalog.lookup(name)?;
        let arguments = arguments.unwrap_or_default();

        if flow.name == UPLOAD_TOOL_NAME {
            let file = match arguments.get(FILE_ARGUMENT) {
                None | Some(Value::Null) => {
                    return Err(CoreError::MissingParameter(FILE_ARGUMENT.to_string()).into())
                }
                Some(Value::String(path)) => path.clone(),
                Some(other) => {
                    return Err(McpError::InvalidArguments(format!(
                        "'{}' must be a string path, got {}",
                        FILE_ARGUMENT, other
                    )))
                }
            };
            debug!(file = %file, "Uploading file");
            return match self.client.upload_file(&flow.api_key, Path::new(&file)).await {
                Ok(body) => Ok(stream::once(async move { ToolOutput::text(body) }).boxed()),
                Err(err) => in_band(err),
            };
        }

        debug!(tool = %flow.name, ?mode, "Calling flow");
        match self.client.chat(flow, &arguments, mode).await {
            Ok(fragments) => Ok(fragments.map(ToolOutput::from).boxed()),
            Err(err) => in_band(err),
        }
    }
}

fn in_band(err: CoreError) -> McpResult<ToolOutputStream> {
    match err {
        CoreError::Remote(_) | CoreError::Http(_) | CoreError::Decode(_) => {
            warn!(error = %err, "Remote call failed");
            let output = ToolOutput::error(err.to_string());
            Ok(stream::once(async move { output }).boxed())
        }
        other => Err(other.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowbridge_core::{
        ApiKey, CoreResult, FlowDefinition, FlowDescriber, FlowInfo, InputSchema,
        NameCollisionPolicy,
    };

    struct Fixed;

    #[async_trait::async_trait]
    impl FlowDescriber for Fixed {
        async fn describe_flow(&self, flow_id: &str, _api_key: &ApiKey) -> CoreResult<FlowInfo> {
            Ok(FlowInfo {
                name: format!("flow_{}", flow_id),
                description: "remote".to_string(),
                input_schema: InputSchema::new().with_property("query", "string", "question", true),
            })
        }
    }

    async fn adapter() -> ToolAdapter {
        let catalog = FlowCatalog::build(
            vec![FlowDefinition::new("1", "k1"), FlowDefinition::new("2", "k2")],
            &Fixed,
            NameCollisionPolicy::LastWins,
        )
        .await
        .unwrap();
        ToolAdapter::new(catalog, WorkflowClient::new("http://127.0.0.1:9"))
    }

    #[tokio::test]
    async fn lists_one_tool_per_flow_in_order() {
        let tools = adapter().await.list_tools();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["flow_1", "flow_2", UPLOAD_TOOL_NAME]);
        assert_eq!(tools[0].input_schema["required"][0], "query");
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let err = adapter().await.call_tool("nonexistent", None).await.err().unwrap();
        assert!(matches!(err, McpError::Core(CoreError::UnknownTool(_))));
    }

    #[tokio::test]
    async fn upload_without_file_is_missing_parameter() {
        let err = adapter().await.call_tool(UPLOAD_TOOL_NAME, Some(Map::new())).await.err().unwrap();
        assert!(matches!(err, McpError::Core(CoreError::MissingParameter(p)) if p == "file"));
    }

    #[tokio::test]
    async fn upload_with_non_string_file_is_invalid_arguments() {
        let mut args = Map::new();
        args.insert("file".into(), Value::from(42));
        let err = adapter().await.call_tool(UPLOAD_TOOL_NAME, Some(args)).await.err().unwrap();
        assert!(matches!(err, McpError::InvalidArguments(_)));
    }

    #[test]
    fn terminal_diagnostics_become_error_outputs() {
        let out = ToolOutput::from(ChatFragment::diagnostic(
            flowbridge_core::DiagnosticKind::Remote,
            "{\"code\":1}",
        ));
        assert!(out.is_error);
        let out = ToolOutput::from(ChatFragment::diagnostic(
            flowbridge_core::DiagnosticKind::Decode,
            "bad frame",
        ));
        assert!(!out.is_error);
    }
}
