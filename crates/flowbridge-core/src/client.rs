//! HTTP client for the remote workflow service.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::types::{ApiKey, InputSchema};

/// Production endpoint of the workflow service.
pub const DEFAULT_BASE_URL: &str = "https://xingchen-api.xf-yun.com";

pub(crate) const DESCRIBE_PATH: &str = "/workflow/v1/get_flow_info";
pub(crate) const CHAT_PATH: &str = "/workflow/v1/chat/completions";
pub(crate) const UPLOAD_PATH: &str = "/workflow/v1/upload_file";

/// Node id prefix of a workflow's entry node; its outputs are the flow inputs.
const START_NODE_PREFIX: &str = "node-start";

/// Metadata of a flow as reported by the describe endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowInfo {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

/// Source of flow metadata used while building the catalog.
#[async_trait]
pub trait FlowDescriber: Send + Sync {
    async fn describe_flow(&self, flow_id: &str, api_key: &ApiKey) -> CoreResult<FlowInfo>;
}

#[derive(Debug, Deserialize)]
struct DescribeEnvelope {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<DescribeData>,
}

#[derive(Debug, Deserialize)]
struct DescribeData {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    data: Option<FlowGraph>,
}

#[derive(Debug, Default, Deserialize)]
struct FlowGraph {
    #[serde(default)]
    nodes: Vec<FlowNode>,
}

#[derive(Debug, Deserialize)]
struct FlowNode {
    #[serde(default)]
    id: String,
    #[serde(default)]
    data: Option<FlowNodeData>,
}

#[derive(Debug, Default, Deserialize)]
struct FlowNodeData {
    #[serde(default)]
    outputs: Vec<NodeOutput>,
}

#[derive(Debug, Deserialize)]
struct NodeOutput {
    name: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    schema: Option<OutputSchema>,
}

#[derive(Debug, Deserialize)]
struct OutputSchema {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    default: Option<JsonValue>,
}

impl NodeOutput {
    fn kind(&self) -> &str {
        self.schema.as_ref().and_then(|s| s.kind.as_deref()).unwrap_or("string")
    }

    /// Explicit description, falling back to the schema's default text.
    fn description(&self) -> String {
        if let Some(d) = &self.description {
            return d.clone();
        }
        match self.schema.as_ref().and_then(|s| s.default.as_ref()) {
            Some(JsonValue::String(s)) => s.clone(),
            Some(JsonValue::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

impl FlowGraph {
    fn input_schema(&self, flow_id: &str) -> InputSchema {
        let start = self.nodes.iter().find(|n| n.id.starts_with(START_NODE_PREFIX));
        let Some(start) = start else {
            warn!("Flow {} has no start node; advertising an empty input schema", flow_id);
            return InputSchema::new();
        };
        start
            .data
            .as_ref()
            .map(|d| d.outputs.as_slice())
            .unwrap_or_default()
            .iter()
            .fold(InputSchema::new(), |schema, out| {
                schema.with_property(&out.name, out.kind(), out.description(), out.required)
            })
    }
}

/// Client for the three workflow endpoints (describe, chat, upload).
#[derive(Debug, Clone)]
pub struct WorkflowClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for WorkflowClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl WorkflowClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(reqwest::Client::new(), base_url)
    }

    pub fn with_http_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn get(&self, path: &str, api_key: &ApiKey) -> RequestBuilder {
        self.http.get(self.url(path)).bearer_auth(api_key.expose())
    }

    pub(crate) fn post(&self, path: &str, api_key: &ApiKey) -> RequestBuilder {
        self.http.post(self.url(path)).bearer_auth(api_key.expose())
    }

    /// Fetch canonical name, description and input schema of a flow.
    pub async fn get_flow_info(&self, flow_id: &str, api_key: &ApiKey) -> CoreResult<FlowInfo> {
        debug!("Describing flow {}", flow_id);
        let path = format!("{}/{}", DESCRIBE_PATH, flow_id);
        let response = self.get(&path, api_key).send().await?;
        let response = ensure_success(response).await?;

        let envelope: DescribeEnvelope = response.json().await?;
        if envelope.code != 0 {
            return Err(CoreError::Remote(format!(
                "describe flow {} failed with code {}: {}",
                flow_id, envelope.code, envelope.message
            )));
        }
        let data = envelope.data.ok_or_else(|| {
            CoreError::Decode(format!("describe flow {}: response has no data", flow_id))
        })?;

        let input_schema = data.data.unwrap_or_default().input_schema(flow_id);
        Ok(FlowInfo { name: data.name, description: data.description, input_schema })
    }
}

#[async_trait]
impl FlowDescriber for WorkflowClient {
    async fn describe_flow(&self, flow_id: &str, api_key: &ApiKey) -> CoreResult<FlowInfo> {
        self.get_flow_info(flow_id, api_key).await
    }
}

/// Turn a non-success HTTP status into [`CoreError::Remote`] before any body
/// is consumed by the caller.
pub(crate) async fn ensure_success(response: Response) -> CoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(CoreError::Remote(format!("{} returned HTTP {}: {}", url, status, body.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graph(value: JsonValue) -> FlowGraph {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn schema_comes_from_start_node_outputs() {
        let g = graph(json!({
            "nodes": [
                {"id": "node-end::1", "data": {"outputs": [{"name": "ignored"}]}},
                {"id": "node-start::0", "data": {"outputs": [
                    {"name": "AGENT_USER_INPUT", "required": true,
                     "schema": {"type": "string", "default": "user question"}},
                    {"name": "img", "required": false,
                     "schema": {"type": "string"}, "description": "image url"}
                ]}}
            ]
        }));
        let schema = g.input_schema("f");
        assert_eq!(schema.required, vec!["AGENT_USER_INPUT"]);
        assert_eq!(schema.properties["AGENT_USER_INPUT"].description, "user question");
        assert_eq!(schema.properties["img"].description, "image url");
        assert!(!schema.properties.contains_key("ignored"));
    }

    #[test]
    fn missing_start_node_gives_empty_schema() {
        let g = graph(json!({"nodes": [{"id": "node-llm::1"}]}));
        assert_eq!(g.input_schema("f"), InputSchema::new());
    }

    #[test]
    fn output_type_defaults_to_string() {
        let g = graph(json!({"nodes": [{"id": "node-start::1", "data": {"outputs": [{"name": "q"}]}}]}));
        assert_eq!(g.input_schema("f").properties["q"].kind, "string");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = WorkflowClient::new("http://localhost:8080/");
        assert_eq!(client.url(CHAT_PATH), "http://localhost:8080/workflow/v1/chat/completions");
    }

    #[test]
    fn default_points_at_production() {
        assert_eq!(WorkflowClient::default().base_url(), DEFAULT_BASE_URL);
    }
}
