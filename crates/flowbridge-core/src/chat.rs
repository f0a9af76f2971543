//! Chat completions against a flow, streamed or blocking.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::client::{ensure_success, WorkflowClient, CHAT_PATH};
use crate::error::CoreResult;
use crate::stream::{decode_event_stream, decode_single_response, FragmentStream};
use crate::types::Flow;

/// Whether the chat endpoint should answer with an event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatMode {
    #[default]
    Streaming,
    Blocking,
}

impl ChatMode {
    pub fn is_streaming(self) -> bool {
        matches!(self, ChatMode::Streaming)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    flow_id: &'a str,
    parameters: &'a Map<String, JsonValue>,
    stream: bool,
}

impl WorkflowClient {
    /// Start a chat completion against `flow`.
    ///
    /// Fails with [`crate::CoreError::Remote`] when the HTTP status is not a
    /// success, before any fragment is produced. Otherwise the returned
    /// stream yields fragments as the body arrives (streaming mode) or
    /// exactly one fragment (blocking mode).
    pub async fn chat(
        &self,
        flow: &Flow,
        inputs: &Map<String, JsonValue>,
        mode: ChatMode,
    ) -> CoreResult<FragmentStream> {
        let body = ChatRequest { flow_id: &flow.flow_id, parameters: inputs, stream: mode.is_streaming() };
        debug!(flow = %flow.name, flow_id = %flow.flow_id, ?mode, "Sending chat request");

        let response = self.post(CHAT_PATH, &flow.api_key).json(&body).send().await?;
        let response = ensure_success(response).await?;

        match mode {
            ChatMode::Streaming => Ok(decode_event_stream(response.bytes_stream())),
            ChatMode::Blocking => {
                let bytes = response.bytes().await?;
                let fragment = decode_single_response(&bytes);
                Ok(stream::once(async move { fragment }).boxed())
            }
        }
    }
}
