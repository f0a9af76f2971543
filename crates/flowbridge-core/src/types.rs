use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

/// Placeholder printed wherever an API key would otherwise appear.
const REDACTED_PLACEHOLDER: &str = "***REDACTED***";

/// Bearer credential for a flow. Never printed through `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw credential, for building the `Authorization` header only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", REDACTED_PLACEHOLDER)
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED_PLACEHOLDER)
    }
}

/// One property of a flow's input schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
}

/// Accepted parameters of a flow, rendered as a JSON-Schema object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSchema {
    pub properties: IndexMap<String, PropertySchema>,
    pub required: Vec<String>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(
        mut self,
        name: impl Into<String>,
        kind: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let name = name.into();
        if required && !self.required.contains(&name) {
            self.required.push(name.clone());
        }
        self.properties.insert(
            name,
            PropertySchema { kind: kind.into(), description: description.into() },
        );
        self
    }

    pub fn from_params(params: &[FlowParam]) -> Self {
        params.iter().fold(Self::new(), |schema, p| {
            schema.with_property(&p.name, &p.kind, &p.description, p.required)
        })
    }

    pub fn to_json(&self) -> JsonValue {
        json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }
}

/// Locally declared parameter, as written in the config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlowParam {
    pub name: String,
    #[serde(rename = "type", default = "default_param_kind")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

fn default_param_kind() -> String {
    "string".to_string()
}

/// A remote workflow registered as a callable tool.
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    pub flow_id: String,
    pub name: String,
    pub description: String,
    pub api_key: ApiKey,
    pub input_schema: InputSchema,
}

/// What kind of problem a diagnostic fragment reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A single malformed frame; the stream carries on.
    Decode,
    /// The remote service reported a failure; the stream ends.
    Remote,
    /// The connection broke mid-stream; the stream ends.
    Transport,
}

/// One incremental piece of chat output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatFragment {
    Content(String),
    Diagnostic { kind: DiagnosticKind, message: String },
}

impl ChatFragment {
    pub fn content(text: impl Into<String>) -> Self {
        ChatFragment::Content(text.into())
    }

    pub fn diagnostic(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        ChatFragment::Diagnostic { kind, message: message.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            ChatFragment::Content(text) => text,
            ChatFragment::Diagnostic { message, .. } => message,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            ChatFragment::Content(text) => text,
            ChatFragment::Diagnostic { message, .. } => message,
        }
    }

    /// True for diagnostics after which no further fragment follows.
    pub fn is_terminal_error(&self) -> bool {
        matches!(
            self,
            ChatFragment::Diagnostic { kind: DiagnosticKind::Remote | DiagnosticKind::Transport, .. }
        )
    }
}
