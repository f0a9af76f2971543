//! FlowBridge core: the flow catalog and the remote workflow client.
//!
//! A [`FlowCatalog`] is built once at startup from [`FlowDefinition`]s,
//! describing flows through the remote service where local metadata is
//! missing. [`WorkflowClient`] issues chat and upload requests; streamed chat
//! responses are decoded lazily into [`ChatFragment`]s.

pub mod catalog;
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod stream;
pub mod types;
mod upload;

pub use catalog::{FlowCatalog, NameCollisionPolicy, UPLOAD_TOOL_NAME};
pub use chat::ChatMode;
pub use client::{FlowDescriber, FlowInfo, WorkflowClient, DEFAULT_BASE_URL};
pub use config::{resolve_config_path, BridgeConfig, FlowDefinition, CONFIG_PATH_ENV};
pub use error::{CoreError, CoreResult};
pub use stream::FragmentStream;
pub use types::{ApiKey, ChatFragment, DiagnosticKind, Flow, FlowParam, InputSchema, PropertySchema};
