//! Flow definitions loaded from the YAML/JSON config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};
use crate::types::{ApiKey, FlowParam};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// A flow as written in the config file, before metadata resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowDefinition {
    #[serde(deserialize_with = "flow_id_from_text_or_number")]
    pub flow_id: String,
    pub api_key: ApiKey,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Only consulted when no describe-call is made for this flow.
    #[serde(default)]
    pub params: Vec<FlowParam>,
}

/// Flow ids are long integers and are often written unquoted.
fn flow_id_from_text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawFlowId {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match RawFlowId::deserialize(deserializer)? {
        RawFlowId::Text(id) => id,
        RawFlowId::Unsigned(id) => id.to_string(),
        RawFlowId::Signed(id) => id.to_string(),
    })
}

impl FlowDefinition {
    pub fn new(flow_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            flow_id: flow_id.into(),
            api_key: ApiKey::new(api_key),
            name: None,
            description: None,
            params: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether name or description must be fetched from the remote service.
    pub fn needs_describe(&self) -> bool {
        self.name.is_none() || self.description.is_none()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConfigFile {
    List(Vec<FlowDefinition>),
    Document {
        #[serde(default)]
        base_url: Option<String>,
        flows: Vec<FlowDefinition>,
    },
}

/// Parsed configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub base_url: Option<String>,
    pub flows: Vec<FlowDefinition>,
}

impl BridgeConfig {
    pub fn from_yaml_str(content: &str) -> CoreResult<Self> {
        let file: ConfigFile = serde_yaml::from_str(content)?;
        let config = match file {
            ConfigFile::List(flows) => Self { base_url: None, flows },
            ConfigFile::Document { base_url, flows } => Self { base_url, flows },
        };
        if config.flows.is_empty() {
            return Err(CoreError::EmptyCatalog);
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> CoreResult<Self> {
        debug!("Loading flow config from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml_str(&content)?;
        info!("Loaded {} flow definition(s) from {}", config.flows.len(), path.display());
        Ok(config)
    }
}

/// Resolve the config path: explicit value first, then `CONFIG_PATH`.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> CoreResult<PathBuf> {
    explicit
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or(CoreError::MissingConfig)
}
