use std::path::PathBuf;

use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("config path not provided (set CONFIG_PATH or pass --config)")]
    MissingConfig,
    #[error("config: {0}")]
    Config(String),
    #[error("no flows defined in configuration")]
    EmptyCatalog,
    #[error("duplicate tool name: {0}")]
    DuplicateName(String),
    #[error("remote service error: {0}")]
    Remote(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("missing required parameter: {0}")]
    MissingParameter(String),
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("serde: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<serde_yaml::Error> for CoreError {
    fn from(err: serde_yaml::Error) -> Self {
        CoreError::Config(err.to_string())
    }
}
