//! Multipart file upload to the workflow service.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use crate::client::{ensure_success, WorkflowClient, UPLOAD_PATH};
use crate::error::{CoreError, CoreResult};
use crate::types::ApiKey;

/// Multipart field the upload endpoint reads the file from.
const FILE_FIELD: &str = "file";

impl WorkflowClient {
    /// Upload a local file and return the response body verbatim.
    pub async fn upload_file(&self, api_key: &ApiKey, file_path: &Path) -> CoreResult<String> {
        let bytes = tokio::fs::read(file_path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CoreError::FileNotFound(file_path.to_path_buf()),
            _ => CoreError::Io(e),
        })?;
        debug!("Uploading {} ({} bytes)", file_path.display(), bytes.len());

        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| FILE_FIELD.to_string());
        let form = Form::new().part(FILE_FIELD, Part::bytes(bytes).file_name(file_name));

        let response = self.post(UPLOAD_PATH, api_key).multipart(form).send().await?;
        let response = ensure_success(response).await?;

        let body = response.bytes().await?;
        let text = String::from_utf8(body.to_vec()).map_err(|e| {
            CoreError::Decode(format!("upload response is not valid UTF-8: {}", e))
        })?;
        info!("Uploaded {}", file_path.display());
        Ok(text)
    }
}
