//! Image uploads to the `/upload` endpoint.

use catalog_editor_core::{ImageFile, ImageUploader, UploadError};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::ApiResponse;
use crate::notify::Notification;

/// Where a multi-file upload stored each file, in upload order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFiles {
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub file_names: Vec<String>,
}

/// Uploads files as multipart form data under the field name `file`.
#[derive(Debug, Clone)]
pub struct UploadService {
    client: ApiClient,
}

impl UploadService {
    pub const PATH: &'static str = "/upload";
    pub const FIELD: &'static str = "file";
    pub const MULTIPLE_PATH: &'static str = "/upload/multiple";

    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Upload one file and return the path the server stored it under.
    pub async fn upload_file(&self, file: &ImageFile) -> Result<String, ApiError> {
        let form = Form::new().part(Self::FIELD, file_part(file)?);

        let body: Value = self.client.upload(Self::PATH, form).await?;
        let path = stored_path(&body).ok_or_else(|| ApiError::Decode {
            url: self.client.url(Self::PATH),
            message: "upload response has no path".into(),
        })?;

        tracing::debug!(name = %file.name, %path, "uploaded file");
        self.client
            .notify(Notification::info("Success", "File uploaded successfully"));
        Ok(path)
    }

    /// Upload several files in one request, as fields `files[0]`, `files[1]`, ...
    pub async fn upload_files(&self, files: &[ImageFile]) -> Result<UploadedFiles, ApiError> {
        let mut form = Form::new();
        for (index, file) in files.iter().enumerate() {
            form = form.part(format!("files[{index}]"), file_part(file)?);
        }

        let response: ApiResponse<UploadedFiles> =
            self.client.upload(Self::MULTIPLE_PATH, form).await?;
        tracing::debug!(count = files.len(), "uploaded files");
        self.client.notify(Notification::info(
            "Success",
            format!("{} files uploaded successfully", files.len()),
        ));
        Ok(response.data)
    }
}

fn file_part(file: &ImageFile) -> Result<Part, ApiError> {
    Part::bytes(file.data.to_vec())
        .file_name(file.name.to_string())
        .mime_str(&file.media_type)
        .map_err(|e| ApiError::Request {
            message: format!("bad media type {:?}: {e}", file.media_type),
        })
}

/// The stored location in an upload response.
///
/// Servers answer `{path}` or `{url}`, either bare or inside a `data`
/// envelope.
fn stored_path(body: &Value) -> Option<String> {
    let pick = |v: &Value| {
        v.get("path")
            .or_else(|| v.get("url"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    pick(body).or_else(|| body.get("data").and_then(pick))
}

impl ImageUploader for UploadService {
    async fn upload_image(&self, file: &ImageFile) -> Result<String, UploadError> {
        self.upload_file(file).await.map_err(|err| match err {
            ApiError::Network { .. } => UploadError::Transport(err.to_string()),
            other => UploadError::Rejected(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stored_path_shapes() {
        assert_eq!(
            stored_path(&json!({"path": "images/cat.png"})).as_deref(),
            Some("images/cat.png")
        );
        assert_eq!(
            stored_path(&json!({"success": true, "url": "/placeholder.svg", "fileName": "1-cat.png"}))
                .as_deref(),
            Some("/placeholder.svg")
        );
        assert_eq!(
            stored_path(&json!({"success": true, "data": {"url": "https://cdn.example.com/a.png"}}))
                .as_deref(),
            Some("https://cdn.example.com/a.png")
        );
        assert_eq!(stored_path(&json!({"path": ""})), None);
        assert_eq!(stored_path(&json!({"error": "No file provided"})), None);
    }
}
