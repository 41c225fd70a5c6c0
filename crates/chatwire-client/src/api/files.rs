//! Files API.
//!
//! Uploads are checked against [`MAX_UPLOAD_BYTES`] before any bytes leave
//! the process. Status codes specific to file storage come back as
//! [`FileOperationError`] rather than generic API errors.

use std::path::Path;

use bytes::Bytes;
use reqwest::Method;

use crate::client::ChatwireClient;
use crate::error::{ApiError, Error, FileOperationError, Result, ValidationError};
use crate::types::{FileInfo, FileList};

/// Largest upload the service accepts (100 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Files API client.
pub struct FilesApi {
    client: ChatwireClient,
}

impl FilesApi {
    pub(crate) fn new(client: ChatwireClient) -> Self {
        Self { client }
    }

    /// List uploaded files.
    pub async fn list(&self) -> Result<FileList> {
        self.client
            .pipeline()
            .get("files")
            .await
            .map_err(|e| file_error(e, "files"))
    }

    /// Get file metadata.
    pub async fn get(&self, id: &str) -> Result<FileInfo> {
        self.client
            .pipeline()
            .get(&format!("files/{}", id))
            .await
            .map_err(|e| file_error(e, id))
    }

    /// Upload in-memory content.
    pub async fn upload_bytes(
        &self,
        filename: &str,
        content: impl Into<Bytes>,
        purpose: Option<&str>,
    ) -> Result<FileInfo> {
        let content = content.into();
        validate_upload(filename, content.len() as u64)?;

        let pipeline = self.client.pipeline();
        let mut url = pipeline.url("files")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("filename", filename);
            if let Some(purpose) = purpose {
                query.append_pair("purpose", purpose);
            }
        }

        tracing::debug!(filename, bytes = content.len(), "Uploading file");
        pipeline
            .post_bytes(url, "application/octet-stream", content)
            .await
            .map_err(|e| file_error(e, filename))
    }

    /// Upload a local file.
    pub async fn upload(&self, path: impl AsRef<Path>, purpose: Option<&str>) -> Result<FileInfo> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(ValidationError::EmptyField { field: "filename" })?;

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| local_io_error(e, &display))?;
        validate_upload(filename, metadata.len())?;

        let content = tokio::fs::read(path)
            .await
            .map_err(|e| local_io_error(e, &display))?;
        self.upload_bytes(filename, content, purpose).await
    }

    /// Download file content.
    pub async fn download(&self, id: &str) -> Result<Bytes> {
        let pipeline = self.client.pipeline();
        let request = pipeline
            .authorized(Method::GET, pipeline.url(&format!("files/{}/content", id))?)
            .await?
            .header("Accept", "application/octet-stream");
        let response = pipeline.send(request).await.map_err(|e| file_error(e, id))?;
        Ok(response.body)
    }

    /// Download file content to a local path.
    pub async fn download_to(&self, id: &str, path: impl AsRef<Path>) -> Result<u64> {
        let path = path.as_ref();
        let content = self.download(id).await?;
        tokio::fs::write(path, &content)
            .await
            .map_err(|e| local_io_error(e, &path.display().to_string()))?;
        Ok(content.len() as u64)
    }

    /// Delete a file.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client
            .pipeline()
            .delete(&format!("files/{}", id))
            .await
            .map_err(|e| file_error(e, id))
    }
}

fn validate_upload(filename: &str, size: u64) -> Result<()> {
    if filename.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "filename" }.into());
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge {
            size,
            limit: MAX_UPLOAD_BYTES,
        }
        .into());
    }
    Ok(())
}

/// Map storage-specific statuses onto [`FileOperationError`].
fn file_error(error: Error, subject: &str) -> Error {
    let Error::Api(api) = error else {
        return error;
    };
    match api {
        ApiError::NotFound { .. } => FileOperationError::NotFound(subject.to_string()).into(),
        ApiError::Forbidden { message } => FileOperationError::AccessDenied(message).into(),
        ApiError::Undocumented {
            status: 413,
            message,
        } => FileOperationError::PayloadTooLarge(message).into(),
        ApiError::Undocumented { status: 507, .. } => FileOperationError::QuotaExceeded.into(),
        other => Error::Api(other),
    }
}

fn local_io_error(error: std::io::Error, path: &str) -> Error {
    match error.kind() {
        std::io::ErrorKind::NotFound => FileOperationError::NotFound(path.to_string()).into(),
        std::io::ErrorKind::PermissionDenied => {
            FileOperationError::AccessDenied(path.to_string()).into()
        }
        _ => FileOperationError::Io(format!("{}: {}", path, error)).into(),
    }
}
