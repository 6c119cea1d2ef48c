use super::models::*;
use crate::error::Result;
use crate::upload::{ProgressCallback, ProgressTracker};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Method};
use std::path::Path;

/// A file staged for upload, held in memory.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, data })
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

impl super::ApiClient {
    /// Upload a batch of files to a case as one multipart request.
    ///
    /// `on_progress` receives 0-100 as the file bytes are handed to the
    /// transport, and 100 once the backend has answered.
    pub async fn upload_documents(
        &self,
        case_id: &str,
        files: Vec<UploadFile>,
        on_progress: Option<ProgressCallback>,
    ) -> Result<UploadResponse> {
        let path = "/api/documents/upload";
        let total_bytes: u64 = files.iter().map(UploadFile::size).sum();
        let tracker = ProgressTracker::new(total_bytes, on_progress);

        let mut form = Form::new().text("case_id", case_id.to_string());
        for file in files {
            let len = file.size();
            let mime = mime_guess::from_path(&file.name).first_or_octet_stream();
            let body = Body::wrap_stream(tracker.stream(file.data));
            let part = Part::stream_with_length(body, len)
                .file_name(file.name)
                .mime_str(mime.as_ref())?;
            form = form.part("files", part);
        }

        tracing::info!("Uploading {} bytes to case {}", total_bytes, case_id);
        let builder = self.request(Method::POST, path).multipart(form);
        let response = self.send(path, builder).await?;
        let value: serde_json::Value = response.json().await?;
        tracker.finish();

        if value.is_array() {
            return Ok(UploadResponse {
                documents: serde_json::from_value(value)?,
                failed: Vec::new(),
            });
        }
        Ok(serde_json::from_value(value)?)
    }

    pub async fn list_documents(&self, case_id: &str) -> Result<Vec<Document>> {
        let value = self
            .get_value(&format!("/api/documents/{}/documents", case_id))
            .await?;
        Ok(extract_list(value, &["documents", "data"])?)
    }

    pub async fn view_document(&self, id: &str) -> Result<Document> {
        let value = self
            .get_value(&format!("/api/documents/{}/view", id))
            .await?;
        Ok(extract_item(value, "document")?)
    }

    pub async fn delete_document(&self, id: &str, case_id: &str) -> Result<()> {
        let path = format!("/api/documents/{}?case_id={}", id, case_id);
        self.send(&path, self.request(Method::DELETE, &path)).await?;
        tracing::info!("Deleted document {} from case {}", id, case_id);
        Ok(())
    }

    pub async fn documents_processing_status(&self, case_id: &str) -> Result<ProcessingStatus> {
        self.get_json(&format!("/api/documents/{}/processing-status", case_id))
            .await
    }

    pub async fn document_chunks(&self, id: &str) -> Result<Vec<DocumentChunk>> {
        let value = self
            .get_value(&format!("/api/documents/{}/chunks", id))
            .await?;
        Ok(extract_list(value, &["chunks", "data"])?)
    }

    pub async fn download_document(&self, id: &str) -> Result<Vec<u8>> {
        let path = format!("/api/documents/{}/download", id);
        let response = self.send(&path, self.request(Method::GET, &path)).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
