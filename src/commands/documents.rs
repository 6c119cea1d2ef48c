use super::current_case_id;
use crate::api::{Document, DocumentChunk, ProcessingStatus, UploadFailure, UploadFile};
use crate::error::Result;
use crate::state::AppState;
use crate::store::{Action, Modal};
use crate::upload::{match_results, validate_files, FileOutcome, ProgressCallback};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct UploadSummary {
    pub uploaded: Vec<Document>,
    pub failed: Vec<UploadFailure>,
}

impl UploadSummary {
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

pub async fn load_documents(state: &AppState, case_id: &str) -> Result<Vec<Document>> {
    let documents = state.api.list_documents(case_id).await?;
    state.store.dispatch(Action::SetDocuments(documents.clone()));
    Ok(documents)
}

/// Validate and upload files to a case.
///
/// Each file resolves independently: the documents the backend accepted are
/// added to the store even when others in the batch failed.
pub async fn upload_documents(
    state: &AppState,
    case_id: &str,
    files: Vec<UploadFile>,
) -> Result<UploadSummary> {
    validate_files(&files, &state.settings.upload_limits())?;

    let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
    state.store.dispatch(Action::BeginUpload(names.clone()));

    let store = state.store.clone();
    let on_progress: ProgressCallback =
        Arc::new(move |percent| store.dispatch(Action::UploadProgress(percent)));

    let response = match state
        .api
        .upload_documents(case_id, files, Some(on_progress))
        .await
    {
        Ok(response) => response,
        Err(e) => {
            for name in names {
                state.store.dispatch(Action::UploadFailed(name));
            }
            return Err(e);
        }
    };

    let mut failed = Vec::new();
    for (name, outcome) in match_results(&names, &response) {
        match outcome {
            FileOutcome::Uploaded => state.store.dispatch(Action::UploadCompleted(name)),
            FileOutcome::Failed(error) => {
                state.store.dispatch(Action::UploadFailed(name.clone()));
                failed.push(UploadFailure {
                    filename: name,
                    error,
                });
            }
        }
    }

    state
        .store
        .dispatch(Action::AddDocuments(response.documents.clone()));

    if failed.is_empty() {
        tracing::info!("Uploaded {} documents", response.documents.len());
    } else {
        tracing::warn!(
            "Uploaded {} documents, {} failed",
            response.documents.len(),
            failed.len()
        );
    }

    Ok(UploadSummary {
        uploaded: response.documents,
        failed,
    })
}

pub fn dismiss_upload(state: &AppState) {
    state.store.dispatch(Action::DismissUpload);
    let resolved = state.store.select(|s| s.upload.is_none());
    if resolved {
        state.store.dispatch(Action::CloseModal(Modal::Upload));
    }
}

pub async fn delete_document(state: &AppState, id: &str) -> Result<()> {
    let case_id = current_case_id(state)?;
    state.api.delete_document(id, &case_id).await?;
    state.store.dispatch(Action::RemoveDocument(id.to_string()));
    Ok(())
}

pub async fn preview_document(state: &AppState, id: &str) -> Result<Document> {
    let document = state.api.view_document(id).await?;
    state.store.dispatch(Action::OpenModal(Modal::DocumentPreview));
    Ok(document)
}

pub async fn document_chunks(state: &AppState, id: &str) -> Result<Vec<DocumentChunk>> {
    state.api.document_chunks(id).await
}

pub async fn download_document(state: &AppState, id: &str, destination: &Path) -> Result<u64> {
    let bytes = state.api.download_document(id).await?;
    tokio::fs::write(destination, &bytes).await?;
    Ok(bytes.len() as u64)
}

/// Fetch backend processing status and copy per-document statuses into the
/// store. Status is only ever taken from the backend.
pub async fn refresh_processing_status(state: &AppState, case_id: &str) -> Result<ProcessingStatus> {
    let status = state.api.documents_processing_status(case_id).await?;

    let documents = state.store.select(|s| s.documents.clone());
    for progress in &status.documents {
        if let Some(existing) = documents.iter().find(|d| d.id == progress.id) {
            if existing.status != progress.status || existing.error_message != progress.error_message
            {
                let mut updated = existing.clone();
                updated.status = progress.status;
                updated.error_message = progress.error_message.clone();
                state.store.dispatch(Action::UpdateDocument(updated));
            }
        }
    }

    Ok(status)
}

/// Poll processing status until no document is pending or `max_polls` is
/// reached.
pub async fn wait_for_processing(
    state: &AppState,
    case_id: &str,
    interval: Duration,
    max_polls: usize,
) -> Result<ProcessingStatus> {
    let mut status = refresh_processing_status(state, case_id).await?;
    for _ in 1..max_polls {
        if status.is_settled() {
            break;
        }
        tokio::time::sleep(interval).await;
        status = refresh_processing_status(state, case_id).await?;
    }
    Ok(status)
}
