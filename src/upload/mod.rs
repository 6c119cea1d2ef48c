mod progress;

pub use progress::*;

use crate::api::{FileType, UploadFile, UploadResponse};
use crate::error::{CaseDeskError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_files: usize,
    pub max_file_size_mb: u64,
}

impl UploadLimits {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

/// Check a batch against the limits before anything touches the network.
///
/// A batch over the file count is rejected outright; otherwise every file is
/// checked and all problems are reported together, one message per file.
pub fn validate_files(files: &[UploadFile], limits: &UploadLimits) -> Result<()> {
    if files.is_empty() {
        return Err(CaseDeskError::Validation(vec![
            "Please select at least one file to upload.".to_string(),
        ]));
    }

    if files.len() > limits.max_files {
        return Err(CaseDeskError::Validation(vec![format!(
            "Too many files selected ({}). Maximum {} files allowed per upload.",
            files.len(),
            limits.max_files
        )]));
    }

    let errors: Vec<String> = files
        .iter()
        .filter_map(|file| validate_file(file, limits).err())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CaseDeskError::Validation(errors))
    }
}

fn validate_file(file: &UploadFile, limits: &UploadLimits) -> std::result::Result<(), String> {
    if !FileType::from_filename(&file.name).is_supported() {
        return Err(format!(
            "{} has an unsupported file type. Allowed types: {}",
            file.name,
            FileType::ALLOWED_EXTENSIONS.join(", ")
        ));
    }
    if file.size() > limits.max_file_size_bytes() {
        return Err(format!(
            "{} exceeds the maximum file size of {}MB",
            file.name, limits.max_file_size_mb
        ));
    }
    Ok(())
}

/// Reason recorded for a file the backend said nothing about
pub const NO_RESULT: &str = "No result reported by the server";

/// How one requested file fared in an upload response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Uploaded,
    Failed(String),
}

/// Pair every requested file name with its outcome in `response`.
///
/// Results are matched by the name the file was uploaded under (the
/// document's `original_filename` when the backend stored it renamed).
/// Results that match no requested name take the remaining files in request
/// order. Files left over after that have failed.
pub fn match_results(requested: &[String], response: &UploadResponse) -> Vec<(String, FileOutcome)> {
    let mut outcomes: Vec<Option<FileOutcome>> = vec![None; requested.len()];

    let mut stray = Vec::new();
    let by_name = response
        .documents
        .iter()
        .map(|doc| (doc.uploaded_name(), FileOutcome::Uploaded))
        .chain(
            response
                .failed
                .iter()
                .map(|f| (f.filename.as_str(), FileOutcome::Failed(f.error.clone()))),
        );
    for (name, outcome) in by_name {
        match unclaimed(requested, &outcomes, Some(name)) {
            Some(slot) => outcomes[slot] = Some(outcome),
            None => stray.push((name, outcome)),
        }
    }

    for (name, outcome) in stray {
        match unclaimed(requested, &outcomes, None) {
            Some(slot) => {
                tracing::debug!("Matched upload result {} to {} by position", name, requested[slot]);
                outcomes[slot] = Some(outcome);
            }
            None => tracing::warn!("Upload result for {} matches no requested file", name),
        }
    }

    requested
        .iter()
        .cloned()
        .zip(
            outcomes
                .into_iter()
                .map(|o| o.unwrap_or_else(|| FileOutcome::Failed(NO_RESULT.to_string()))),
        )
        .collect()
}

fn unclaimed(requested: &[String], outcomes: &[Option<FileOutcome>], name: Option<&str>) -> Option<usize> {
    requested
        .iter()
        .zip(outcomes)
        .position(|(n, o)| o.is_none() && name.map_or(true, |name| n == name))
}

/// Files of one upload in flight. Each name sits in exactly one of the three
/// lists; names only ever move out of `processing`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadBatch {
    pub processing: Vec<String>,
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    pub progress: u8,
}

impl UploadBatch {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            processing: names.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn mark_completed(&mut self, name: &str) -> bool {
        self.resolve(name).map(|n| self.completed.push(n)).is_some()
    }

    pub fn mark_failed(&mut self, name: &str) -> bool {
        self.resolve(name).map(|n| self.failed.push(n)).is_some()
    }

    /// Fail everything still processing, e.g. when the request itself failed.
    pub fn fail_remaining(&mut self) {
        self.failed.append(&mut self.processing);
    }

    pub fn set_progress(&mut self, progress: u8) {
        self.progress = progress.min(100);
    }

    pub fn is_resolved(&self) -> bool {
        self.processing.is_empty()
    }

    fn resolve(&mut self, name: &str) -> Option<String> {
        let index = self.processing.iter().position(|n| n == name)?;
        Some(self.processing.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: usize = 1024 * 1024;

    fn limits() -> UploadLimits {
        UploadLimits {
            max_files: 3,
            max_file_size_mb: 1,
        }
    }

    fn messages(result: Result<()>) -> Vec<String> {
        match result {
            Err(CaseDeskError::Validation(messages)) => messages,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_file_at_size_limit_is_accepted() {
        let files = vec![UploadFile::new("exact.pdf", vec![0; MB])];
        assert!(validate_files(&files, &limits()).is_ok());
    }

    #[test]
    fn test_file_one_byte_over_limit_is_rejected_by_name() {
        let files = vec![UploadFile::new("big.pdf", vec![0; MB + 1])];
        let errors = messages(validate_files(&files, &limits()));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("big.pdf"));
        assert!(errors[0].contains("1MB"));
    }

    #[test]
    fn test_too_many_files_reports_count() {
        let files: Vec<_> = (0..4)
            .map(|i| UploadFile::new(format!("f{i}.txt"), vec![1]))
            .collect();
        let errors = messages(validate_files(&files, &limits()));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("(4)"));
        assert!(errors[0].contains("Maximum 3 files"));
    }

    #[test]
    fn test_disallowed_extension_and_oversize_reported_together() {
        let files = vec![
            UploadFile::new("ok.docx", vec![1]),
            UploadFile::new("script.exe", vec![1]),
            UploadFile::new("huge.TXT", vec![0; MB + 10]),
        ];
        let errors = messages(validate_files(&files, &limits()));
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("script.exe has an unsupported file type"));
        assert!(errors[1].starts_with("huge.TXT exceeds"));
    }

    #[test]
    fn test_empty_selection_rejected() {
        assert_eq!(messages(validate_files(&[], &limits())).len(), 1);
    }

    fn response(value: serde_json::Value) -> UploadResponse {
        serde_json::from_value(value).unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_renamed_files_match_by_original_name() {
        let requested = names(&["Motion (1).pdf", "brief.pdf"]);
        let outcomes = match_results(
            &requested,
            &response(serde_json::json!({"documents": [
                {"id": "d2", "filename": "brief.pdf"},
                {"id": "d1", "filename": "motion_1.pdf", "original_filename": "Motion (1).pdf"}
            ]})),
        );

        assert_eq!(
            outcomes,
            vec![
                ("Motion (1).pdf".to_string(), FileOutcome::Uploaded),
                ("brief.pdf".to_string(), FileOutcome::Uploaded),
            ]
        );
    }

    #[test]
    fn test_unmatched_results_fall_back_to_request_order() {
        let requested = names(&["Exhibit A.pdf", "notes.txt", "lost.doc"]);
        let outcomes = match_results(
            &requested,
            &response(serde_json::json!({
                "documents": [{"id": "d1", "filename": "exhibit_a.pdf"}],
                "failed": [{"filename": "notes.txt", "error": "Empty file"}]
            })),
        );

        assert_eq!(outcomes[0].1, FileOutcome::Uploaded);
        assert_eq!(outcomes[1].1, FileOutcome::Failed("Empty file".to_string()));
        assert_eq!(outcomes[2].1, FileOutcome::Failed(NO_RESULT.to_string()));
    }

    #[test]
    fn test_batch_lists_stay_disjoint() {
        let mut batch = UploadBatch::new(["a.pdf", "b.pdf", "c.pdf"]);
        assert!(batch.mark_completed("a.pdf"));
        assert!(batch.mark_failed("b.pdf"));
        // already resolved, cannot move again
        assert!(!batch.mark_failed("a.pdf"));
        assert!(!batch.is_resolved());

        batch.fail_remaining();
        assert!(batch.is_resolved());
        assert_eq!(batch.completed, vec!["a.pdf"]);
        assert_eq!(batch.failed, vec!["b.pdf", "c.pdf"]);
    }

    #[test]
    fn test_progress_is_clamped() {
        let mut batch = UploadBatch::new(["a.pdf"]);
        batch.set_progress(250);
        assert_eq!(batch.progress, 100);
    }
}
