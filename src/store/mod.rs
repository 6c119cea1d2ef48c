mod actions;

pub use actions::*;

use crate::api::{Case, ChatMessage, Citation, Document};
use crate::upload::UploadBatch;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modal {
    CreateCase,
    Upload,
    DocumentPreview,
    Citation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModalFlags {
    pub create_case: bool,
    pub upload: bool,
    pub document_preview: bool,
    pub citation: bool,
}

impl ModalFlags {
    pub fn set(&mut self, modal: Modal, open: bool) {
        match modal {
            Modal::CreateCase => self.create_case = open,
            Modal::Upload => self.upload = open,
            Modal::DocumentPreview => self.document_preview = open,
            Modal::Citation => self.citation = open,
        }
    }

    pub fn is_open(&self, modal: Modal) -> bool {
        match modal {
            Modal::CreateCase => self.create_case,
            Modal::Upload => self.upload,
            Modal::DocumentPreview => self.document_preview,
            Modal::Citation => self.citation,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardState {
    pub cases: Vec<Case>,
    pub current_case: Option<Case>,
    pub current_thread: Option<String>,
    pub documents: Vec<Document>,
    pub chat_messages: Vec<ChatMessage>,
    /// Assistant text received so far on the in-flight stream
    pub streaming_text: String,
    pub is_streaming: bool,
    pub selected_citation: Option<Citation>,
    pub upload: Option<UploadBatch>,
    pub modals: ModalFlags,
}

/// Shared container for [`DashboardState`].
///
/// State only changes through [`Store::dispatch`]; subscribers are woken with
/// the new revision number after every dispatch.
pub struct Store {
    state: RwLock<DashboardState>,
    revision: watch::Sender<u64>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: RwLock::new(DashboardState::default()),
            revision,
        }
    }

    pub fn dispatch(&self, action: Action) {
        tracing::trace!("dispatch {:?}", action);
        {
            let mut state = self.state.write();
            reduce(&mut state, action);
        }
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Apply `action` only if `guard` holds, checked under the same write
    /// lock. Returns whether the action was applied.
    pub fn dispatch_if(&self, guard: impl FnOnce(&DashboardState) -> bool, action: Action) -> bool {
        {
            let mut state = self.state.write();
            if !guard(&state) {
                return false;
            }
            tracing::trace!("dispatch {:?}", action);
            reduce(&mut state, action);
        }
        self.revision.send_modify(|rev| *rev += 1);
        true
    }

    pub fn snapshot(&self) -> DashboardState {
        self.state.read().clone()
    }

    /// Read part of the state without cloning all of it.
    pub fn select<T>(&self, f: impl FnOnce(&DashboardState) -> T) -> T {
        f(&self.state.read())
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CaseStatus, DocumentStatus};
    use chrono::Utc;
    use std::sync::Arc;

    fn case(id: &str) -> Case {
        Case {
            id: id.to_string(),
            user_id: "u1".to_string(),
            title: format!("Case {id}"),
            description: None,
            status: CaseStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn citation() -> Citation {
        Citation {
            chunk_id: "k1".to_string(),
            document_id: "d1".to_string(),
            document_name: "brief.pdf".to_string(),
            page_number: Some(2),
            chunk_number: Some(4),
            relevance_score: 0.9,
            content_preview: "preview".to_string(),
            full_content: "full".to_string(),
        }
    }

    fn busy_store() -> Store {
        let store = Store::new();
        store.dispatch(Action::SetCases(vec![case("a"), case("b")]));
        store.dispatch(Action::SelectCase(Some(case("a"))));
        store.dispatch(Action::SetCurrentThread(Some("thread-1".to_string())));
        store.dispatch(Action::AppendMessage(ChatMessage::user("hello")));
        store.dispatch(Action::SetStreaming(true));
        store.dispatch(Action::AppendStreamText("partial".to_string()));
        store.dispatch(Action::SelectCitation(Some(citation())));
        store
    }

    #[test]
    fn test_selecting_case_resets_chat() {
        let store = busy_store();
        store.dispatch(Action::SelectCase(Some(case("b"))));

        let state = store.snapshot();
        assert_eq!(state.current_case.as_ref().map(|c| c.id.as_str()), Some("b"));
        assert!(state.chat_messages.is_empty());
        assert!(state.streaming_text.is_empty());
        assert!(!state.is_streaming);
        assert!(state.selected_citation.is_none());
    }

    #[test]
    fn test_selecting_same_case_still_resets_chat() {
        let store = busy_store();
        store.dispatch(Action::SelectCase(Some(case("a"))));
        assert!(store.select(|s| s.chat_messages.is_empty() && s.selected_citation.is_none()));
    }

    #[test]
    fn test_removing_current_case_clears_current_state() {
        let store = busy_store();
        store.dispatch(Action::RemoveCase("a".to_string()));

        let state = store.snapshot();
        assert!(state.current_case.is_none());
        assert!(state.current_thread.is_none());
        assert!(state.chat_messages.is_empty());
        assert_eq!(state.cases.len(), 1);
    }

    #[test]
    fn test_removing_other_case_leaves_current_state() {
        let store = busy_store();
        store.dispatch(Action::RemoveCase("b".to_string()));

        let state = store.snapshot();
        assert_eq!(state.current_case.as_ref().map(|c| c.id.as_str()), Some("a"));
        assert_eq!(state.current_thread.as_deref(), Some("thread-1"));
        assert_eq!(state.chat_messages.len(), 1);
        assert_eq!(state.cases.len(), 1);
    }

    #[test]
    fn test_update_case_refreshes_current() {
        let store = busy_store();
        let mut renamed = case("a");
        renamed.title = "Renamed".to_string();
        store.dispatch(Action::UpdateCase(renamed));

        let state = store.snapshot();
        assert_eq!(state.cases[0].title, "Renamed");
        assert_eq!(state.current_case.unwrap().title, "Renamed");
    }

    #[test]
    fn test_upload_batch_lifecycle() {
        let store = Store::new();
        store.dispatch(Action::BeginUpload(vec!["a.pdf".into(), "b.pdf".into()]));
        store.dispatch(Action::UploadProgress(40));
        store.dispatch(Action::UploadCompleted("a.pdf".into()));

        // still processing b.pdf, dismiss is ignored
        store.dispatch(Action::DismissUpload);
        assert!(store.select(|s| s.upload.is_some()));

        store.dispatch(Action::UploadFailed("b.pdf".into()));
        let batch = store.snapshot().upload.unwrap();
        assert_eq!(batch.progress, 40);
        assert_eq!(batch.completed, vec!["a.pdf"]);
        assert_eq!(batch.failed, vec!["b.pdf"]);

        store.dispatch(Action::DismissUpload);
        assert!(store.select(|s| s.upload.is_none()));
    }

    #[test]
    fn test_dispatch_if_admits_one_concurrent_stream() {
        let store = Arc::new(Store::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.dispatch_if(|s| !s.is_streaming, Action::SetStreaming(true))
                })
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|admitted| *admitted)
            .count();

        assert_eq!(admitted, 1);
        assert!(store.snapshot().is_streaming);
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_documents_and_modals() {
        let store = Store::new();
        let doc = Document {
            id: "d1".into(),
            case_id: "a".into(),
            filename: "brief.pdf".into(),
            original_filename: None,
            file_size: 10,
            file_type: "pdf".into(),
            status: DocumentStatus::Pending,
            error_message: None,
            raw_text: None,
            created_at: None,
        };
        store.dispatch(Action::AddDocuments(vec![doc.clone()]));
        store.dispatch(Action::UpdateDocument(Document {
            status: DocumentStatus::Completed,
            ..doc
        }));
        assert_eq!(store.snapshot().documents[0].status, DocumentStatus::Completed);
        store.dispatch(Action::RemoveDocument("d1".into()));
        assert!(store.snapshot().documents.is_empty());

        store.dispatch(Action::OpenModal(Modal::Upload));
        assert!(store.select(|s| s.modals.is_open(Modal::Upload)));
        store.dispatch(Action::CloseModal(Modal::Upload));
        assert!(!store.select(|s| s.modals.is_open(Modal::Upload)));
    }

    #[tokio::test]
    async fn test_subscribers_see_new_revision() {
        let store = Store::new();
        let mut rx = store.subscribe();
        store.dispatch(Action::SetStreaming(true));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 1);

        store.dispatch(Action::Reset);
        assert_eq!(store.revision(), 2);
        assert!(!store.snapshot().is_streaming);
    }
}
