use super::{DashboardState, Modal};
use crate::api::{Case, ChatMessage, Citation, Document};
use crate::upload::UploadBatch;

/// Every way the dashboard state can change.
#[derive(Debug, Clone)]
pub enum Action {
    SetCases(Vec<Case>),
    AddCase(Case),
    UpdateCase(Case),
    RemoveCase(String),
    SelectCase(Option<Case>),
    SetCurrentThread(Option<String>),

    SetDocuments(Vec<Document>),
    AddDocuments(Vec<Document>),
    UpdateDocument(Document),
    RemoveDocument(String),

    SetMessages(Vec<ChatMessage>),
    AppendMessage(ChatMessage),
    SetStreaming(bool),
    AppendStreamText(String),
    ClearStream,
    SelectCitation(Option<Citation>),

    BeginUpload(Vec<String>),
    UploadProgress(u8),
    UploadCompleted(String),
    UploadFailed(String),
    DismissUpload,

    OpenModal(Modal),
    CloseModal(Modal),

    /// Back to the initial state, e.g. after logout
    Reset,
}

/// Apply `action` to `state`. Pure and synchronous.
pub fn reduce(state: &mut DashboardState, action: Action) {
    match action {
        Action::SetCases(cases) => state.cases = cases,
        Action::AddCase(case) => state.cases.insert(0, case),
        Action::UpdateCase(case) => {
            if let Some(existing) = state.cases.iter_mut().find(|c| c.id == case.id) {
                *existing = case.clone();
            }
            if let Some(current) = state.current_case.as_mut().filter(|c| c.id == case.id) {
                *current = case;
            }
        }
        Action::RemoveCase(id) => {
            state.cases.retain(|c| c.id != id);
            if state.current_case.as_ref().map(|c| c.id == id).unwrap_or(false) {
                state.current_case = None;
                state.current_thread = None;
                clear_chat(state);
                state.documents.clear();
            }
        }
        Action::SelectCase(case) => {
            state.current_case = case;
            state.current_thread = None;
            clear_chat(state);
            state.documents.clear();
        }
        Action::SetCurrentThread(thread) => state.current_thread = thread,

        Action::SetDocuments(documents) => state.documents = documents,
        Action::AddDocuments(documents) => state.documents.extend(documents),
        Action::UpdateDocument(document) => {
            if let Some(existing) = state.documents.iter_mut().find(|d| d.id == document.id) {
                *existing = document;
            }
        }
        Action::RemoveDocument(id) => state.documents.retain(|d| d.id != id),

        Action::SetMessages(messages) => state.chat_messages = messages,
        Action::AppendMessage(message) => state.chat_messages.push(message),
        Action::SetStreaming(streaming) => state.is_streaming = streaming,
        Action::AppendStreamText(text) => state.streaming_text.push_str(&text),
        Action::ClearStream => {
            state.streaming_text.clear();
            state.is_streaming = false;
        }
        Action::SelectCitation(citation) => state.selected_citation = citation,

        Action::BeginUpload(names) => state.upload = Some(UploadBatch::new(names)),
        Action::UploadProgress(progress) => {
            if let Some(batch) = state.upload.as_mut() {
                batch.set_progress(progress);
            }
        }
        Action::UploadCompleted(name) => {
            if let Some(batch) = state.upload.as_mut() {
                batch.mark_completed(&name);
            }
        }
        Action::UploadFailed(name) => {
            if let Some(batch) = state.upload.as_mut() {
                batch.mark_failed(&name);
            }
        }
        Action::DismissUpload => {
            if state.upload.as_ref().map(UploadBatch::is_resolved).unwrap_or(true) {
                state.upload = None;
            }
        }

        Action::OpenModal(modal) => state.modals.set(modal, true),
        Action::CloseModal(modal) => state.modals.set(modal, false),

        Action::Reset => *state = DashboardState::default(),
    }
}

fn clear_chat(state: &mut DashboardState) {
    state.chat_messages.clear();
    state.streaming_text.clear();
    state.is_streaming = false;
    state.selected_citation = None;
}
