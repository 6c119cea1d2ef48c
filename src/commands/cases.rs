use crate::api::{Case, CaseStatus, CaseUpdate, NewCase, ProcessingStatus};
use crate::error::{CaseDeskError, Result};
use crate::state::AppState;
use crate::store::{Action, Modal};

/// Number of past messages loaded when a case is opened
pub const HISTORY_LIMIT: usize = 50;

pub async fn load_cases(state: &AppState) -> Result<Vec<Case>> {
    let cases = state.api.list_cases().await?;
    state.store.dispatch(Action::SetCases(cases.clone()));
    Ok(cases)
}

/// Make `id` the current case and load its documents and chat history.
pub async fn open_case(state: &AppState, id: &str) -> Result<Case> {
    let case = state.api.get_case(id).await?;
    state.store.dispatch(Action::SelectCase(Some(case.clone())));

    let documents = state.api.list_documents(id).await?;
    state.store.dispatch(Action::SetDocuments(documents));

    // History is a convenience; an unavailable history leaves an empty chat
    match state.api.chat_history(id, HISTORY_LIMIT).await {
        Ok(messages) => state.store.dispatch(Action::SetMessages(messages)),
        Err(CaseDeskError::SessionExpired) => return Err(CaseDeskError::SessionExpired),
        Err(e) => tracing::warn!("Could not load chat history for {}: {}", id, e),
    }

    Ok(case)
}

pub fn close_case(state: &AppState) {
    state.store.dispatch(Action::SelectCase(None));
}

pub async fn create_case(state: &AppState, title: &str, description: Option<&str>) -> Result<Case> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CaseDeskError::Validation(vec![
            "Case title is required".to_string(),
        ]));
    }

    let request = NewCase {
        title: title.to_string(),
        description: description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string),
    };
    let case = state.api.create_case(&request).await?;
    state.store.dispatch(Action::AddCase(case.clone()));
    state.store.dispatch(Action::CloseModal(Modal::CreateCase));
    Ok(case)
}

pub async fn update_case(state: &AppState, id: &str, update: CaseUpdate) -> Result<Case> {
    if update.title.as_deref().map(|t| t.trim().is_empty()).unwrap_or(false) {
        return Err(CaseDeskError::Validation(vec![
            "Case title cannot be empty".to_string(),
        ]));
    }
    let case = state.api.update_case(id, &update).await?;
    state.store.dispatch(Action::UpdateCase(case.clone()));
    Ok(case)
}

/// Archive a case and drop it from the active list.
pub async fn archive_case(state: &AppState, id: &str) -> Result<Case> {
    let update = CaseUpdate {
        status: Some(CaseStatus::Archived),
        ..Default::default()
    };
    let case = state.api.update_case(id, &update).await?;
    state.store.dispatch(Action::RemoveCase(case.id.clone()));
    Ok(case)
}

pub async fn processing_status(state: &AppState, id: &str) -> Result<ProcessingStatus> {
    state.api.case_processing_status(id).await
}
