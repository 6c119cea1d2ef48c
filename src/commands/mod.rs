//! Dashboard actions: each one calls the backend and then records the
//! outcome in the [`Store`](crate::store::Store).

pub mod cases;
pub mod chat;
pub mod documents;

use crate::error::{CaseDeskError, Result};
use crate::state::AppState;

pub(crate) fn current_case_id(state: &AppState) -> Result<String> {
    state
        .store
        .select(|s| s.current_case.as_ref().map(|c| c.id.clone()))
        .ok_or_else(|| CaseDeskError::NotFound("No case selected".to_string()))
}

pub(crate) fn current_user_id(state: &AppState) -> Result<String> {
    state
        .session_state()
        .user()
        .map(|u| u.id)
        .ok_or(CaseDeskError::SessionExpired)
}
