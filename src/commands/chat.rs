use super::{current_case_id, current_user_id};
use crate::api::{ChatMessage, Citation, SearchRequest};
use crate::error::{CaseDeskError, Result};
use crate::state::AppState;
use crate::store::{Action, Modal, Store};
use crate::stream::{self, ChatStreamEvent, ChatStreamHandler};

/// Collects one streamed assistant answer while mirroring it into the store.
struct StreamedTurn<'a, F> {
    store: &'a Store,
    on_text: F,
    text: String,
    final_text: Option<String>,
    citations: Vec<Citation>,
    message_id: Option<String>,
    error: Option<String>,
}

impl<F: FnMut(&str)> ChatStreamHandler for StreamedTurn<'_, F> {
    fn on_chunk(&mut self, event: &ChatStreamEvent) {
        match event {
            ChatStreamEvent::Status { message, status } => {
                if let Some(status) = message.as_ref().or(status.as_ref()) {
                    tracing::debug!("Assistant status: {}", status);
                }
            }
            ChatStreamEvent::Content { content } => {
                self.text.push_str(content);
                self.store.dispatch(Action::AppendStreamText(content.clone()));
                (self.on_text)(content);
            }
            ChatStreamEvent::Complete {
                response,
                content,
                citations,
                message_id,
            } => {
                self.final_text = response.clone().or_else(|| content.clone());
                self.citations = citations.clone();
                self.message_id = message_id.clone();
            }
            ChatStreamEvent::Error { .. } | ChatStreamEvent::Done => {}
        }
    }

    fn on_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }

    fn on_complete(&mut self) {
        tracing::debug!("Chat stream complete ({} chars)", self.text.len());
    }
}

/// Send `query` about the current case and stream the answer.
///
/// The user message is shown immediately; the assistant message is added
/// only once the stream has finished. `on_text` receives each content piece
/// as it arrives.
pub async fn send_message(
    state: &AppState,
    query: &str,
    on_text: impl FnMut(&str),
) -> Result<ChatMessage> {
    let query = query.trim();
    if query.is_empty() {
        return Err(CaseDeskError::Validation(vec![
            "Message cannot be empty".to_string(),
        ]));
    }
    let case_id = current_case_id(state)?;
    let user_id = current_user_id(state)?;

    if !state
        .store
        .dispatch_if(|s| !s.is_streaming, Action::SetStreaming(true))
    {
        return Err(CaseDeskError::Other(
            "A response is already in progress".to_string(),
        ));
    }
    state.store.dispatch(Action::AppendMessage(ChatMessage::user(query)));

    let mut turn = StreamedTurn {
        store: &state.store,
        on_text,
        text: String::new(),
        final_text: None,
        citations: Vec::new(),
        message_id: None,
        error: None,
    };
    let response = state.api.open_chat_stream(&case_id, query, &user_id).await;
    stream::consume_response(response, &mut turn).await;

    state.store.dispatch(Action::ClearStream);

    if let Some(error) = turn.error {
        return Err(CaseDeskError::Stream(error));
    }

    let content = turn.final_text.unwrap_or(turn.text);
    let mut message = ChatMessage::assistant(content, turn.citations);
    if let Some(id) = turn.message_id {
        message.id = id;
    }
    state.store.dispatch(Action::AppendMessage(message.clone()));
    Ok(message)
}

/// Non-streaming variant of [`send_message`].
pub async fn ask(state: &AppState, query: &str) -> Result<ChatMessage> {
    let query = query.trim();
    if query.is_empty() {
        return Err(CaseDeskError::Validation(vec![
            "Message cannot be empty".to_string(),
        ]));
    }
    let case_id = current_case_id(state)?;
    let user_id = current_user_id(state)?;

    state.store.dispatch(Action::AppendMessage(ChatMessage::user(query)));
    let reply = state.api.chat(&case_id, query, &user_id).await?;
    let message = ChatMessage::from(reply);
    state.store.dispatch(Action::AppendMessage(message.clone()));
    Ok(message)
}

pub async fn load_history(state: &AppState, case_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
    let messages = state.api.chat_history(case_id, limit).await?;
    state.store.dispatch(Action::SetMessages(messages.clone()));
    Ok(messages)
}

pub fn select_citation(state: &AppState, citation: Option<Citation>) {
    let open = citation.is_some();
    state.store.dispatch(Action::SelectCitation(citation));
    if open {
        state.store.dispatch(Action::OpenModal(Modal::Citation));
    } else {
        state.store.dispatch(Action::CloseModal(Modal::Citation));
    }
}

/// Fetch the full citation for a chunk and show it.
pub async fn open_citation(state: &AppState, chunk_id: &str) -> Result<Citation> {
    let citation = state.api.get_citation(chunk_id).await?;
    select_citation(state, Some(citation.clone()));
    Ok(citation)
}

pub async fn search(state: &AppState, case_id: &str, query: &str, limit: usize) -> Result<Vec<Citation>> {
    let request = SearchRequest {
        case_id: case_id.to_string(),
        query: query.to_string(),
        limit,
    };
    state.api.search(&request).await
}
