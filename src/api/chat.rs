use super::models::*;
use crate::error::{CaseDeskError, Result};
use reqwest::header::ACCEPT;
use reqwest::{Method, Response};

impl super::ApiClient {
    /// Non-streaming chat: waits for the full assistant answer.
    pub async fn chat(&self, case_id: &str, query: &str, user_id: &str) -> Result<ChatReply> {
        let request = ChatRequest {
            case_id: case_id.to_string(),
            query: query.to_string(),
            user_id: user_id.to_string(),
            stream: false,
        };
        self.send_json(Method::POST, "/api/chat/chat", &request).await
    }

    /// Open the streaming variant of the chat endpoint. The returned response
    /// body is an SSE stream; see [`crate::stream`].
    pub async fn open_chat_stream(
        &self,
        case_id: &str,
        query: &str,
        user_id: &str,
    ) -> Result<Response> {
        let path = "/api/chat/chat";
        let request = ChatRequest {
            case_id: case_id.to_string(),
            query: query.to_string(),
            user_id: user_id.to_string(),
            stream: true,
        };
        let builder = self
            .request(Method::POST, path)
            .header(ACCEPT, "text/event-stream")
            .json(&request);
        let response = self.send(path, builder).await?;

        if response.content_length() == Some(0) {
            return Err(CaseDeskError::StreamUnavailable);
        }
        Ok(response)
    }

    pub async fn chat_history(&self, case_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        let value = self
            .get_value(&format!("/api/chat/history/{}?limit={}", case_id, limit))
            .await?;
        Ok(extract_list(value, &["messages", "history"])?)
    }

    pub async fn get_citation(&self, chunk_id: &str) -> Result<Citation> {
        let value = self
            .get_value(&format!("/api/chat/citations/{}", chunk_id))
            .await?;
        Ok(extract_item(value, "citation")?)
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<Citation>> {
        let value: serde_json::Value = self
            .send_json(Method::POST, "/api/chat/search", request)
            .await?;
        Ok(extract_list(value, &["results", "chunks"])?)
    }
}
