//! Consumer for the streaming chat endpoint.
//!
//! The backend answers `POST /api/chat/chat` with `Accept: text/event-stream`
//! by sending `data: <json>` lines. Each payload is a [`ChatStreamEvent`].
//! A `done` or `error` event ends the stream even if more bytes follow.

mod sse;

pub use sse::*;

use crate::api::Citation;
use crate::error::{CaseDeskError, Result};
use futures::{Stream, StreamExt};
use reqwest::Response;
use serde::Deserialize;
use std::collections::VecDeque;
use std::pin::Pin;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatStreamEvent {
    Status {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        status: Option<String>,
    },
    Content {
        #[serde(default)]
        content: String,
    },
    Complete {
        #[serde(default)]
        response: Option<String>,
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        citations: Vec<Citation>,
        #[serde(default)]
        message_id: Option<String>,
    },
    Error {
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    Done,
}

impl ChatStreamEvent {
    /// `done` and `error` end the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }

    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Error { error, message } => Some(
                error
                    .clone()
                    .or_else(|| message.clone())
                    .unwrap_or_else(|| "The assistant failed to respond".to_string()),
            ),
            _ => None,
        }
    }
}

/// Receives the events of one chat stream.
pub trait ChatStreamHandler {
    fn on_chunk(&mut self, event: &ChatStreamEvent);
    fn on_error(&mut self, message: &str);
    fn on_complete(&mut self);
}

struct EventReader<S> {
    body: Pin<Box<S>>,
    decoder: SseDecoder,
    ready: VecDeque<ChatStreamEvent>,
    body_ended: bool,
    finished: bool,
}

impl<S, B, E> EventReader<S>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<CaseDeskError>,
{
    fn new(body: S) -> Self {
        Self {
            body: Box::pin(body),
            decoder: SseDecoder::new(),
            ready: VecDeque::new(),
            body_ended: false,
            finished: false,
        }
    }

    async fn next_event(&mut self) -> Option<Result<ChatStreamEvent>> {
        loop {
            if self.finished {
                return None;
            }
            if let Some(event) = self.ready.pop_front() {
                if event.is_terminal() {
                    self.finished = true;
                    self.ready.clear();
                }
                return Some(Ok(event));
            }
            if self.body_ended {
                self.finished = true;
                return None;
            }

            match self.body.next().await {
                Some(Ok(fragment)) => {
                    let lines = self.decoder.push(fragment.as_ref());
                    self.enqueue(lines);
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
                None => {
                    self.body_ended = true;
                    if let Some(line) = self.decoder.finish() {
                        self.enqueue(vec![line]);
                    }
                }
            }
        }
    }

    fn enqueue(&mut self, lines: Vec<String>) {
        for line in lines {
            match parse_line(&line) {
                Some(Ok(event)) => self.ready.push_back(event),
                Some(Err(e)) => {
                    tracing::warn!("Skipping malformed stream frame: {} ({})", line, e);
                }
                None => {}
            }
        }
    }
}

/// Pull-based view of a chat stream: a lazy, finite sequence of events that
/// ends after the first terminal event, the end of the body, or the first
/// transport error.
pub fn events<S, B, E>(body: S) -> impl Stream<Item = Result<ChatStreamEvent>>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<CaseDeskError>,
{
    futures::stream::unfold(EventReader::new(body), |mut reader| async move {
        let item = reader.next_event().await?;
        Some((item, reader))
    })
}

/// Drive `handler` over a chat stream body.
///
/// Every `status`, `content` and `complete` event goes to `on_chunk`. A
/// `done` event calls `on_complete`; an `error` event calls `on_error` and
/// then `on_complete`. A transport failure calls `on_error` only.
pub async fn consume<S, B, E, H>(body: S, handler: &mut H)
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<CaseDeskError>,
    H: ChatStreamHandler + ?Sized,
{
    let mut events = std::pin::pin!(events(body));

    while let Some(item) = events.next().await {
        match item {
            Ok(ChatStreamEvent::Done) => {
                handler.on_complete();
                return;
            }
            Ok(event @ ChatStreamEvent::Error { .. }) => {
                let message = event.error_message().unwrap_or_default();
                tracing::warn!("Chat stream ended with error frame: {}", message);
                handler.on_error(&message);
                handler.on_complete();
                return;
            }
            Ok(event) => handler.on_chunk(&event),
            Err(e) => {
                tracing::error!("Chat stream read failed: {}", e);
                handler.on_error(&e.user_message());
                return;
            }
        }
    }

    handler.on_complete();
}

/// Top-level entry: report a failed request through `on_error`, otherwise
/// consume the response body.
pub async fn consume_response<H>(response: Result<Response>, handler: &mut H)
where
    H: ChatStreamHandler + ?Sized,
{
    match response {
        Ok(response) => consume(response.bytes_stream(), handler).await,
        Err(e) => {
            tracing::error!("Failed to open chat stream: {}", e);
            handler.on_error(&e.user_message());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        chunks: Vec<ChatStreamEvent>,
        errors: Vec<String>,
        completions: usize,
    }

    impl ChatStreamHandler for Recorder {
        fn on_chunk(&mut self, event: &ChatStreamEvent) {
            self.chunks.push(event.clone());
        }

        fn on_error(&mut self, message: &str) {
            self.errors.push(message.to_string());
        }

        fn on_complete(&mut self) {
            self.completions += 1;
        }
    }

    fn body(
        fragments: &[&'static str],
    ) -> impl Stream<Item = std::result::Result<&'static str, CaseDeskError>> {
        futures::stream::iter(fragments.to_vec().into_iter().map(Ok))
    }

    #[tokio::test]
    async fn test_content_then_done() {
        let mut recorder = Recorder::default();
        consume(
            body(&[
                "data: {\"type\":\"content\",\"content\":\"hi\"}\n",
                "data: {\"type\":\"done\"}\n",
            ]),
            &mut recorder,
        )
        .await;

        assert_eq!(
            recorder.chunks,
            vec![ChatStreamEvent::Content {
                content: "hi".to_string()
            }]
        );
        assert_eq!(recorder.completions, 1);
        assert!(recorder.errors.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_frame_is_skipped() {
        let mut recorder = Recorder::default();
        consume(
            body(&["data: {not json}\n", "data: {\"type\":\"done\"}\n"]),
            &mut recorder,
        )
        .await;

        assert!(recorder.chunks.is_empty());
        assert!(recorder.errors.is_empty());
        assert_eq!(recorder.completions, 1);
    }

    #[tokio::test]
    async fn test_done_stops_before_trailing_bytes() {
        let mut recorder = Recorder::default();
        consume(
            body(&[
                "data: {\"type\":\"done\"}\ndata: {\"type\":\"content\",\"content\":\"late\"}\n",
                "data: {\"type\":\"content\",\"content\":\"later\"}\n",
            ]),
            &mut recorder,
        )
        .await;

        assert!(recorder.chunks.is_empty());
        assert_eq!(recorder.completions, 1);
    }

    #[tokio::test]
    async fn test_error_frame_reports_and_completes() {
        let mut recorder = Recorder::default();
        consume(
            body(&[
                "data: {\"type\":\"status\",\"message\":\"Searching documents\"}\n",
                "data: {\"type\":\"error\",\"error\":\"model overloaded\"}\n",
                "data: {\"type\":\"content\",\"content\":\"never\"}\n",
            ]),
            &mut recorder,
        )
        .await;

        assert_eq!(recorder.chunks.len(), 1);
        assert_eq!(recorder.errors, vec!["model overloaded"]);
        assert_eq!(recorder.completions, 1);
    }

    #[tokio::test]
    async fn test_end_of_body_completes_and_flushes_last_line() {
        let mut recorder = Recorder::default();
        consume(
            body(&[
                "data: {\"type\":\"content\",",
                "\"content\":\"split\"}\ndata: {\"type\":\"complete\",\"response\":\"split\",\"citations\":[{\"chunkId\":\"k1\",\"score\":0.5}]}",
            ]),
            &mut recorder,
        )
        .await;

        assert_eq!(recorder.chunks.len(), 2);
        match &recorder.chunks[1] {
            ChatStreamEvent::Complete { citations, .. } => {
                assert_eq!(citations[0].chunk_id, "k1");
                assert_eq!(citations[0].relevance_score, 0.5);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(recorder.completions, 1);
    }

    #[tokio::test]
    async fn test_complete_frame_with_mixed_citation_names_is_delivered() {
        let mut recorder = Recorder::default();
        consume(
            body(&[
                "data: {\"type\":\"complete\",\"response\":\"ok\",\"citations\":[{\"chunk_id\":\"k1\",\"score\":0.4,\"relevance_score\":0.8,\"content\":\"short\",\"full_content\":\"long\"}]}\n",
                "data: {\"type\":\"done\"}\n",
            ]),
            &mut recorder,
        )
        .await;

        assert_eq!(recorder.chunks.len(), 1);
        match &recorder.chunks[0] {
            ChatStreamEvent::Complete { citations, .. } => {
                assert_eq!(citations[0].relevance_score, 0.8);
                assert_eq!(citations[0].full_content, "long");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_error_reports_once_without_completion() {
        let fragments: Vec<std::result::Result<&'static str, CaseDeskError>> = vec![
            Ok("data: {\"type\":\"content\",\"content\":\"a\"}\n"),
            Err(CaseDeskError::Stream("connection reset".into())),
            Ok("data: {\"type\":\"done\"}\n"),
        ];
        let mut recorder = Recorder::default();
        consume(futures::stream::iter(fragments), &mut recorder).await;

        assert_eq!(recorder.chunks.len(), 1);
        assert_eq!(recorder.errors.len(), 1);
        assert_eq!(recorder.completions, 0);
    }

    #[tokio::test]
    async fn test_failed_request_reports_via_on_error() {
        let mut recorder = Recorder::default();
        consume_response(Err(CaseDeskError::SessionExpired), &mut recorder).await;
        assert_eq!(recorder.errors.len(), 1);
        assert_eq!(recorder.completions, 0);
    }

    #[tokio::test]
    async fn test_pull_stream_ends_after_terminal_event() {
        let collected: Vec<_> = events(body(&[
            "data: {\"type\":\"status\",\"status\":\"thinking\"}\n",
            "data: {\"type\":\"done\"}\n",
            "data: {\"type\":\"content\",\"content\":\"ignored\"}\n",
        ]))
        .collect()
        .await;

        assert_eq!(collected.len(), 2);
        assert!(matches!(collected[1], Ok(ChatStreamEvent::Done)));
    }
}
