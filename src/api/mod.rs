mod auth;
mod cases;
mod chat;
mod documents;
mod models;

pub use documents::UploadFile;
pub use models::*;

use crate::error::{CaseDeskError, Result};
use crate::session::SessionState;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Default request timeout (2 minutes)
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Endpoints whose 401 responses are reported to the caller instead of
/// forcing a logout.
const AUTH_EXEMPT_PATHS: &[&str] = &["/api/auth/login", "/api/auth/logout"];

/// Authenticated HTTP wrapper around the CaseDesk backend.
///
/// The bearer token is read from the shared [`SessionState`] on every
/// request, so a token rotated by login or logout takes effect on the next
/// call without rebuilding the client.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<SessionState>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, session: Arc<SessionState>) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    /// Start a request with the current bearer token attached.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request, intercepting 401s and turning other failures into
    /// [`CaseDeskError::Api`].
    pub(crate) async fn send(&self, path: &str, builder: RequestBuilder) -> Result<Response> {
        tracing::debug!("Sending request to {}", path);
        let response = builder.send().await?;

        if response.status() == StatusCode::UNAUTHORIZED && !is_auth_exempt(path) {
            tracing::warn!("Received 401 from {}, forcing logout", path);
            self.session.force_logout();
            return Err(CaseDeskError::SessionExpired);
        }

        check_status(path, response).await
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(path, self.request(Method::GET, path)).await?;
        Ok(response.json().await?)
    }

    pub(crate) async fn get_value(&self, path: &str) -> Result<serde_json::Value> {
        self.get_json(path).await
    }

    // reqwest sets `Content-Type: application/json` for `.json()` bodies and
    // the multipart boundary header for `.multipart()` bodies.
    pub(crate) async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(method, path).json(body);
        let response = self.send(path, builder).await?;
        Ok(response.json().await?)
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        self.get_json("/api/health").await
    }
}

fn is_auth_exempt(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    AUTH_EXEMPT_PATHS.contains(&path)
}

pub(crate) async fn check_status(path: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body, status);
    tracing::error!("Request to {} failed: {} - {}", path, status, message);
    Err(CaseDeskError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Extract a user-friendly error message from an error response body
fn extract_error_message(body: &str, status: StatusCode) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "detail", "message"] {
            match json.get(key) {
                Some(serde_json::Value::String(msg)) => return msg.clone(),
                Some(serde_json::Value::Object(obj)) => {
                    if let Some(msg) = obj.get("message").and_then(|m| m.as_str()) {
                        return msg.to_string();
                    }
                }
                Some(serde_json::Value::Array(items)) => {
                    let joined: Vec<&str> = items
                        .iter()
                        .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                        .collect();
                    if !joined.is_empty() {
                        return joined.join("; ");
                    }
                }
                _ => {}
            }
        }
    }

    let body = body.trim();
    if body.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string();
    }
    if body.chars().count() > 200 {
        format!("{}...", body.chars().take(200).collect::<String>())
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_exempt_paths() {
        assert!(is_auth_exempt("/api/auth/login"));
        assert!(is_auth_exempt("/api/auth/logout"));
        assert!(!is_auth_exempt("/api/auth/verify-token"));
        assert!(!is_auth_exempt("/api/cases"));
        assert!(!is_auth_exempt("/api/documents/d1?case_id=c1"));
    }

    #[test]
    fn test_extract_error_message_variants() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(
            extract_error_message(r#"{"error": "Case not found"}"#, status),
            "Case not found"
        );
        assert_eq!(
            extract_error_message(r#"{"detail": "Invalid super key"}"#, status),
            "Invalid super key"
        );
        assert_eq!(
            extract_error_message(r#"{"detail": [{"msg": "field required"}]}"#, status),
            "field required"
        );
        assert_eq!(extract_error_message("", status), "Bad Request");
        assert_eq!(extract_error_message("plain failure", status), "plain failure");
    }
}
