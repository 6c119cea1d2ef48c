use super::models::*;
use crate::error::Result;
use reqwest::Method;

impl super::ApiClient {
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        self.send_json(Method::POST, "/api/auth/login", request).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        self.send_json(Method::POST, "/api/auth/register", request)
            .await
    }

    pub async fn logout(&self) -> Result<()> {
        let path = "/api/auth/logout";
        self.send(path, self.request(Method::POST, path)).await?;
        Ok(())
    }

    /// Check `token` against the backend. Uses the given token rather than the
    /// session's and bypasses 401 interception, since a rejected token here is
    /// an expected outcome during start-up.
    pub async fn verify_token(&self, token: &str) -> Result<User> {
        let path = "/api/auth/verify-token";
        let response = self
            .http()
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await?;
        let response = super::check_status(path, response).await?;
        let value: serde_json::Value = response.json().await?;
        Ok(extract_item(value, "user")?)
    }
}
