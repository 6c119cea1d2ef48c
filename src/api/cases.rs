use super::models::*;
use crate::error::Result;
use reqwest::Method;

impl super::ApiClient {
    pub async fn list_cases(&self) -> Result<Vec<Case>> {
        let value = self.get_value("/api/cases").await?;
        Ok(extract_list(value, &["cases", "data"])?)
    }

    pub async fn get_case(&self, id: &str) -> Result<Case> {
        let value = self.get_value(&format!("/api/cases/{}", id)).await?;
        Ok(extract_item(value, "case")?)
    }

    pub async fn create_case(&self, case: &NewCase) -> Result<Case> {
        let value: serde_json::Value = self.send_json(Method::POST, "/api/cases", case).await?;
        let created: Case = extract_item(value, "case")?;
        tracing::info!("Created case {} ({})", created.title, created.id);
        Ok(created)
    }

    pub async fn update_case(&self, id: &str, update: &CaseUpdate) -> Result<Case> {
        let path = format!("/api/cases/{}", id);
        let value: serde_json::Value = self.send_json(Method::PUT, &path, update).await?;
        Ok(extract_item(value, "case")?)
    }

    pub async fn case_processing_status(&self, id: &str) -> Result<ProcessingStatus> {
        self.get_json(&format!("/api/cases/{}/processing-status", id))
            .await
    }
}
