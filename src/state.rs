use crate::api::ApiClient;
use crate::error::{CaseDeskError, Result};
use crate::session::{Navigator, Session, SessionState, TokenStorage};
use crate::store::{Action, Store};
use crate::upload::UploadLimits;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_max_files")]
    pub max_files_per_upload: usize,
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_max_files() -> usize {
    10
}

fn default_max_file_size_mb() -> u64 {
    50
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            max_files_per_upload: default_max_files(),
            max_file_size_mb: default_max_file_size_mb(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Settings {
    /// Load settings from an optional JSON file, then apply environment
    /// overrides (`CASEDESK_API_URL`, `CASEDESK_MAX_FILES`,
    /// `CASEDESK_MAX_FILE_SIZE_MB`, `CASEDESK_REQUEST_TIMEOUT_SECS`).
    pub fn load(settings_path: Option<&Path>) -> Self {
        Self::load_with(settings_path, |key| std::env::var(key).ok())
    }

    fn load_with(settings_path: Option<&Path>, var: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings: Settings = settings_path
            .filter(|path| path.exists())
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|s| match serde_json::from_str(&s) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable settings file: {}", e);
                    None
                }
            })
            .unwrap_or_default();

        settings.apply_env(var);
        settings
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("CASEDESK_API_URL").filter(|u| !u.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        if let Some(max) = parse_var(&var, "CASEDESK_MAX_FILES") {
            self.max_files_per_upload = max;
        }
        if let Some(max) = parse_var(&var, "CASEDESK_MAX_FILE_SIZE_MB") {
            self.max_file_size_mb = max;
        }
        if let Some(secs) = parse_var(&var, "CASEDESK_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = secs;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(CaseDeskError::Config(format!(
                "API URL must start with http:// or https://, got {}",
                self.api_url
            )));
        }
        if self.max_files_per_upload == 0 || self.max_file_size_mb == 0 {
            return Err(CaseDeskError::Config(
                "Upload limits must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits {
            max_files: self.max_files_per_upload,
            max_file_size_mb: self.max_file_size_mb,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = var(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {}", key, raw);
            None
        }
    }
}

/// Everything the actions need: configuration, the authenticated client,
/// session operations and the dashboard store.
pub struct AppState {
    pub settings: Settings,
    pub api: ApiClient,
    pub session: Session,
    pub store: Arc<Store>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        storage: Box<dyn TokenStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        settings.validate()?;

        let session_state = Arc::new(SessionState::new(storage, navigator));
        let store = Arc::new(Store::new());

        // Dashboard data belongs to the signed-in user
        {
            let store = store.clone();
            session_state.on_logout(move || store.dispatch(Action::Reset));
        }

        let api = ApiClient::new(
            &settings.api_url,
            settings.request_timeout(),
            session_state,
        );
        let session = Session::new(api.clone());

        tracing::info!("CaseDesk client configured for {}", settings.api_url);

        Ok(Self {
            settings,
            api,
            session,
            store,
        })
    }

    pub fn session_state(&self) -> &Arc<SessionState> {
        self.api.session()
    }
}
