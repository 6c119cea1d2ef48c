use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// Where the access token is mirrored between runs of the session.
pub trait TokenStorage: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str) -> std::io::Result<()>;
    fn clear(&self) -> std::io::Result<()>;
}

/// Lives only as long as the process, like a browser tab's session storage.
#[derive(Default)]
pub struct SessionSlot {
    token: Mutex<Option<String>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for SessionSlot {
    fn load(&self) -> Option<String> {
        self.token.lock().clone()
    }

    fn save(&self, token: &str) -> std::io::Result<()> {
        *self.token.lock() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> std::io::Result<()> {
        *self.token.lock() = None;
        Ok(())
    }
}

/// Keeps the token in a file so the CLI can stay logged in between
/// invocations.
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/casedesk/session`, falling back to the working directory.
    pub fn default_location() -> Self {
        let dir = dirs::data_local_dir()
            .map(|d| d.join("casedesk"))
            .unwrap_or_else(|| PathBuf::from(".casedesk"));
        Self::new(dir.join("session"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStorage for FileSlot {
    fn load(&self) -> Option<String> {
        std::fs::read_to_string(&self.path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn save(&self, token: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token)
    }

    fn clear(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
