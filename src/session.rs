// src/session.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const SESSION_FILE_NAME: &str = "attendance_session.json";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session file I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Not logged in")]
    NotLoggedIn,
}

/// Locally persisted login state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub logged_in_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        if !self.path.exists() {
            debug!("No session file at {}", self.path.display());
            return Ok(None);
        }

        let json_string = fs::read_to_string(&self.path)?;
        let session: Session = serde_json::from_str(&json_string)?;

        Ok(Some(session))
    }

    pub fn save(&self, user_id: &str) -> Result<Session, SessionError> {
        let session = Session {
            user_id: user_id.to_string(),
            logged_in_at: Utc::now(),
        };

        let json_string = serde_json::to_string_pretty(&session)?;

        let mut file = File::create(&self.path)?;
        file.write_all(json_string.as_bytes())?;

        info!("Session saved for user {} at {}", user_id, self.path.display());
        Ok(session)
    }

    /// Removes the session file. Clearing an absent session is not an error.
    pub fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Session cleared ({})", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn require_user_id(&self) -> Result<String, SessionError> {
        self.load()?
            .map(|session| session.user_id)
            .ok_or(SessionError::NotLoggedIn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(name: &str) -> SessionStore {
        let path = std::env::temp_dir().join(format!("attendance_session_{}.json", name));
        let _ = fs::remove_file(&path);
        SessionStore::new(path)
    }

    fn teardown(store: &SessionStore) {
        let _ = fs::remove_file(store.path());
    }

    #[test]
    fn load_without_file_is_none() {
        let store = setup("missing");
        assert_eq!(store.load().unwrap(), None);
        assert!(matches!(store.require_user_id(), Err(SessionError::NotLoggedIn)));
        teardown(&store);
    }

    #[test]
    fn save_then_load_returns_user() {
        let store = setup("roundtrip");
        let saved = store.save("42").unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(store.require_user_id().unwrap(), "42");
        teardown(&store);
    }

    #[test]
    fn clear_is_idempotent() {
        let store = setup("clear");
        store.save("7").unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();
        teardown(&store);
    }

    #[test]
    fn corrupt_file_is_a_json_error() {
        let store = setup("corrupt");
        fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(SessionError::Json(_))));
        teardown(&store);
    }
}
