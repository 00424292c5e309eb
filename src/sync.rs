//! Remote backup of the pomodoro document.
//!
//! A backup target is addressed by a folder path and a file name. The
//! [`FolderSync`] implementation maps that onto a directory tree, typically
//! a folder kept in sync by a cloud drive client.

use crate::models::{PomodoroData, SyncConfig};
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Sync I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Sync JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No backup file found at {0}, push before pulling")]
    NotFound(String),
    #[error("Could not get an access token: {0}")]
    Token(String),
}

/// Supplies the access token handed to the sync service.
pub trait TokenProvider {
    /// `interactive` allows prompting the user.
    fn token(&self, interactive: bool) -> Result<String, SyncError>;
}

/// Token taken from configuration. Without one, only anonymous targets work.
pub struct StaticToken(pub Option<String>);

const ANONYMOUS_TOKEN: &str = "anonymous";

impl TokenProvider for StaticToken {
    fn token(&self, _interactive: bool) -> Result<String, SyncError> {
        match &self.0 {
            Some(token) if token.trim().is_empty() => {
                Err(SyncError::Token("token is empty".to_string()))
            }
            Some(token) => Ok(token.clone()),
            None => Ok(ANONYMOUS_TOKEN.to_string()),
        }
    }
}

/// A place the whole document can be pushed to and pulled from.
pub trait RemoteSync {
    /// Uploads `data` and returns `config` with the resolved ids and sync time.
    fn push(
        &self,
        token: &str,
        data: &PomodoroData,
        config: &SyncConfig,
        now: DateTime<Utc>,
    ) -> Result<SyncConfig, SyncError>;

    /// Downloads the document and returns it with the updated config.
    fn pull(
        &self,
        token: &str,
        config: &SyncConfig,
        now: DateTime<Utc>,
    ) -> Result<(PomodoroData, SyncConfig), SyncError>;
}

/// Splits a folder path into trimmed, non-empty segments. `.` and `..` are
/// dropped so a path never leaves the sync root.
pub fn folder_segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\'])
        .map(str::trim)
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .collect()
}

/// Backup into a local directory tree.
pub struct FolderSync {
    root: PathBuf,
}

impl FolderSync {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Folder id is the folder path relative to the root, `/`-joined.
    fn folder(&self, config: &SyncConfig) -> (String, PathBuf) {
        let segments = folder_segments(&config.folder_path);
        let dir = segments
            .iter()
            .fold(self.root.clone(), |dir, segment| dir.join(segment));
        (segments.join("/"), dir)
    }

    /// File id is the file path relative to the root. A remembered id wins
    /// over the configured name as long as the file still exists.
    fn find_file(&self, folder_id: &str, config: &SyncConfig) -> Option<String> {
        let remembered = config
            .file_id
            .as_ref()
            .filter(|id| self.resolve(id).is_file());
        if let Some(id) = remembered {
            return Some(id.clone());
        }
        let id = join_id(folder_id, &config.file_name);
        self.resolve(&id).is_file().then_some(id)
    }

    fn resolve(&self, id: &str) -> PathBuf {
        folder_segments(id)
            .iter()
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

fn join_id(folder_id: &str, file_name: &str) -> String {
    if folder_id.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", folder_id, file_name)
    }
}

fn write_atomically(path: &Path, content: &str) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)
}

impl RemoteSync for FolderSync {
    fn push(
        &self,
        _token: &str,
        data: &PomodoroData,
        config: &SyncConfig,
        now: DateTime<Utc>,
    ) -> Result<SyncConfig, SyncError> {
        let (folder_id, dir) = self.folder(config);
        fs::create_dir_all(&dir)?;

        let file_id = self
            .find_file(&folder_id, config)
            .unwrap_or_else(|| join_id(&folder_id, &config.file_name));

        let uploaded = PomodoroData {
            sync: SyncConfig {
                folder_id: Some(folder_id.clone()),
                file_id: Some(file_id.clone()),
                ..config.clone()
            },
            updated_at: now,
            ..data.clone()
        };
        let content = serde_json::to_string_pretty(&uploaded)?;
        write_atomically(&self.resolve(&file_id), &content)?;
        log::info!("Pushed backup to {}", file_id);

        Ok(SyncConfig {
            folder_id: Some(folder_id),
            file_id: Some(file_id),
            last_sync_at: Some(now),
            ..config.clone()
        })
    }

    fn pull(
        &self,
        _token: &str,
        config: &SyncConfig,
        now: DateTime<Utc>,
    ) -> Result<(PomodoroData, SyncConfig), SyncError> {
        let (folder_id, _) = self.folder(config);
        let Some(file_id) = self.find_file(&folder_id, config) else {
            return Err(SyncError::NotFound(join_id(&folder_id, &config.file_name)));
        };

        let content = fs::read_to_string(self.resolve(&file_id))?;
        let data = serde_json::from_str::<PomodoroData>(&content)?.normalized();
        log::info!("Pulled backup from {}", file_id);

        let config = SyncConfig {
            folder_id: Some(folder_id),
            file_id: Some(file_id),
            last_sync_at: Some(now),
            ..config.clone()
        };
        Ok((data, config))
    }
}
