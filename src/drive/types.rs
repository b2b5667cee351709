use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::utils::media;

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// One user-selected file, fixed at selection time. The name is used
/// verbatim as the remote file name.
#[derive(Debug, Clone)]
pub struct Asset {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub mime_type: String,
}

impl Asset {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        let size = std::fs::metadata(path).ok()?.len();
        Some(Self {
            name,
            path: path.to_path_buf(),
            size,
            mime_type: media::mime_for_path(path).to_string(),
        })
    }
}

/// Per-asset state machine. No transitions out of Completed or Error.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadPhase {
    Pending,
    Uploading,
    Completed,
    Error(String),
}

impl UploadPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadPhase::Completed | UploadPhase::Error(_))
    }
}

/// Progress record for one asset within a batch. Records are keyed by
/// input position, so duplicate display names stay independent.
#[derive(Debug, Clone)]
pub struct FileProgress {
    pub name: String,
    pub percent: u8,
    pub phase: UploadPhase,
}

impl FileProgress {
    pub fn pending(name: &str) -> Self {
        Self {
            name: name.to_string(),
            percent: 0,
            phase: UploadPhase::Pending,
        }
    }
}

/// Remote file descriptor as Drive returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(rename = "createdTime", default)]
    pub created_time: Option<String>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
}

/// Terminal aggregate of one batch run. The batch is a success only if
/// `failed` is empty.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub succeeded: Vec<DriveFile>,
    pub failed: Vec<(String, String)>,
}

impl BatchOutcome {
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drive_file_parses_list_payload() {
        let payload = r#"{
            "files": [
                {"id": "f1", "name": "Ravi Sharma", "mimeType": "application/vnd.google-apps.folder"},
                {"id": "a1", "name": "a.jpg", "mimeType": "image/jpeg", "size": "1048576", "createdTime": "2025-06-01T10:00:00Z"}
            ]
        }"#;
        let list: FileList = serde_json::from_str(payload).unwrap();
        assert_eq!(list.files.len(), 2);
        assert!(list.files[0].is_folder());
        assert!(!list.files[1].is_folder());
        assert_eq!(list.files[1].size.as_deref(), Some("1048576"));
    }

    #[test]
    fn terminal_phases() {
        assert!(!UploadPhase::Pending.is_terminal());
        assert!(!UploadPhase::Uploading.is_terminal());
        assert!(UploadPhase::Completed.is_terminal());
        assert!(UploadPhase::Error("x".into()).is_terminal());
    }

    #[test]
    fn empty_outcome_is_success() {
        assert!(BatchOutcome::default().success());
    }
}
