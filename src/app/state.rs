use std::sync::mpsc::Receiver;

use tokio_util::sync::CancellationToken;

use crate::drive::{BatchOutcome, DriveFile, FileProgress, UploadPhase};

/// Everything the upload tab renders. The orchestrator runs on a
/// background thread and reports back over channels; receivers never
/// leave this struct and are excluded from cloning.
#[derive(Default)]
pub struct UploadState {
    pub statuses: Vec<FileProgress>,
    pub outcome: Option<BatchOutcome>,
    pub error_message: Option<String>,
    pub show_details: bool,
    pub is_uploading: bool,
    pub snapshot_receiver: Option<Receiver<Vec<FileProgress>>>,
    pub outcome_receiver: Option<Receiver<Result<BatchOutcome, String>>>,
    pub cancel: Option<CancellationToken>,
}

impl UploadState {
    pub fn clear(&mut self) {
        *self = UploadState::default();
    }

    pub fn begin_run(&mut self) {
        self.statuses.clear();
        self.outcome = None;
        self.error_message = None;
        self.is_uploading = true;
    }

    /// Mean of the per-file percents, 0.0..=1.0, for the overall bar.
    pub fn progress_fraction(&self) -> f32 {
        if self.statuses.is_empty() {
            return 0.0;
        }
        let total: u32 = self.statuses.iter().map(|s| s.percent as u32).sum();
        total as f32 / (self.statuses.len() as f32 * 100.0)
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        let terminal = self.statuses.iter().filter(|s| s.phase.is_terminal()).count();
        let done = self
            .statuses
            .iter()
            .filter(|s| s.phase == UploadPhase::Completed)
            .count();
        (terminal, done, self.statuses.len())
    }

    pub fn status_line(&self) -> String {
        let (terminal, done, total) = self.counts();
        format!(
            "Progress: {}/{} files | ✅ Uploaded: {} | ❌ Failed: {}",
            terminal,
            total,
            done,
            terminal - done
        )
    }
}

#[derive(Default)]
pub struct GalleryState {
    pub entries: Vec<DriveFile>,
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub archive_notice: Option<String>,
    pub entries_receiver: Option<Receiver<Result<Vec<DriveFile>, String>>>,
    pub archive_receiver: Option<Receiver<Result<usize, String>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(percent: u8, phase: UploadPhase) -> FileProgress {
        FileProgress {
            name: "a.jpg".to_string(),
            percent,
            phase,
        }
    }

    #[test]
    fn progress_fraction_averages_per_file_percent() {
        let mut state = UploadState::default();
        assert_eq!(state.progress_fraction(), 0.0);

        state.statuses = vec![
            record(100, UploadPhase::Completed),
            record(50, UploadPhase::Uploading),
        ];
        assert!((state.progress_fraction() - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn status_line_counts_terminal_files() {
        let mut state = UploadState::default();
        state.statuses = vec![
            record(100, UploadPhase::Completed),
            record(10, UploadPhase::Error("boom".to_string())),
            record(0, UploadPhase::Pending),
        ];
        assert_eq!(
            state.status_line(),
            "Progress: 2/3 files | ✅ Uploaded: 1 | ❌ Failed: 1"
        );
    }
}
