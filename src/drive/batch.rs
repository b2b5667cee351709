use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::drive::error::{DriveError, TransferFailure};
use crate::drive::transfer::ResumableTransfer;
use crate::drive::types::{Asset, BatchOutcome, DriveFile, FileProgress, UploadPhase};

/// Seam between batch orchestration and the wire. The production
/// implementation opens a resumable session and streams the bytes; tests
/// swap in an in-memory fake.
#[async_trait]
pub trait AssetTransfer {
    async fn upload(
        &self,
        token: &str,
        asset: &Asset,
        folder_id: &str,
        cancel: &CancellationToken,
        on_progress: &mut (dyn FnMut(u8) + Send),
    ) -> Result<DriveFile, DriveError>;
}

#[async_trait]
impl AssetTransfer for ResumableTransfer {
    async fn upload(
        &self,
        token: &str,
        asset: &Asset,
        folder_id: &str,
        cancel: &CancellationToken,
        on_progress: &mut (dyn FnMut(u8) + Send),
    ) -> Result<DriveFile, DriveError> {
        let session = self.begin_session(token, asset, folder_id).await?;
        self.send(token, &session, asset, cancel, on_progress).await
    }
}

/// Sequential batch runner. Assets go up one at a time, in input order;
/// a failed asset is recorded and the batch keeps going. Cancellation
/// stops the whole batch: the in-flight asset ends aborted and the rest
/// end canceled without a transfer call, so every asset still reaches
/// exactly one terminal state.
pub struct UploadBatch<T> {
    transfer: T,
}

impl<T: AssetTransfer + Sync> UploadBatch<T> {
    pub fn new(transfer: T) -> Self {
        Self { transfer }
    }

    pub async fn run(
        &self,
        token: &str,
        assets: &[Asset],
        folder_id: &str,
        cancel: &CancellationToken,
        mut publish: impl FnMut(&[FileProgress]) + Send,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        if assets.is_empty() {
            return outcome;
        }

        let mut records: Vec<FileProgress> =
            assets.iter().map(|a| FileProgress::pending(&a.name)).collect();
        publish(&records);

        for (index, asset) in assets.iter().enumerate() {
            if cancel.is_cancelled() {
                let detail = TransferFailure::Canceled.to_string();
                records[index].phase = UploadPhase::Error(detail.clone());
                publish(&records);
                outcome.failed.push((asset.name.clone(), detail));
                continue;
            }

            records[index].phase = UploadPhase::Uploading;
            publish(&records);

            let result = {
                let mut relay = |percent: u8| {
                    // The terminal 100 is written only by the completion
                    // transition below.
                    let capped = percent.min(99);
                    if capped > records[index].percent {
                        records[index].percent = capped;
                        publish(&records);
                    }
                };
                self.transfer
                    .upload(token, asset, folder_id, cancel, &mut relay)
                    .await
            };

            match result {
                Ok(remote) => {
                    records[index].percent = 100;
                    records[index].phase = UploadPhase::Completed;
                    publish(&records);
                    info!(name = %asset.name, "upload completed");
                    outcome.succeeded.push(remote);
                }
                Err(err) => {
                    let detail = err.detail();
                    records[index].phase = UploadPhase::Error(detail.clone());
                    publish(&records);
                    warn!(name = %asset.name, error = %detail, "upload failed");
                    outcome.failed.push((asset.name.clone(), detail));
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use reqwest::StatusCode;

    use super::*;

    fn asset(name: &str, size: u64) -> Asset {
        Asset {
            name: name.to_string(),
            path: PathBuf::from(name),
            size,
            mime_type: "application/octet-stream".to_string(),
        }
    }

    fn remote(name: &str) -> DriveFile {
        DriveFile {
            id: format!("id-{}", name),
            name: name.to_string(),
            mime_type: "image/jpeg".to_string(),
            size: None,
            created_time: None,
        }
    }

    #[derive(Default)]
    struct FakeTransfer {
        calls: Mutex<Vec<String>>,
        fail_with: HashMap<String, StatusCode>,
        cancel_during: Option<String>,
        progress_steps: Vec<u8>,
    }

    #[async_trait]
    impl AssetTransfer for FakeTransfer {
        async fn upload(
            &self,
            _token: &str,
            asset: &Asset,
            _folder_id: &str,
            cancel: &CancellationToken,
            on_progress: &mut (dyn FnMut(u8) + Send),
        ) -> Result<DriveFile, DriveError> {
            self.calls.lock().unwrap().push(asset.name.clone());

            if self.cancel_during.as_deref() == Some(asset.name.as_str()) {
                cancel.cancel();
                return Err(TransferFailure::Aborted.into());
            }
            for step in &self.progress_steps {
                on_progress(*step);
            }
            if let Some(status) = self.fail_with.get(&asset.name) {
                return Err(TransferFailure::Rejected {
                    status: *status,
                    body: "backend error".to_string(),
                }
                .into());
            }
            Ok(remote(&asset.name))
        }
    }

    async fn run_collecting(
        batch: &UploadBatch<FakeTransfer>,
        assets: &[Asset],
        cancel: &CancellationToken,
    ) -> (BatchOutcome, Vec<Vec<FileProgress>>) {
        let mut snapshots: Vec<Vec<FileProgress>> = Vec::new();
        let outcome = batch
            .run("token", assets, "F1", cancel, |s| snapshots.push(s.to_vec()))
            .await;
        (outcome, snapshots)
    }

    #[tokio::test]
    async fn every_asset_reaches_exactly_one_terminal_state() {
        let batch = UploadBatch::new(FakeTransfer {
            progress_steps: vec![40, 80],
            ..Default::default()
        });
        let assets = vec![asset("a.jpg", 10), asset("b.mp4", 20), asset("c.png", 30)];
        let (outcome, snapshots) = run_collecting(&batch, &assets, &CancellationToken::new()).await;

        assert!(outcome.success());
        let names: Vec<_> = outcome.succeeded.iter().map(|f| f.name.clone()).collect();
        assert_eq!(names, vec!["a.jpg", "b.mp4", "c.png"]);

        let first = snapshots.first().unwrap();
        assert!(first.iter().all(|r| r.phase == UploadPhase::Pending));
        let last = snapshots.last().unwrap();
        assert!(last
            .iter()
            .all(|r| r.phase == UploadPhase::Completed && r.percent == 100));
    }

    #[tokio::test]
    async fn per_asset_order_is_pending_uploading_terminal() {
        let batch = UploadBatch::new(FakeTransfer {
            progress_steps: vec![50],
            ..Default::default()
        });
        let assets = vec![asset("a.jpg", 10), asset("b.mp4", 20)];
        let (_, snapshots) = run_collecting(&batch, &assets, &CancellationToken::new()).await;

        for index in 0..assets.len() {
            let mut saw_uploading = false;
            let mut last_rank = 0;
            for snapshot in &snapshots {
                let rank = match snapshot[index].phase {
                    UploadPhase::Pending => 0,
                    UploadPhase::Uploading => {
                        saw_uploading = true;
                        1
                    }
                    UploadPhase::Completed | UploadPhase::Error(_) => 2,
                };
                assert!(rank >= last_rank, "phase went backwards for asset {}", index);
                last_rank = rank;
            }
            assert!(saw_uploading);
            assert_eq!(last_rank, 2);
        }
    }

    #[tokio::test]
    async fn middle_failure_does_not_stop_the_batch() {
        let batch = UploadBatch::new(FakeTransfer {
            fail_with: HashMap::from([("b.mp4".to_string(), StatusCode::BAD_GATEWAY)]),
            ..Default::default()
        });
        let assets = vec![asset("a.jpg", 10), asset("b.mp4", 20), asset("c.png", 30)];
        let (outcome, snapshots) = run_collecting(&batch, &assets, &CancellationToken::new()).await;

        assert!(!outcome.success());
        assert_eq!(outcome.succeeded.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, "b.mp4");

        let last = snapshots.last().unwrap();
        assert_eq!(last[0].phase, UploadPhase::Completed);
        assert!(matches!(last[1].phase, UploadPhase::Error(_)));
        assert_eq!(last[2].phase, UploadPhase::Completed);
    }

    #[tokio::test]
    async fn rejected_transfer_surfaces_the_http_status() {
        // a.jpg (1 MB) succeeds; b.mp4 (50 MB) dies with a 500 on send.
        let batch = UploadBatch::new(FakeTransfer {
            fail_with: HashMap::from([(
                "b.mp4".to_string(),
                StatusCode::INTERNAL_SERVER_ERROR,
            )]),
            ..Default::default()
        });
        let assets = vec![asset("a.jpg", 1 << 20), asset("b.mp4", 50 << 20)];
        let (outcome, _) = run_collecting(&batch, &assets, &CancellationToken::new()).await;

        assert!(!outcome.success());
        assert_eq!(outcome.succeeded[0].name, "a.jpg");
        let (name, detail) = &outcome.failed[0];
        assert_eq!(name, "b.mp4");
        assert!(detail.contains("500"), "detail was: {}", detail);
    }

    #[tokio::test]
    async fn empty_batch_returns_immediately_with_no_calls() {
        let batch = UploadBatch::new(FakeTransfer::default());
        let (outcome, snapshots) = run_collecting(&batch, &[], &CancellationToken::new()).await;

        assert!(outcome.success());
        assert!(outcome.succeeded.is_empty());
        assert!(outcome.failed.is_empty());
        assert!(snapshots.is_empty());
        assert!(batch.transfer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancellation_stops_the_whole_batch() {
        let batch = UploadBatch::new(FakeTransfer {
            cancel_during: Some("a.jpg".to_string()),
            ..Default::default()
        });
        let assets = vec![asset("a.jpg", 10), asset("b.mp4", 20)];
        let cancel = CancellationToken::new();
        let (outcome, snapshots) = run_collecting(&batch, &assets, &cancel).await;

        // Only the first asset ever hit the wire.
        assert_eq!(*batch.transfer.calls.lock().unwrap(), vec!["a.jpg"]);

        assert_eq!(outcome.failed.len(), 2);
        assert!(outcome.failed[0].1.contains("aborted"));
        assert!(outcome.failed[1].1.contains("canceled"));

        let last = snapshots.last().unwrap();
        assert!(last.iter().all(|r| r.phase.is_terminal()));
    }

    #[tokio::test]
    async fn duplicate_names_are_tracked_independently() {
        let batch = UploadBatch::new(FakeTransfer {
            cancel_during: None,
            fail_with: HashMap::new(),
            progress_steps: vec![30],
            calls: Mutex::new(Vec::new()),
        });
        let assets = vec![asset("a.jpg", 10), asset("a.jpg", 10)];
        let (outcome, snapshots) = run_collecting(&batch, &assets, &CancellationToken::new()).await;

        assert_eq!(outcome.succeeded.len(), 2);
        let last = snapshots.last().unwrap();
        assert_eq!(last.len(), 2);
        assert!(last.iter().all(|r| r.phase == UploadPhase::Completed));
    }

    #[tokio::test]
    async fn published_percent_never_decreases_and_hits_100_only_on_completion() {
        let batch = UploadBatch::new(FakeTransfer {
            progress_steps: vec![10, 50, 50, 99, 100],
            fail_with: HashMap::from([("b.mp4".to_string(), StatusCode::INTERNAL_SERVER_ERROR)]),
            ..Default::default()
        });
        let assets = vec![asset("a.jpg", 10), asset("b.mp4", 20)];
        let (_, snapshots) = run_collecting(&batch, &assets, &CancellationToken::new()).await;

        for index in 0..assets.len() {
            let mut last_percent = 0;
            for snapshot in &snapshots {
                assert!(snapshot[index].percent >= last_percent);
                last_percent = snapshot[index].percent;
            }
        }

        let last = snapshots.last().unwrap();
        assert_eq!(last[0].percent, 100);
        assert_eq!(last[0].phase, UploadPhase::Completed);
        // The failed asset never reports 100, even though the transport
        // claimed it.
        assert!(last[1].percent < 100);
    }
}
