use async_stream::stream;
use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{Body, Client};
use serde_json::json;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::drive::error::{DriveError, TransferFailure};
use crate::drive::types::{Asset, DriveFile};

const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
const CHUNK_SIZE: usize = 256 * 1024;

/// Per-session upload endpoint handed back by Drive.
#[derive(Debug)]
pub struct UploadSession {
    pub url: String,
}

/// Two-phase resumable upload: declare the file, then stream its bytes to
/// the session endpoint. One linear send per asset; a dropped connection
/// is not re-probed or resumed.
#[derive(Clone)]
pub struct ResumableTransfer {
    client: Client,
    base_url: String,
}

impl ResumableTransfer {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: UPLOAD_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub async fn begin_session(
        &self,
        token: &str,
        asset: &Asset,
        folder_id: &str,
    ) -> Result<UploadSession, DriveError> {
        let metadata = json!({
            "name": asset.name,
            "parents": [folder_id],
        });

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(token)
            .query(&[("uploadType", "resumable"), ("supportsAllDrives", "true")])
            .header("X-Upload-Content-Type", &asset.mime_type)
            .header("X-Upload-Content-Length", asset.size.to_string())
            .json(&metadata)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::RemoteService { status, body });
        }

        let url = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                DriveError::Protocol("upload session response missing Location header".to_string())
            })?;

        debug!(name = %asset.name, "upload session opened");
        Ok(UploadSession { url })
    }

    /// Streams the asset to the session endpoint. `on_progress` receives a
    /// strictly increasing percent, capped at 99 while bytes are still in
    /// flight; the terminal 100 belongs to the caller's completion
    /// transition.
    pub async fn send(
        &self,
        token: &str,
        session: &UploadSession,
        asset: &Asset,
        cancel: &CancellationToken,
        on_progress: &mut (dyn FnMut(u8) + Send),
    ) -> Result<DriveFile, DriveError> {
        if cancel.is_cancelled() {
            return Err(TransferFailure::Aborted.into());
        }

        let mut file = tokio::fs::File::open(&asset.path).await.map_err(|e| {
            TransferFailure::Source {
                name: asset.name.clone(),
                detail: e.to_string(),
            }
        })?;

        let total = asset.size;
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel::<u64>();

        let body_stream = stream! {
            let mut sent: u64 = 0;
            loop {
                let mut buf = vec![0u8; CHUNK_SIZE];
                match file.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        buf.truncate(n);
                        sent += n as u64;
                        let _ = sent_tx.send(sent);
                        yield Ok::<Bytes, std::io::Error>(Bytes::from(buf));
                    }
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        };

        let request = self
            .client
            .put(&session.url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, &asset.mime_type)
            .header(CONTENT_LENGTH, total)
            .body(Body::wrap_stream(body_stream))
            .send();
        tokio::pin!(request);

        let mut last_percent = 0u8;
        let response = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    // Dropping the request future tears down the connection.
                    return Err(TransferFailure::Aborted.into());
                }
                Some(sent) = sent_rx.recv() => {
                    let percent = in_flight_percent(sent, total);
                    if percent > last_percent {
                        last_percent = percent;
                        on_progress(percent);
                    }
                }
                result = &mut request => {
                    break result.map_err(|e| TransferFailure::Network(e.to_string()))?;
                }
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransferFailure::Rejected { status, body }.into());
        }

        response
            .json::<DriveFile>()
            .await
            .map_err(|e| DriveError::Protocol(format!("bad upload response: {}", e)))
    }
}

fn in_flight_percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    (sent.saturating_mul(100) / total).min(99) as u8
}
