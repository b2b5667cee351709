use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context};
use reqwest::Client;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::drive::error::DriveError;
use crate::drive::types::{DriveFile, FileList};
use crate::utils::media;

const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";

/// Read side of the shared wedding folder: listing everyone's media,
/// stable preview URLs, and zip export.
#[derive(Clone)]
pub struct GalleryClient {
    client: Client,
}

impl GalleryClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Walks the folder tree under the shared root and collects every
    /// image and video, newest first. Guests' uploads live one level
    /// down, in their per-name folders.
    pub async fn list_media_recursive(
        &self,
        token: &str,
        folder_id: &str,
    ) -> Result<Vec<DriveFile>, DriveError> {
        if folder_id.is_empty() {
            return Err(DriveError::Configuration("wedding folder id is not set"));
        }

        let mut found = Vec::new();
        let mut pending = vec![folder_id.to_string()];
        while let Some(current) = pending.pop() {
            let query = format!("'{}' in parents and trashed = false", current);
            for file in self.list(token, &query).await? {
                if file.is_folder() {
                    pending.push(file.id);
                } else if media::is_media_mime(&file.mime_type) {
                    found.push(file);
                }
            }
        }
        found.sort_by(|a, b| b.created_time.cmp(&a.created_time));
        info!(count = found.len(), "gallery listing complete");
        Ok(found)
    }

    async fn list(&self, token: &str, query: &str) -> Result<Vec<DriveFile>, DriveError> {
        let response = self
            .client
            .get(FILES_URL)
            .bearer_auth(token)
            .query(&[
                ("q", query),
                ("spaces", "drive"),
                ("pageSize", "1000"),
                ("fields", "files(id,name,mimeType,createdTime,size)"),
                ("supportsAllDrives", "true"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::RemoteService { status, body });
        }

        let list: FileList = response
            .json()
            .await
            .map_err(|e| DriveError::Protocol(format!("bad file listing: {}", e)))?;
        Ok(list.files)
    }

    /// Downloads every media file under the folder into a zip at `dest`.
    /// Individual fetch failures are skipped, as long as something made it
    /// into the archive. Returns the number of archived files.
    pub async fn download_archive(
        &self,
        token: &str,
        folder_id: &str,
        dest: &Path,
    ) -> anyhow::Result<usize> {
        let files = self.list_media_recursive(token, folder_id).await?;
        if files.is_empty() {
            bail!("the wedding folder has no photos or videos yet");
        }

        let out = std::fs::File::create(dest)
            .with_context(|| format!("creating {}", dest.display()))?;
        let mut archive = ZipWriter::new(out);

        let mut archived = 0;
        for file in &files {
            let url = format!("{}/{}", FILES_URL, file.id);
            let response = self
                .client
                .get(&url)
                .bearer_auth(token)
                .query(&[("alt", "media"), ("supportsAllDrives", "true")])
                .send()
                .await;

            let bytes = match response {
                Ok(r) if r.status().is_success() => match r.bytes().await {
                    Ok(b) => b,
                    Err(e) => {
                        warn!(name = %file.name, error = %e, "skipping file, body read failed");
                        continue;
                    }
                },
                Ok(r) => {
                    warn!(name = %file.name, status = %r.status(), "skipping file");
                    continue;
                }
                Err(e) => {
                    warn!(name = %file.name, error = %e, "skipping file");
                    continue;
                }
            };

            write_archive_entry(&mut archive, &file.name, &bytes)?;
            archived += 1;
        }

        archive.finish().context("finishing zip archive")?;
        if archived == 0 {
            bail!("none of the {} files could be downloaded", files.len());
        }
        info!(archived, dest = %dest.display(), "wrote gallery archive");
        Ok(archived)
    }
}

fn write_archive_entry<W: Write + std::io::Seek>(
    archive: &mut ZipWriter<W>,
    name: &str,
    bytes: &[u8],
) -> anyhow::Result<()> {
    archive
        .start_file(name, SimpleFileOptions::default())
        .with_context(|| format!("adding {} to archive", name))?;
    archive
        .write_all(bytes)
        .with_context(|| format!("writing {} to archive", name))?;
    Ok(())
}

pub fn thumbnail_url(file_id: &str) -> String {
    format!("https://drive.google.com/thumbnail?id={}&sz=w320", file_id)
}

pub fn view_url(file_id: &str) -> String {
    format!("https://drive.google.com/file/d/{}/view", file_id)
}
