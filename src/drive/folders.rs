use reqwest::Client;
use serde_json::json;
use tracing::info;

use crate::drive::error::DriveError;
use crate::drive::types::{DriveFile, FileList, FOLDER_MIME};

const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";

/// Finds or creates the per-guest folder directly under the shared
/// wedding folder. One folder per uploader name; the match is exact and
/// case-sensitive, first hit in provider order wins. Find-or-create is
/// not atomic: two racing callers can both create a folder.
#[derive(Clone)]
pub struct FolderResolver {
    client: Client,
    base_url: String,
}

impl FolderResolver {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: FILES_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub async fn resolve(
        &self,
        token: &str,
        display_name: &str,
        root_folder_id: &str,
    ) -> Result<String, DriveError> {
        if root_folder_id.is_empty() {
            return Err(DriveError::Configuration("wedding folder id is not set"));
        }

        let query = format!("'{}' in parents and trashed=false", root_folder_id);
        let response = self
            .client
            .get(&self.base_url)
            .bearer_auth(token)
            .query(&[
                ("q", query.as_str()),
                ("spaces", "drive"),
                ("pageSize", "1000"),
                ("fields", "files(id,name,mimeType)"),
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
            .map_err(|e| DriveError::Protocol(format!("bad folder listing: {}", e)))?;

        if let Some(existing) = matching_folder(&list.files, display_name) {
            info!(folder_id = %existing.id, name = %display_name, "reusing guest folder");
            return Ok(existing.id.clone());
        }

        self.create(token, display_name, root_folder_id).await
    }

    async fn create(
        &self,
        token: &str,
        display_name: &str,
        root_folder_id: &str,
    ) -> Result<String, DriveError> {
        let metadata = json!({
            "name": display_name,
            "mimeType": FOLDER_MIME,
            "parents": [root_folder_id],
        });

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(token)
            .query(&[("supportsAllDrives", "true")])
            .json(&metadata)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::RemoteService { status, body });
        }

        let folder: DriveFile = response
            .json()
            .await
            .map_err(|e| DriveError::Protocol(format!("bad create-folder response: {}", e)))?;

        info!(folder_id = %folder.id, name = %display_name, "created guest folder");
        Ok(folder.id)
    }
}

fn matching_folder<'a>(entries: &'a [DriveFile], display_name: &str) -> Option<&'a DriveFile> {
    entries
        .iter()
        .find(|f| f.is_folder() && f.name == display_name)
}
