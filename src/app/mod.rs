mod state;
mod ui;

use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, TryRecvError};

use eframe::egui;
use ignore::Walk;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub use state::{GalleryState, UploadState};

use crate::config::AppConfig;
use crate::drive::{
    self, Asset, FolderResolver, GalleryClient, ResumableTransfer, UploadBatch,
};
use crate::utils::media;

#[derive(Clone, Copy, PartialEq)]
pub enum View {
    Upload,
    Gallery,
}

pub struct WeddingUploader {
    pub config: AppConfig,
    pub view: View,
    pub guest_name: String,
    pub selected: Vec<Asset>,
    pub access_token: Option<String>,
    pub auth_code: String,
    pub signing_in: bool,
    pub auth_error: Option<String>,
    auth_receiver: Option<Receiver<Result<(String, Option<String>), String>>>,
    pub upload: UploadState,
    pub gallery: GalleryState,
}

impl WeddingUploader {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        info!("starting wedding uploader");
        Self {
            config: AppConfig::from_env(),
            view: View::Upload,
            guest_name: String::new(),
            selected: Vec::new(),
            access_token: None,
            auth_code: String::new(),
            signing_in: false,
            auth_error: None,
            auth_receiver: None,
            upload: UploadState::default(),
            gallery: GalleryState::default(),
        }
    }

    pub fn begin_sign_in(&mut self) {
        match drive::auth::consent_url(&self.config) {
            Ok(url) => {
                if let Err(e) = open::that(&url) {
                    self.auth_error = Some(format!("Could not open the browser: {}", e));
                }
            }
            Err(e) => self.auth_error = Some(e.detail()),
        }
    }

    /// Exchanges the pasted authorization code on a worker thread.
    pub fn complete_sign_in(&mut self) {
        let code = self.auth_code.trim().to_string();
        if code.is_empty() {
            self.auth_error = Some("Paste the code from the browser first".to_string());
            return;
        }

        self.signing_in = true;
        self.auth_error = None;
        let config = self.config.clone();
        let (sender, receiver) = channel();
        self.auth_receiver = Some(receiver);

        std::thread::spawn(move || {
            let rt = Runtime::new().expect("tokio runtime");
            rt.block_on(async {
                let client = reqwest::Client::new();
                let result = match drive::auth::exchange_code(&client, &config, &code).await {
                    Ok(tokens) => {
                        let name = drive::auth::fetch_profile(&client, &tokens.access_token)
                            .await
                            .ok()
                            .and_then(|p| p.name);
                        Ok((tokens.access_token, name))
                    }
                    Err(e) => Err(e.detail()),
                };
                let _ = sender.send(result);
            });
        });
    }

    pub fn add_files(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter(
                "Photos & videos",
                &["jpg", "jpeg", "png", "gif", "webp", "heic", "mp4", "mov", "mkv", "avi", "webm"],
            )
            .pick_files();
        if let Some(paths) = picked {
            self.add_paths(paths);
        }
    }

    /// Whole-folder selection, honoring .gitignore files along the walk.
    pub fn add_folder(&mut self) {
        if let Some(folder) = rfd::FileDialog::new().pick_folder() {
            let paths: Vec<PathBuf> = Walk::new(&folder)
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.into_path())
                .filter(|path| path.is_file())
                .collect();
            self.add_paths(paths);
        }
    }

    fn add_paths(&mut self, paths: Vec<PathBuf>) {
        for path in paths {
            if !media::is_media_file(&path) {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                self.upload.error_message = Some(format!("{} is not a photo or video", name));
                continue;
            }
            match Asset::from_path(&path) {
                Some(asset) => self.selected.push(asset),
                None => {
                    self.upload.error_message =
                        Some(format!("Could not read {}", path.display()));
                }
            }
        }
    }

    pub fn remove_file(&mut self, index: usize) {
        if index < self.selected.len() {
            self.selected.remove(index);
        }
    }

    pub fn start_upload(&mut self) {
        let token = match &self.access_token {
            Some(token) => token.clone(),
            None => {
                self.upload.error_message = Some("Sign in with Google first".to_string());
                return;
            }
        };
        let name = self.guest_name.trim().to_string();
        if name.is_empty() {
            self.upload.error_message = Some("Please enter your name".to_string());
            return;
        }
        if self.selected.is_empty() {
            self.upload.error_message = Some("Please select at least one file".to_string());
            return;
        }

        info!(guest = %name, files = self.selected.len(), "starting upload batch");
        self.upload.begin_run();

        let assets = self.selected.clone();
        let root_folder = self.config.wedding_folder_id.clone();
        let cancel = CancellationToken::new();
        self.upload.cancel = Some(cancel.clone());

        let (snapshot_sender, snapshot_receiver) = channel();
        let (outcome_sender, outcome_receiver) = channel();
        self.upload.snapshot_receiver = Some(snapshot_receiver);
        self.upload.outcome_receiver = Some(outcome_receiver);

        std::thread::spawn(move || {
            let rt = Runtime::new().expect("tokio runtime");
            rt.block_on(async move {
                let client = reqwest::Client::new();

                // Folder resolution failures are batch-fatal: there is
                // nowhere to put the files.
                let resolver = FolderResolver::new(client.clone());
                let folder_id = match resolver.resolve(&token, &name, &root_folder).await {
                    Ok(id) => id,
                    Err(e) => {
                        error!(error = %e, "folder resolution failed");
                        let _ = outcome_sender.send(Err(e.detail()));
                        return;
                    }
                };

                let batch = UploadBatch::new(ResumableTransfer::new(client));
                let outcome = batch
                    .run(&token, &assets, &folder_id, &cancel, move |snapshot| {
                        let _ = snapshot_sender.send(snapshot.to_vec());
                    })
                    .await;
                let _ = outcome_sender.send(Ok(outcome));
            });
        });
    }

    pub fn cancel_upload(&mut self) {
        if let Some(cancel) = &self.upload.cancel {
            info!("canceling upload batch");
            cancel.cancel();
        }
    }

    pub fn refresh_gallery(&mut self) {
        let key_path = match &self.config.service_account_key_path {
            Some(path) => path.clone(),
            None => {
                self.gallery.error_message =
                    Some("Gallery is not configured on this machine".to_string());
                return;
            }
        };
        let folder_id = self.config.wedding_folder_id.clone();

        self.gallery.is_loading = true;
        self.gallery.error_message = None;
        let (sender, receiver) = channel();
        self.gallery.entries_receiver = Some(receiver);

        std::thread::spawn(move || {
            let rt = Runtime::new().expect("tokio runtime");
            rt.block_on(async move {
                let result = async {
                    let key = drive::auth::ServiceAccountKey::from_file(&key_path)
                        .map_err(|e| e.to_string())?;
                    let client = reqwest::Client::new();
                    let token = drive::auth::service_account_token(
                        &client,
                        &key,
                        drive::auth::READONLY_SCOPE,
                    )
                    .await
                    .map_err(|e| e.detail())?;
                    GalleryClient::new(client)
                        .list_media_recursive(&token, &folder_id)
                        .await
                        .map_err(|e| e.detail())
                }
                .await;
                let _ = sender.send(result);
            });
        });
    }

    pub fn download_all(&mut self) {
        let key_path = match &self.config.service_account_key_path {
            Some(path) => path.clone(),
            None => {
                self.gallery.error_message =
                    Some("Gallery is not configured on this machine".to_string());
                return;
            }
        };
        let dest = match rfd::FileDialog::new()
            .set_file_name("wedding-photos.zip")
            .save_file()
        {
            Some(path) => path,
            None => return,
        };
        let folder_id = self.config.wedding_folder_id.clone();

        self.gallery.archive_notice = Some("Preparing the archive...".to_string());
        let (sender, receiver) = channel();
        self.gallery.archive_receiver = Some(receiver);

        std::thread::spawn(move || {
            let rt = Runtime::new().expect("tokio runtime");
            rt.block_on(async move {
                let result = async {
                    let key = drive::auth::ServiceAccountKey::from_file(&key_path)
                        .map_err(|e| e.to_string())?;
                    let client = reqwest::Client::new();
                    let token = drive::auth::service_account_token(
                        &client,
                        &key,
                        drive::auth::READONLY_SCOPE,
                    )
                    .await
                    .map_err(|e| e.detail())?;
                    GalleryClient::new(client)
                        .download_archive(&token, &folder_id, &dest)
                        .await
                        .map_err(|e| e.to_string())
                }
                .await;
                let _ = sender.send(result);
            });
        });
    }

    pub fn open_in_browser(&mut self, url: &str) {
        if let Err(e) = open::that(url) {
            self.gallery.error_message = Some(format!("Could not open the browser: {}", e));
        }
    }

    /// Drains the worker channels. Runs once per frame, before rendering.
    pub fn update_state(&mut self, ctx: &egui::Context) {
        if let Some(receiver) = self.auth_receiver.take() {
            match receiver.try_recv() {
                Ok(Ok((token, profile_name))) => {
                    self.signing_in = false;
                    self.access_token = Some(token);
                    self.auth_code.clear();
                    if self.guest_name.trim().is_empty() {
                        if let Some(name) = profile_name {
                            self.guest_name = name;
                        }
                    }
                    ctx.request_repaint();
                }
                Ok(Err(detail)) => {
                    self.signing_in = false;
                    self.auth_error = Some(detail);
                    ctx.request_repaint();
                }
                Err(TryRecvError::Empty) => self.auth_receiver = Some(receiver),
                Err(TryRecvError::Disconnected) => self.signing_in = false,
            }
        }

        if let Some(receiver) = &self.upload.snapshot_receiver {
            let mut latest = None;
            while let Ok(snapshot) = receiver.try_recv() {
                latest = Some(snapshot);
            }
            if let Some(snapshot) = latest {
                self.upload.statuses = snapshot;
                ctx.request_repaint();
            }
        }

        if let Some(receiver) = self.upload.outcome_receiver.take() {
            match receiver.try_recv() {
                Ok(result) => {
                    self.upload.is_uploading = false;
                    self.upload.cancel = None;
                    self.upload.snapshot_receiver = None;
                    match result {
                        Ok(outcome) => {
                            if !outcome.success() {
                                self.upload.error_message = Some(format!(
                                    "Upload finished with {} failed file(s). Check details below.",
                                    outcome.failed.len()
                                ));
                            } else {
                                self.selected.clear();
                            }
                            self.upload.outcome = Some(outcome);
                        }
                        Err(detail) => self.upload.error_message = Some(detail),
                    }
                    ctx.request_repaint();
                }
                Err(TryRecvError::Empty) => self.upload.outcome_receiver = Some(receiver),
                Err(TryRecvError::Disconnected) => self.upload.is_uploading = false,
            }
        }

        if let Some(receiver) = self.gallery.entries_receiver.take() {
            match receiver.try_recv() {
                Ok(result) => {
                    self.gallery.is_loading = false;
                    match result {
                        Ok(entries) => self.gallery.entries = entries,
                        Err(detail) => self.gallery.error_message = Some(detail),
                    }
                    ctx.request_repaint();
                }
                Err(TryRecvError::Empty) => self.gallery.entries_receiver = Some(receiver),
                Err(TryRecvError::Disconnected) => self.gallery.is_loading = false,
            }
        }

        if let Some(receiver) = self.gallery.archive_receiver.take() {
            match receiver.try_recv() {
                Ok(result) => {
                    self.gallery.archive_notice = match result {
                        Ok(count) => Some(format!("Saved {} files to the archive", count)),
                        Err(detail) => Some(format!("Archive failed: {}", detail)),
                    };
                    ctx.request_repaint();
                }
                Err(TryRecvError::Empty) => self.gallery.archive_receiver = Some(receiver),
                Err(TryRecvError::Disconnected) => self.gallery.archive_notice = None,
            }
        }

        if self.upload.is_uploading || self.gallery.is_loading || self.signing_in {
            ctx.request_repaint();
        }
    }
}

impl eframe::App for WeddingUploader {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_state(ctx);
        self.render(ctx);
    }
}

impl Drop for WeddingUploader {
    fn drop(&mut self) {
        // Window teardown aborts any in-flight transfer.
        if let Some(cancel) = &self.upload.cancel {
            cancel.cancel();
        }
    }
}
