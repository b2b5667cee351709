use eframe::egui::{self, Align, Color32, RichText};

use super::{View, WeddingUploader};
use crate::drive::{gallery, UploadPhase};
use crate::utils::color;
use crate::utils::media;

impl WeddingUploader {
    pub fn render(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let total_height = ui.available_height();
            let footer_height = 40.0;
            let footer_margin = 15.0;
            let content_height = total_height - footer_height - footer_margin;

            egui::ScrollArea::vertical()
                .max_height(content_height)
                .show(ui, |ui| {
                    ui.add_space(20.0);
                    ui.vertical_centered(|ui| {
                        ui.heading("💍 Wedding Photo Share");
                        ui.add_space(5.0);
                        ui.label(
                            RichText::new("Share your moments from the big day")
                                .color(ui.visuals().text_color().gamma_multiply(0.7)),
                        );
                    });

                    ui.add_space(15.0);
                    ui.horizontal(|ui| {
                        ui.selectable_value(&mut self.view, View::Upload, "📤 Upload");
                        ui.selectable_value(&mut self.view, View::Gallery, "🖼 Gallery");
                    });
                    ui.separator();
                    ui.add_space(10.0);

                    match self.view {
                        View::Upload => self.render_upload(ui),
                        View::Gallery => self.render_gallery(ui),
                    }

                    ui.add_space(20.0);
                });

            ui.with_layout(egui::Layout::bottom_up(Align::Center), |ui| {
                ui.add_space(footer_margin);
                self.render_footer(ui);
            });
        });
    }

    fn render_upload(&mut self, ui: &mut egui::Ui) {
        if self.access_token.is_none() {
            self.render_sign_in(ui);
            return;
        }

        ui.group(|ui| {
            ui.label("Your name (used to organize your uploads)");
            ui.add(
                egui::TextEdit::singleline(&mut self.guest_name)
                    .hint_text("e.g. Ravi Sharma")
                    .desired_width(ui.available_width()),
            );
        });

        ui.add_space(10.0);

        ui.group(|ui| {
            ui.horizontal(|ui| {
                if ui.button("🖼 Add Photos & Videos").clicked() {
                    self.add_files();
                }
                if ui.button("📁 Add Folder").clicked() {
                    self.add_folder();
                }
            });

            if !self.selected.is_empty() {
                ui.add_space(8.0);
                ui.label(format!("Selected files ({})", self.selected.len()));
                let mut remove_index = None;
                egui::ScrollArea::vertical()
                    .id_source("selected_files")
                    .max_height(160.0)
                    .show(ui, |ui| {
                        for (index, asset) in self.selected.iter().enumerate() {
                            ui.horizontal(|ui| {
                                ui.label(&asset.name);
                                ui.label(
                                    RichText::new(media::format_size(asset.size))
                                        .color(ui.visuals().text_color().gamma_multiply(0.6)),
                                );
                                if !self.upload.is_uploading && ui.small_button("Remove").clicked()
                                {
                                    remove_index = Some(index);
                                }
                            });
                        }
                    });
                if let Some(index) = remove_index {
                    self.remove_file(index);
                }
            }
        });

        ui.add_space(15.0);

        ui.vertical_centered(|ui| {
            if self.upload.is_uploading {
                if ui.button("✖ Cancel Upload").clicked() {
                    self.cancel_upload();
                }
            } else if self.upload.outcome.is_some() {
                if ui.button("🔄 Start New Upload").clicked() {
                    self.upload.clear();
                }
            } else {
                let can_upload =
                    !self.guest_name.trim().is_empty() && !self.selected.is_empty();
                ui.add_enabled_ui(can_upload, |ui| {
                    let button =
                        egui::Button::new("📤 Upload Files").min_size(egui::vec2(200.0, 40.0));
                    if ui.add(button).clicked() {
                        self.start_upload();
                    }
                });
            }
        });

        ui.add_space(15.0);
        self.render_progress(ui);
    }

    fn render_sign_in(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.label("Sign in with Google so your uploads land in the shared wedding folder.");
            ui.label(
                RichText::new(
                    "The app can only see files it uploads itself, never your whole Drive.",
                )
                .color(ui.visuals().text_color().gamma_multiply(0.6)),
            );
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                ui.add_enabled_ui(self.config.can_sign_in(), |ui| {
                    if ui.button("🔐 Sign in with Google").clicked() {
                        self.begin_sign_in();
                    }
                });
                if self.signing_in {
                    ui.spinner();
                }
            });
            if !self.config.can_sign_in() {
                ui.colored_label(
                    Color32::from_rgb(220, 50, 50),
                    "GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET must be set",
                );
            }

            ui.add_space(8.0);
            ui.label("After approving in the browser, paste the code here:");
            ui.horizontal(|ui| {
                ui.add(
                    egui::TextEdit::singleline(&mut self.auth_code)
                        .hint_text("4/0Ab...")
                        .desired_width(280.0),
                );
                if ui.button("Continue").clicked() {
                    self.complete_sign_in();
                }
            });

            if let Some(error) = &self.auth_error {
                ui.add_space(5.0);
                ui.colored_label(Color32::from_rgb(220, 50, 50), error);
            }
        });
    }

    fn render_progress(&mut self, ui: &mut egui::Ui) {
        let batch_done = self
            .upload
            .outcome
            .as_ref()
            .map(|o| o.success())
            .unwrap_or(false);

        if !self.upload.statuses.is_empty() {
            ui.group(|ui| {
                if batch_done {
                    let uploaded = self
                        .upload
                        .outcome
                        .as_ref()
                        .map(|o| o.succeeded.len())
                        .unwrap_or(0);
                    ui.colored_label(
                        Color32::from_rgb(0, 180, 0),
                        format!("✅ {} file(s) uploaded. Thank you for sharing!", uploaded),
                    );
                } else if self.upload.is_uploading {
                    ui.label("📤 Uploading...");
                }

                let progress_bar = egui::ProgressBar::new(self.upload.progress_fraction())
                    .show_percentage()
                    .animate(false)
                    .fill(color::accent());
                ui.add(progress_bar);
                ui.label(self.upload.status_line());
            });

            ui.add_space(10.0);
            self.render_details(ui);
        }

        if let Some(error) = &self.upload.error_message {
            ui.add_space(5.0);
            ui.colored_label(Color32::from_rgb(220, 50, 50), error);
        }
    }

    fn render_details(&mut self, ui: &mut egui::Ui) {
        if ui
            .button(if self.upload.show_details {
                "Hide Details"
            } else {
                "Show Details"
            })
            .clicked()
        {
            self.upload.show_details = !self.upload.show_details;
        }

        if self.upload.show_details {
            egui::ScrollArea::vertical()
                .id_source("upload_details")
                .max_height(200.0)
                .show(ui, |ui| {
                    egui::Frame::none()
                        .fill(ui.style().visuals.extreme_bg_color)
                        .show(ui, |ui| {
                            ui.add_space(8.0);
                            for status in &self.upload.statuses {
                                ui.horizontal(|ui| match &status.phase {
                                    UploadPhase::Pending => {
                                        ui.label("⏳");
                                        ui.colored_label(
                                            Color32::from_rgb(150, 150, 150),
                                            &status.name,
                                        );
                                    }
                                    UploadPhase::Uploading => {
                                        ui.label("📤");
                                        ui.label(format!(
                                            "{} - {}%",
                                            status.name, status.percent
                                        ));
                                    }
                                    UploadPhase::Completed => {
                                        ui.label("✅");
                                        ui.colored_label(
                                            Color32::from_rgb(0, 180, 0),
                                            &status.name,
                                        );
                                    }
                                    UploadPhase::Error(detail) => {
                                        ui.label("❌");
                                        ui.colored_label(
                                            Color32::from_rgb(220, 50, 50),
                                            format!("{} - {}", status.name, detail),
                                        );
                                    }
                                });
                                ui.add_space(4.0);
                            }
                            ui.add_space(8.0);
                        });
                });
        }
    }

    fn render_gallery(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("🔄 Refresh").clicked() {
                self.refresh_gallery();
            }
            if !self.gallery.entries.is_empty() && ui.button("⬇ Download all (.zip)").clicked() {
                self.download_all();
            }
            if self.gallery.is_loading {
                ui.spinner();
            }
        });

        if let Some(notice) = &self.gallery.archive_notice {
            ui.add_space(5.0);
            ui.label(notice.clone());
        }

        if let Some(error) = &self.gallery.error_message {
            ui.add_space(5.0);
            ui.colored_label(Color32::from_rgb(220, 50, 50), error);
            return;
        }

        ui.add_space(10.0);

        if self.gallery.entries.is_empty() && !self.gallery.is_loading {
            ui.vertical_centered(|ui| {
                ui.label("No photos yet. Be the first to share!");
            });
            return;
        }

        ui.label(format!("{} photos and videos", self.gallery.entries.len()));
        ui.add_space(5.0);

        let mut open_url = None;
        egui::ScrollArea::vertical()
            .id_source("gallery_entries")
            .max_height(320.0)
            .show(ui, |ui| {
                for entry in &self.gallery.entries {
                    ui.horizontal(|ui| {
                        let icon = if entry.mime_type.starts_with("video/") {
                            "🎬"
                        } else {
                            "🖼"
                        };
                        ui.label(icon);
                        ui.label(&entry.name);
                        if let Some(size) = entry.size.as_deref().and_then(|s| s.parse().ok()) {
                            ui.label(
                                RichText::new(media::format_size(size))
                                    .color(ui.visuals().text_color().gamma_multiply(0.6)),
                            );
                        }
                        if let Some(created) = &entry.created_time {
                            ui.label(
                                RichText::new(created.as_str())
                                    .color(ui.visuals().text_color().gamma_multiply(0.5)),
                            );
                        }
                        if ui.small_button("Preview").clicked() {
                            open_url = Some(gallery::thumbnail_url(&entry.id));
                        }
                        if ui.small_button("Open").clicked() {
                            open_url = Some(gallery::view_url(&entry.id));
                        }
                    });
                    ui.add_space(3.0);
                }
            });
        if let Some(url) = open_url {
            self.open_in_browser(&url);
        }
    }

    fn render_footer(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let footer_width = 220.0;
            let indent = (ui.available_width() - footer_width) / 2.0;
            ui.add_space(indent);
            ui.scope(|ui| {
                ui.set_width(footer_width);
                ui.horizontal_centered(|ui| {
                    ui.label("Made with");
                    ui.colored_label(color::accent(), "♥");
                    ui.label("for the happy couple");
                });
            });
        });
    }
}
