//! Job view - image input, progress and result text

use egui::RichText;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::dashboard::components::{CardStatus, StatusCard};
use crate::dashboard::state::JobViewState;
use crate::dashboard::theme::{card, color_with_alpha, ThemeColors};
use crate::shared::{SharedAppState, UploadCommand};

/// Render the job view
pub fn render_job_view(
    ui: &mut egui::Ui,
    view_state: &mut JobViewState,
    shared_state: &Arc<RwLock<SharedAppState>>,
) {
    ui.heading(RichText::new("Image job").size(24.0).strong());
    ui.add_space(8.0);
    ui.label(
        RichText::new("Upload an image and follow OCR and summary generation")
            .size(14.0)
            .color(ThemeColors::TEXT_SECONDARY),
    );
    ui.add_space(16.0);

    {
        let app_state = shared_state.read();
        let max_edge = app_state.config.ui.preview_max_size;
        view_state
            .preview
            .sync(ui.ctx(), app_state.selection.as_ref(), max_edge);
    }

    egui::ScrollArea::vertical().show(ui, |ui| {
        render_summary_cards(ui, shared_state);
        ui.add_space(16.0);
        render_input_card(ui, view_state, shared_state);
        ui.add_space(16.0);
        render_progress_card(ui, shared_state);
        ui.add_space(16.0);
        render_output_card(ui, shared_state);
    });
}

fn render_summary_cards(ui: &mut egui::Ui, shared_state: &Arc<RwLock<SharedAppState>>) {
    let app_state = shared_state.read();
    let job = &app_state.job;

    ui.horizontal(|ui| {
        let (selection, selection_status) = match &app_state.selection {
            Some(selected) => (selected.upload.file_name.clone(), CardStatus::Done),
            None => ("None".to_string(), CardStatus::Idle),
        };
        StatusCard::new("Image", selection, selection_status).show(ui);

        ui.add_space(12.0);

        let phase = match (&job.phase, job.uploading) {
            (Some(phase), _) => phase.label().to_string(),
            (None, true) => "Uploading".to_string(),
            (None, false) => "Idle".to_string(),
        };
        StatusCard::new("Phase", phase, CardStatus::for_phase(job.phase.as_ref(), job.is_busy())).show(ui);

        ui.add_space(12.0);

        let job_id = job
            .job_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let id_status = if job.stream_open { CardStatus::Running } else { CardStatus::Idle };
        StatusCard::new("Job", job_id, id_status).show(ui);
    });
}

fn render_input_card(
    ui: &mut egui::Ui,
    view_state: &mut JobViewState,
    shared_state: &Arc<RwLock<SharedAppState>>,
) {
    card().show(ui, |ui| {
        ui.set_width(ui.available_width());

        ui.horizontal(|ui| {
            if ui.button("Choose image…").clicked() {
                shared_state.write().runtime.open_file_dialog = true;
            }
            if ui.button("Paste").clicked() {
                shared_state.write().runtime.paste_requested = true;
            }

            let (ready, uploading) = {
                let state = shared_state.read();
                (state.can_upload(), state.job.uploading)
            };
            let fill = if ready {
                ThemeColors::ACCENT_SUCCESS
            } else {
                ThemeColors::BG_LIGHT
            };
            let upload = egui::Button::new(RichText::new("Upload and start").color(egui::Color32::WHITE))
                .fill(fill)
                .min_size(egui::vec2(150.0, 30.0));
            if ui.add_enabled(!uploading, upload).clicked() {
                shared_state.write().runtime.upload_command = Some(UploadCommand::Start);
            }

            if ui.button("Clear").clicked() {
                shared_state.write().runtime.upload_command = Some(UploadCommand::Clear);
            }
        });

        ui.add_space(6.0);
        ui.label(
            RichText::new("Ctrl+V pastes an image from the clipboard; files can be dropped onto the window.")
                .size(12.0)
                .color(ThemeColors::TEXT_MUTED),
        );
        ui.add_space(10.0);

        let border = if view_state.drop_hover {
            ThemeColors::BORDER_DROP
        } else {
            ThemeColors::BORDER
        };
        egui::Frame::none()
            .fill(ThemeColors::BG_DARK)
            .stroke(egui::Stroke::new(1.5, border))
            .rounding(egui::Rounding::same(6.0))
            .inner_margin(12.0)
            .show(ui, |ui| {
                let area = egui::vec2(ui.available_width(), 200.0);
                ui.set_min_size(area);

                if let Some(texture) = view_state.preview.texture() {
                    let tex_size = texture.size_vec2();
                    let scale = (area.x / tex_size.x).min(area.y / tex_size.y).min(1.0);
                    ui.centered_and_justified(|ui| {
                        ui.image((texture.id(), tex_size * scale));
                    });
                } else {
                    let message = match (view_state.preview.error(), shared_state.read().selection.is_some()) {
                        (Some(_), true) => "Preview unavailable for this format; it can still be uploaded",
                        _ if view_state.drop_hover => "Release to select the image",
                        _ => "Paste or drop an image here",
                    };
                    ui.centered_and_justified(|ui| {
                        ui.label(RichText::new(message).color(ThemeColors::TEXT_MUTED));
                    });
                }
            });
    });
}

fn render_progress_card(ui: &mut egui::Ui, shared_state: &Arc<RwLock<SharedAppState>>) {
    let app_state = shared_state.read();
    let job = &app_state.job;

    card().show(ui, |ui| {
        ui.set_width(ui.available_width());

        let bar_color = match job.phase {
            Some(crate::job::Phase::Error) => ThemeColors::ACCENT_ERROR,
            Some(crate::job::Phase::Done) => ThemeColors::ACCENT_SUCCESS,
            _ => ThemeColors::ACCENT_PRIMARY,
        };
        ui.add(
            egui::ProgressBar::new(job.fraction())
                .fill(bar_color)
                .desired_width(ui.available_width())
                .text(format!("{}%", job.progress)),
        );

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.label(RichText::new("Status:").color(ThemeColors::TEXT_MUTED));
            let color = if job.status.starts_with("failed") {
                ThemeColors::ACCENT_ERROR
            } else {
                ThemeColors::TEXT_PRIMARY
            };
            ui.label(RichText::new(&job.status).color(color));
        });
    });

    if let Some(error) = &app_state.runtime.last_error {
        ui.add_space(12.0);
        egui::Frame::none()
            .fill(color_with_alpha(ThemeColors::ACCENT_ERROR, 51))
            .rounding(egui::Rounding::same(6.0))
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new("Error:").color(ThemeColors::ACCENT_ERROR).strong());
                    ui.label(RichText::new(error).color(ThemeColors::TEXT_PRIMARY));
                });
            });
    }
}

fn render_output_card(ui: &mut egui::Ui, shared_state: &Arc<RwLock<SharedAppState>>) {
    let app_state = shared_state.read();

    card().show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.label(RichText::new("Output").size(16.0).strong());
        ui.add_space(8.0);

        let mut text: &str = &app_state.job.result_text;
        egui::ScrollArea::vertical()
            .id_salt("result_text")
            .max_height(320.0)
            .show(ui, |ui| {
                ui.add(
                    egui::TextEdit::multiline(&mut text)
                        .hint_text("The result appears here…")
                        .font(egui::TextStyle::Monospace)
                        .desired_rows(12)
                        .desired_width(f32::INFINITY),
                );
            });
    });
}
