//! Settings view - job server connection

use egui::RichText;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::dashboard::state::{SaveMessage, ServerDraft, SettingsViewState};
use crate::dashboard::theme::{card, ThemeColors};
use crate::shared::SharedAppState;

/// Render the settings view
pub fn render_settings_view(
    ui: &mut egui::Ui,
    view_state: &mut SettingsViewState,
    shared_state: &Arc<RwLock<SharedAppState>>,
) {
    ui.heading(RichText::new("Settings").size(24.0).strong());
    ui.add_space(8.0);
    ui.label(
        RichText::new("Where jobs are sent and how long to wait for them")
            .size(14.0)
            .color(ThemeColors::TEXT_SECONDARY),
    );
    ui.add_space(24.0);

    let mut revert = false;
    let draft = view_state
        .draft
        .get_or_insert_with(|| ServerDraft::from(&shared_state.read().config.server));

    card().show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.heading(RichText::new("Server").size(16.0));
        ui.add_space(12.0);

        egui::Grid::new("server_settings")
            .num_columns(2)
            .spacing([24.0, 10.0])
            .show(ui, |ui| {
                ui.label(RichText::new("Base URL:").color(ThemeColors::TEXT_MUTED));
                ui.add(
                    egui::TextEdit::singleline(&mut draft.base_url)
                        .hint_text("http://127.0.0.1:8080")
                        .desired_width(320.0),
                );
                ui.end_row();

                ui.label(RichText::new("Connect timeout:").color(ThemeColors::TEXT_MUTED));
                ui.add(egui::Slider::new(&mut draft.connect_timeout_secs, 1..=60).suffix(" s"));
                ui.end_row();

                ui.label(RichText::new("Upload timeout:").color(ThemeColors::TEXT_MUTED));
                ui.add(egui::Slider::new(&mut draft.upload_timeout_secs, 5..=600).suffix(" s"));
                ui.end_row();

                ui.label(RichText::new("Stream idle timeout:").color(ThemeColors::TEXT_MUTED));
                ui.add(egui::Slider::new(&mut draft.stream_idle_timeout_secs, 5..=600).suffix(" s"));
                ui.end_row();
            });

        ui.add_space(16.0);
        ui.horizontal(|ui| {
            if ui.button("Save").clicked() {
                view_state.save_requested = true;
            }
            if ui.button("Revert").clicked() {
                revert = true;
            }
        });

        if let Some(message) = &view_state.save_message {
            ui.add_space(8.0);
            let (text, color) = match message {
                SaveMessage::Saved(text) => (text, ThemeColors::ACCENT_SUCCESS),
                SaveMessage::Failed(text) => (text, ThemeColors::ACCENT_ERROR),
            };
            ui.label(RichText::new(text).size(13.0).color(color));
        }
    });

    if revert {
        view_state.draft = None;
        view_state.save_message = None;
    }

    ui.add_space(16.0);
    ui.label(
        RichText::new(format!(
            "The {} environment variable overrides the base URL at startup.",
            crate::config::SERVER_ENV_VAR
        ))
        .size(12.0)
        .color(ThemeColors::TEXT_MUTED),
    );
}
