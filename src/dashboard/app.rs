//! Dashboard application entry point

use eframe::egui;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::app::{JobWorker, Waker};
use crate::client::JobClient;
use crate::clipboard;
use crate::config::{save_config, UiSettings};
use crate::dashboard::components::render_sidebar;
use crate::dashboard::state::{DashboardState, DashboardView, SaveMessage};
use crate::dashboard::theme;
use crate::dashboard::views::{render_job_view, render_settings_view};
use crate::job::{is_image_mime, ImageUpload, UploadError, IMAGE_EXTENSIONS};
use crate::shared::{ImageSource, SharedAppState, UploadCommand};

const DROP_NOT_IMAGE_ALERT: &str = "Drop an image file";
const CLIPBOARD_EMPTY_ALERT: &str = "The clipboard does not contain an image";

/// The main dashboard application
pub struct DashboardApp {
    /// Shared application state
    shared_state: Arc<RwLock<SharedAppState>>,
    /// Dashboard-specific state
    dashboard_state: DashboardState,
    /// Whether theme has been applied
    theme_applied: bool,
    /// Background network worker
    worker: JobWorker,
    /// Where settings are saved
    config_path: Option<PathBuf>,
    /// Worker death already reported
    worker_lost: bool,
}

impl DashboardApp {
    /// Create a new dashboard application
    pub fn new(
        shared_state: Arc<RwLock<SharedAppState>>,
        worker: JobWorker,
        config_path: Option<PathBuf>,
    ) -> Self {
        Self {
            shared_state,
            dashboard_state: DashboardState::default(),
            theme_applied: false,
            worker,
            config_path,
            worker_lost: false,
        }
    }

    /// Create eframe options for the dashboard window
    pub fn options(ui: &UiSettings) -> eframe::NativeOptions {
        eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([ui.window_size.0, ui.window_size.1])
                .with_min_inner_size([720.0, 480.0])
                .with_drag_and_drop(true)
                .with_title("SnapSum"),
            ..Default::default()
        }
    }

    /// Apply everything the worker reported since the last frame
    fn process_worker_events(&mut self) {
        let events = self.worker.drain_events();
        if !events.is_empty() {
            let mut state = self.shared_state.write();
            for event in events {
                state.apply_worker_event(event);
            }
        }

        if !self.worker_lost && !self.worker.is_running() {
            error!("Job worker stopped unexpectedly");
            self.worker_lost = true;
            self.shared_state
                .write()
                .runtime
                .set_error("Background worker stopped; restart the application");
        }
    }

    /// Paste shortcuts and dropped files
    fn process_input(&mut self, ctx: &egui::Context) {
        let (dropped, hovering, paste) = ctx.input(|i| {
            let paste = i.events.iter().any(|event| match event {
                egui::Event::Paste(_) => true,
                egui::Event::Key {
                    key: egui::Key::V,
                    pressed: true,
                    modifiers,
                    ..
                } => modifiers.command,
                _ => false,
            });
            (i.raw.dropped_files.clone(), !i.raw.hovered_files.is_empty(), paste)
        });

        self.dashboard_state.job.drop_hover = hovering;

        if paste
            && !ctx.wants_keyboard_input()
            && self.dashboard_state.current_view == DashboardView::Job
        {
            self.paste_from_clipboard();
        }

        if let Some(file) = dropped.first() {
            if dropped.len() > 1 {
                info!("{} files dropped, using the first", dropped.len());
            }
            self.dashboard_state.current_view = DashboardView::Job;
            self.select_dropped(file);
        }
    }

    /// Process requests raised by the views
    fn process_commands(&mut self) {
        let (command, open_dialog, paste) = {
            let mut state = self.shared_state.write();
            (
                state.runtime.upload_command.take(),
                std::mem::take(&mut state.runtime.open_file_dialog),
                std::mem::take(&mut state.runtime.paste_requested),
            )
        };

        if open_dialog {
            self.open_file_dialog();
        }
        if paste {
            self.paste_from_clipboard();
        }

        match command {
            Some(UploadCommand::Start) => {
                let submission = self.shared_state.write().request_upload();
                if let Some(submission) = submission {
                    info!(
                        file = %submission.upload.file_name,
                        bytes = submission.upload.len(),
                        submission = submission.id,
                        "Submitting image"
                    );
                    if let Err(e) = self.worker.submit(submission) {
                        error!("{}", e);
                        self.shared_state.write().job.submit_failed(&e.to_string());
                    }
                }
            }
            Some(UploadCommand::Clear) => {
                self.worker.cancel();
                self.shared_state.write().clear();
            }
            None => {}
        }

        self.process_settings_save();
    }

    fn open_file_dialog(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_title("Choose an image")
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file()
        else {
            return;
        };

        match ImageUpload::from_path(&path) {
            Ok(upload) => self.shared_state.write().select_image(upload, ImageSource::File(path)),
            Err(e) => self.report_upload_error(e),
        }
    }

    fn paste_from_clipboard(&mut self) {
        match clipboard::read_image() {
            Ok(Some(upload)) => self.shared_state.write().select_image(upload, ImageSource::Clipboard),
            Ok(None) => self.shared_state.write().runtime.alert(CLIPBOARD_EMPTY_ALERT),
            Err(e) => {
                warn!("Clipboard read failed: {:#}", e);
                self.shared_state.write().runtime.set_error(format!("{:#}", e));
            }
        }
    }

    fn select_dropped(&mut self, file: &egui::DroppedFile) {
        match upload_from_dropped(file) {
            Ok(upload) => self.shared_state.write().select_image(upload, ImageSource::Dropped),
            Err(e) => self.report_upload_error(e),
        }
    }

    fn report_upload_error(&mut self, error: UploadError) {
        let mut state = self.shared_state.write();
        match error {
            UploadError::NotAnImage(name) => {
                warn!(file = %name, "Rejected non-image selection");
                state.runtime.alert(DROP_NOT_IMAGE_ALERT);
            }
            other => {
                warn!("Could not load image: {}", other);
                state.runtime.set_error(other.to_string());
            }
        }
    }

    /// Validate, persist and apply edited server settings
    fn process_settings_save(&mut self) {
        let view_state = &mut self.dashboard_state.settings;
        if !std::mem::take(&mut view_state.save_requested) {
            return;
        }
        let Some(draft) = &view_state.draft else {
            return;
        };

        let settings = draft.to_settings();
        if let Err(e) = JobClient::new(&settings) {
            view_state.save_message = Some(SaveMessage::Failed(e.to_string()));
            return;
        }

        let config = {
            let mut state = self.shared_state.write();
            state.config.server = settings.clone();
            state.config.clone()
        };
        self.worker.update_server(settings);

        view_state.save_message = Some(match &self.config_path {
            Some(path) => match save_config(&config, path) {
                Ok(()) => {
                    info!("Saved configuration to {:?}", path);
                    SaveMessage::Saved(format!("Saved to {}", path.display()))
                }
                Err(e) => SaveMessage::Failed(format!("Applied, but saving failed: {:#}", e)),
            },
            None => SaveMessage::Saved("Applied for this session".to_string()),
        });
    }

    /// Modal message for alerts
    fn render_alert(&mut self, ctx: &egui::Context) {
        let Some(message) = self.shared_state.read().runtime.pending_alert.clone() else {
            return;
        };

        let mut dismissed = false;
        egui::Window::new("Notice")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(&message);
                ui.add_space(12.0);
                if ui.button("OK").clicked() || ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    dismissed = true;
                }
            });

        if dismissed {
            self.shared_state.write().runtime.pending_alert = None;
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Apply theme once
        if !self.theme_applied {
            theme::apply_theme(ctx);
            self.theme_applied = true;
        }

        self.process_worker_events();
        self.process_input(ctx);
        self.process_commands();

        let server = self.shared_state.read().config.server.base_url.clone();
        egui::SidePanel::left("sidebar")
            .resizable(false)
            .default_width(170.0)
            .show(ctx, |ui| {
                render_sidebar(ui, &mut self.dashboard_state.current_view, &server);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::none().inner_margin(24.0).show(ui, |ui| {
                match self.dashboard_state.current_view {
                    DashboardView::Job => {
                        render_job_view(ui, &mut self.dashboard_state.job, &self.shared_state);
                    }
                    DashboardView::Settings => {
                        render_settings_view(ui, &mut self.dashboard_state.settings, &self.shared_state);
                    }
                }
            });
        });

        self.render_alert(ctx);
    }
}

/// Build an upload from a file dropped onto the window
pub fn upload_from_dropped(file: &egui::DroppedFile) -> Result<ImageUpload, UploadError> {
    if !file.mime.is_empty() && !is_image_mime(&file.mime) {
        return Err(UploadError::NotAnImage(file.name.clone()));
    }

    if let Some(path) = &file.path {
        return ImageUpload::from_path(path);
    }

    match &file.bytes {
        Some(bytes) => ImageUpload::from_bytes(file.name.clone(), bytes.clone()),
        None => Err(UploadError::NotAnImage(file.name.clone())),
    }
}

/// Run the dashboard application
pub fn run_dashboard(
    shared_state: Arc<RwLock<SharedAppState>>,
    config_path: Option<PathBuf>,
) -> Result<(), eframe::Error> {
    let (options, server) = {
        let state = shared_state.read();
        (DashboardApp::options(&state.config.ui), state.config.server.clone())
    };

    eframe::run_native(
        "SnapSum",
        options,
        Box::new(
            move |cc: &eframe::CreationContext<'_>| -> Result<
                Box<dyn eframe::App>,
                Box<dyn std::error::Error + Send + Sync>,
            > {
                let ctx = cc.egui_ctx.clone();
                let waker: Waker = Arc::new(move || ctx.request_repaint());
                let worker = JobWorker::spawn(server, waker)?;
                Ok(Box::new(DashboardApp::new(shared_state, worker, config_path)))
            },
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn png_bytes() -> Vec<u8> {
        ImageUpload::from_rgba(2, 2, vec![255; 16]).unwrap().bytes.to_vec()
    }

    #[test]
    fn test_dropped_bytes_become_selection() {
        let file = egui::DroppedFile {
            name: "drop.png".to_string(),
            mime: "image/png".to_string(),
            bytes: Some(png_bytes().into()),
            ..Default::default()
        };

        let upload = upload_from_dropped(&file).unwrap();
        assert_eq!(upload.mime, "image/png");

        let mut state = SharedAppState::default();
        state.select_image(upload, ImageSource::Dropped);
        assert!(state.can_upload());
    }

    #[test]
    fn test_dropped_path_is_read() {
        let mut temp = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        temp.write_all(&png_bytes()).unwrap();

        let file = egui::DroppedFile {
            path: Some(temp.path().to_path_buf()),
            ..Default::default()
        };

        assert_eq!(upload_from_dropped(&file).unwrap().mime, "image/png");
    }

    #[test]
    fn test_dropped_text_rejected() {
        let file = egui::DroppedFile {
            name: "notes.txt".to_string(),
            mime: "text/plain".to_string(),
            bytes: Some(b"hello".to_vec().into()),
            ..Default::default()
        };

        assert!(matches!(upload_from_dropped(&file), Err(UploadError::NotAnImage(_))));
    }

    #[test]
    fn test_dropped_without_payload_rejected() {
        let file = egui::DroppedFile {
            name: "ghost.png".to_string(),
            ..Default::default()
        };
        assert!(upload_from_dropped(&file).is_err());
    }
}
