//! Dashboard view state management

use crate::config::ServerSettings;
use crate::dashboard::preview::PreviewSlot;

/// Current view in the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashboardView {
    #[default]
    Job,
    Settings,
}

impl DashboardView {
    /// Get the display name for this view
    pub fn name(&self) -> &'static str {
        match self {
            DashboardView::Job => "Job",
            DashboardView::Settings => "Settings",
        }
    }

    /// Get the icon character for this view
    pub fn icon(&self) -> &'static str {
        match self {
            DashboardView::Job => "J",
            DashboardView::Settings => "S",
        }
    }
}

/// Overall dashboard state
#[derive(Debug, Default)]
pub struct DashboardState {
    /// Current active view
    pub current_view: DashboardView,
    /// Job view state
    pub job: JobViewState,
    /// Settings view state
    pub settings: SettingsViewState,
}

/// Job view state
#[derive(Debug, Default)]
pub struct JobViewState {
    /// Texture for the selected image
    pub preview: PreviewSlot,
    /// Files are being dragged over the window
    pub drop_hover: bool,
}

/// Settings view state; edits stay in the draft until saved
#[derive(Debug, Default)]
pub struct SettingsViewState {
    /// Editable copy of the server settings
    pub draft: Option<ServerDraft>,
    /// Save button pressed
    pub save_requested: bool,
    /// Result of the last save
    pub save_message: Option<SaveMessage>,
}

/// Text-field backed copy of [`ServerSettings`]
#[derive(Debug, Clone, PartialEq)]
pub struct ServerDraft {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    pub stream_idle_timeout_secs: u64,
}

impl From<&ServerSettings> for ServerDraft {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            connect_timeout_secs: settings.connect_timeout_secs,
            upload_timeout_secs: settings.upload_timeout_secs,
            stream_idle_timeout_secs: settings.stream_idle_timeout_secs,
        }
    }
}

impl ServerDraft {
    pub fn to_settings(&self) -> ServerSettings {
        ServerSettings {
            base_url: self.base_url.trim().to_string(),
            connect_timeout_secs: self.connect_timeout_secs,
            upload_timeout_secs: self.upload_timeout_secs,
            stream_idle_timeout_secs: self.stream_idle_timeout_secs,
        }
    }
}

/// Feedback shown under the save button
#[derive(Debug, Clone, PartialEq)]
pub enum SaveMessage {
    Saved(String),
    Failed(String),
}
