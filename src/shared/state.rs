//! Shared application state between the dashboard and the job worker

use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::client::StreamControl;
use crate::config::AppConfig;
use crate::job::{ImageUpload, JobId, JobUpdate, Phase};
use crate::shared::messages::{JobEvent, Submission, SubmissionId, WorkerEvent};

pub const IDLE_STATUS: &str = "Select, paste or drop an image";
pub const NO_IMAGE_ALERT: &str = "Select or paste an image first";
pub const CONNECTION_LOST_STATUS: &str = "Connection lost; retry the upload";

/// Central shared state
#[derive(Debug, Clone)]
pub struct SharedAppState {
    /// Application configuration
    pub config: AppConfig,
    /// The image the next upload will send
    pub selection: Option<SelectedImage>,
    /// Progress of the current job
    pub job: JobView,
    /// Runtime state (not persisted)
    pub runtime: RuntimeState,
    next_revision: u64,
    next_submission: SubmissionId,
}

impl Default for SharedAppState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl SharedAppState {
    /// Create a new shared state with the given configuration
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            selection: None,
            job: JobView::default(),
            runtime: RuntimeState::default(),
            next_revision: 1,
            next_submission: 1,
        }
    }

    /// Replace the selected image; the latest pick, paste or drop wins
    pub fn select_image(&mut self, upload: ImageUpload, source: ImageSource) {
        info!(file = %upload.file_name, mime = %upload.mime, ?source, "Image selected");
        let revision = self.next_revision;
        self.next_revision += 1;
        self.job.status = format!("{} ready; click \"Upload and start\"", source.describe());
        self.selection = Some(SelectedImage {
            upload,
            source,
            revision,
        });
    }

    /// Whether the upload button should be enabled
    pub fn can_upload(&self) -> bool {
        self.selection.is_some() && !self.job.uploading
    }

    /// Take the upload for the current selection, or raise an alert
    ///
    /// `None` means nothing should be sent to the backend.
    pub fn request_upload(&mut self) -> Option<Submission> {
        let Some(selected) = &self.selection else {
            self.runtime.alert(NO_IMAGE_ALERT);
            return None;
        };
        if self.job.uploading {
            return None;
        }
        let upload = selected.upload.clone();
        let id = self.next_submission;
        self.next_submission += 1;
        self.job.begin_upload(id);
        Some(Submission { id, upload })
    }

    /// Forget the selection and return to idle
    pub fn clear(&mut self) {
        self.selection = None;
        self.job.reset();
        self.runtime.clear_error();
    }

    /// Route a worker message to the job view
    ///
    /// Events from a submission that was cleared or replaced are dropped.
    pub fn apply_worker_event(&mut self, event: WorkerEvent) {
        if self.job.submission != Some(event.submission) {
            debug!(submission = event.submission, current = ?self.job.submission, "Dropping stale worker event");
            return;
        }
        match event.kind {
            JobEvent::JobCreated(id) => self.job.job_created(id),
            JobEvent::Update(update) => {
                self.job.apply_update(&update);
            }
            JobEvent::StreamFinished => self.job.stream_finished(),
            JobEvent::TransportLost(reason) => self.job.transport_lost(&reason),
            JobEvent::SubmitFailed(message) => self.job.submit_failed(&message),
        }
    }
}

/// Where the selected image came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    File(PathBuf),
    Clipboard,
    Dropped,
}

impl ImageSource {
    fn describe(&self) -> &'static str {
        match self {
            ImageSource::File(_) => "Image",
            ImageSource::Clipboard => "Pasted image",
            ImageSource::Dropped => "Dropped image",
        }
    }
}

/// The image slot
#[derive(Debug, Clone)]
pub struct SelectedImage {
    pub upload: ImageUpload,
    pub source: ImageSource,
    /// Changes whenever the slot is replaced
    pub revision: u64,
}

/// Everything the dashboard shows about the current job
#[derive(Debug, Clone, PartialEq)]
pub struct JobView {
    /// Upload whose events this view accepts
    pub submission: Option<SubmissionId>,
    pub job_id: Option<JobId>,
    pub phase: Option<Phase>,
    /// Always within `0..=100`
    pub progress: u8,
    pub status: String,
    /// Cumulative result text
    pub result_text: String,
    /// Upload request in flight
    pub uploading: bool,
    pub stream_open: bool,
}

impl Default for JobView {
    fn default() -> Self {
        Self {
            submission: None,
            job_id: None,
            phase: None,
            progress: 0,
            status: IDLE_STATUS.to_string(),
            result_text: String::new(),
            uploading: false,
            stream_open: false,
        }
    }
}

impl JobView {
    pub fn begin_upload(&mut self, submission: SubmissionId) {
        self.submission = Some(submission);
        self.job_id = None;
        self.phase = None;
        self.progress = 0;
        self.status = "Uploading…".to_string();
        self.uploading = true;
        self.stream_open = false;
    }

    pub fn job_created(&mut self, id: JobId) {
        info!(job = %id, "Job created");
        self.job_id = Some(id);
        self.result_text.clear();
        self.progress = 1;
        self.status = "Job created, processing…".to_string();
        self.uploading = false;
        self.stream_open = true;
    }

    /// Apply one stream message; `Close` means the stream is done
    pub fn apply_update(&mut self, update: &JobUpdate) -> StreamControl {
        self.phase = Some(update.phase.clone());

        if let Some(message) = update.failure() {
            self.progress = 100;
            self.status = format!("failed: {}", message);
            self.stream_open = false;
            return StreamControl::Close;
        }

        self.progress = update.clamped_progress();
        self.status = format!("{} ({}%)", update.phase.label(), self.progress);
        if let Some(text) = &update.result_text {
            self.result_text.clone_from(text);
        }

        if update.closes_stream() {
            self.stream_open = false;
            StreamControl::Close
        } else {
            StreamControl::Continue
        }
    }

    pub fn submit_failed(&mut self, message: &str) {
        warn!(%message, "Job submission failed");
        self.status = format!("failed: {}", message);
        self.uploading = false;
        self.stream_open = false;
    }

    pub fn transport_lost(&mut self, reason: &str) {
        warn!(%reason, "Event stream lost");
        self.status = CONNECTION_LOST_STATUS.to_string();
        self.stream_open = false;
    }

    pub fn stream_finished(&mut self) {
        self.stream_open = false;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Progress as a fraction for progress bars
    pub fn fraction(&self) -> f32 {
        f32::from(self.progress) / 100.0
    }

    pub fn is_busy(&self) -> bool {
        self.uploading || self.stream_open
    }
}

/// Pending request from the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadCommand {
    /// Upload the current selection
    Start,
    /// Drop the selection and reset the job view
    Clear,
}

/// Runtime state that is not persisted
#[derive(Debug, Clone, Default)]
pub struct RuntimeState {
    /// Pending command from the UI
    pub upload_command: Option<UploadCommand>,
    /// Modal message waiting for acknowledgement
    pub pending_alert: Option<String>,
    /// Last error message (if any)
    pub last_error: Option<String>,
    /// Request to open the file dialog
    pub open_file_dialog: bool,
    /// Request to read the clipboard
    pub paste_requested: bool,
}

impl RuntimeState {
    /// Clear any error state
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Set an error message
    pub fn set_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }

    /// Show a modal message
    pub fn alert(&mut self, message: impl Into<String>) {
        self.pending_alert = Some(message.into());
    }
}
