//! Message types for communication between the dashboard and the job worker

use crate::config::ServerSettings;
use crate::job::{ImageUpload, JobId, JobUpdate};

/// Sequence number of one upload request; events from older ones are stale
pub type SubmissionId = u64;

/// An upload handed to the worker
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: SubmissionId,
    pub upload: ImageUpload,
}

/// Messages sent from the UI to the worker
#[derive(Debug, Clone)]
pub enum WorkerCommand {
    /// Upload an image and follow the resulting job
    Submit(Submission),
    /// Abandon the current job without starting another
    Cancel,
    /// Use a different backend for later submissions
    UpdateServer(ServerSettings),
    /// Stop the worker thread
    Shutdown,
}

/// Message sent from the worker to the UI
#[derive(Debug, Clone)]
pub struct WorkerEvent {
    /// Submission this event belongs to
    pub submission: SubmissionId,
    pub kind: JobEvent,
}

#[derive(Debug, Clone)]
pub enum JobEvent {
    /// The backend accepted the upload
    JobCreated(JobId),
    /// A status message from the event stream
    Update(JobUpdate),
    /// The stream ended after a terminal update
    StreamFinished,
    /// The stream broke before the job finished
    TransportLost(String),
    /// Job creation failed
    SubmitFailed(String),
}

impl WorkerEvent {
    pub fn new(submission: SubmissionId, kind: JobEvent) -> Self {
        Self { submission, kind }
    }

    /// Whether nothing else follows for this submission
    pub fn is_final(&self) -> bool {
        matches!(
            self.kind,
            JobEvent::StreamFinished | JobEvent::TransportLost(_) | JobEvent::SubmitFailed(_)
        )
    }
}
