//! Shared state and messaging between the dashboard and the job worker
//!
//! This module provides thread-safe shared state and message passing
//! for communication between the dashboard UI and background network tasks.

pub mod state;
pub mod messages;

pub use state::{ImageSource, JobView, RuntimeState, SelectedImage, SharedAppState, UploadCommand};
pub use messages::{JobEvent, Submission, SubmissionId, WorkerCommand, WorkerEvent};
