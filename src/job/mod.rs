//! Job protocol types
//!
//! Wire types for the job backend: the id returned on creation and the
//! status updates pushed over the event stream.

pub mod upload;

use serde::{Deserialize, Deserializer};
use std::fmt;

pub use upload::{is_image_mime, ImageUpload, UploadError, IMAGE_EXTENSIONS};

/// Identifier of a server-side job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Processing stage reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Phase {
    Queued,
    Ocr,
    Llm,
    Done,
    Error,
    /// A phase this client does not know; shown verbatim
    Other(String),
}

impl From<String> for Phase {
    fn from(name: String) -> Self {
        match name.as_str() {
            "queued" => Phase::Queued,
            "ocr" => Phase::Ocr,
            "llm" => Phase::Llm,
            "done" => Phase::Done,
            "error" => Phase::Error,
            _ => Phase::Other(name),
        }
    }
}

impl Phase {
    /// Human readable label for status lines
    pub fn label(&self) -> &str {
        match self {
            Phase::Queued => "Queued",
            Phase::Ocr => "OCR in progress",
            Phase::Llm => "Generating",
            Phase::Done => "Done",
            Phase::Error => "Failed",
            Phase::Other(name) => name,
        }
    }

    /// Whether the job can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done | Phase::Error)
    }
}

/// One status message from the event stream
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobUpdate {
    pub phase: Phase,
    /// Missing, `null` and fractional values are accepted
    #[serde(default, deserialize_with = "progress_or_zero")]
    pub progress: i64,
    /// Cumulative result so far (replaces, never appends)
    #[serde(default)]
    pub result_text: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn clamped_progress(&self) -> u8 {
        clamp_progress(self.progress)
    }

    /// Server-supplied failure message, only for the `error` phase
    pub fn failure(&self) -> Option<&str> {
        match (&self.phase, &self.error) {
            (Phase::Error, Some(message)) => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn closes_stream(&self) -> bool {
        self.phase.is_terminal()
    }
}

fn progress_or_zero<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.filter(|v| v.is_finite()).map(|v| v.round() as i64).unwrap_or(0))
}

/// Clamp a reported progress value into `0..=100`
pub fn clamp_progress(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

/// Body of a successful `POST /api/job`
#[derive(Debug, Deserialize)]
pub(crate) struct CreateJobResponse {
    pub job_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_from_known_names() {
        assert_eq!(Phase::from("queued".to_string()), Phase::Queued);
        assert_eq!(Phase::from("ocr".to_string()), Phase::Ocr);
        assert_eq!(Phase::from("llm".to_string()), Phase::Llm);
        assert_eq!(Phase::from("done".to_string()), Phase::Done);
        assert_eq!(Phase::from("error".to_string()), Phase::Error);
    }

    #[test]
    fn test_unknown_phase_keeps_name() {
        let phase = Phase::from("thumbnail".to_string());
        assert_eq!(phase.label(), "thumbnail");
        assert!(!phase.is_terminal());
    }

    #[test]
    fn test_terminal_phases() {
        assert!(Phase::Done.is_terminal());
        assert!(Phase::Error.is_terminal());
        assert!(!Phase::Queued.is_terminal());
        assert!(!Phase::Llm.is_terminal());
    }

    #[test]
    fn test_clamp_progress() {
        assert_eq!(clamp_progress(-5), 0);
        assert_eq!(clamp_progress(0), 0);
        assert_eq!(clamp_progress(42), 42);
        assert_eq!(clamp_progress(100), 100);
        assert_eq!(clamp_progress(250), 100);
    }

    #[test]
    fn test_update_parses_minimal_payload() {
        let update: JobUpdate = serde_json::from_str(r#"{"phase":"ocr","progress":40}"#).unwrap();
        assert_eq!(update.phase, Phase::Ocr);
        assert_eq!(update.clamped_progress(), 40);
        assert!(update.result_text.is_none());
        assert!(update.failure().is_none());
    }

    #[test]
    fn test_update_missing_progress_defaults_to_zero() {
        let update: JobUpdate = serde_json::from_str(r#"{"phase":"queued"}"#).unwrap();
        assert_eq!(update.progress, 0);
    }

    #[test]
    fn test_update_null_progress_is_zero() {
        let update: JobUpdate = serde_json::from_str(r#"{"phase":"ocr","progress":null}"#).unwrap();
        assert_eq!(update.progress, 0);

        let update: JobUpdate = serde_json::from_str(r#"{"phase":"llm","progress":62.6}"#).unwrap();
        assert_eq!(update.clamped_progress(), 63);
    }

    #[test]
    fn test_failure_requires_error_phase() {
        let failed: JobUpdate =
            serde_json::from_str(r#"{"phase":"error","progress":100,"error":"x"}"#).unwrap();
        assert_eq!(failed.failure(), Some("x"));
        assert!(failed.closes_stream());

        let stray: JobUpdate =
            serde_json::from_str(r#"{"phase":"llm","progress":60,"error":"ignored"}"#).unwrap();
        assert_eq!(stray.failure(), None);
        assert!(!stray.closes_stream());
    }

    #[test]
    fn test_job_id_is_transparent() {
        let body: CreateJobResponse = serde_json::from_str(r#"{"job_id":"abc-1"}"#).unwrap();
        let id = JobId::new(body.job_id);
        assert_eq!(id.as_str(), "abc-1");
        assert_eq!(id.to_string(), "abc-1");
    }
}
