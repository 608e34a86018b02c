//! Headless mode
//!
//! Submits one image from the command line and reports progress on the
//! terminal, using the same state transitions as the dashboard.

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::app::JobWorker;
use crate::config::AppConfig;
use crate::job::{ImageUpload, Phase};
use crate::shared::{ImageSource, SharedAppState};

/// Upload `path`, follow the job and print the final result to stdout
pub fn run_headless(config: AppConfig, path: &Path) -> Result<()> {
    let upload = ImageUpload::from_path(path)
        .with_context(|| format!("Cannot submit {}", path.display()))?;

    info!(server = %config.server.base_url, "Submitting {}", path.display());

    let worker = JobWorker::spawn(config.server.clone(), Arc::new(|| {}))?;
    let mut state = SharedAppState::new(config);
    state.select_image(upload, ImageSource::File(path.to_path_buf()));

    let Some(submission) = state.request_upload() else {
        bail!("Nothing to upload");
    };
    worker.submit(submission)?;

    let mut stderr = std::io::stderr();
    let mut last_status = String::new();
    report(&mut stderr, &state, &mut last_status);

    while let Some(event) = worker.recv_event() {
        let settled = event.is_final();
        state.apply_worker_event(event);
        report(&mut stderr, &state, &mut last_status);
        if settled {
            break;
        }
    }

    match state.job.phase {
        Some(Phase::Done) => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", state.job.result_text)?;
            Ok(())
        }
        _ => bail!("{}", state.job.status),
    }
}

/// Print the status line when it changes
fn report(out: &mut impl Write, state: &SharedAppState, last_status: &mut String) {
    if state.job.status == *last_status {
        return;
    }
    let job = state
        .job
        .job_id
        .as_ref()
        .map(|id| format!(" [{}]", id))
        .unwrap_or_default();
    let _ = writeln!(out, "{:>3}% {}{}", state.job.progress, state.job.status, job);
    last_status.clone_from(&state.job.status);
}
