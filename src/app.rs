//! Job Worker
//!
//! Owns the tokio runtime that performs uploads and follows event streams,
//! so the dashboard thread never blocks on the network.

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::{ClientError, JobClient, StreamControl};
use crate::config::ServerSettings;
use crate::job::ImageUpload;
use crate::shared::{JobEvent, Submission, SubmissionId, WorkerCommand, WorkerEvent};

/// Called after each event so the UI can repaint
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// Background worker running one job at a time
pub struct JobWorker {
    /// Channel to send commands to the worker
    commands: Sender<WorkerCommand>,
    /// Channel to receive job events
    events: Receiver<WorkerEvent>,
    /// Handle to worker thread
    handle: Option<JoinHandle<()>>,
}

impl JobWorker {
    /// Start the worker thread
    pub fn spawn(settings: ServerSettings, waker: Waker) -> Result<Self> {
        let (commands, command_rx) = unbounded();
        let (event_tx, events) = unbounded();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("snapsum-net")
            .enable_all()
            .build()
            .context("Failed to create tokio runtime")?;

        let handle = std::thread::Builder::new()
            .name("snapsum-worker".to_string())
            .spawn(move || {
                info!("Job worker starting...");
                run_command_loop(runtime, settings, command_rx, event_tx, waker);
                info!("Job worker exiting...");
            })
            .context("Failed to spawn worker thread")?;

        Ok(Self {
            commands,
            events,
            handle: Some(handle),
        })
    }

    /// Upload an image; any job still streaming is abandoned
    ///
    /// Fails only when the worker thread is gone.
    pub fn submit(&self, submission: Submission) -> Result<()> {
        self.commands
            .send(WorkerCommand::Submit(submission))
            .map_err(|_| anyhow!("Job worker is not running"))
    }

    /// Stop following the current job
    pub fn cancel(&self) {
        let _ = self.commands.send(WorkerCommand::Cancel);
    }

    /// Point later submissions at a different backend
    pub fn update_server(&self, settings: ServerSettings) {
        let _ = self.commands.send(WorkerCommand::UpdateServer(settings));
    }

    /// Events received since the last call
    pub fn drain_events(&self) -> Vec<WorkerEvent> {
        self.events.try_iter().collect()
    }

    /// Block until the next event (headless use)
    pub fn recv_event(&self) -> Option<WorkerEvent> {
        self.events.recv().ok()
    }

    /// Check if the worker thread is still alive
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for JobWorker {
    fn drop(&mut self) {
        // Signal worker to stop
        let _ = self.commands.send(WorkerCommand::Shutdown);

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_command_loop(
    runtime: tokio::runtime::Runtime,
    settings: ServerSettings,
    commands: Receiver<WorkerCommand>,
    events: Sender<WorkerEvent>,
    waker: Waker,
) {
    let mut client = build_client(&settings);
    let mut current_job: Option<CancellationToken> = None;

    for command in commands.iter() {
        match command {
            WorkerCommand::Submit(Submission { id, upload }) => {
                if let Some(previous) = current_job.take() {
                    debug!("Cancelling previous job stream");
                    previous.cancel();
                }

                let client = match &client {
                    Ok(client) => client.clone(),
                    Err(e) => {
                        emit(&events, &waker, id, JobEvent::SubmitFailed(e.to_string()));
                        continue;
                    }
                };

                let token = CancellationToken::new();
                current_job = Some(token.clone());
                let sink = EventSink {
                    submission: id,
                    events: events.clone(),
                    waker: waker.clone(),
                };
                runtime.spawn(run_job(client, upload, sink, token));
            }
            WorkerCommand::Cancel => {
                if let Some(previous) = current_job.take() {
                    debug!("Cancelling job stream");
                    previous.cancel();
                }
            }
            WorkerCommand::UpdateServer(settings) => {
                info!(url = %settings.base_url, "Switching job server");
                client = build_client(&settings);
            }
            WorkerCommand::Shutdown => break,
        }
    }

    if let Some(token) = current_job {
        token.cancel();
    }
    runtime.shutdown_background();
}

fn build_client(settings: &ServerSettings) -> Result<JobClient, ClientError> {
    JobClient::new(settings).inspect_err(|e| error!("Invalid server settings: {}", e))
}

fn emit(events: &Sender<WorkerEvent>, waker: &Waker, submission: SubmissionId, kind: JobEvent) {
    if events.send(WorkerEvent::new(submission, kind)).is_ok() {
        waker();
    }
}

/// Where one job's events go
struct EventSink {
    submission: SubmissionId,
    events: Sender<WorkerEvent>,
    waker: Waker,
}

impl EventSink {
    fn emit(&self, kind: JobEvent) {
        emit(&self.events, &self.waker, self.submission, kind);
    }
}

/// Upload, then follow the job until it finishes, fails or is cancelled
async fn run_job(client: JobClient, upload: ImageUpload, sink: EventSink, cancel: CancellationToken) {
    let submission = sink.submission;
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(submission, "Job cancelled");
        }
        _ = drive_job(&client, &upload, &sink, &cancel) => {}
    }
}

async fn drive_job(client: &JobClient, upload: &ImageUpload, sink: &EventSink, cancel: &CancellationToken) {
    let job_id = match client.create_job(upload).await {
        Ok(id) => id,
        Err(e) => {
            if cancel.is_cancelled() {
                debug!("Superseded job failed to upload: {}", e);
            } else {
                warn!("Job creation failed: {}", e);
                sink.emit(JobEvent::SubmitFailed(e.to_string()));
            }
            return;
        }
    };

    if cancel.is_cancelled() {
        debug!(job = %job_id, "Job superseded before streaming");
        return;
    }
    sink.emit(JobEvent::JobCreated(job_id.clone()));

    let outcome = client
        .follow_job(&job_id, |update| {
            sink.emit(JobEvent::Update(update));
            StreamControl::Continue
        })
        .await;

    if cancel.is_cancelled() {
        return;
    }
    match outcome {
        Ok(()) => sink.emit(JobEvent::StreamFinished),
        Err(e) => sink.emit(JobEvent::TransportLost(e.to_string())),
    }
}
