//! HTTP client for the job backend
//!
//! Two calls make up the protocol:
//!
//! - [`JobClient::create_job`] uploads the image as `multipart/form-data`
//!   (field `file`) to `POST /api/job` and returns the job id.
//! - [`JobClient::follow_job`] opens `GET /api/events?job_id=..` and feeds
//!   every status message to a callback until the job reaches a terminal
//!   phase or the callback asks to stop.
//!
//! Nothing is retried; callers surface the error and let the user resubmit.

pub mod error;
pub mod sse;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::config::ServerSettings;
use crate::job::{CreateJobResponse, ImageUpload, JobId, JobUpdate};

pub use error::ClientError;
pub use sse::{SseDecoder, SseEvent, SseKind};

/// Consecutive undecodable messages tolerated before giving up
const MAX_EVENT_PARSE_ERRORS: usize = 3;

/// Cap on error bodies echoed back to the user
const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Whether the stream consumer wants more updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamControl {
    Continue,
    Close,
}

/// Client bound to one backend base URL
#[derive(Debug, Clone)]
pub struct JobClient {
    http: reqwest::Client,
    base_url: Url,
    upload_timeout: Duration,
    idle_timeout: Duration,
}

impl JobClient {
    pub fn new(settings: &ServerSettings) -> Result<Self, ClientError> {
        let base_url = parse_base_url(&settings.base_url)?;

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            http,
            base_url,
            upload_timeout: Duration::from_secs(settings.upload_timeout_secs.max(1)),
            idle_timeout: Duration::from_secs(settings.stream_idle_timeout_secs.max(1)),
        })
    }

    /// Upload an image and return the id of the created job
    pub async fn create_job(&self, upload: &ImageUpload) -> Result<JobId, ClientError> {
        let url = self.endpoint("api/job")?;

        let part = Part::bytes(upload.bytes.to_vec())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime)?;
        let form = Form::new().part("file", part);

        debug!(%url, file = %upload.file_name, bytes = upload.len(), "Creating job");

        let response = self
            .http
            .post(url)
            .timeout(self.upload_timeout)
            .multipart(form)
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let body: CreateJobResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        if body.job_id.trim().is_empty() {
            return Err(ClientError::InvalidResponse("empty job_id".to_string()));
        }

        Ok(JobId::new(body.job_id))
    }

    /// Follow a job's event stream until it finishes
    ///
    /// Returns `Ok(())` once a terminal update was delivered or `on_update`
    /// returned [`StreamControl::Close`]. An EOF before that point is
    /// [`ClientError::StreamClosed`].
    pub async fn follow_job<F>(&self, job_id: &JobId, mut on_update: F) -> Result<(), ClientError>
    where
        F: FnMut(JobUpdate) -> StreamControl,
    {
        let url = self.events_url(job_id)?;
        debug!(%url, "Opening event stream");

        let request = self
            .http
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send();
        // The idle bound also covers a server that never sends headers
        let Ok(response) = tokio::time::timeout(self.idle_timeout, request).await else {
            return Err(ClientError::IdleTimeout(self.idle_timeout.as_secs()));
        };
        let response = ensure_success(response?).await?;

        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut parse_errors = 0usize;

        loop {
            let Ok(next) = tokio::time::timeout(self.idle_timeout, stream.next()).await else {
                return Err(ClientError::IdleTimeout(self.idle_timeout.as_secs()));
            };
            let Some(chunk) = next else {
                debug!(job = %job_id, unterminated_bytes = decoder.pending(), "Event stream ended early");
                return Err(ClientError::StreamClosed);
            };

            for event in decoder.push(&chunk?)? {
                match event.kind() {
                    SseKind::Ping => {
                        trace!(job = %job_id, "Heartbeat");
                        continue;
                    }
                    SseKind::Named(name) => {
                        trace!(job = %job_id, event = name, "Ignoring named event");
                        continue;
                    }
                    SseKind::Message => {
                        trace!(job = %job_id, id = ?event.id, "Job event");
                    }
                }

                let update = match serde_json::from_str::<JobUpdate>(&event.data) {
                    Ok(update) => {
                        parse_errors = 0;
                        update
                    }
                    Err(e) => {
                        parse_errors += 1;
                        warn!(%e, job = %job_id, payload_bytes = event.data.len(), "Invalid job event payload");
                        if parse_errors >= MAX_EVENT_PARSE_ERRORS {
                            return Err(ClientError::InvalidEvent(e.to_string()));
                        }
                        continue;
                    }
                };

                let terminal = update.closes_stream();
                if on_update(update) == StreamControl::Close || terminal {
                    debug!(job = %job_id, "Closing event stream");
                    return Ok(());
                }
            }
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    fn events_url(&self, job_id: &JobId) -> Result<Url, ClientError> {
        let mut url = self.endpoint("api/events")?;
        url.query_pairs_mut().append_pair("job_id", job_id.as_str());
        Ok(url)
    }
}

/// Parse a base URL, making sure relative joins keep its path
fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };

    let url = Url::parse(&with_slash).map_err(|e| ClientError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ClientError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {other}"),
        }),
    }
}

/// Turn non-success responses into [`ClientError::Rejected`] carrying the body
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = read_capped_body(response).await;
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| status.to_string())
    } else {
        body.trim().to_string()
    };

    Err(ClientError::Rejected { status, message })
}

async fn read_capped_body(response: reqwest::Response) -> String {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::sse::SseError;
    use crate::job::Phase;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> JobClient {
        let settings = ServerSettings {
            base_url: server.uri(),
            stream_idle_timeout_secs: 2,
            ..ServerSettings::default()
        };
        JobClient::new(&settings).unwrap()
    }

    fn upload() -> ImageUpload {
        ImageUpload::from_bytes("shot.png", vec![0x89, b'P', b'N', b'G']).unwrap()
    }

    fn sse_body(events: &[&str]) -> String {
        events.iter().map(|e| format!("{e}\n\n")).collect()
    }

    async fn mount_events(server: &MockServer, job_id: &str, body: String) {
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .and(query_param("job_id", job_id))
            .and(header("accept", "text/event-stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(server)
            .await;
    }

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let url = parse_base_url("http://host:8080/ocr").unwrap();
        assert_eq!(url.join("api/job").unwrap().as_str(), "http://host:8080/ocr/api/job");
    }

    #[test]
    fn test_base_url_rejects_other_schemes() {
        assert!(matches!(
            parse_base_url("ftp://host"),
            Err(ClientError::InvalidBaseUrl { .. })
        ));
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_events_url_encodes_job_id() {
        let client = JobClient::new(&ServerSettings::default()).unwrap();
        let url = client.events_url(&JobId::new("a b&c")).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/api/events?job_id=a+b%26c");
    }

    #[tokio::test]
    async fn test_create_job_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/job"))
            .and(body_string_contains("name=\"file\"; filename=\"shot.png\""))
            .and(body_string_contains("image/png"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "job_id": "job-42"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let id = client_for(&server).create_job(&upload()).await.unwrap();
        assert_eq!(id.as_str(), "job-42");
    }

    #[tokio::test]
    async fn test_create_job_error_uses_body_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/job"))
            .respond_with(ResponseTemplate::new(413).set_body_string("image too large\n"))
            .mount(&server)
            .await;

        let err = client_for(&server).create_job(&upload()).await.unwrap_err();
        assert_eq!(err.status(), Some(reqwest::StatusCode::PAYLOAD_TOO_LARGE));
        assert_eq!(err.to_string(), "image too large");
    }

    #[tokio::test]
    async fn test_create_job_error_without_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/job"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server).create_job(&upload()).await.unwrap_err();
        assert_eq!(err.to_string(), "Internal Server Error");
    }

    #[tokio::test]
    async fn test_create_job_rejects_missing_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/job"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
            .mount(&server)
            .await;

        let err = client_for(&server).create_job(&upload()).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_follow_job_until_done() {
        let server = MockServer::start().await;
        mount_events(
            &server,
            "job-1",
            sse_body(&[
                r#"data: {"phase":"queued","progress":0}"#,
                "event: ping",
                r#"data: {"phase":"ocr","progress":40}"#,
                r#"data: {"phase":"llm","progress":70,"result_text":"Hel"}"#,
                r#"data: {"phase":"done","progress":100,"result_text":"Hello"}"#,
                r#"data: {"phase":"done","progress":100,"result_text":"never read"}"#,
            ]),
        )
        .await;

        let mut seen = Vec::new();
        client_for(&server)
            .follow_job(&JobId::new("job-1"), |update| {
                seen.push(update);
                StreamControl::Continue
            })
            .await
            .unwrap();

        let phases: Vec<Phase> = seen.iter().map(|u| u.phase.clone()).collect();
        assert_eq!(phases, vec![Phase::Queued, Phase::Ocr, Phase::Llm, Phase::Done]);
        assert_eq!(seen.last().unwrap().result_text.as_deref(), Some("Hello"));
    }

    #[tokio::test]
    async fn test_follow_job_stops_on_error_phase() {
        let server = MockServer::start().await;
        mount_events(
            &server,
            "job-2",
            sse_body(&[
                r#"data: {"phase":"ocr","progress":20}"#,
                r#"data: {"phase":"error","progress":100,"error":"x"}"#,
            ]),
        )
        .await;

        let mut last = None;
        client_for(&server)
            .follow_job(&JobId::new("job-2"), |update| {
                last = Some(update);
                StreamControl::Continue
            })
            .await
            .unwrap();

        assert_eq!(last.unwrap().failure(), Some("x"));
    }

    #[tokio::test]
    async fn test_follow_job_callback_can_close() {
        let server = MockServer::start().await;
        mount_events(
            &server,
            "job-3",
            sse_body(&[
                r#"data: {"phase":"ocr","progress":10}"#,
                r#"data: {"phase":"ocr","progress":20}"#,
            ]),
        )
        .await;

        let mut count = 0;
        client_for(&server)
            .follow_job(&JobId::new("job-3"), |_| {
                count += 1;
                StreamControl::Close
            })
            .await
            .unwrap();

        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_follow_job_premature_eof() {
        let server = MockServer::start().await;
        mount_events(&server, "job-4", sse_body(&[r#"data: {"phase":"llm","progress":50}"#])).await;

        let err = client_for(&server)
            .follow_job(&JobId::new("job-4"), |_| StreamControl::Continue)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::StreamClosed));
    }

    #[tokio::test]
    async fn test_follow_job_skips_bad_payloads_until_threshold() {
        let server = MockServer::start().await;
        mount_events(
            &server,
            "job-5",
            sse_body(&["data: not json", "data: {}", "data: [1,2]"]),
        )
        .await;

        let err = client_for(&server)
            .follow_job(&JobId::new("job-5"), |_| StreamControl::Continue)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::InvalidEvent(_)));
    }

    #[tokio::test]
    async fn test_follow_job_unknown_job_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .follow_job(&JobId::new("missing"), |_| StreamControl::Continue)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(reqwest::StatusCode::NOT_FOUND));
        assert_eq!(err.to_string(), "not found");
    }

    /// Serve one SSE response, writing each chunk after its delay, then
    /// keep the connection open for `hold`
    async fn serve_slow_stream(chunks: Vec<(u64, &'static str)>, hold: Duration) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n";
            socket.write_all(head.as_bytes()).await.unwrap();
            for (delay_ms, chunk) in chunks {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                if socket.write_all(chunk.as_bytes()).await.is_err() {
                    return;
                }
                let _ = socket.flush().await;
            }
            tokio::time::sleep(hold).await;
        });

        format!("http://{addr}")
    }

    fn client_with_idle(base_url: String, idle_secs: u64) -> JobClient {
        JobClient::new(&ServerSettings {
            base_url,
            stream_idle_timeout_secs: idle_secs,
            ..ServerSettings::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_follow_job_headers_never_arrive() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string("data: {\"phase\":\"done\",\"progress\":100}\n\n")
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let client = client_with_idle(server.uri(), 1);
        let outcome = tokio::time::timeout(
            Duration::from_secs(4),
            client.follow_job(&JobId::new("slow"), |_| StreamControl::Continue),
        )
        .await
        .expect("follow_job must give up on its own");

        assert!(matches!(outcome, Err(ClientError::IdleTimeout(1))));
    }

    #[tokio::test]
    async fn test_follow_job_stalled_body_times_out() {
        let base = serve_slow_stream(
            vec![(0, "data: {\"phase\":\"ocr\",\"progress\":10}\n\n")],
            Duration::from_secs(10),
        )
        .await;

        let mut seen = Vec::new();
        let client = client_with_idle(base, 1);
        let outcome = tokio::time::timeout(
            Duration::from_secs(4),
            client.follow_job(&JobId::new("stalled"), |update| {
                seen.push(update.clamped_progress());
                StreamControl::Continue
            }),
        )
        .await
        .expect("follow_job must give up on its own");

        assert!(matches!(outcome, Err(ClientError::IdleTimeout(1))));
        assert_eq!(seen, vec![10]);
    }

    #[tokio::test]
    async fn test_pings_keep_stream_alive() {
        let base = serve_slow_stream(
            vec![
                (0, "data: {\"phase\":\"ocr\",\"progress\":10}\n\n"),
                (600, "event: ping\n\n"),
                (600, "event: ping\n\n"),
                (600, "event: ping\n\n"),
                (600, "data: {\"phase\":\"done\",\"progress\":100,\"result_text\":\"ok\"}\n\n"),
            ],
            Duration::from_secs(5),
        )
        .await;

        let mut seen = Vec::new();
        let client = client_with_idle(base, 1);
        client
            .follow_job(&JobId::new("alive"), |update| {
                seen.push(update.phase.clone());
                StreamControl::Continue
            })
            .await
            .unwrap();

        assert_eq!(seen, vec![Phase::Ocr, Phase::Done]);
    }

    #[tokio::test]
    async fn test_follow_job_rejects_oversized_event() {
        let server = MockServer::start().await;
        let body = format!("data: {}", "x".repeat(sse::MAX_SSE_BUFFER_BYTES + 1024));
        mount_events(&server, "big", body).await;

        let err = client_for(&server)
            .follow_job(&JobId::new("big"), |_| StreamControl::Continue)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Stream(SseError::BufferOverflow(_))));
    }

    #[tokio::test]
    async fn test_follow_job_rejects_invalid_utf8() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_bytes(b"data: \xff\xfe\n\n".to_vec()),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .follow_job(&JobId::new("bytes"), |_| StreamControl::Continue)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Stream(SseError::InvalidUtf8)));
    }
}
