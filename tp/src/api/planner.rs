//! Streaming trip planner with legacy fallback
//!
//! The primary endpoint answers with an event stream of `workflow_step`
//! frames closed by one `final_result` (or `error`) frame. When that endpoint
//! is missing or has no body the legacy endpoint is called directly; when the
//! stream fails for any other reason the legacy endpoint gets exactly one
//! retry. Only a failure of both paths reaches the caller.

use futures::StreamExt;
use reqwest::{Client, StatusCode, header};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::WorkflowStep;
use crate::stream::{Frame, Utf8Decoder, decode};

use super::http::error_from_response;
use super::{ApiError, ErrorPayload, FinalResult, PlanError, PlanOutcome, PlanRequest, PlanSource};

/// Frame names on the planning stream
pub const EVENT_WORKFLOW_STEP: &str = "workflow_step";
pub const EVENT_FINAL_RESULT: &str = "final_result";
pub const EVENT_ERROR: &str = "error";

/// Message used when the body ends before a terminal frame
pub const STREAM_ENDED_WITHOUT_RESULT: &str = "Stream ended without a result";

/// Terminal frame of a planning stream
#[derive(Debug, Clone)]
enum Terminal {
    Result(FinalResult),
    Error(String),
}

/// Incremental state of one planning stream
///
/// Fed raw body chunks; yields workflow steps in arrival order and remembers
/// the first terminal frame. Later terminal frames are logged and ignored.
#[derive(Debug, Default)]
pub struct PlanStream {
    utf8: Utf8Decoder,
    buffer: String,
    steps: Vec<WorkflowStep>,
    terminal: Option<Terminal>,
}

impl PlanStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one body chunk, returning the steps it completed
    ///
    /// Stops at an `error` frame; steps before it are still returned and the
    /// failure is reported by [`PlanStream::failure`].
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<WorkflowStep> {
        let text = self.utf8.decode(chunk);
        self.buffer.push_str(&text);
        self.drain_frames()
    }

    /// Flush the decoder and any unterminated trailing frame
    pub fn flush(&mut self) -> Vec<WorkflowStep> {
        let text = self.utf8.finish();
        self.buffer.push_str(&text);
        if !self.buffer.trim().is_empty() {
            debug!(len = self.buffer.len(), "flush: unterminated trailing frame");
            self.buffer.push_str("\n\n");
        }
        self.drain_frames()
    }

    /// Server-declared error, if the stream reported one before any result
    pub fn failure(&self) -> Option<ApiError> {
        match &self.terminal {
            Some(Terminal::Error(message)) => Some(ApiError::Stream(message.clone())),
            _ => None,
        }
    }

    /// Steps delivered so far
    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    /// Resolve the stream once the body is exhausted
    pub fn into_outcome(self) -> Result<PlanOutcome, ApiError> {
        match self.terminal {
            Some(Terminal::Result(result)) => result.into_outcome(self.steps, PlanSource::Stream),
            Some(Terminal::Error(message)) => Err(ApiError::Stream(message)),
            None => Err(ApiError::InvalidResponse(STREAM_ENDED_WITHOUT_RESULT.to_string())),
        }
    }

    fn drain_frames(&mut self) -> Vec<WorkflowStep> {
        let decoded = decode(&self.buffer);
        self.buffer = decoded.remainder;

        let mut delivered = Vec::new();
        for frame in decoded.frames {
            if self.failure().is_some() {
                debug!(event = %frame.event, "drain_frames: stream already failed, dropping frame");
                continue;
            }
            if let Some(step) = self.apply(frame) {
                self.steps.push(step.clone());
                delivered.push(step);
            }
        }
        delivered
    }

    fn apply(&mut self, frame: Frame) -> Option<WorkflowStep> {
        match frame.event.as_str() {
            EVENT_WORKFLOW_STEP => match WorkflowStep::from_value(frame.data) {
                Ok(step) => Some(step),
                Err(e) => {
                    warn!(error = %e, "apply: workflow_step payload not a step, skipping");
                    None
                }
            },
            EVENT_FINAL_RESULT => {
                let result: FinalResult = match serde_json::from_value(frame.data) {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(error = %e, "apply: final_result payload malformed, skipping");
                        return None;
                    }
                };
                self.set_terminal(Terminal::Result(result));
                None
            }
            EVENT_ERROR => {
                let payload: ErrorPayload = serde_json::from_value(frame.data).unwrap_or_default();
                self.set_terminal(Terminal::Error(payload.text()));
                None
            }
            other => {
                debug!(event = %other, "apply: ignoring unknown frame");
                None
            }
        }
    }

    fn set_terminal(&mut self, terminal: Terminal) {
        if self.terminal.is_some() {
            warn!(?terminal, "set_terminal: terminal frame already received, ignoring");
            return;
        }
        self.terminal = Some(terminal);
    }
}

/// Why the streaming path did not produce an outcome
#[derive(Debug)]
enum StreamFailure {
    /// Endpoint missing or bodyless; go straight to the legacy endpoint
    Unavailable(&'static str),
    /// The stream broke; retry once on the legacy endpoint
    Fatal(ApiError),
}

/// Plan a trip, streaming first and falling back to the legacy endpoint
pub async fn plan_trip(
    http: &Client,
    stream_url: &str,
    legacy_url: &str,
    request: &PlanRequest,
    step_tx: mpsc::Sender<WorkflowStep>,
) -> Result<PlanOutcome, PlanError> {
    debug!(%stream_url, %legacy_url, "plan_trip: called");

    let streaming_error = match stream_plan(http, stream_url, request, &step_tx).await {
        Ok(outcome) => {
            info!(steps = outcome.workflow_steps.len(), "plan_trip: stream completed");
            return Ok(outcome);
        }
        Err(StreamFailure::Unavailable(reason)) => {
            info!(%reason, "plan_trip: streaming unavailable, using legacy endpoint");
            None
        }
        Err(StreamFailure::Fatal(err)) => {
            if err.is_subscription_required() {
                debug!("plan_trip: subscription required");
                return Err(PlanError::SubscriptionRequired);
            }
            warn!(error = %err, "plan_trip: stream failed, retrying on legacy endpoint");
            Some(err)
        }
    };

    match legacy_plan(http, legacy_url, request).await {
        Ok(outcome) => Ok(outcome),
        Err(fallback_error) => {
            warn!(error = %fallback_error, "plan_trip: legacy endpoint failed");
            Err(PlanError::from_failures(streaming_error.as_ref(), Some(&fallback_error)))
        }
    }
}

/// Run the streaming request to completion
async fn stream_plan(
    http: &Client,
    url: &str,
    request: &PlanRequest,
    step_tx: &mpsc::Sender<WorkflowStep>,
) -> Result<PlanOutcome, StreamFailure> {
    debug!(%url, "stream_plan: called");
    let response = http
        .post(url)
        .header(header::ACCEPT, "text/event-stream")
        .json(request)
        .send()
        .await
        .map_err(|e| StreamFailure::Fatal(ApiError::Network(e)))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(StreamFailure::Unavailable("streaming endpoint not found"));
    }
    if !status.is_success() {
        debug!(%status, "stream_plan: non-success status");
        return Err(StreamFailure::Fatal(error_from_response(response).await));
    }
    if response.content_length() == Some(0) {
        return Err(StreamFailure::Unavailable("streaming response has no body"));
    }

    let mut body = response.bytes_stream();
    let mut stream = PlanStream::new();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| StreamFailure::Fatal(ApiError::Network(e)))?;
        debug!(len = chunk.len(), "stream_plan: chunk received");
        deliver(step_tx, stream.feed(&chunk)).await;
        if let Some(err) = stream.failure() {
            debug!(error = %err, "stream_plan: server reported error");
            return Err(StreamFailure::Fatal(err));
        }
    }

    deliver(step_tx, stream.flush()).await;
    stream.into_outcome().map_err(StreamFailure::Fatal)
}

/// Hand steps to the listener; a listener that went away is not an error
async fn deliver(step_tx: &mpsc::Sender<WorkflowStep>, steps: Vec<WorkflowStep>) {
    for step in steps {
        if step_tx.send(step).await.is_err() {
            debug!("deliver: step receiver dropped");
        }
    }
}

/// Single request/response planning call
async fn legacy_plan(http: &Client, url: &str, request: &PlanRequest) -> Result<PlanOutcome, ApiError> {
    debug!(%url, "legacy_plan: called");
    let response = http.post(url).json(request).send().await?;

    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    let result: FinalResult = response.json().await?;
    result.into_outcome(Vec::new(), PlanSource::Legacy)
}
