//! The request/response channel between a control surface and the page context.
//!
//! `ExportService` lives with the page and owns the pipeline and the sink.
//! `ExportClient` is the invoking side; its reply channel stays open for the
//! whole scroll-and-extract run.

use crate::config::DEFAULT_FILENAME;
use crate::sink::ArtifactSink;
use groupex_scanner::record::to_json;
use groupex_scanner::{ExportError, Extraction, ExtractionPipeline, Page, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum ExportRequest {
    #[serde(rename = "export", alias = "exportGroups")]
    Export,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExportResponse {
    pub fn succeeded(count: usize) -> Self {
        Self {
            success: true,
            count: Some(count),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            count: None,
            error: Some(error.into()),
        }
    }

    /// Reduces an export result to what travels back over the channel.
    pub fn from_result(result: &Result<ExportOutcome>) -> Self {
        match result {
            Ok(outcome) => Self::succeeded(outcome.extraction.count()),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

/// A request plus the channel its response goes back on.
#[derive(Debug)]
pub struct Envelope {
    pub request: ExportRequest,
    pub reply: oneshot::Sender<ExportResponse>,
}

/// What a successful export produced.
#[derive(Debug)]
pub struct ExportOutcome {
    pub extraction: Extraction,
    pub path: PathBuf,
}

pub struct ExportService<P: Page, S: ArtifactSink> {
    pipeline: ExtractionPipeline<P>,
    sink: S,
    filename: String,
    cancel: CancellationToken,
}

impl<P: Page, S: ArtifactSink> ExportService<P, S> {
    pub fn new(pipeline: ExtractionPipeline<P>, sink: S) -> Self {
        Self {
            pipeline,
            sink,
            filename: DEFAULT_FILENAME.to_string(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    /// Token that aborts an in-flight run at its next scroll step.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs the pipeline and emits the artifact. Nothing is written on failure.
    pub async fn export(&self) -> Result<ExportOutcome> {
        let extraction = self.pipeline.run_with_cancel(&self.cancel).await?;
        let json = to_json(&extraction.records)?;
        let path = self.sink.save(&self.filename, &json)?;
        info!("Exported {} groups to {}", extraction.count(), path.display());
        Ok(ExportOutcome { extraction, path })
    }

    pub async fn handle(&self, request: ExportRequest) -> ExportResponse {
        match request {
            ExportRequest::Export => {
                let result = self.export().await;
                if let Err(e) = &result {
                    warn!("Export failed: {}", e);
                }
                ExportResponse::from_result(&result)
            }
        }
    }

    /// Answers requests one at a time until every client is gone.
    pub async fn serve(&self, mut requests: mpsc::Receiver<Envelope>) {
        while let Some(Envelope { request, reply }) = requests.recv().await {
            let response = self.handle(request).await;
            if reply.send(response).is_err() {
                warn!("Requester went away before the export finished");
            }
        }
    }
}

/// The invoking side of the channel.
#[derive(Debug, Clone)]
pub struct ExportClient {
    target: Option<mpsc::Sender<Envelope>>,
}

impl ExportClient {
    /// A connected client and the receiver to hand to `ExportService::serve`.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Envelope>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                target: Some(sender),
            },
            receiver,
        )
    }

    /// A client with no page context to talk to.
    pub fn detached() -> Self {
        Self { target: None }
    }

    pub async fn request(&self, request: ExportRequest) -> Result<ExportResponse> {
        let target = self.target.as_ref().ok_or(ExportError::NoActiveContext)?;
        let (reply, response) = oneshot::channel();
        target
            .send(Envelope { request, reply })
            .await
            .map_err(|_| ExportError::Transport("the page context is not listening".to_string()))?;
        response.await.map_err(|_| {
            ExportError::Transport("the page context closed before responding".to_string())
        })
    }

    /// Like `request`, but channel failures become a failed response.
    pub async fn trigger(&self, request: ExportRequest) -> ExportResponse {
        match self.request(request).await {
            Ok(response) => response,
            Err(e) => ExportResponse::failed(e.to_string()),
        }
    }
}
