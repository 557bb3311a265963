pub mod config;
pub mod service;
pub mod sink;
pub mod summary;

pub use config::{ExportConfig, OutputConfig, DEFAULT_FILENAME};
pub use service::{
    Envelope, ExportClient, ExportOutcome, ExportRequest, ExportResponse, ExportService,
};
pub use sink::{ArtifactSink, DirectorySink};
pub use summary::ExportSummary;
