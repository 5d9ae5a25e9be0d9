//! Recording Downloader - A Rust CLI tool for bulk-exporting contact-center voice recordings
//!
//! This library resolves the recordings of a queue over a date range, submits them as one
//! batch export job, polls the job until every item is finalized, downloads the exported
//! files and optionally hands them to an external transcoding script.

pub mod cli;
pub mod config;
pub mod export;
pub mod platform;
pub mod prompt;
pub mod transcode;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use export::{ExportOutcome, ExportPipeline, ExportRequest, ExportSummary};
pub use platform::{AudioFormat, RecordingApi, Region};
pub use transcode::{ScriptTranscoder, Transcoder};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Fatal errors that terminate a download run
#[derive(thiserror::Error, Debug)]
pub enum DownloaderError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Batch submission rejected: {0}")]
    BatchSubmission(String),

    #[error("Batch {batch_id} did not complete after {attempts} status checks")]
    PollTimeout { batch_id: String, attempts: u32 },

    #[error("Could not prepare output directory {path}: {reason}")]
    OutputDirectory { path: String, reason: String },
}
