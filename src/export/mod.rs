//! Batch export pipeline: resolve, submit, poll, fetch, then convert if needed.

use anyhow::Result;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::platform::{AudioFormat, BatchJobHandle, RecordingApi};
use crate::transcode::Transcoder;

pub mod fetcher;
pub mod poller;
pub mod resolver;
pub mod submitter;

pub use fetcher::{FetchReport, RecordingFetcher};
pub use poller::BatchPoller;
pub use resolver::RecordingResolver;

/// What the operator asked to export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub queue_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub format: AudioFormat,
}

/// Result of the conversion step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeOutcome {
    NotRequired,
    Succeeded,
    Failed(String),
}

/// Summary of a run that reached the download stage
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub batch: BatchJobHandle,
    pub report: FetchReport,
    pub transcode: TranscodeOutcome,
    pub elapsed: Duration,
}

impl ExportSummary {
    /// Recordings saved to disk
    pub fn success_count(&self) -> usize {
        self.report.downloaded.len()
    }

    /// Recordings that failed on the platform or during download
    pub fn error_count(&self) -> usize {
        self.report.export_errors.len() + self.report.failed.len()
    }
}

/// How a run ended
#[derive(Debug, Clone)]
pub enum ExportOutcome {
    /// The search found no conversations
    NoConversations,
    /// Conversations exist but none has an AVAILABLE recording
    NoAvailableRecordings,
    /// The finished batch carried no results
    EmptyBatch,
    Completed(ExportSummary),
}

/// Single-run export pipeline
pub struct ExportPipeline<'a> {
    api: &'a dyn RecordingApi,
    transcoder: &'a dyn Transcoder,
    fetcher: RecordingFetcher,
    page_size: u32,
    max_poll_attempts: u32,
    poll_interval: Duration,
}

impl<'a> ExportPipeline<'a> {
    pub fn new(api: &'a dyn RecordingApi, transcoder: &'a dyn Transcoder, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            api,
            transcoder,
            fetcher: RecordingFetcher::new(output_dir),
            page_size: resolver::MAX_PAGE_SIZE,
            max_poll_attempts: poller::DEFAULT_MAX_ATTEMPTS,
            poll_interval: poller::DEFAULT_INTERVAL,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_poll_policy(mut self, max_attempts: u32, interval: Duration) -> Self {
        self.max_poll_attempts = max_attempts;
        self.poll_interval = interval;
        self
    }

    /// Run every stage in order. Fatal errors are returned as [`crate::DownloaderError`].
    pub async fn run(&self, request: &ExportRequest) -> Result<ExportOutcome> {
        let start_time = Instant::now();
        let resolver = RecordingResolver::new(self.api, self.page_size);

        let conversation_ids = resolver
            .find_conversations(&request.queue_id, request.start, request.end)
            .await;
        if conversation_ids.is_empty() {
            tracing::warn!("No conversations found");
            return Ok(ExportOutcome::NoConversations);
        }

        let recordings = resolver.available_recordings(&conversation_ids).await;
        if recordings.is_empty() {
            tracing::warn!("No recordings available for download");
            return Ok(ExportOutcome::NoAvailableRecordings);
        }

        let batch = submitter::submit(self.api, &recordings).await?;

        let results = BatchPoller::with_policy(self.api, self.max_poll_attempts, self.poll_interval)
            .poll(&batch)
            .await?;
        if results.is_empty() {
            tracing::warn!("Batch {} returned no results to download", batch);
            return Ok(ExportOutcome::EmptyBatch);
        }

        let report = self.fetcher.fetch(&results).await?;
        tracing::info!(
            "Downloaded {} recordings into {}",
            report.downloaded.len(),
            report.output_dir.display()
        );

        let transcode = self.convert(&report, request.format).await;

        Ok(ExportOutcome::Completed(ExportSummary {
            batch,
            report,
            transcode,
            elapsed: start_time.elapsed(),
        }))
    }

    /// Hand the download directory to the transcoder unless the export format already matches
    async fn convert(&self, report: &FetchReport, format: AudioFormat) -> TranscodeOutcome {
        if !format.needs_conversion() {
            tracing::info!("No conversion needed");
            return TranscodeOutcome::NotRequired;
        }

        tracing::info!("Converting recordings to {}", format);
        match self.transcoder.transcode(&report.output_dir, format).await {
            Ok(()) => {
                tracing::info!("Conversion finished");
                TranscodeOutcome::Succeeded
            }
            Err(e) => {
                tracing::error!("Conversion failed: {}", e);
                TranscodeOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{
        ApiError, BatchResultItem, BatchStatus, MockRecordingApi, RecordingMetadata,
    };
    use crate::transcode::{MockTranscoder, TranscodeError};
    use crate::DownloaderError;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(format: AudioFormat) -> ExportRequest {
        ExportRequest {
            queue_id: "support".to_string(),
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            format,
        }
    }

    fn metadata(id: &str, state: &str) -> RecordingMetadata {
        RecordingMetadata {
            id: id.to_string(),
            conversation_id: None,
            file_state: Some(state.to_string()),
        }
    }

    /// Two conversations, three recordings of which two are AVAILABLE.
    ///
    /// The batch completes on status check `completes_after`; `checks` status checks are expected.
    fn support_queue_api(result_url: String, completes_after: usize, checks: usize) -> MockRecordingApi {
        let mut api = MockRecordingApi::new();
        api.expect_query_conversations()
            .times(1)
            .returning(|_| Ok(vec!["conv123".to_string(), "conv789".to_string()]));
        api.expect_recording_metadata()
            .withf(|id| id == "conv123")
            .returning(|_| Ok(vec![metadata("rec456", "AVAILABLE"), metadata("rec000", "EXPIRED")]));
        api.expect_recording_metadata()
            .withf(|id| id == "conv789")
            .returning(|_| Ok(vec![metadata("rec111", "AVAILABLE")]));
        api.expect_submit_batch()
            .withf(|descriptors, format| descriptors.len() == 2 && *format == AudioFormat::Ogg)
            .times(1)
            .returning(|_, _| Ok(BatchJobHandle::new("batch-1")));

        let mut calls = 0;
        api.expect_batch_status()
            .times(checks)
            .returning(move |_| {
                calls += 1;
                let done = calls == completes_after;
                Ok(BatchStatus {
                    id: "batch-1".to_string(),
                    expected_result_count: Some(2),
                    results: vec![
                        BatchResultItem {
                            conversation_id: "conv123".to_string(),
                            recording_id: "rec456".to_string(),
                            result_url: done.then(|| result_url.clone()),
                            error_msg: None,
                        },
                        BatchResultItem {
                            conversation_id: "conv789".to_string(),
                            recording_id: "rec111".to_string(),
                            result_url: None,
                            error_msg: done.then(|| "Recording not exportable".to_string()),
                        },
                    ],
                })
            });
        api
    }

    async fn recording_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/exports/conv123_rec456.ogg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"OggS".to_vec()))
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_support_queue_scenario() {
        let server = recording_server().await;
        let api = support_queue_api(format!("{}/exports/conv123_rec456.ogg", server.uri()), 3, 3);
        let mut transcoder = MockTranscoder::new();
        transcoder.expect_transcode().never();

        let dir = tempfile::tempdir().unwrap();
        let pipeline = ExportPipeline::new(&api, &transcoder, dir.path().join("Recordings"))
            .with_poll_policy(60, Duration::ZERO);

        let outcome = pipeline.run(&request(AudioFormat::Ogg)).await.unwrap();

        let summary = match outcome {
            ExportOutcome::Completed(summary) => summary,
            other => panic!("expected a completed run, got {other:?}"),
        };
        assert_eq!(summary.success_count(), 1);
        assert_eq!(summary.error_count(), 1);
        assert_eq!(summary.transcode, TranscodeOutcome::NotRequired);
        assert!(dir.path().join("Recordings").join("conv123_rec456.ogg").is_file());
        let files = fs_err::read_dir(dir.path().join("Recordings")).unwrap().count();
        assert_eq!(files, 1);
    }

    #[tokio::test]
    async fn test_conversion_runs_once_for_wav() {
        let server = recording_server().await;
        let api = support_queue_api(format!("{}/exports/conv123_rec456.ogg", server.uri()), 1, 1);
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("Recordings");

        let expected_dir = output_dir.clone();
        let mut transcoder = MockTranscoder::new();
        transcoder
            .expect_transcode()
            .withf(move |dir, format| {
                dir == expected_dir.as_path() && *format == AudioFormat::Wav && format.as_str() == "wav"
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let pipeline = ExportPipeline::new(&api, &transcoder, output_dir).with_poll_policy(5, Duration::ZERO);
        let outcome = pipeline.run(&request(AudioFormat::Wav)).await.unwrap();

        match outcome {
            ExportOutcome::Completed(summary) => assert_eq!(summary.transcode, TranscodeOutcome::Succeeded),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_conversion_failure_keeps_downloads() {
        let server = recording_server().await;
        let api = support_queue_api(format!("{}/exports/conv123_rec456.ogg", server.uri()), 1, 1);
        let mut transcoder = MockTranscoder::new();
        transcoder.expect_transcode().times(1).returning(|_, _| {
            Err(TranscodeError::Failed {
                code: Some(1),
                stderr: "ffmpeg not found".to_string(),
            })
        });

        let dir = tempfile::tempdir().unwrap();
        let pipeline = ExportPipeline::new(&api, &transcoder, dir.path()).with_poll_policy(5, Duration::ZERO);
        let outcome = pipeline.run(&request(AudioFormat::Mp3)).await.unwrap();

        match outcome {
            ExportOutcome::Completed(summary) => {
                assert!(matches!(summary.transcode, TranscodeOutcome::Failed(ref msg) if msg.contains("ffmpeg")));
                assert_eq!(summary.success_count(), 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(dir.path().join("conv123_rec456.ogg").is_file());
    }

    #[tokio::test]
    async fn test_no_conversations_never_submits() {
        let mut api = MockRecordingApi::new();
        api.expect_query_conversations().returning(|_| Ok(Vec::new()));
        api.expect_recording_metadata().never();
        api.expect_submit_batch().never();
        let transcoder = MockTranscoder::new();

        let dir = tempfile::tempdir().unwrap();
        let pipeline = ExportPipeline::new(&api, &transcoder, dir.path());

        let outcome = pipeline.run(&request(AudioFormat::Wav)).await.unwrap();
        assert!(matches!(outcome, ExportOutcome::NoConversations));
    }

    #[tokio::test]
    async fn test_search_failure_ends_without_submitting() {
        let mut api = MockRecordingApi::new();
        api.expect_query_conversations()
            .withf(|q| q.page_size == resolver::MAX_PAGE_SIZE)
            .times(1)
            .returning(|_| {
                Err(ApiError::Status {
                    status: 503,
                    body: String::new(),
                })
            });
        api.expect_recording_metadata().never();
        api.expect_submit_batch().never();
        let transcoder = MockTranscoder::new();

        let dir = tempfile::tempdir().unwrap();
        let pipeline = ExportPipeline::new(&api, &transcoder, dir.path()).with_page_size(500);

        let outcome = pipeline.run(&request(AudioFormat::Ogg)).await.unwrap();
        assert!(matches!(outcome, ExportOutcome::NoConversations));
    }

    #[tokio::test]
    async fn test_no_available_recordings_never_submits() {
        let mut api = MockRecordingApi::new();
        api.expect_query_conversations()
            .returning(|_| Ok(vec!["c1".to_string(), "c2".to_string()]));
        api.expect_recording_metadata()
            .withf(|id| id == "c1")
            .returning(|_| Ok(vec![metadata("r1", "EXPIRED"), metadata("r2", "DELETED")]));
        api.expect_recording_metadata()
            .withf(|id| id == "c2")
            .returning(|id| Err(ApiError::NotFound(id.to_string())));
        api.expect_submit_batch().never();
        let transcoder = MockTranscoder::new();

        let dir = tempfile::tempdir().unwrap();
        let pipeline = ExportPipeline::new(&api, &transcoder, dir.path());

        let outcome = pipeline.run(&request(AudioFormat::Ogg)).await.unwrap();
        assert!(matches!(outcome, ExportOutcome::NoAvailableRecordings));
    }

    #[tokio::test]
    async fn test_poll_timeout_skips_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        // The third check would complete, but only two are allowed
        let api = support_queue_api(format!("{}/exports/conv123_rec456.ogg", server.uri()), 3, 2);
        let mut transcoder = MockTranscoder::new();
        transcoder.expect_transcode().never();

        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("Recordings");
        let pipeline = ExportPipeline::new(&api, &transcoder, output_dir.clone()).with_poll_policy(2, Duration::ZERO);

        let err = pipeline.run(&request(AudioFormat::Wav)).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DownloaderError>(),
            Some(DownloaderError::PollTimeout { attempts: 2, .. })
        ));
        assert!(!output_dir.exists());
    }
}
