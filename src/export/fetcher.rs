use anyhow::{Context, Result};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::platform::BatchResultItem;
use crate::utils::format_file_size;
use crate::DownloaderError;

/// Outcome of the download stage
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// Directory the files were written to
    pub output_dir: PathBuf,

    /// Items persisted to disk
    pub downloaded: Vec<BatchResultItem>,

    /// Items whose download failed, with the reason
    pub failed: Vec<(BatchResultItem, String)>,

    /// Items the platform could not export
    pub export_errors: Vec<BatchResultItem>,
}

/// Downloads exported recordings one at a time
pub struct RecordingFetcher {
    client: Client,
    output_dir: PathBuf,
}

impl RecordingFetcher {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: Client::new(),
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Download every item that has a result location and no export error.
    ///
    /// Only a missing output directory that cannot be created is an error; individual
    /// download failures are logged and collected in the report.
    pub async fn fetch(&self, items: &[BatchResultItem]) -> Result<FetchReport, DownloaderError> {
        fs_err::create_dir_all(&self.output_dir).map_err(|e| DownloaderError::OutputDirectory {
            path: self.output_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut report = FetchReport {
            output_dir: self.output_dir.clone(),
            ..FetchReport::default()
        };

        let (downloadable, rest): (Vec<_>, Vec<_>) = items
            .iter()
            .partition(|item| item.download_url().is_some() && item.error_message().is_none());

        for item in downloadable {
            tracing::info!("Downloading recording {}", item.label());

            match self.download(item).await {
                Ok(size) => {
                    tracing::info!("Saved {} ({})", item.file_name(), format_file_size(size));
                    report.downloaded.push(item.clone());
                }
                Err(e) => {
                    tracing::error!("Failed to download {}: {:#}", item.label(), e);
                    report.failed.push((item.clone(), format!("{:#}", e)));
                }
            }
        }

        for item in rest {
            match item.error_message() {
                Some(message) => {
                    tracing::warn!("Platform failed to export recording {}: {}", item.label(), message);
                    report.export_errors.push(item.clone());
                }
                None => tracing::warn!("Recording {} has no download location", item.label()),
            }
        }

        Ok(report)
    }

    /// Stream one recording to disk, returning the number of bytes written
    async fn download(&self, item: &BatchResultItem) -> Result<u64> {
        let url = item
            .download_url()
            .ok_or_else(|| anyhow::anyhow!("No download location"))?;
        let path = self.output_dir.join(item.file_name());

        let response = self.client.get(url).send().await.context("Request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP {}", response.status());
        }

        let progress = ProgressBar::new(response.content_length().unwrap_or(0));
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
                .unwrap()
        );
        progress.set_message(item.file_name());

        let result = self.write_stream(response, &path, &progress).await;
        match &result {
            Ok(_) => progress.finish_and_clear(),
            Err(_) => {
                progress.abandon();
                if path.is_file() {
                    let _ = fs_err::remove_file(&path);
                }
            }
        }

        result
    }

    async fn write_stream(&self, response: reqwest::Response, path: &Path, progress: &ProgressBar) -> Result<u64> {
        let mut file = fs_err::File::create(path)?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Download interrupted")?;
            file.write_all(&chunk)?;
            written += chunk.len() as u64;
            progress.set_position(written);
        }

        file.flush()?;
        Ok(written)
    }
}
