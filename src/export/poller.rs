use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::time::sleep;

use crate::platform::{BatchJobHandle, BatchResultItem, RecordingApi};
use crate::DownloaderError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Waits for a batch export job to finalize every expected item
pub struct BatchPoller<'a> {
    api: &'a dyn RecordingApi,
    max_attempts: u32,
    interval: Duration,
}

impl<'a> BatchPoller<'a> {
    pub fn with_policy(api: &'a dyn RecordingApi, max_attempts: u32, interval: Duration) -> Self {
        Self {
            api,
            max_attempts,
            interval,
        }
    }

    /// Poll at a fixed interval until the job is complete or the attempts run out.
    ///
    /// A failed status request counts as a pending attempt. Nothing is returned on timeout.
    pub async fn poll(&self, handle: &BatchJobHandle) -> Result<Vec<BatchResultItem>, DownloaderError> {
        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap()
        );
        progress.set_message(format!("Waiting for batch {}...", handle));

        let start_time = std::time::Instant::now();

        for attempt in 1..=self.max_attempts {
            match self.api.batch_status(handle).await {
                Ok(status) => {
                    let completed = status.finalized_count();
                    tracing::info!(
                        "Batch status: {}/{} (check #{})",
                        completed,
                        status.expected_label(),
                        attempt
                    );

                    if status.is_complete() {
                        progress.finish_with_message("Batch export processed!");
                        return Ok(status.results);
                    }

                    progress.set_message(format!(
                        "Exporting... {}/{} ready ({}s elapsed, check #{})",
                        completed,
                        status.expected_label(),
                        start_time.elapsed().as_secs(),
                        attempt
                    ));
                }
                Err(e) => {
                    tracing::error!("Failed to check batch status (check #{}): {}", attempt, e);
                }
            }

            sleep(self.interval).await;
        }

        progress.finish_with_message("Batch export timed out");

        Err(DownloaderError::PollTimeout {
            batch_id: handle.to_string(),
            attempts: self.max_attempts,
        })
    }
}
