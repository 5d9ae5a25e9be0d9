use crate::platform::{AudioFormat, BatchJobHandle, RecordingApi, RecordingDescriptor};
use crate::DownloaderError;

/// Submit every descriptor as a single batch export job in the export container format
pub async fn submit(
    api: &dyn RecordingApi,
    descriptors: &[RecordingDescriptor],
) -> Result<BatchJobHandle, DownloaderError> {
    tracing::info!(
        "Submitting batch export of {} recordings as {}",
        descriptors.len(),
        AudioFormat::EXPORT
    );

    let handle = api
        .submit_batch(descriptors, AudioFormat::EXPORT)
        .await
        .map_err(|e| DownloaderError::BatchSubmission(e.to_string()))?;

    for descriptor in descriptors {
        tracing::info!("Added to batch: {}", descriptor.label());
    }
    tracing::info!("Batch {} created", handle);

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{ApiError, MockRecordingApi};

    fn descriptor(conversation: &str, recording: &str) -> RecordingDescriptor {
        RecordingDescriptor {
            conversation_id: conversation.to_string(),
            recording_id: recording.to_string(),
            file_state: "AVAILABLE".to_string(),
        }
    }

    #[tokio::test]
    async fn test_submits_all_descriptors_as_ogg() {
        let mut api = MockRecordingApi::new();
        api.expect_submit_batch()
            .withf(|descriptors, format| descriptors.len() == 2 && *format == AudioFormat::Ogg)
            .times(1)
            .returning(|_, _| Ok(BatchJobHandle::new("batch-1")));

        let descriptors = vec![descriptor("c1", "r1"), descriptor("c2", "r2")];
        let handle = submit(&api, &descriptors).await.unwrap();

        assert_eq!(handle, BatchJobHandle::new("batch-1"));
    }

    #[tokio::test]
    async fn test_rejection_is_fatal() {
        let mut api = MockRecordingApi::new();
        api.expect_submit_batch().times(1).returning(|_, _| {
            Err(ApiError::Status {
                status: 400,
                body: "invalid request".to_string(),
            })
        });

        let err = submit(&api, &[descriptor("c1", "r1")]).await.unwrap_err();

        assert!(matches!(err, DownloaderError::BatchSubmission(msg) if msg.contains("invalid request")));
    }
}
