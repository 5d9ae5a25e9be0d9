use chrono::NaiveDate;

use crate::platform::{ConversationQuery, RecordingApi, RecordingDescriptor};

/// Largest page the conversation details query accepts
pub const MAX_PAGE_SIZE: u32 = 100;

/// Finds exportable recordings of a queue over a date range
pub struct RecordingResolver<'a> {
    api: &'a dyn RecordingApi,
    page_size: u32,
}

impl<'a> RecordingResolver<'a> {
    pub fn new(api: &'a dyn RecordingApi, page_size: u32) -> Self {
        Self {
            api,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Voice conversations of the queue, most recent first, first page only
    pub async fn find_conversations(&self, queue_id: &str, start: NaiveDate, end: NaiveDate) -> Vec<String> {
        let query = ConversationQuery {
            queue_id: queue_id.to_string(),
            start,
            end,
            page_size: self.page_size,
        };

        tracing::info!("Searching voice conversations in {}", query.interval());

        match self.api.query_conversations(&query).await {
            Ok(ids) => {
                tracing::info!("Found {} conversations", ids.len());
                if ids.len() >= self.page_size as usize {
                    tracing::warn!(
                        "Conversation search returned a full page of {}; older conversations in the range are not included",
                        self.page_size
                    );
                }
                ids
            }
            Err(e) => {
                tracing::error!("Conversation search failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Recording descriptors in state AVAILABLE for the given conversations
    pub async fn available_recordings(&self, conversation_ids: &[String]) -> Vec<RecordingDescriptor> {
        let mut recordings = Vec::new();

        for conversation_id in conversation_ids {
            let metadata = match self.api.recording_metadata(conversation_id).await {
                Ok(metadata) => metadata,
                Err(e) if e.is_not_found() => continue,
                Err(e) => {
                    tracing::error!("Failed to fetch recording metadata of conversation {}: {}", conversation_id, e);
                    continue;
                }
            };

            if !metadata.is_empty() {
                tracing::info!("Conversation {} has {} recordings", conversation_id, metadata.len());
            }

            for entry in metadata {
                let state = entry.file_state.clone().unwrap_or_else(|| "N/A".to_string());
                if entry.is_available() {
                    tracing::debug!("Recording {} is available", entry.id);
                    recordings.push(RecordingDescriptor {
                        conversation_id: conversation_id.clone(),
                        recording_id: entry.id,
                        file_state: state,
                    });
                } else {
                    tracing::warn!(
                        "Skipping recording {} of conversation {}: state {}",
                        entry.id,
                        conversation_id,
                        state
                    );
                }
            }
        }

        recordings
    }
}
