use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use super::models::{
    BatchDownloadRequest, BatchDownloadSubmission, BatchSubmissionResponse, ConversationDetailsQuery,
    ConversationDetailsResponse, QueueListing,
};
use super::{
    ApiError, AudioFormat, BatchJobHandle, BatchStatus, ConversationQuery, Queue, RecordingApi,
    RecordingDescriptor, RecordingMetadata, Region,
};

/// Authenticated REST client for one platform region
pub struct CloudClient {
    http: Client,
    base_url: String,
    access_token: String,
}

impl CloudClient {
    pub fn new(region: Region, access_token: impl Into<String>) -> Self {
        Self::with_base_url(region.api_base_url(), access_token)
    }

    /// Use an explicit API base URL
    pub fn with_base_url(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send an authenticated request and decode the JSON body
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, resource: &str) -> Result<T, ApiError> {
        let response = request.bearer_auth(&self.access_token).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(resource.to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl RecordingApi for CloudClient {
    async fn list_queues(&self, page_size: u32) -> Result<Vec<Queue>, ApiError> {
        let request = self
            .http
            .get(self.url("/api/v2/routing/queues"))
            .query(&[("pageSize", page_size)]);

        let listing: QueueListing = self.send_json(request, "routing queues").await?;
        Ok(listing.entities)
    }

    async fn query_conversations(&self, query: &ConversationQuery) -> Result<Vec<String>, ApiError> {
        let body = ConversationDetailsQuery::from(query);
        tracing::debug!("Querying conversations in {}", body.interval);

        let request = self
            .http
            .post(self.url("/api/v2/analytics/conversations/details/query"))
            .json(&body);

        let response: ConversationDetailsResponse = self.send_json(request, "conversation details").await?;
        Ok(response
            .conversations
            .into_iter()
            .map(|conversation| conversation.conversation_id)
            .collect())
    }

    async fn recording_metadata(&self, conversation_id: &str) -> Result<Vec<RecordingMetadata>, ApiError> {
        let path = format!(
            "/api/v2/conversations/{}/recordingmetadata",
            urlencoding::encode(conversation_id)
        );
        let request = self.http.get(self.url(&path));

        self.send_json(request, &format!("recording metadata of {}", conversation_id))
            .await
    }

    async fn submit_batch(
        &self,
        descriptors: &[RecordingDescriptor],
        format: AudioFormat,
    ) -> Result<BatchJobHandle, ApiError> {
        let body = BatchDownloadSubmission {
            batch_download_request_list: descriptors
                .iter()
                .map(|descriptor| BatchDownloadRequest {
                    conversation_id: descriptor.conversation_id.clone(),
                    recording_id: descriptor.recording_id.clone(),
                })
                .collect(),
            format_id: format.format_id(),
        };

        let request = self.http.post(self.url("/api/v2/recording/batchrequests")).json(&body);
        let response: BatchSubmissionResponse = self.send_json(request, "batch request").await?;

        Ok(BatchJobHandle::new(response.id))
    }

    async fn batch_status(&self, handle: &BatchJobHandle) -> Result<BatchStatus, ApiError> {
        let path = format!(
            "/api/v2/recording/batchrequests/{}",
            urlencoding::encode(handle.as_str())
        );
        let request = self.http.get(self.url(&path));

        self.send_json(request, &format!("batch request {}", handle)).await
    }
}
