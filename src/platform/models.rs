//! Request and response bodies of the platform REST API.

use serde::{Deserialize, Serialize};

use super::{ConversationQuery, Queue};

#[derive(Debug, Deserialize)]
pub struct QueueListing {
    #[serde(default)]
    pub entities: Vec<Queue>,
}

/// Body of `POST /api/v2/analytics/conversations/details/query`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDetailsQuery {
    pub interval: String,
    pub order: &'static str,
    pub order_by: &'static str,
    pub paging: Paging,
    pub segment_filters: Vec<SegmentFilter>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    pub page_size: u32,
    pub page_number: u32,
}

#[derive(Debug, Serialize)]
pub struct SegmentFilter {
    #[serde(rename = "type")]
    pub filter_type: &'static str,
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Serialize)]
pub struct Predicate {
    #[serde(rename = "type")]
    pub predicate_type: &'static str,
    pub dimension: &'static str,
    pub operator: &'static str,
    pub value: String,
}

impl Predicate {
    fn matches(dimension: &'static str, value: impl Into<String>) -> Self {
        Self {
            predicate_type: "dimension",
            dimension,
            operator: "matches",
            value: value.into(),
        }
    }
}

impl From<&ConversationQuery> for ConversationDetailsQuery {
    fn from(query: &ConversationQuery) -> Self {
        Self {
            interval: query.interval(),
            order: "desc",
            order_by: "conversationStart",
            paging: Paging {
                page_size: query.page_size,
                page_number: 1,
            },
            segment_filters: vec![SegmentFilter {
                filter_type: "and",
                predicates: vec![
                    Predicate::matches("queueId", query.queue_id.clone()),
                    Predicate::matches("mediaType", "voice"),
                ],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConversationDetailsResponse {
    #[serde(default)]
    pub conversations: Vec<ConversationDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDetail {
    pub conversation_id: String,
}

/// Body of `POST /api/v2/recording/batchrequests`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDownloadSubmission {
    pub batch_download_request_list: Vec<BatchDownloadRequest>,
    pub format_id: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDownloadRequest {
    pub conversation_id: String,
    pub recording_id: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchSubmissionResponse {
    pub id: String,
}

/// Response of the OAuth token endpoint
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}
