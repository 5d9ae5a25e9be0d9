use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod auth;
pub mod client;
pub mod models;

pub use auth::{ClientCredentials, TokenProvider};
pub use client::CloudClient;

/// Recording metadata state that makes a recording exportable
pub const AVAILABLE: &str = "AVAILABLE";

/// Errors returned by the contact-center platform API
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

/// Contact-center deployment regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Region {
    #[value(name = "mypurecloud.com")]
    UsEast,
    #[value(name = "usw2.pure.cloud")]
    UsWest,
    #[value(name = "cac1.pure.cloud")]
    Canada,
    #[value(name = "sae1.pure.cloud")]
    SaoPaulo,
    #[value(name = "mypurecloud.ie")]
    Ireland,
    #[value(name = "euw2.pure.cloud")]
    London,
    #[value(name = "mypurecloud.de")]
    Frankfurt,
    #[value(name = "mypurecloud.jp")]
    Tokyo,
    #[value(name = "mypurecloud.com.au")]
    Sydney,
    #[value(name = "aps1.pure.cloud")]
    Mumbai,
}

impl Region {
    pub const ALL: [Region; 10] = [
        Region::UsEast,
        Region::UsWest,
        Region::Canada,
        Region::SaoPaulo,
        Region::Ireland,
        Region::London,
        Region::Frankfurt,
        Region::Tokyo,
        Region::Sydney,
        Region::Mumbai,
    ];

    /// Environment host name of the region
    pub fn host(&self) -> &'static str {
        match self {
            Region::UsEast => "mypurecloud.com",
            Region::UsWest => "usw2.pure.cloud",
            Region::Canada => "cac1.pure.cloud",
            Region::SaoPaulo => "sae1.pure.cloud",
            Region::Ireland => "mypurecloud.ie",
            Region::London => "euw2.pure.cloud",
            Region::Frankfurt => "mypurecloud.de",
            Region::Tokyo => "mypurecloud.jp",
            Region::Sydney => "mypurecloud.com.au",
            Region::Mumbai => "aps1.pure.cloud",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Region::UsEast => "US East",
            Region::UsWest => "US West",
            Region::Canada => "Canada",
            Region::SaoPaulo => "Sao Paulo",
            Region::Ireland => "EU Ireland",
            Region::London => "EU London",
            Region::Frankfurt => "EU Frankfurt",
            Region::Tokyo => "Asia Pacific Tokyo",
            Region::Sydney => "Asia Pacific Sydney",
            Region::Mumbai => "Asia Pacific Mumbai",
        }
    }

    pub fn from_host(host: &str) -> Option<Self> {
        let host = host.trim().to_lowercase();
        Self::ALL.into_iter().find(|region| region.host() == host)
    }

    /// Base URL of the REST API for this region
    pub fn api_base_url(&self) -> String {
        format!("https://api.{}", self.host())
    }

    /// Base URL of the OAuth login service for this region
    pub fn login_base_url(&self) -> String {
        format!("https://login.{}", self.host())
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.label(), self.host())
    }
}

/// Audio formats an operator can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum AudioFormat {
    Ogg,
    Wav,
    Mp3,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 3] = [AudioFormat::Ogg, AudioFormat::Wav, AudioFormat::Mp3];

    /// Container the batch export always produces
    pub const EXPORT: AudioFormat = AudioFormat::Ogg;

    /// Format identifier as the platform spells it
    pub fn format_id(&self) -> &'static str {
        match self {
            AudioFormat::Ogg => "OGG",
            AudioFormat::Wav => "WAV",
            AudioFormat::Mp3 => "MP3",
        }
    }

    /// Lower-cased name, also used as file extension
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Ogg => "ogg",
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AudioFormat::Ogg => "OGG (export default, fastest)",
            AudioFormat::Wav => "WAV (converted, uncompressed)",
            AudioFormat::Mp3 => "MP3 (converted, compressed)",
        }
    }

    /// Whether files exported as OGG must be converted to reach this format
    pub fn needs_conversion(&self) -> bool {
        *self != Self::EXPORT
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format_id())
    }
}

/// Routing queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Queue {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Voice conversations of one queue inside an inclusive date range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationQuery {
    pub queue_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub page_size: u32,
}

impl ConversationQuery {
    /// ISO-8601 interval covering the whole of both days in UTC
    pub fn interval(&self) -> String {
        format!(
            "{}T00:00:00.000Z/{}T23:59:59.999Z",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Recording metadata entry as returned per conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingMetadata {
    pub id: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub file_state: Option<String>,
}

impl RecordingMetadata {
    pub fn is_available(&self) -> bool {
        self.file_state.as_deref() == Some(AVAILABLE)
    }
}

/// Reference to one exportable recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingDescriptor {
    pub conversation_id: String,
    pub recording_id: String,
    pub file_state: String,
}

impl RecordingDescriptor {
    pub fn label(&self) -> String {
        format!("{}_{}", self.conversation_id, self.recording_id)
    }
}

/// Identifier of a submitted batch export job
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchJobHandle(String);

impl BatchJobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BatchJobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of a batch export job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResultItem {
    pub conversation_id: String,
    pub recording_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

impl BatchResultItem {
    /// Download location, ignoring empty strings
    pub fn download_url(&self) -> Option<&str> {
        self.result_url.as_deref().filter(|url| !url.is_empty())
    }

    /// Platform-side failure message, ignoring empty strings
    pub fn error_message(&self) -> Option<&str> {
        self.error_msg.as_deref().filter(|msg| !msg.is_empty())
    }

    pub fn is_finalized(&self) -> bool {
        self.download_url().is_some() || self.error_message().is_some()
    }

    pub fn label(&self) -> String {
        format!("{}_{}", self.conversation_id, self.recording_id)
    }

    /// Deterministic name of the exported file on disk
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.label(), AudioFormat::EXPORT.as_str())
    }
}

/// Current state of a batch export job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatus {
    #[serde(default)]
    pub id: String,
    /// Absent until the platform has sized the job
    #[serde(default)]
    pub expected_result_count: Option<usize>,
    #[serde(default)]
    pub results: Vec<BatchResultItem>,
}

impl BatchStatus {
    pub fn finalized_count(&self) -> usize {
        self.results.iter().filter(|item| item.is_finalized()).count()
    }

    /// Complete once every expected item is finalized; an unknown count is never complete
    pub fn is_complete(&self) -> bool {
        self.expected_result_count == Some(self.finalized_count())
    }

    /// Expected item count for progress messages
    pub fn expected_label(&self) -> String {
        self.expected_result_count
            .map(|count| count.to_string())
            .unwrap_or_else(|| "?".to_string())
    }
}

/// Contact-center platform operations used by the export pipeline
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordingApi: Send + Sync {
    /// List routing queues (first page only)
    async fn list_queues(&self, page_size: u32) -> Result<Vec<Queue>, ApiError>;

    /// Find conversation ids matching the query, most recent first
    async fn query_conversations(&self, query: &ConversationQuery) -> Result<Vec<String>, ApiError>;

    /// Recording metadata of one conversation
    async fn recording_metadata(&self, conversation_id: &str) -> Result<Vec<RecordingMetadata>, ApiError>;

    /// Submit one batch export job covering every descriptor
    async fn submit_batch(
        &self,
        descriptors: &[RecordingDescriptor],
        format: AudioFormat,
    ) -> Result<BatchJobHandle, ApiError>;

    /// Fetch the current status of a batch export job
    async fn batch_status(&self, handle: &BatchJobHandle) -> Result<BatchStatus, ApiError>;
}
