//! Recording store collaborator
//!
//! Persists forensic recordings and serves the audit-facing retrieval
//! surface. Administrative operations are out of the core flow but consumed
//! by the audit dashboard.

use super::RecordingUpload;
use crate::utils::error::DisclosureResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server acknowledgement for a stored recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub accepted: bool,
    pub recording_ref: Option<String>,
    pub sha256_hash: Option<String>,
    pub size_bytes: u64,
}

/// Stored-recording metadata as listed for auditors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingInfo {
    pub id: String,
    /// "video", "audio" or "both"
    pub modality: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub duration_seconds: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub uploaded_at: DateTime<Utc>,
    pub sha256_hash: String,
}

/// Collaborator persisting recordings as forensic evidence.
#[async_trait]
pub trait RecordingStore: Send + Sync {
    /// Persist an encoded recording. Exactly one attempt; retries are the
    /// caller's decision.
    async fn upload_recording(&self, upload: &RecordingUpload) -> DisclosureResult<UploadReceipt>;

    /// List stored recordings (audit surface).
    async fn list_recordings(&self) -> DisclosureResult<Vec<RecordingInfo>>;

    /// Fetch one recording with its base64-encoded media for playback.
    async fn get_recording(&self, id: &str) -> DisclosureResult<(RecordingInfo, String)>;

    /// Delete a recording (audit surface, admin only).
    async fn delete_recording(&self, id: &str) -> DisclosureResult<()>;
}
