//! Recording upload pipeline
//!
//! Converts a finished capture asset into the transport encoding and submits
//! it to the storage collaborator. Submission is atomic from the caller's
//! perspective: no partial success, no automatic retry.

pub mod store;

pub use store::{RecordingInfo, RecordingStore, UploadReceipt};

use crate::capture::asset::CaptureAsset;
use crate::utils::error::{DisclosureError, DisclosureResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Wire payload for a recording submission. Field names are fixed by the
/// storage collaborator's protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingUpload {
    /// Captured modalities: "video", "audio" or "both"
    pub recording_type: String,
    pub mime_type: String,
    pub duration_seconds: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Base64-encoded media
    pub recording_data: String,
}

/// Terminal record of a pipeline run, owned by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub accepted: bool,

    /// Server-side reference to the persisted recording
    pub recording_ref: Option<String>,

    /// Server-computed SHA-256 of the encoded payload
    pub sha256_hash: Option<String>,
}

/// Encodes finished assets and submits them to the recording store.
#[derive(Clone)]
pub struct UploadPipeline {
    store: Arc<dyn RecordingStore>,
    min_encoded_len: usize,
}

impl UploadPipeline {
    pub fn new(store: Arc<dyn RecordingStore>, min_encoded_len: usize) -> Self {
        Self {
            store,
            min_encoded_len,
        }
    }

    /// Encode `asset` and submit it with its metadata.
    ///
    /// An encoding shorter than the configured floor is classified as an
    /// empty capture locally and never sent to the server.
    pub async fn submit(&self, asset: &CaptureAsset) -> DisclosureResult<UploadResult> {
        let encoded = BASE64.encode(&asset.bytes);
        if encoded.len() < self.min_encoded_len {
            tracing::warn!(
                encoded_len = encoded.len(),
                floor = self.min_encoded_len,
                "encoded recording below minimum length, treating as empty capture"
            );
            return Err(DisclosureError::EmptyCapture);
        }

        let upload = RecordingUpload {
            recording_type: asset.modality.as_str().to_string(),
            mime_type: asset.mime_type.clone(),
            duration_seconds: asset.duration_seconds,
            started_at: asset.started_at,
            ended_at: asset.ended_at,
            recording_data: encoded,
        };

        tracing::info!(
            mime_type = %upload.mime_type,
            duration_seconds = upload.duration_seconds,
            size_bytes = asset.bytes.len(),
            "submitting recording"
        );

        let receipt = self.store.upload_recording(&upload).await?;
        Ok(UploadResult {
            accepted: receipt.accepted,
            recording_ref: receipt.recording_ref,
            sha256_hash: receipt.sha256_hash,
        })
    }
}

/// Decode a persisted recording back to raw media bytes for playback.
pub fn decode_recording(encoded: &str) -> DisclosureResult<Vec<u8>> {
    BASE64
        .decode(encoded)
        .map_err(|e| DisclosureError::UploadRejected(format!("invalid recording encoding: {e}")))
}
