//! Recording session and finished asset
//!
//! A session accumulates chunks while the recorder runs; finalization folds
//! it into an immutable asset, produced at most once per session.

use super::device::RecordingModality;
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use uuid::Uuid;

/// One device-backed recording tied to one disclosure. Mutated only by the
/// capture engine; dropped once the upload pipeline has consumed it.
#[derive(Debug)]
pub struct RecordingSession {
    /// Stable session id
    pub session_id: Uuid,

    /// Negotiated encoding for this session
    pub mime_type: String,

    /// Wall-clock start, for upload metadata
    pub started_at: DateTime<Utc>,

    /// Wall-clock end, set at finalization
    pub ended_at: Option<DateTime<Utc>>,

    /// Encoded media fragments in arrival order
    pub chunks: Vec<Vec<u8>>,

    /// Monotonic start, for duration computation
    started_instant: Instant,
}

impl RecordingSession {
    pub fn new(mime_type: &str) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            mime_type: mime_type.to_string(),
            started_at: Utc::now(),
            ended_at: None,
            chunks: Vec::new(),
            started_instant: Instant::now(),
        }
    }

    /// Seconds elapsed since the session started, on the monotonic clock.
    pub fn elapsed_seconds(&self) -> u64 {
        self.started_instant.elapsed().as_secs_f64().round() as u64
    }

    /// Fold the session into an immutable asset. Consumes the session so an
    /// asset is produced at most once.
    pub fn finalize(mut self, modality: RecordingModality) -> CaptureAsset {
        let ended_at = Utc::now();
        self.ended_at = Some(ended_at);
        let duration_seconds = self.elapsed_seconds();

        let mut bytes = Vec::with_capacity(self.chunks.iter().map(Vec::len).sum());
        for chunk in &self.chunks {
            bytes.extend_from_slice(chunk);
        }

        CaptureAsset {
            bytes,
            mime_type: self.mime_type,
            modality,
            duration_seconds,
            started_at: self.started_at,
            ended_at,
        }
    }
}

/// Immutable concatenation of a session's chunks plus computed duration.
/// Transient: exists only between stop and upload submission.
#[derive(Debug, Clone)]
pub struct CaptureAsset {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub modality: RecordingModality,
    pub duration_seconds: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_preserves_chunk_order() {
        let mut session = RecordingSession::new("video/webm");
        session.chunks.push(vec![1, 2]);
        session.chunks.push(vec![3]);
        session.chunks.push(vec![4, 5, 6]);

        let asset = session.finalize(RecordingModality::Both);
        assert_eq!(asset.bytes, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(asset.mime_type, "video/webm");
    }

    #[tokio::test(start_paused = true)]
    async fn test_duration_uses_monotonic_clock() {
        let session = RecordingSession::new("video/webm");
        tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        let asset = session.finalize(RecordingModality::Both);
        assert_eq!(asset.duration_seconds, 10);
    }
}
