//! Capture device trait definitions
//!
//! Platform-agnostic traits for the camera+microphone collaborator. The
//! engine owns the acquired stream exclusively for the lifetime of one
//! recording session.

use crate::config::MediaConstraints;
use crate::utils::error::DisclosureResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

/// Which modalities a recording carries. Wire values are fixed by the
/// storage collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingModality {
    Video,
    Audio,
    Both,
}

impl RecordingModality {
    pub fn from_constraints(constraints: &MediaConstraints) -> Self {
        match (constraints.video, constraints.audio) {
            (true, true) => Self::Both,
            (true, false) => Self::Video,
            _ => Self::Audio,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Both => "both",
        }
    }
}

/// Codec/container combinations tried in order; the first one the stream
/// supports governs the session mime type.
pub const MIME_PREFERENCES: [&str; 5] = [
    "video/webm;codecs=vp9,opus",
    "video/webm;codecs=vp8,opus",
    "video/webm;codecs=h264",
    "video/webm",
    "video/mp4",
];

/// Fallback when the stream reports no supported combination.
pub const FALLBACK_MIME: &str = "video/webm";

/// Events emitted by an active media stream, in capture order.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// A fixed-interval segment of encoded media
    Data(Vec<u8>),
    /// The recorder finished flushing after a stop request
    Stopped,
    /// The recorder failed mid-capture (device disconnect, encoder error)
    Error(String),
}

/// Collaborator granting exclusive access to camera and microphone.
#[async_trait]
pub trait MediaDevice: Send + Sync {
    /// Acquire an exclusive stream. Suspends while the user decides on the
    /// permission prompt. Fails with `PermissionDenied` or `DeviceError`.
    async fn acquire(
        &self,
        constraints: &MediaConstraints,
    ) -> DisclosureResult<Box<dyn MediaStream>>;
}

/// An acquired camera+microphone stream.
#[async_trait]
pub trait MediaStream: Send {
    /// Whether the stream can encode to `mime`.
    fn supports_mime(&self, mime: &str) -> bool;

    /// Begin recording, segmenting into chunks every `chunk_interval` and
    /// emitting them (then `Stopped` or `Error`) on `events`.
    async fn start(
        &mut self,
        mime: &str,
        chunk_interval: Duration,
        events: mpsc::Sender<CaptureEvent>,
    ) -> DisclosureResult<()>;

    /// Request the recorder to stop. Remaining data is flushed as `Data`
    /// events followed by `Stopped`.
    async fn stop(&mut self);

    /// Stop all tracks and drop device handles. Must be safe to call in
    /// any state and more than once.
    fn release(&mut self);
}
