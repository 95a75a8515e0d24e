//! Subsystem configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Constraints passed to the media device when acquiring camera+microphone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaConstraints {
    /// Whether to capture video
    pub video: bool,

    /// Whether to capture audio
    pub audio: bool,

    /// Ideal video width in pixels
    pub ideal_width: u32,

    /// Ideal video height in pixels
    pub ideal_height: u32,

    /// Video bitrate hint in bits per second
    pub video_bits_per_second: u32,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: true,
            ideal_width: 640,
            ideal_height: 480,
            video_bits_per_second: 1_000_000,
        }
    }
}

/// Configuration for a disclosure session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosureConfig {
    /// Local fallback for the grant validity window, in seconds. The
    /// server-provided window wins when present.
    pub grant_validity_seconds: u64,

    /// Hard ceiling on recording length, in milliseconds
    pub max_capture_ms: u64,

    /// Chunk segmentation interval, in milliseconds
    pub chunk_interval_ms: u64,

    /// Minimum accepted length of the base64-encoded asset. Anything
    /// shorter is treated as an empty capture and never submitted.
    pub min_encoded_len: usize,

    /// Device acquisition constraints
    pub constraints: MediaConstraints,
}

impl Default for DisclosureConfig {
    fn default() -> Self {
        Self {
            grant_validity_seconds: 120,
            max_capture_ms: 120_000,
            chunk_interval_ms: 1_000,
            min_encoded_len: 100,
            constraints: MediaConstraints::default(),
        }
    }
}

impl DisclosureConfig {
    pub fn max_capture(&self) -> Duration {
        Duration::from_millis(self.max_capture_ms)
    }

    pub fn chunk_interval(&self) -> Duration {
        Duration::from_millis(self.chunk_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_policy() {
        let config = DisclosureConfig::default();
        assert_eq!(config.grant_validity_seconds, 120);
        assert_eq!(config.max_capture_ms, 120_000);
        assert_eq!(config.chunk_interval(), Duration::from_secs(1));
        assert_eq!(config.min_encoded_len, 100);
        assert!(config.constraints.video && config.constraints.audio);
    }
}
