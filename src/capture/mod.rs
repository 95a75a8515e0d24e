//! Capture engine module
//!
//! Device-backed forensic recording:
//! - `MediaDevice`/`MediaStream` collaborator traits and the ordered
//!   `CaptureEvent` stream
//! - `RecordingSession`/`CaptureAsset` data model
//! - `CaptureEngine` lifecycle (acquire, negotiate, chunk, cap, finalize)

pub mod asset;
pub mod device;
pub mod engine;

pub use asset::{CaptureAsset, RecordingSession};
pub use device::{CaptureEvent, MediaDevice, MediaStream, RecordingModality};
pub use engine::{CaptureEngine, CaptureState, CaptureUpdate};
