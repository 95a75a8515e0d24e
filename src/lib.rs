//! Sealed Disclosure - one-time viewing of sealed case data under forensic
//! capture.
//!
//! An authorized reviewer sees highly sensitive case data exactly once,
//! under a time-boxed grant, while an audio/video recording of the viewing
//! session is captured and persisted as evidence. The crate covers the
//! one-time-view token lifecycle, the viewing state machine, the capture
//! engine and the upload pipeline; grant issuance, device access and
//! recording storage are collaborator traits the embedding application
//! implements.

pub mod capture;
pub mod config;
pub mod token;
pub mod upload;
pub mod utils;
pub mod viewing;

pub use capture::{CaptureEngine, CaptureState, MediaDevice, MediaStream, RecordingModality};
pub use config::{DisclosureConfig, MediaConstraints};
pub use token::{DisclosureGrant, DisclosurePayload, GrantService, TokenController};
pub use upload::{RecordingStore, UploadPipeline, UploadResult};
pub use utils::{DisclosureError, DisclosureResult, ErrorResponse};
pub use viewing::{ViewingSession, ViewingState};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging for embedding applications.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sealed_disclosure=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
