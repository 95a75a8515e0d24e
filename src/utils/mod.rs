//! Shared utilities

pub mod error;
pub mod timer;

pub use error::{DisclosureError, DisclosureResult, ErrorResponse};
pub use timer::TimerHandle;
