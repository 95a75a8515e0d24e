//! Viewing state machine
//!
//! One linear disclosure flow per session: request → countdown → disclosure
//! with mandatory capture → upload. The disclosed payload is the session
//! result contract; rendering it is the caller's business.

pub mod session;

pub use session::{CloseOutcome, ViewingEvent, ViewingSession, ViewingState};
