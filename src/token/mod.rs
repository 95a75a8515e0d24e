//! One-time view grant lifecycle
//!
//! - `DisclosureGrant` / `DisclosurePayload` data model
//! - `GrantService` collaborator trait
//! - `TokenController` with local 1 Hz countdown and exactly-once consume

pub mod controller;
pub mod grant;

pub use controller::{GrantService, TokenController};
pub use grant::{DisclosureGrant, DisclosurePayload, GrantTicket};
