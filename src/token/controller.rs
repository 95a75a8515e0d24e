//! Disclosure token controller
//!
//! Requests one-time view grants, tracks their countdown, and exchanges a
//! grant for the sealed payload exactly once. Expiry is enforced locally at
//! 1 Hz so the flow fails fast without waiting for the server to say no.

use super::grant::{DisclosureGrant, DisclosurePayload, GrantTicket};
use crate::utils::error::{DisclosureError, DisclosureResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Collaborator issuing and redeeming one-time view grants.
#[async_trait]
pub trait GrantService: Send + Sync {
    /// Request a fresh grant for a resource. No side effects on the
    /// resource until the grant is consumed.
    async fn request_grant(&self, resource_id: u64) -> DisclosureResult<GrantTicket>;

    /// Redeem a grant token. The server honors exactly one successful
    /// call per token.
    async fn consume_grant(
        &self,
        resource_id: u64,
        token: &str,
    ) -> DisclosureResult<DisclosurePayload>;
}

/// Owns at most one active grant and its local countdown.
pub struct TokenController {
    service: Arc<dyn GrantService>,
    grant: Option<DisclosureGrant>,
    remaining_seconds: u64,
    locally_expired: bool,
}

impl TokenController {
    pub fn new(service: Arc<dyn GrantService>) -> Self {
        Self {
            service,
            grant: None,
            remaining_seconds: 0,
            locally_expired: false,
        }
    }

    /// Request a grant for `resource_id`, replacing any previously held
    /// grant. The countdown restarts from the granted window.
    pub async fn request_grant(&mut self, resource_id: u64) -> DisclosureResult<DisclosureGrant> {
        let ticket = self.service.request_grant(resource_id).await?;
        tracing::info!(
            resource_id,
            expires_in = ticket.expires_in_seconds,
            "disclosure grant issued"
        );

        self.remaining_seconds = ticket.expires_in_seconds;
        self.locally_expired = ticket.expires_in_seconds == 0;
        let grant = DisclosureGrant::new(resource_id, ticket);
        self.grant = Some(grant.clone());
        Ok(grant)
    }

    /// Seconds left before the held grant expires locally.
    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    /// Decrement the countdown by one second. Reaching zero expires the
    /// grant locally, independent of server confirmation.
    pub fn tick(&mut self) -> u64 {
        if self.remaining_seconds > 0 {
            self.remaining_seconds -= 1;
        }
        if self.remaining_seconds == 0 && self.grant.is_some() && !self.locally_expired {
            tracing::debug!("grant countdown reached zero, expiring locally");
            self.locally_expired = true;
        }
        self.remaining_seconds
    }

    /// Whether the held grant is expired (locally or by the server window).
    pub fn is_expired(&self) -> bool {
        self.locally_expired
            || self
                .grant
                .as_ref()
                .map(|g| g.is_past_window())
                .unwrap_or(false)
    }

    /// Exchange the held grant for the sealed payload.
    ///
    /// Honored at most once per grant: a second call fails with
    /// `AlreadyConsumed`, a call past the window fails with `Expired`.
    /// A failed exchange of any kind invalidates the grant, so recovery
    /// always goes through a fresh `request_grant`.
    pub async fn consume(&mut self) -> DisclosureResult<DisclosurePayload> {
        let grant = self
            .grant
            .as_ref()
            .ok_or_else(|| DisclosureError::NotEligible("no active grant".to_string()))?;

        if grant.consumed {
            return Err(DisclosureError::AlreadyConsumed);
        }
        if self.is_expired() {
            self.locally_expired = true;
            return Err(DisclosureError::Expired);
        }

        let resource_id = grant.resource_id;
        let token = grant.grant_id.clone();
        match self.service.consume_grant(resource_id, &token).await {
            Ok(payload) => {
                if let Some(g) = self.grant.as_mut() {
                    g.consumed = true;
                }
                tracing::info!(resource_id, "disclosure grant consumed");
                Ok(payload)
            }
            Err(e) => {
                // No internal retry: the token may have been burned
                // server-side, so the held grant is no longer trustworthy.
                tracing::warn!(resource_id, error = %e, "grant consume failed, invalidating grant");
                self.grant = None;
                self.remaining_seconds = 0;
                Err(e)
            }
        }
    }

    /// The grant currently held, if any.
    pub fn grant(&self) -> Option<&DisclosureGrant> {
        self.grant.as_ref()
    }
}
