//! Disclosure grant types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire response to a grant request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantTicket {
    /// Opaque single-use view token
    pub token: String,

    /// Validity window granted by the server, in seconds
    pub expires_in_seconds: u64,
}

/// A short-lived, single-use credential authorizing one reveal of sealed
/// case data. Exclusively owned by the token controller; terminal once
/// consumed or expired.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosureGrant {
    /// Resource (opening request) this grant discloses
    pub resource_id: u64,

    /// Server-issued view token, doubling as the grant id
    pub grant_id: String,

    /// When the grant was issued (local clock)
    pub issued_at: DateTime<Utc>,

    /// When the grant stops being exchangeable
    pub expires_at: DateTime<Utc>,

    /// Whether the grant has been exchanged for a payload
    pub consumed: bool,
}

impl DisclosureGrant {
    pub fn new(resource_id: u64, ticket: GrantTicket) -> Self {
        let issued_at = Utc::now();
        Self {
            resource_id,
            grant_id: ticket.token,
            issued_at,
            expires_at: issued_at + chrono::Duration::seconds(ticket.expires_in_seconds as i64),
            consumed: false,
        }
    }

    /// Whether the server-side window has lapsed according to the local clock.
    pub fn is_past_window(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// The sensitive data returned by a successful grant exchange. Opaque to
/// this subsystem; ownership transfers to the caller and the payload is
/// never cached here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosurePayload {
    /// Sealed case detail as returned by the collaborator
    pub case_detail: serde_json::Value,

    /// Signers of the underlying resolution
    pub signers: Vec<String>,

    /// Custodian approvals that authorized the opening
    pub approvals: Vec<String>,

    /// Free-text reason recorded with the opening request
    pub reason: String,
}
