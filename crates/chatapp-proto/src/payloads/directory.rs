//! Directory payloads: registration, de-registration, table broadcast.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// Liveness status of a registered name.
///
/// A name that has ever registered keeps its table entry forever; the status
/// records whether the endpoint is currently reachable. Offline entries
/// block re-registration of the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Registered and presumed reachable.
    Online,
    /// De-registered or evicted; the name stays reserved.
    Offline,
}

/// One row of the registration table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    /// Client name (primary key, unique per server lifetime).
    pub name: String,
    /// Client listen address.
    pub ip: Ipv4Addr,
    /// Client listen port.
    pub port: u16,
    /// Current liveness status.
    pub status: Status,
}

/// Server response to a `register` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterAck {
    /// Whether the registration was accepted.
    pub ok: bool,
    /// Rejection reason when `ok` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RegisterAck {
    /// Acceptance.
    pub fn accepted() -> Self {
        Self { ok: true, reason: None }
    }

    /// Duplicate-name rejection.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self { ok: false, reason: Some(reason.into()) }
    }
}

/// De-registration request.
///
/// `name` is normally the sender's own name; after a failed peer delivery a
/// client also sends this for the unresponsive peer (best effort).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dereg {
    /// Name to de-register.
    pub name: String,
}

/// Full registration-table snapshot, in table insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Every row the server has ever held, current status included.
    pub entries: Vec<TableEntry>,
}
