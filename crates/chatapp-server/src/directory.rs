//! Authoritative membership state: registration table and group registry.
//!
//! Both tables keep insertion order because the protocol exposes it: table
//! broadcasts, `list_groups`, and `list_members` all report in the order
//! entries first appeared. Linear scans are fine at this scale and keep the
//! ordering for free.
//!
//! # Invariants
//!
//! - At most one record per name; a name that has ever registered keeps its
//!   record (`Offline`) after de-registration or eviction, blocking reuse.
//! - Group names are unique; every group member is a registered name.
//! - Taking a name offline removes it from every group, so group members
//!   are online by construction.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use chatapp_proto::payloads::{
    directory::{Status, TableEntry},
    group::{CreateOutcome, JoinOutcome},
};

/// Result of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// New name; a record was inserted.
    Registered,
    /// Identical `(name, ip, port)` tuple already online: a retransmitted
    /// request. Accepted without state change.
    DuplicateOnline,
    /// The name is reserved by an existing record (online or offline).
    NameTaken,
}

struct Group {
    name: String,
    members: Vec<String>,
}

/// Registration table plus group registry.
#[derive(Default)]
pub struct Directory {
    clients: Vec<TableEntry>,
    groups: Vec<Group>,
}

impl Directory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to register `name` at `ip:port`.
    ///
    /// Names are reserved for the server lifetime: any existing record, even
    /// offline, blocks the name — except the exact-duplicate case retries
    /// produce, which is accepted idempotently.
    pub fn register(&mut self, name: &str, ip: Ipv4Addr, port: u16) -> RegisterOutcome {
        if let Some(existing) = self.clients.iter().find(|c| c.name == name) {
            if existing.status == Status::Online && existing.ip == ip && existing.port == port {
                return RegisterOutcome::DuplicateOnline;
            }
            return RegisterOutcome::NameTaken;
        }

        self.clients.push(TableEntry { name: name.to_owned(), ip, port, status: Status::Online });
        RegisterOutcome::Registered
    }

    /// Whether any record (online or offline) exists for `name`.
    pub fn knows(&self, name: &str) -> bool {
        self.clients.iter().any(|c| c.name == name)
    }

    /// Whether `name` is currently online.
    pub fn is_online(&self, name: &str) -> bool {
        self.clients
            .iter()
            .any(|c| c.name == name && c.status == Status::Online)
    }

    /// Take `name` offline and purge it from every group.
    ///
    /// Covers both voluntary de-registration and timeout eviction. Returns
    /// `true` if the table content changed (the record was online), so the
    /// caller knows whether a broadcast is due.
    pub fn set_offline(&mut self, name: &str) -> bool {
        let changed = match self.clients.iter_mut().find(|c| c.name == name) {
            Some(record) if record.status == Status::Online => {
                record.status = Status::Offline;
                true
            }
            _ => false,
        };

        for group in &mut self.groups {
            group.members.retain(|m| m != name);
        }

        changed
    }

    /// Listen endpoint of an online client.
    pub fn endpoint(&self, name: &str) -> Option<SocketAddr> {
        self.clients
            .iter()
            .find(|c| c.name == name && c.status == Status::Online)
            .map(|c| SocketAddr::V4(SocketAddrV4::new(c.ip, c.port)))
    }

    /// Full table in insertion order (the broadcast body).
    pub fn snapshot(&self) -> Vec<TableEntry> {
        self.clients.clone()
    }

    /// Every online client with its endpoint (the broadcast recipients).
    pub fn online_clients(&self) -> Vec<(String, SocketAddr)> {
        self.clients
            .iter()
            .filter(|c| c.status == Status::Online)
            .map(|c| (c.name.clone(), SocketAddr::V4(SocketAddrV4::new(c.ip, c.port))))
            .collect()
    }

    /// Create a group. Conditional, so duplicate requests are harmless.
    pub fn create_group(&mut self, group: &str) -> CreateOutcome {
        if self.groups.iter().any(|g| g.name == group) {
            return CreateOutcome::AlreadyExists;
        }

        self.groups.push(Group { name: group.to_owned(), members: Vec::new() });
        CreateOutcome::Created
    }

    /// Group names in insertion order.
    pub fn group_names(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.name.clone()).collect()
    }

    /// Add `member` to `group`. Re-joining is a no-op.
    ///
    /// Callers must only pass registered names; the driver enforces this by
    /// dropping frames from unknown senders.
    pub fn join_group(&mut self, group: &str, member: &str) -> JoinOutcome {
        let Some(group) = self.groups.iter_mut().find(|g| g.name == group) else {
            return JoinOutcome::NoSuchGroup;
        };

        if !group.members.iter().any(|m| m == member) {
            group.members.push(member.to_owned());
        }
        JoinOutcome::Entered
    }

    /// Remove `member` from `group`. Returns whether it was a member.
    pub fn leave_group(&mut self, group: &str, member: &str) -> bool {
        self.groups
            .iter_mut()
            .find(|g| g.name == group)
            .is_some_and(|g| {
                let before = g.members.len();
                g.members.retain(|m| m != member);
                g.members.len() != before
            })
    }

    /// Membership of `group` in insertion order. `None` if no such group.
    pub fn members(&self, group: &str) -> Option<Vec<String>> {
        self.groups
            .iter()
            .find(|g| g.name == group)
            .map(|g| g.members.clone())
    }

    /// Fan-out targets: every member of `group` except `sender`, resolved
    /// to endpoints.
    pub fn recipients(&self, group: &str, sender: &str) -> Vec<(String, SocketAddr)> {
        self.members(group)
            .unwrap_or_default()
            .into_iter()
            .filter(|m| m != sender)
            .filter_map(|m| self.endpoint(&m).map(|addr| (m, addr)))
            .collect()
    }
}
