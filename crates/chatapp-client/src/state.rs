//! Pure client state: mode, table mirror, offline inbox, inbound handling.
//!
//! Everything here is synchronous and socket-free so the mode rules and
//! inbox semantics can be tested directly. The runtime executes the
//! returned [`Effect`]s.

use std::net::SocketAddr;

use chatapp_proto::{
    payloads::{chat, directory::TableEntry, directory::Status},
    Frame, Identity, Payload,
};

/// Which commands are accepted and where inbound direct messages go.
///
/// A tagged variant rather than a bool-plus-name: there is no state where
/// the client is "in a group" without knowing which.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Direct chat and directory commands.
    Free,
    /// Group traffic only; direct messages are buffered.
    InGroup(String),
}

impl Mode {
    /// The joined group name, if any.
    pub fn group(&self) -> Option<&str> {
        match self {
            Self::Free => None,
            Self::InGroup(group) => Some(group),
        }
    }
}

/// One buffered direct message, awaiting the return to free mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxEntry {
    /// Peer that sent the message.
    pub from: String,
    /// Message text.
    pub text: String,
}

/// What the runtime must do after an inbound frame was handled.
#[derive(Debug)]
pub enum Effect {
    /// Send a plain (non-reliable) frame; ACKs of inbound traffic.
    Ack {
        /// Where to send it (the inbound frame's source).
        dest: SocketAddr,
        /// Frame to send.
        frame: Frame,
    },
    /// Print a bracketed status line.
    Status(String),
    /// Print a raw line (group message delivery).
    Plain(String),
}

/// Client-side state shared between the driver and the listener handler.
pub struct ClientState {
    identity: Identity,
    mode: Mode,
    mirror: Vec<TableEntry>,
    inbox: Vec<InboxEntry>,
}

impl ClientState {
    /// Fresh state for a client with the given startup identity.
    pub fn new(identity: Identity) -> Self {
        Self { identity, mode: Mode::Free, mirror: Vec::new(), inbox: Vec::new() }
    }

    /// This client's startup identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.mode.clone()
    }

    /// Switch to group mode after a successful join.
    pub fn enter_group(&mut self, group: impl Into<String>) {
        self.mode = Mode::InGroup(group.into());
    }

    /// Return to free mode, draining the offline inbox in arrival order.
    pub fn leave_group(&mut self) -> Vec<InboxEntry> {
        self.mode = Mode::Free;
        std::mem::take(&mut self.inbox)
    }

    /// Resolve an online peer to its endpoint via the local mirror.
    pub fn resolve_peer(&self, name: &str) -> Option<SocketAddr> {
        self.mirror
            .iter()
            .find(|e| e.name == name && e.status == Status::Online)
            .map(|e| SocketAddr::from((e.ip, e.port)))
    }

    /// Rows currently held in the local mirror.
    pub fn mirror(&self) -> &[TableEntry] {
        &self.mirror
    }

    fn ack(&self, dest: SocketAddr, payload: Payload) -> Effect {
        Effect::Ack { dest, frame: Frame::new(payload, self.identity.clone()) }
    }

    /// Handle a non-ACK inbound frame from the listener.
    ///
    /// ACKs are sent before anything is printed or buffered, so the sender's
    /// retry clock stops as early as possible.
    pub fn handle_frame(&mut self, frame: Frame, src: SocketAddr) -> Vec<Effect> {
        match frame.payload {
            Payload::Msg(chat::Msg { text }) => {
                let from = frame.meta.name;
                let mut effects = vec![self.ack(src, Payload::MsgAck)];
                match self.mode {
                    Mode::Free => effects.push(Effect::Status(format!("{from}: {text}"))),
                    Mode::InGroup(_) => self.inbox.push(InboxEntry { from, text }),
                }
                effects
            }
            Payload::GroupMsg(chat::GroupMsg { group, from, text }) => {
                // Always ACKed, even for a group we are not in: the server
                // retries until someone answers, and a stale roster is its
                // problem to fix, not ours to time out.
                let mut effects = vec![self.ack(
                    src,
                    Payload::GroupMsgAck(chat::GroupMsgAck { group: group.clone() }),
                )];
                if self.mode.group() == Some(group.as_str()) {
                    effects.push(Effect::Plain(format!("Group_Message {from}: {text}")));
                } else {
                    tracing::debug!(%group, %from, "dropping group message for a group we are not in");
                }
                effects
            }
            Payload::Table(table) => {
                // Wholesale replacement, never a merge.
                self.mirror = table.entries;
                vec![
                    self.ack(src, Payload::TableAck),
                    Effect::Status("Client table updated.".to_owned()),
                ]
            }
            other => {
                tracing::warn!(kind = %other.kind(), %src, "dropping unexpected frame kind");
                Vec::new()
            }
        }
    }
}
