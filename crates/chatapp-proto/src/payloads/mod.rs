//! CBOR-encoded payload types.
//!
//! The [`Payload`] enum covers all message types: directory operations
//! (register, dereg, table broadcast), direct chat, and group chat. It is
//! adjacently tagged, so the variant tag is the frame's `type` field on the
//! wire and the variant content is its `payload` field. Unit variants
//! (plain requests and ACKs) carry no `payload` at all.

pub mod chat;
pub mod directory;
pub mod group;

use serde::{Deserialize, Serialize};

use crate::kind::FrameKind;

/// All possible frame payloads.
///
/// # Invariants
///
/// - Each variant corresponds to exactly one [`FrameKind`]; [`Payload::kind`]
///   is total and exhaustive, so adding a variant without a kind is a
///   compile error.
/// - Round-trip encoding must produce an equivalent value (verified by the
///   frame property tests).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Payload {
    // Directory
    /// Request to join; the identity is in the frame metadata.
    Register,
    /// Acceptance or duplicate-name rejection.
    RegisterAck(directory::RegisterAck),
    /// Voluntary de-registration (or best-effort eviction of a dead peer).
    Dereg(directory::Dereg),
    /// Acknowledges a de-registration.
    DeregAck,
    /// Full table snapshot, broadcast on membership change.
    Table(directory::Table),
    /// Acknowledges a table broadcast.
    TableAck,

    // Direct chat
    /// Direct unicast message.
    Msg(chat::Msg),
    /// Acknowledges a direct message.
    MsgAck,

    // Group chat
    /// Create a group.
    CreateGroup(group::CreateGroup),
    /// Reply to `CreateGroup`.
    CreateGroupReply(group::CreateGroupReply),
    /// List all groups.
    ListGroups,
    /// Reply to `ListGroups`.
    ListGroupsReply(group::ListGroupsReply),
    /// Join a group.
    JoinGroup(group::JoinGroup),
    /// Reply to `JoinGroup`.
    JoinGroupReply(group::JoinGroupReply),
    /// Leave a group.
    LeaveGroup(group::LeaveGroup),
    /// Reply to `LeaveGroup`.
    LeaveGroupReply(group::LeaveGroupReply),
    /// List the members of a group.
    ListMembers(group::ListMembers),
    /// Reply to `ListMembers`.
    ListMembersReply(group::ListMembersReply),
    /// Fan a message out to a group via the server.
    SendGroup(group::SendGroup),
    /// Reply to `SendGroup` once the fan-out loop completes.
    SendGroupReply(group::SendGroupReply),
    /// Fan-out delivery of a group message.
    GroupMsg(chat::GroupMsg),
    /// Recipient ACK for a group message.
    GroupMsgAck(chat::GroupMsgAck),
}

impl Payload {
    /// Kind tag corresponding to this payload.
    pub const fn kind(&self) -> FrameKind {
        match self {
            Self::Register => FrameKind::Register,
            Self::RegisterAck(_) => FrameKind::RegisterAck,
            Self::Dereg(_) => FrameKind::Dereg,
            Self::DeregAck => FrameKind::DeregAck,
            Self::Table(_) => FrameKind::Table,
            Self::TableAck => FrameKind::TableAck,
            Self::Msg(_) => FrameKind::Msg,
            Self::MsgAck => FrameKind::MsgAck,
            Self::CreateGroup(_) => FrameKind::CreateGroup,
            Self::CreateGroupReply(_) => FrameKind::CreateGroupReply,
            Self::ListGroups => FrameKind::ListGroups,
            Self::ListGroupsReply(_) => FrameKind::ListGroupsReply,
            Self::JoinGroup(_) => FrameKind::JoinGroup,
            Self::JoinGroupReply(_) => FrameKind::JoinGroupReply,
            Self::LeaveGroup(_) => FrameKind::LeaveGroup,
            Self::LeaveGroupReply(_) => FrameKind::LeaveGroupReply,
            Self::ListMembers(_) => FrameKind::ListMembers,
            Self::ListMembersReply(_) => FrameKind::ListMembersReply,
            Self::SendGroup(_) => FrameKind::SendGroup,
            Self::SendGroupReply(_) => FrameKind::SendGroupReply,
            Self::GroupMsg(_) => FrameKind::GroupMsg,
            Self::GroupMsgAck(_) => FrameKind::GroupMsgAck,
        }
    }

    /// Group name carried by this payload, if any.
    ///
    /// ACK predicates use this to match group-scoped acknowledgements
    /// (`group_msg_ack`, the group replies) to the exchange that awaits them.
    pub fn group(&self) -> Option<&str> {
        match self {
            Self::CreateGroup(p) => Some(&p.group),
            Self::CreateGroupReply(p) => Some(&p.group),
            Self::JoinGroup(p) => Some(&p.group),
            Self::JoinGroupReply(p) => Some(&p.group),
            Self::LeaveGroup(p) => Some(&p.group),
            Self::LeaveGroupReply(p) => Some(&p.group),
            Self::ListMembers(p) => Some(&p.group),
            Self::ListMembersReply(p) => Some(&p.group),
            Self::SendGroup(p) => Some(&p.group),
            Self::SendGroupReply(p) => Some(&p.group),
            Self::GroupMsg(p) => Some(&p.group),
            Self::GroupMsgAck(p) => Some(&p.group),
            _ => None,
        }
    }
}
