//! Frame kind tags.

use std::fmt;

/// Fieldless mirror of every [`crate::Payload`] variant.
///
/// Used to key ACK-predicate matching and handler dispatch without holding
/// payload data. The wire tag of each kind is its snake_case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Client requests to join the directory.
    Register,
    /// Server accepts or rejects a registration.
    RegisterAck,
    /// Client de-registers a name (its own, or a dead peer on its behalf).
    Dereg,
    /// Server acknowledges a de-registration.
    DeregAck,
    /// Full registration-table broadcast.
    Table,
    /// Client acknowledges a table broadcast.
    TableAck,
    /// Direct peer-to-peer message.
    Msg,
    /// Peer acknowledges a direct message.
    MsgAck,
    /// Create a group chat.
    CreateGroup,
    /// Reply to `CreateGroup`.
    CreateGroupReply,
    /// List all group chats.
    ListGroups,
    /// Reply to `ListGroups`.
    ListGroupsReply,
    /// Join a group chat.
    JoinGroup,
    /// Reply to `JoinGroup`.
    JoinGroupReply,
    /// Leave a group chat.
    LeaveGroup,
    /// Reply to `LeaveGroup`.
    LeaveGroupReply,
    /// List the members of a group.
    ListMembers,
    /// Reply to `ListMembers`.
    ListMembersReply,
    /// Ask the server to fan a message out to a group.
    SendGroup,
    /// Reply to `SendGroup` after the fan-out completes.
    SendGroupReply,
    /// Server-delivered group message.
    GroupMsg,
    /// Recipient acknowledges a group message.
    GroupMsgAck,
}

impl FrameKind {
    /// Wire tag of this kind (the serde variant tag).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::RegisterAck => "register_ack",
            Self::Dereg => "dereg",
            Self::DeregAck => "dereg_ack",
            Self::Table => "table",
            Self::TableAck => "table_ack",
            Self::Msg => "msg",
            Self::MsgAck => "msg_ack",
            Self::CreateGroup => "create_group",
            Self::CreateGroupReply => "create_group_reply",
            Self::ListGroups => "list_groups",
            Self::ListGroupsReply => "list_groups_reply",
            Self::JoinGroup => "join_group",
            Self::JoinGroupReply => "join_group_reply",
            Self::LeaveGroup => "leave_group",
            Self::LeaveGroupReply => "leave_group_reply",
            Self::ListMembers => "list_members",
            Self::ListMembersReply => "list_members_reply",
            Self::SendGroup => "send_group",
            Self::SendGroupReply => "send_group_reply",
            Self::GroupMsg => "group_msg",
            Self::GroupMsgAck => "group_msg_ack",
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
