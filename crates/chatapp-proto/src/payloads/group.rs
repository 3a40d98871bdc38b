//! Group-chat payloads: creation, listing, membership, fan-out requests.

use serde::{Deserialize, Serialize};

/// Outcome of a `create_group` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateOutcome {
    /// The group was created.
    Created,
    /// A group with this name already exists.
    AlreadyExists,
}

/// Outcome of a `join_group` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinOutcome {
    /// The requester is now a member (re-joining is a no-op).
    Entered,
    /// No group with this name exists.
    NoSuchGroup,
}

/// Create a group chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGroup {
    /// Group name (unique).
    pub group: String,
}

/// Reply to [`CreateGroup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGroupReply {
    /// Group the request named.
    pub group: String,
    /// Whether the group was created or already existed.
    pub outcome: CreateOutcome,
}

/// Reply to `list_groups`: every group name in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListGroupsReply {
    /// All group names.
    pub groups: Vec<String>,
}

/// Join a group chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGroup {
    /// Group to join.
    pub group: String,
}

/// Reply to [`JoinGroup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGroupReply {
    /// Group the request named.
    pub group: String,
    /// Whether the requester entered the group.
    pub outcome: JoinOutcome,
}

/// Leave a group chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveGroup {
    /// Group to leave.
    pub group: String,
}

/// Reply to [`LeaveGroup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveGroupReply {
    /// Group that was left.
    pub group: String,
}

/// List the members of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMembers {
    /// Group to inspect.
    pub group: String,
}

/// Reply to [`ListMembers`]: the roster in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMembersReply {
    /// Group the request named.
    pub group: String,
    /// Member names.
    pub members: Vec<String>,
}

/// Ask the server to fan a message out to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendGroup {
    /// Target group.
    pub group: String,
    /// Message text.
    pub text: String,
}

/// Reply to [`SendGroup`], sent after the fan-out loop completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendGroupReply {
    /// Group the message was fanned out to.
    pub group: String,
}
