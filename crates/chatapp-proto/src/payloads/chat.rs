//! Chat payloads: direct unicast and group fan-out delivery.

use serde::{Deserialize, Serialize};

/// Direct peer-to-peer message. The sender is the frame metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Msg {
    /// Message text.
    pub text: String,
}

/// Group message delivered by the server to one group member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMsg {
    /// Group the message belongs to.
    pub group: String,
    /// Name of the original sender.
    pub from: String,
    /// Message text.
    pub text: String,
}

/// Recipient acknowledgement of a [`GroupMsg`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMsgAck {
    /// Group the acknowledged message belonged to.
    pub group: String,
}
