//! Chat client for the chatapp protocol.
//!
//! A client registers with the directory server, mirrors the table the
//! server broadcasts, exchanges direct messages peer-to-peer, and exchanges
//! group messages through the server. The interactive surface is a small
//! command grammar gated by the client's mode: `Free` for direct chat and
//! directory commands, `InGroup` for group traffic. Direct messages that
//! arrive while the client sits in a group are buffered in an offline inbox
//! and drained on leaving.
//!
//! [`ClientState`] is the pure core (mode, mirror, inbox, inbound frame
//! handling); [`Session`] runs the command flows over the shared
//! reliability layer; [`run`] wires stdin and signal handling around a
//! session.

mod command;
mod error;
mod output;
mod runtime;
mod state;

pub use command::{parse, Command, InvalidCommand};
pub use error::ClientError;
pub use output::Printer;
pub use runtime::{run, ClientConfig, Flow, Session};
pub use state::{ClientState, Effect, InboxEntry, Mode};
