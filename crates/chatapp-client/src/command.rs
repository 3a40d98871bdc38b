//! The user command grammar, gated by mode.
//!
//! A command typed in the wrong mode is as invalid as an unknown word: no
//! network traffic, just the invalid-command line. The parse result carries
//! everything the session needs; text arguments are rejoined with single
//! spaces.

use crate::state::Mode;

/// A parsed, mode-checked user command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `send <name> <text...>` - direct message to a peer (free mode).
    Send {
        /// Target peer name.
        peer: String,
        /// Message text.
        text: String,
    },
    /// `dereg <name>` - de-register and shut down (free mode).
    Dereg {
        /// Name to de-register; anything but the own name is refused.
        name: String,
    },
    /// `create_group <g>` (free mode).
    CreateGroup {
        /// Group name.
        group: String,
    },
    /// `list_groups` (free mode).
    ListGroups,
    /// `join_group <g>` (free mode).
    JoinGroup {
        /// Group name.
        group: String,
    },
    /// `send_group <text...>` (group mode).
    SendGroup {
        /// Message text.
        text: String,
    },
    /// `list_members` (group mode).
    ListMembers,
    /// `leave_group` (group mode).
    LeaveGroup,
}

/// The line was not an acceptable command in the current mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid command: {word}")]
pub struct InvalidCommand {
    /// The command word, echoed in the invalid-command line.
    pub word: String,
}

/// Parse one user line against the current mode.
///
/// Blank lines parse to `None`. Anything else either yields a command legal
/// in `mode` or an [`InvalidCommand`] carrying the offending word.
pub fn parse(line: &str, mode: &Mode) -> Result<Option<Command>, InvalidCommand> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((&word, args)) = tokens.split_first() else {
        return Ok(None);
    };

    let invalid = || InvalidCommand { word: word.to_owned() };

    let command = match (word, mode) {
        ("send", Mode::Free) => match args.split_first() {
            Some((&peer, text)) if !text.is_empty() => {
                Command::Send { peer: peer.to_owned(), text: text.join(" ") }
            }
            _ => return Err(invalid()),
        },
        ("dereg", Mode::Free) => match args {
            [name] => Command::Dereg { name: (*name).to_owned() },
            _ => return Err(invalid()),
        },
        ("create_group", Mode::Free) => match args {
            [group] => Command::CreateGroup { group: (*group).to_owned() },
            _ => return Err(invalid()),
        },
        ("list_groups", Mode::Free) => match args {
            [] => Command::ListGroups,
            _ => return Err(invalid()),
        },
        ("join_group", Mode::Free) => match args {
            [group] => Command::JoinGroup { group: (*group).to_owned() },
            _ => return Err(invalid()),
        },
        ("send_group", Mode::InGroup(_)) if !args.is_empty() => {
            Command::SendGroup { text: args.join(" ") }
        }
        ("list_members", Mode::InGroup(_)) => match args {
            [] => Command::ListMembers,
            _ => return Err(invalid()),
        },
        ("leave_group", Mode::InGroup(_)) => match args {
            [] => Command::LeaveGroup,
            _ => return Err(invalid()),
        },
        _ => return Err(invalid()),
    };

    Ok(Some(command))
}
