//! Startup argument validation.
//!
//! The diagnostics here are part of the observable surface, down to their
//! exact wording (`` `-s` only accepts <port> `` and friends), so the
//! validation is written out by hand instead of leaning on a parser
//! generator's messages. Ports must fall in 1024-65535; the server address
//! must be IPv4 dotted-decimal.

use std::net::Ipv4Addr;

const HELP: &str = "\
ChatApp allows you to spinup a client and server for UDP based chatting.

Commands:
    -c      Starts client with required server information.
    -s      Starts server mode at specified port

Usage:
    ChatApp [flags] [options]

Use \"ChatApp <command> -h\" for more information about a given command";

const CLIENT_HELP: &str = "\
Starts client with required server information.

Examples:
    # Join the server at 1.2.3.4:5000, listening on 5555
    ChatApp -c alice 1.2.3.4 5000 5555

Options:
    <name>: The unique name to register under.
    <server-ip>: The already running server IPv4 addr.
    <server-port>: The already running server port.
    <client-port>: The port of the listening client.";

const SERVER_HELP: &str = "\
Starts server mode at specified port.

Examples:
    # Start a server on port 5555
    ChatApp -s 5555

Options:
    <port>: The port to serve on UDP.";

/// A validated invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// `-s <port>`
    Server {
        /// Port to serve on.
        port: u16,
    },
    /// `-c <name> <server-ip> <server-port> <client-port>`
    Client {
        /// Client name.
        name: String,
        /// Server IPv4 address.
        server_ip: Ipv4Addr,
        /// Server port.
        server_port: u16,
        /// Own listen port.
        client_port: u16,
    },
}

/// Why the arguments were refused. The `Display` text is the diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgError {
    /// Help was requested (or no mode given); carries the help text.
    #[error("{0}")]
    Usage(String),

    /// `-s` got the wrong number of values.
    #[error("`-s` only accepts <port>")]
    ServerArity,

    /// `-c` got the wrong number of values.
    #[error("`-c` only accepts <name> <server-ip> <server-port> <client-port>")]
    ClientArity,

    /// A port value is not a number in 1024-65535.
    #[error("Invalid <{field}>: {value}; Must be within 1024-65535")]
    InvalidPort {
        /// Which positional was bad (`port`, `server-port`, `client-port`).
        field: &'static str,
        /// The offending text.
        value: String,
    },

    /// The server address is not IPv4 dotted-decimal.
    #[error("Invalid <server-ip>: {0}; Must be IPv4")]
    InvalidServerIp(String),

    /// The first argument is neither `-s` nor `-c`.
    #[error("{0} is not a valid mode")]
    UnknownMode(String),
}

fn parse_port(field: &'static str, value: &str) -> Result<u16, ArgError> {
    let invalid = || ArgError::InvalidPort { field, value: value.to_owned() };

    if !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let port: u32 = value.parse().map_err(|_| invalid())?;
    if !(1024..=65535).contains(&port) {
        return Err(invalid());
    }
    Ok(port as u16)
}

fn parse_server_mode(args: &[String]) -> Result<Invocation, ArgError> {
    if args.iter().any(|a| a == "-h") {
        return Err(ArgError::Usage(SERVER_HELP.to_owned()));
    }
    let [port] = args else {
        return Err(ArgError::ServerArity);
    };

    Ok(Invocation::Server { port: parse_port("port", port)? })
}

fn parse_client_mode(args: &[String]) -> Result<Invocation, ArgError> {
    if args.iter().any(|a| a == "-h") {
        return Err(ArgError::Usage(CLIENT_HELP.to_owned()));
    }
    let [name, server_ip, server_port, client_port] = args else {
        return Err(ArgError::ClientArity);
    };

    let server_ip: Ipv4Addr = server_ip
        .parse()
        .map_err(|_| ArgError::InvalidServerIp(server_ip.clone()))?;

    Ok(Invocation::Client {
        name: name.clone(),
        server_ip,
        server_port: parse_port("server-port", server_port)?,
        client_port: parse_port("client-port", client_port)?,
    })
}

/// Validate the raw arguments (program name already stripped).
///
/// # Errors
///
/// Returns an [`ArgError`] whose `Display` text is the exact diagnostic to
/// print; the caller exits non-zero.
pub fn parse(args: &[String]) -> Result<Invocation, ArgError> {
    let Some((mode, rest)) = args.split_first() else {
        return Err(ArgError::Usage(HELP.to_owned()));
    };

    match mode.as_str() {
        "-s" => parse_server_mode(rest),
        "-c" => parse_client_mode(rest),
        other => Err(ArgError::UnknownMode(other.to_owned())),
    }
}
