//! Async client runtime: session flows over UDP plus the terminal driver.
//!
//! Two tasks beside the driver: the shared listener (receive, decode,
//! ACK-slot routing) and the inbound handler (executes [`Effect`]s from the
//! pure state). The driver reads stdin lines and runs one command flow at a
//! time, so at most one reliable exchange is ever in flight from here.
//! Neither side holds the state lock across an await.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{Arc, Mutex},
};

use chatapp_core::{
    run_listener, shutdown_channel, AckPredicate, AckSlot, ReliableSender, RetryPolicy,
    SendOutcome, ShutdownHandle, ShutdownSignal,
};
use chatapp_proto::{
    payloads::{chat, directory, group},
    Frame, FrameKind, Identity, Payload,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::UdpSocket,
    sync::mpsc,
};

use crate::{
    command::{self, Command},
    error::ClientError,
    output::Printer,
    state::{ClientState, Effect, Mode},
};

/// Depth of the listener-to-handler queue.
const INBOUND_QUEUE: usize = 64;

/// The server's metadata name, used in ACK predicates for server replies.
const SERVER_NAME: &str = "Server";

/// Client startup configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Unique client name.
    pub name: String,
    /// Server address.
    pub server_ip: Ipv4Addr,
    /// Server port.
    pub server_port: u16,
    /// Own listen port.
    pub client_port: u16,
    /// Retry schedule for every reliable exchange.
    pub retry: RetryPolicy,
}

impl ClientConfig {
    /// Default retry schedule with the given endpoints.
    pub fn new(name: impl Into<String>, server_ip: Ipv4Addr, server_port: u16, client_port: u16) -> Self {
        Self {
            name: name.into(),
            server_ip,
            server_port,
            client_port,
            retry: RetryPolicy::default(),
        }
    }

    /// The server's socket address.
    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::from((self.server_ip, self.server_port))
    }
}

/// What the driver loop should do after a dispatched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading commands.
    Continue,
    /// The session ended cleanly (notified leave).
    Quit,
}

/// A registered client session.
///
/// Command flows run on the caller's task; the listener and inbound handler
/// run in the background until shutdown.
pub struct Session {
    state: Arc<Mutex<ClientState>>,
    reliable: ReliableSender,
    printer: Arc<Printer>,
    server: SocketAddr,
    name: String,
    shutdown: ShutdownHandle,
}

impl Session {
    /// Bind, start the background tasks, and register with the server.
    ///
    /// Prints the welcome line on success. On rejection or server silence
    /// the corresponding lines are printed before the error returns.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Bind`] if the listen port cannot be bound
    /// - [`ClientError::NameTaken`] if the server rejects the name
    /// - [`ClientError::ServerUnresponsive`] if registration times out
    pub async fn connect(config: &ClientConfig, printer: Arc<Printer>) -> Result<Self, ClientError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, config.client_port))
            .await
            .map_err(|source| ClientError::Bind { port: config.client_port, source })?;
        let socket = Arc::new(socket);
        let listen_port = socket.local_addr()?.port();

        let server = config.server_addr();
        let local_ip = discover_local_ip(server).await.unwrap_or(Ipv4Addr::LOCALHOST);
        let identity = Identity::new(&config.name, local_ip, listen_port);

        let state = Arc::new(Mutex::new(ClientState::new(identity)));
        let slot = Arc::new(AckSlot::new());
        let reliable = ReliableSender::new(Arc::clone(&socket), Arc::clone(&slot), config.retry);

        let (shutdown, signal) = shutdown_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);
        tokio::spawn(run_listener(socket, slot, inbound_tx, signal.clone()));
        tokio::spawn(handle_inbound(
            inbound_rx,
            Arc::clone(&state),
            reliable.clone(),
            Arc::clone(&printer),
            signal,
        ));

        let session = Self {
            state,
            reliable,
            printer,
            server,
            name: config.name.clone(),
            shutdown,
        };
        session.register().await?;
        Ok(session)
    }

    /// Current mode (for the prompt and tests).
    pub fn mode(&self) -> Mode {
        self.state.lock().expect("client state mutex poisoned").mode()
    }

    /// Show the prompt for the current mode.
    pub fn prompt(&self) {
        self.printer.prompt(&self.mode());
    }

    /// Silent leave: stop the listener, send nothing.
    ///
    /// The server finds out at its next delivery attempt, which times out
    /// and evicts us.
    pub fn silent_leave(&self) {
        self.shutdown.shutdown();
    }

    fn frame(&self, payload: Payload) -> Frame {
        let identity = self
            .state
            .lock()
            .expect("client state mutex poisoned")
            .identity()
            .clone();
        Frame::new(payload, identity)
    }

    fn server_lost<T>(&self, mode: &Mode) -> Result<T, ClientError> {
        self.printer.status(mode, "Server not responding");
        self.printer.status(mode, "Exiting");
        self.shutdown.shutdown();
        Err(ClientError::ServerUnresponsive)
    }

    async fn register(&self) -> Result<(), ClientError> {
        let frame = self.frame(Payload::Register);
        let outcome = self
            .reliable
            .send(
                self.server,
                &frame,
                AckPredicate::new(FrameKind::RegisterAck).from_name(SERVER_NAME),
            )
            .await?;

        match outcome {
            SendOutcome::Delivered(reply) => {
                if let Payload::RegisterAck(ack) = reply.payload {
                    if ack.ok {
                        self.printer.status(&Mode::Free, "Welcome, You are registered.");
                        return Ok(());
                    }
                    self.printer
                        .status(&Mode::Free, &format!("`{}` already exists!", self.name));
                    self.shutdown.shutdown();
                    return Err(ClientError::NameTaken);
                }
                self.server_lost(&Mode::Free)
            }
            SendOutcome::TimedOut => self.server_lost(&Mode::Free),
        }
    }

    /// Reliable server exchange; the timeout path exits the client.
    async fn server_request(
        &self,
        mode: &Mode,
        payload: Payload,
        predicate: AckPredicate,
    ) -> Result<Frame, ClientError> {
        let frame = self.frame(payload);
        match self.reliable.send(self.server, &frame, predicate).await? {
            SendOutcome::Delivered(reply) => Ok(reply),
            SendOutcome::TimedOut => self.server_lost(mode),
        }
    }

    /// Parse and run one user line.
    ///
    /// # Errors
    ///
    /// - [`ClientError::ServerUnresponsive`] if a server exchange timed out
    ///   (the exit lines are already printed)
    /// - [`ClientError::Net`] on local socket failure
    pub async fn dispatch(&self, line: &str) -> Result<Flow, ClientError> {
        let mode = self.mode();
        let parsed = match command::parse(line, &mode) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(Flow::Continue),
            Err(invalid) => {
                self.printer
                    .status(&mode, &format!("Invalid command: {}", invalid.word));
                return Ok(Flow::Continue);
            }
        };

        match parsed {
            Command::Send { peer, text } => self.send_direct(&mode, &peer, text).await,
            Command::Dereg { name } => self.dereg(&mode, name).await,
            Command::CreateGroup { group } => self.create_group(&mode, group).await,
            Command::ListGroups => self.list_groups(&mode).await,
            Command::JoinGroup { group } => self.join_group(&mode, group).await,
            Command::SendGroup { text } => self.send_group(&mode, text).await,
            Command::ListMembers => self.list_members(&mode).await,
            Command::LeaveGroup => self.leave_group(&mode).await,
        }
    }

    async fn send_direct(&self, mode: &Mode, peer: &str, text: String) -> Result<Flow, ClientError> {
        let target = self
            .state
            .lock()
            .expect("client state mutex poisoned")
            .resolve_peer(peer);
        let Some(addr) = target else {
            self.printer.status(mode, &format!("Unknown peer {peer}"));
            return Ok(Flow::Continue);
        };

        let frame = self.frame(Payload::Msg(chat::Msg { text }));
        let outcome = self
            .reliable
            .send(addr, &frame, AckPredicate::new(FrameKind::MsgAck).from_name(peer))
            .await?;

        match outcome {
            SendOutcome::Delivered(_) => {
                self.printer.status(mode, &format!("Message received by {peer}"));
            }
            SendOutcome::TimedOut => {
                self.printer
                    .status(mode, &format!("No ACK from {peer}, message not delivered"));

                // Best effort: ask the server to take the dead peer offline.
                // Whatever happens to this exchange, we carry on.
                let dereg = self.frame(Payload::Dereg(directory::Dereg { name: peer.to_owned() }));
                if let Err(e) = self
                    .reliable
                    .send(
                        self.server,
                        &dereg,
                        AckPredicate::new(FrameKind::DeregAck).from_name(SERVER_NAME),
                    )
                    .await
                {
                    tracing::warn!(error = %e, peer, "peer dereg request failed");
                }
            }
        }
        Ok(Flow::Continue)
    }

    async fn dereg(&self, mode: &Mode, name: String) -> Result<Flow, ClientError> {
        if name != self.name {
            self.printer.status(mode, "You can only deregister yourself.");
            return Ok(Flow::Continue);
        }

        let frame = self.frame(Payload::Dereg(directory::Dereg { name }));
        let outcome = self
            .reliable
            .send(
                self.server,
                &frame,
                AckPredicate::new(FrameKind::DeregAck).from_name(SERVER_NAME),
            )
            .await?;

        match outcome {
            SendOutcome::Delivered(_) => {
                self.printer.status(mode, "You are Offline. Bye.");
                self.shutdown.shutdown();
                Ok(Flow::Quit)
            }
            SendOutcome::TimedOut => self.server_lost(mode),
        }
    }

    async fn create_group(&self, mode: &Mode, group: String) -> Result<Flow, ClientError> {
        let reply = self
            .server_request(
                mode,
                Payload::CreateGroup(group::CreateGroup { group: group.clone() }),
                AckPredicate::new(FrameKind::CreateGroupReply)
                    .from_name(SERVER_NAME)
                    .in_group(&group),
            )
            .await?;

        if let Payload::CreateGroupReply(reply) = reply.payload {
            match reply.outcome {
                group::CreateOutcome::Created => {
                    self.printer
                        .status(mode, &format!("Group {group} created by Server."));
                }
                group::CreateOutcome::AlreadyExists => {
                    self.printer
                        .status(mode, &format!("Group {group} already exists."));
                }
            }
        }
        Ok(Flow::Continue)
    }

    async fn list_groups(&self, mode: &Mode) -> Result<Flow, ClientError> {
        let reply = self
            .server_request(
                mode,
                Payload::ListGroups,
                AckPredicate::new(FrameKind::ListGroupsReply).from_name(SERVER_NAME),
            )
            .await?;

        if let Payload::ListGroupsReply(reply) = reply.payload {
            self.printer.status(mode, "Available group chats:");
            for name in reply.groups {
                self.printer.status(mode, &name);
            }
        }
        Ok(Flow::Continue)
    }

    async fn join_group(&self, mode: &Mode, group: String) -> Result<Flow, ClientError> {
        let reply = self
            .server_request(
                mode,
                Payload::JoinGroup(group::JoinGroup { group: group.clone() }),
                AckPredicate::new(FrameKind::JoinGroupReply)
                    .from_name(SERVER_NAME)
                    .in_group(&group),
            )
            .await?;

        if let Payload::JoinGroupReply(reply) = reply.payload {
            match reply.outcome {
                group::JoinOutcome::Entered => {
                    self.state
                        .lock()
                        .expect("client state mutex poisoned")
                        .enter_group(&group);
                    self.printer.status(
                        &Mode::InGroup(group.clone()),
                        &format!("Entered group {group} successfully!"),
                    );
                }
                group::JoinOutcome::NoSuchGroup => {
                    self.printer
                        .status(mode, &format!("Group {group} does not exist."));
                }
            }
        }
        Ok(Flow::Continue)
    }

    async fn send_group(&self, mode: &Mode, text: String) -> Result<Flow, ClientError> {
        let Some(group) = mode.group().map(str::to_owned) else {
            return Ok(Flow::Continue);
        };

        self.server_request(
            mode,
            Payload::SendGroup(group::SendGroup { group: group.clone(), text }),
            AckPredicate::new(FrameKind::SendGroupReply)
                .from_name(SERVER_NAME)
                .in_group(&group),
        )
        .await?;

        self.printer.status(mode, "Message received by Server.");
        Ok(Flow::Continue)
    }

    async fn list_members(&self, mode: &Mode) -> Result<Flow, ClientError> {
        let Some(group) = mode.group().map(str::to_owned) else {
            return Ok(Flow::Continue);
        };

        let reply = self
            .server_request(
                mode,
                Payload::ListMembers(group::ListMembers { group: group.clone() }),
                AckPredicate::new(FrameKind::ListMembersReply)
                    .from_name(SERVER_NAME)
                    .in_group(&group),
            )
            .await?;

        if let Payload::ListMembersReply(reply) = reply.payload {
            self.printer
                .status(mode, &format!("Members in the group {group}:"));
            for member in reply.members {
                self.printer.status(mode, &member);
            }
        }
        Ok(Flow::Continue)
    }

    async fn leave_group(&self, mode: &Mode) -> Result<Flow, ClientError> {
        let Some(group) = mode.group().map(str::to_owned) else {
            return Ok(Flow::Continue);
        };

        self.server_request(
            mode,
            Payload::LeaveGroup(group::LeaveGroup { group: group.clone() }),
            AckPredicate::new(FrameKind::LeaveGroupReply)
                .from_name(SERVER_NAME)
                .in_group(&group),
        )
        .await?;

        let drained = self
            .state
            .lock()
            .expect("client state mutex poisoned")
            .leave_group();

        self.printer
            .status(&Mode::Free, &format!("Leave group chat {group}"));
        for entry in drained {
            self.printer
                .status(&Mode::Free, &format!(">>> {}: {}", entry.from, entry.text));
        }
        Ok(Flow::Continue)
    }
}

/// Executes effects from the pure state for every inbound frame.
async fn handle_inbound(
    mut inbound: mpsc::Receiver<(Frame, SocketAddr)>,
    state: Arc<Mutex<ClientState>>,
    reliable: ReliableSender,
    printer: Arc<Printer>,
    mut signal: ShutdownSignal,
) {
    loop {
        let (frame, src) = tokio::select! {
            () = signal.recv() => break,
            received = inbound.recv() => match received {
                Some(pair) => pair,
                None => break,
            },
        };

        let (effects, mode) = {
            let mut state = state.lock().expect("client state mutex poisoned");
            let effects = state.handle_frame(frame, src);
            (effects, state.mode())
        };

        for effect in effects {
            match effect {
                Effect::Ack { dest, frame } => {
                    if let Err(e) = reliable.send_plain(dest, &frame).await {
                        tracing::warn!(%dest, error = %e, "ack send failed");
                    }
                }
                Effect::Status(text) => printer.status(&mode, &text),
                Effect::Plain(text) => printer.plain(&mode, &text),
            }
        }
    }
}

/// Find the local IPv4 address a packet to `server` would leave from.
async fn discover_local_ip(server: SocketAddr) -> Option<Ipv4Addr> {
    let probe = UdpSocket::bind("0.0.0.0:0").await.ok()?;
    probe.connect(server).await.ok()?;
    match probe.local_addr().ok()?.ip() {
        IpAddr::V4(ip) => Some(ip),
        IpAddr::V6(_) => None,
    }
}

/// Run the interactive client until it leaves, notified or silent.
///
/// The first interrupt is a silent leave: stop the listener, close the
/// socket, send nothing. Further interrupts land on the already-installed
/// handler and are absorbed.
///
/// # Errors
///
/// See [`Session::connect`] and [`Session::dispatch`]; either way the
/// user-facing lines are printed before the error returns.
pub async fn run(config: ClientConfig) -> Result<(), ClientError> {
    let printer = Arc::new(Printer::stdout());
    let session = Session::connect(&config, printer).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        session.prompt();
        tokio::select! {
            interrupt = tokio::signal::ctrl_c() => {
                if let Err(e) = interrupt {
                    tracing::warn!(error = %e, "interrupt handler unavailable");
                }
                session.silent_leave();
                return Ok(());
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => match session.dispatch(&line).await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Quit) => return Ok(()),
                    Err(e @ ClientError::ServerUnresponsive) => return Err(e),
                    Err(e) => {
                        session.silent_leave();
                        return Err(e);
                    }
                },
                // EOF on stdin behaves like an interrupt: silent leave.
                Ok(None) => {
                    session.silent_leave();
                    return Ok(());
                }
                Err(e) => {
                    session.silent_leave();
                    return Err(ClientError::Io(e));
                }
            }
        }
    }
}
