//! Async server runtime: executes driver actions over UDP.
//!
//! One listener task feeds inbound frames (and ACK candidates) from the
//! socket; the driver loop here processes them strictly one at a time, so
//! directory updates are serialized and every broadcast a handler requests
//! completes before the next frame is handled.

use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};

use chatapp_core::{
    run_listener, AckPredicate, AckSlot, ReliableSender, RetryPolicy, SendOutcome, ShutdownSignal,
};
use chatapp_proto::{
    payloads::{chat, directory, group},
    Frame, FrameKind, Identity, Payload,
};
use tokio::{net::UdpSocket, sync::mpsc};

use crate::{
    driver::{ServerAction, ServerDriver},
    error::ServerError,
};

/// Depth of the listener-to-driver queue. Frames arriving while the driver
/// is mid-broadcast wait here.
const INBOUND_QUEUE: usize = 64;

/// Server configuration.
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    /// UDP port to serve on.
    pub port: u16,
    /// Retry schedule for broadcasts and fan-outs.
    pub retry: RetryPolicy,
}

impl ServerConfig {
    /// Default schedule on the given port.
    pub fn new(port: u16) -> Self {
        Self { port, retry: RetryPolicy::default() }
    }
}

/// A bound directory server, ready to run.
pub struct Server {
    socket: Arc<UdpSocket>,
    slot: Arc<AckSlot>,
    reliable: ReliableSender,
    driver: ServerDriver,
    identity: Identity,
}

impl Server {
    /// Bind the server socket.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the port cannot be bound.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, config.port))
            .await
            .map_err(|source| ServerError::Bind { port: config.port, source })?;
        let socket = Arc::new(socket);

        let port = socket.local_addr()?.port();
        let identity = Identity::new("Server", Ipv4Addr::UNSPECIFIED, port);

        let slot = Arc::new(AckSlot::new());
        let reliable = ReliableSender::new(Arc::clone(&socket), Arc::clone(&slot), config.retry);

        tracing::info!(port, "server started");

        Ok(Self {
            socket,
            slot,
            reliable,
            driver: ServerDriver::new(identity.clone()),
            identity,
        })
    }

    /// Address the server is bound to.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the socket address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.socket.local_addr()?)
    }

    /// Serve until the shutdown signal fires.
    ///
    /// Handler failures are logged and never tear the loop down; only
    /// shutdown (or the listener vanishing) ends it. The socket closes when
    /// the last task holding it exits.
    pub async fn run(mut self, mut shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let (inbound_tx, mut inbound_rx) = mpsc::channel(INBOUND_QUEUE);
        let listener = tokio::spawn(run_listener(
            Arc::clone(&self.socket),
            Arc::clone(&self.slot),
            inbound_tx,
            shutdown.clone(),
        ));

        loop {
            let (frame, src) = tokio::select! {
                () = shutdown.recv() => break,
                received = inbound_rx.recv() => match received {
                    Some(pair) => pair,
                    None => break,
                },
            };

            for action in self.driver.handle_frame(frame, src) {
                self.execute(action).await;
            }
        }

        listener.abort();
        let _ = listener.await;
        tracing::info!("server stopped");
        Ok(())
    }

    async fn execute(&mut self, action: ServerAction) {
        match action {
            ServerAction::Reply { dest, frame } => {
                if let Err(e) = self.reliable.send_plain(dest, &frame).await {
                    tracing::warn!(%dest, error = %e, "reply send failed");
                }
            }
            ServerAction::Broadcast => self.broadcast_until_stable().await,
            ServerAction::Fanout { group, from, text, reply_to } => {
                self.fan_out(&group, &from, &text, reply_to).await;
            }
        }
    }

    /// One table-broadcast discipline.
    ///
    /// Each cycle sends the current snapshot to every online client;
    /// recipients that time out are evicted, which changes the table and
    /// forces another cycle. Converges because the online set strictly
    /// shrinks on every repeat.
    async fn broadcast_until_stable(&mut self) {
        loop {
            let entries = self.driver.directory().snapshot();
            let recipients = self.driver.directory().online_clients();
            tracing::info!(clients = entries.len(), online = recipients.len(), "table updated");

            let frame = Frame::new(
                Payload::Table(directory::Table { entries }),
                self.server_identity(),
            );

            let mut evicted = false;
            for (name, addr) in recipients {
                match self
                    .reliable
                    .send(
                        addr,
                        &frame,
                        AckPredicate::new(FrameKind::TableAck).from_name(&name),
                    )
                    .await
                {
                    Ok(SendOutcome::Delivered(_)) => {}
                    Ok(SendOutcome::TimedOut) => {
                        evicted |= self.driver.evict(&name);
                    }
                    Err(e) => tracing::warn!(%name, error = %e, "table send failed"),
                }
            }

            if !evicted {
                break;
            }
        }
    }

    /// Deliver a group message to every member except the sender.
    ///
    /// Members that time out are dropped from the group and evicted from the
    /// table; the updated table goes out before the sender gets its reply.
    async fn fan_out(&mut self, group: &str, from: &str, text: &str, reply_to: SocketAddr) {
        let recipients = self.driver.directory().recipients(group, from);
        let mut table_changed = false;

        for (name, addr) in recipients {
            let frame = Frame::new(
                Payload::GroupMsg(chat::GroupMsg {
                    group: group.to_owned(),
                    from: from.to_owned(),
                    text: text.to_owned(),
                }),
                self.server_identity(),
            );

            match self
                .reliable
                .send(
                    addr,
                    &frame,
                    AckPredicate::new(FrameKind::GroupMsgAck)
                        .from_name(&name)
                        .in_group(group),
                )
                .await
            {
                Ok(SendOutcome::Delivered(_)) => {}
                Ok(SendOutcome::TimedOut) => {
                    tracing::info!(%name, %group, "group member unresponsive, dropping");
                    self.driver.drop_from_group(group, &name);
                    table_changed |= self.driver.evict(&name);
                }
                Err(e) => tracing::warn!(%name, error = %e, "group message send failed"),
            }
        }

        if table_changed {
            self.broadcast_until_stable().await;
        }

        let reply = Frame::new(
            Payload::SendGroupReply(group::SendGroupReply { group: group.to_owned() }),
            self.server_identity(),
        );
        if let Err(e) = self.reliable.send_plain(reply_to, &reply).await {
            tracing::warn!(%reply_to, error = %e, "send_group reply failed");
        }
    }

    fn server_identity(&self) -> Identity {
        self.identity.clone()
    }
}
