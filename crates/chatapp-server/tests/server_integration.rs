//! End-to-end tests against a live server on localhost UDP.
//!
//! Each test drives the real runtime with raw protocol frames from plain
//! test sockets, acknowledging broadcasts the way a client would. Broadcasts
//! are sequential reliable-sends, so when a registration fans the table out
//! to several clients the test awaits them concurrently with `join!`.
//! Retry schedules are shrunken so eviction paths run in milliseconds.

use std::net::{Ipv4Addr, SocketAddr};

use chatapp_core::{shutdown_channel, RetryPolicy, ShutdownHandle};
use chatapp_proto::{
    payloads::{
        chat,
        directory::{self, Status},
        group::{self, CreateOutcome, JoinOutcome},
    },
    Frame, Identity, Payload, MAX_DATAGRAM,
};
use chatapp_server::{Server, ServerConfig};
use tokio::{
    net::UdpSocket,
    time::{timeout, Duration},
};

const RECV_WINDOW: Duration = Duration::from_secs(2);

async fn start_server() -> (SocketAddr, ShutdownHandle) {
    let config = ServerConfig {
        port: 0,
        retry: RetryPolicy::new(2, Duration::from_millis(100)),
    };
    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (handle, signal) = shutdown_channel();

    tokio::spawn(async move {
        let _ = server.run(signal).await;
    });

    (addr, handle)
}

struct TestClient {
    name: String,
    socket: UdpSocket,
    server: SocketAddr,
}

impl TestClient {
    async fn new(name: &str, server: SocketAddr) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        Self { name: name.to_owned(), socket, server }
    }

    fn identity(&self) -> Identity {
        Identity::new(
            &self.name,
            Ipv4Addr::LOCALHOST,
            self.socket.local_addr().unwrap().port(),
        )
    }

    async fn send(&self, payload: Payload) {
        let frame = Frame::new(payload, self.identity());
        self.socket
            .send_to(&frame.to_bytes().unwrap(), self.server)
            .await
            .unwrap();
    }

    async fn recv(&self) -> Frame {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (len, _) = timeout(RECV_WINDOW, self.socket.recv_from(&mut buf))
            .await
            .expect("no frame within the receive window")
            .unwrap();
        Frame::decode(&buf[..len]).unwrap()
    }

    /// Expect a table broadcast and acknowledge it like a live client.
    async fn expect_table(&self) -> Vec<directory::TableEntry> {
        let frame = self.recv().await;
        let Payload::Table(table) = frame.payload else {
            panic!("expected table broadcast, got {:?}", frame.kind());
        };
        self.send(Payload::TableAck).await;
        table.entries
    }

    /// Register and consume the ack plus the resulting broadcast.
    async fn register(&self) {
        self.send(Payload::Register).await;
        match self.recv().await.payload {
            Payload::RegisterAck(ack) => assert!(ack.ok, "registration rejected"),
            other => panic!("expected register_ack, got {other:?}"),
        }
        self.expect_table().await;
    }

    async fn join(&self, group: &str) {
        self.send(Payload::JoinGroup(group::JoinGroup { group: group.into() }))
            .await;
        match self.recv().await.payload {
            Payload::JoinGroupReply(reply) => assert_eq!(reply.outcome, JoinOutcome::Entered),
            other => panic!("expected join_group_reply, got {other:?}"),
        }
    }
}

/// Register two clients; the first acks the second's broadcast concurrently.
async fn register_pair(server: SocketAddr) -> (TestClient, TestClient) {
    let c1 = TestClient::new("c1", server).await;
    c1.register().await;

    let c2 = TestClient::new("c2", server).await;
    let ((), entries) = tokio::join!(c2.register(), c1.expect_table());
    assert_eq!(entries.len(), 2);

    (c1, c2)
}

#[tokio::test]
async fn register_acks_and_broadcasts_table() {
    let (server, _handle) = start_server().await;
    let c1 = TestClient::new("c1", server).await;

    c1.send(Payload::Register).await;

    match c1.recv().await.payload {
        Payload::RegisterAck(ack) => assert!(ack.ok),
        other => panic!("expected register_ack, got {other:?}"),
    }

    let entries = c1.expect_table().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "c1");
    assert_eq!(entries[0].status, Status::Online);
}

#[tokio::test]
async fn duplicate_name_is_rejected() {
    let (server, _handle) = start_server().await;
    let c1 = TestClient::new("c1", server).await;
    c1.register().await;

    // Different endpoint, same name.
    let impostor = TestClient::new("c1", server).await;
    impostor.send(Payload::Register).await;

    match impostor.recv().await.payload {
        Payload::RegisterAck(ack) => {
            assert!(!ack.ok);
            assert_eq!(ack.reason.as_deref(), Some("exists"));
        }
        other => panic!("expected register_ack, got {other:?}"),
    }
}

#[tokio::test]
async fn name_reuse_is_blocked_after_dereg() {
    let (server, _handle) = start_server().await;
    let c1 = TestClient::new("c1", server).await;
    c1.register().await;

    c1.send(Payload::Dereg(directory::Dereg { name: "c1".into() }))
        .await;
    match c1.recv().await.payload {
        Payload::DeregAck => {}
        other => panic!("expected dereg_ack, got {other:?}"),
    }
    // The record is retained offline; no online client remains, so the
    // broadcast cycle has no recipients and nothing more arrives here.

    // Re-registering the identical tuple is rejected.
    c1.send(Payload::Register).await;
    match c1.recv().await.payload {
        Payload::RegisterAck(ack) => assert!(!ack.ok),
        other => panic!("expected register_ack, got {other:?}"),
    }
}

#[tokio::test]
async fn dereg_of_dead_peer_updates_survivors() {
    let (server, _handle) = start_server().await;
    let (c1, _c2) = register_pair(server).await;

    // c1 reports c2 dead (the post-timeout best-effort dereg).
    c1.send(Payload::Dereg(directory::Dereg { name: "c2".into() }))
        .await;
    match c1.recv().await.payload {
        Payload::DeregAck => {}
        other => panic!("expected dereg_ack, got {other:?}"),
    }

    let entries = c1.expect_table().await;
    let c2_entry = entries.iter().find(|e| e.name == "c2").unwrap();
    assert_eq!(c2_entry.status, Status::Offline);
}

#[tokio::test]
async fn group_round_trip_with_fanout() {
    let (server, _handle) = start_server().await;
    let (c1, c2) = register_pair(server).await;

    c1.send(Payload::CreateGroup(group::CreateGroup { group: "G".into() }))
        .await;
    match c1.recv().await.payload {
        Payload::CreateGroupReply(reply) => assert_eq!(reply.outcome, CreateOutcome::Created),
        other => panic!("expected create_group_reply, got {other:?}"),
    }

    c1.join("G").await;
    c2.join("G").await;

    c1.send(Payload::ListMembers(group::ListMembers { group: "G".into() }))
        .await;
    match c1.recv().await.payload {
        Payload::ListMembersReply(reply) => {
            assert_eq!(reply.members, vec!["c1".to_string(), "c2".to_string()]);
        }
        other => panic!("expected list_members_reply, got {other:?}"),
    }

    c1.send(Payload::SendGroup(group::SendGroup { group: "G".into(), text: "hey".into() }))
        .await;

    // c2 receives the fan-out and acknowledges it.
    let frame = c2.recv().await;
    match frame.payload {
        Payload::GroupMsg(msg) => {
            assert_eq!(msg.group, "G");
            assert_eq!(msg.from, "c1");
            assert_eq!(msg.text, "hey");
        }
        other => panic!("expected group_msg, got {other:?}"),
    }
    c2.send(Payload::GroupMsgAck(chat::GroupMsgAck { group: "G".into() }))
        .await;

    // Only then does c1 get its reply.
    match c1.recv().await.payload {
        Payload::SendGroupReply(reply) => assert_eq!(reply.group, "G"),
        other => panic!("expected send_group_reply, got {other:?}"),
    }
}

#[tokio::test]
async fn unresponsive_member_is_evicted_during_fanout() {
    let (server, _handle) = start_server().await;
    let (c1, c2) = register_pair(server).await;

    c1.send(Payload::CreateGroup(group::CreateGroup { group: "G".into() }))
        .await;
    c1.recv().await;
    c1.join("G").await;
    c2.join("G").await;

    // c2 goes silent from here on.
    c1.send(Payload::SendGroup(group::SendGroup { group: "G".into(), text: "hey".into() }))
        .await;

    // The fan-out times out on c2, evicts it, and rebroadcasts the table
    // before replying to the sender.
    let entries = c1.expect_table().await;
    let c2_entry = entries.iter().find(|e| e.name == "c2").unwrap();
    assert_eq!(c2_entry.status, Status::Offline);

    match c1.recv().await.payload {
        Payload::SendGroupReply(reply) => assert_eq!(reply.group, "G"),
        other => panic!("expected send_group_reply, got {other:?}"),
    }

    // The group no longer lists c2.
    c1.send(Payload::ListMembers(group::ListMembers { group: "G".into() }))
        .await;
    match c1.recv().await.payload {
        Payload::ListMembersReply(reply) => assert_eq!(reply.members, vec!["c1".to_string()]),
        other => panic!("expected list_members_reply, got {other:?}"),
    }
}

#[tokio::test]
async fn frames_from_unknown_senders_are_ignored() {
    let (server, _handle) = start_server().await;
    let ghost = TestClient::new("ghost", server).await;

    ghost.send(Payload::ListGroups).await;

    // No reply comes back for an unregistered name.
    let mut buf = vec![0u8; MAX_DATAGRAM];
    assert!(
        timeout(Duration::from_millis(300), ghost.socket.recv_from(&mut buf))
            .await
            .is_err()
    );

    // The server is still alive and serves a registration afterwards.
    ghost.register().await;
}
