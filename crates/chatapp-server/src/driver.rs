//! Frame handlers: inbound frame in, actions out.
//!
//! [`ServerDriver::handle_frame`] is the single logical mutator. It runs on
//! one task, inspects and mutates the [`Directory`], and describes what I/O
//! must happen as [`ServerAction`]s for the runtime to execute. Keeping the
//! handlers free of sockets is what lets every table rule be unit tested.
//!
//! Senders retransmit on timeout, so every handler must be safe under
//! duplicate delivery: registration has an explicit duplicate case,
//! join/leave are set operations, create is conditional.

use std::net::SocketAddr;

use chatapp_proto::{
    payloads::{directory, group},
    Frame, Identity, Payload,
};

use crate::directory::{Directory, RegisterOutcome};

/// I/O the runtime must perform after a handler ran.
#[derive(Debug)]
pub enum ServerAction {
    /// Send a single frame. Replies and ACKs are never reliable-sent; they
    /// are themselves the acknowledgement of the client's exchange.
    Reply {
        /// Destination address (the request's observed source).
        dest: SocketAddr,
        /// Frame to send.
        frame: Frame,
    },

    /// Run one table-broadcast discipline: reliable-send the full table to
    /// every online client, evicting recipients that time out, until the
    /// online set is stable.
    Broadcast,

    /// Deliver a group message to every member except the sender, then
    /// reply to the sender.
    Fanout {
        /// Target group.
        group: String,
        /// Original sender's name.
        from: String,
        /// Message text.
        text: String,
        /// Where the `send_group_reply` goes once the loop completes.
        reply_to: SocketAddr,
    },
}

/// Sans-IO server state machine.
pub struct ServerDriver {
    directory: Directory,
    identity: Identity,
}

impl ServerDriver {
    /// Create a driver that stamps outbound frames with `identity`.
    pub fn new(identity: Identity) -> Self {
        Self { directory: Directory::new(), identity }
    }

    /// Authoritative membership state.
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Take `name` offline after a delivery timeout.
    ///
    /// Returns `true` if the table content changed (a broadcast is due).
    pub fn evict(&mut self, name: &str) -> bool {
        let changed = self.directory.set_offline(name);
        if changed {
            tracing::info!(name, "client evicted after delivery timeout");
        }
        changed
    }

    /// Remove a fan-out recipient that timed out from the group.
    pub fn drop_from_group(&mut self, group: &str, member: &str) {
        self.directory.leave_group(group, member);
    }

    fn frame(&self, payload: Payload) -> Frame {
        Frame::new(payload, self.identity.clone())
    }

    /// Process one inbound frame.
    pub fn handle_frame(&mut self, frame: Frame, src: SocketAddr) -> Vec<ServerAction> {
        let sender = frame.meta.name.clone();

        // Registration is open to anyone. Dereg retransmits may arrive after
        // the sender already went offline, so those only need a known name.
        // Everything else requires a live registration: an evicted client is
        // a zombie and must not reach the group registry.
        let permitted = match &frame.payload {
            Payload::Register => true,
            Payload::Dereg(_) => self.directory.knows(&sender),
            _ => self.directory.is_online(&sender),
        };
        if !permitted {
            tracing::warn!(name = %sender, %src, kind = %frame.kind(), "dropping frame from unknown or offline sender");
            return Vec::new();
        }

        match frame.payload {
            Payload::Register => self.handle_register(&frame.meta, src),
            Payload::Dereg(directory::Dereg { name }) => self.handle_dereg(&sender, &name, src),
            Payload::CreateGroup(group::CreateGroup { group }) => {
                let outcome = self.directory.create_group(&group);
                tracing::info!(%group, requester = %sender, ?outcome, "create_group");
                vec![ServerAction::Reply {
                    dest: src,
                    frame: self.frame(Payload::CreateGroupReply(group::CreateGroupReply {
                        group,
                        outcome,
                    })),
                }]
            }
            Payload::ListGroups => vec![ServerAction::Reply {
                dest: src,
                frame: self.frame(Payload::ListGroupsReply(group::ListGroupsReply {
                    groups: self.directory.group_names(),
                })),
            }],
            Payload::JoinGroup(group::JoinGroup { group }) => {
                let outcome = self.directory.join_group(&group, &sender);
                tracing::info!(%group, member = %sender, ?outcome, "join_group");
                vec![ServerAction::Reply {
                    dest: src,
                    frame: self
                        .frame(Payload::JoinGroupReply(group::JoinGroupReply { group, outcome })),
                }]
            }
            Payload::LeaveGroup(group::LeaveGroup { group }) => {
                self.directory.leave_group(&group, &sender);
                tracing::info!(%group, member = %sender, "leave_group");
                vec![ServerAction::Reply {
                    dest: src,
                    frame: self.frame(Payload::LeaveGroupReply(group::LeaveGroupReply { group })),
                }]
            }
            Payload::ListMembers(group::ListMembers { group }) => {
                let members = self.directory.members(&group).unwrap_or_default();
                vec![ServerAction::Reply {
                    dest: src,
                    frame: self.frame(Payload::ListMembersReply(group::ListMembersReply {
                        group,
                        members,
                    })),
                }]
            }
            Payload::SendGroup(group::SendGroup { group, text }) => {
                tracing::info!(%group, from = %sender, "send_group fan-out");
                vec![ServerAction::Fanout { group, from: sender, text, reply_to: src }]
            }
            other => {
                // Client-bound frames and stray ACKs have no business here.
                tracing::warn!(kind = %other.kind(), %src, "dropping unexpected frame kind");
                Vec::new()
            }
        }
    }

    fn handle_register(&mut self, meta: &Identity, src: SocketAddr) -> Vec<ServerAction> {
        match self.directory.register(&meta.name, meta.ip, meta.port) {
            RegisterOutcome::Registered => {
                tracing::info!(name = %meta.name, endpoint = %meta.endpoint(), "client registered");
                vec![
                    ServerAction::Reply {
                        dest: src,
                        frame: self.frame(Payload::RegisterAck(directory::RegisterAck::accepted())),
                    },
                    ServerAction::Broadcast,
                ]
            }
            RegisterOutcome::DuplicateOnline => vec![ServerAction::Reply {
                dest: src,
                frame: self.frame(Payload::RegisterAck(directory::RegisterAck::accepted())),
            }],
            RegisterOutcome::NameTaken => {
                tracing::info!(name = %meta.name, "registration rejected: name exists");
                vec![ServerAction::Reply {
                    dest: src,
                    frame: self
                        .frame(Payload::RegisterAck(directory::RegisterAck::rejected("exists"))),
                }]
            }
        }
    }

    /// De-registration: voluntary for `name == sender`, best-effort peer
    /// eviction otherwise. The record is retained offline so the name stays
    /// reserved; either way the requester gets its ACK.
    fn handle_dereg(&mut self, sender: &str, name: &str, src: SocketAddr) -> Vec<ServerAction> {
        let changed = self.directory.set_offline(name);
        tracing::info!(name, requester = %sender, changed, "deregistered");

        let mut actions = vec![ServerAction::Reply {
            dest: src,
            frame: self.frame(Payload::DeregAck),
        }];
        if changed {
            actions.push(ServerAction::Broadcast);
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use chatapp_proto::payloads::{
        directory::Status,
        group::{CreateOutcome, JoinOutcome},
    };

    use super::*;

    const SERVER_PORT: u16 = 5000;

    fn driver() -> ServerDriver {
        ServerDriver::new(Identity::new("Server", Ipv4Addr::UNSPECIFIED, SERVER_PORT))
    }

    fn ident(name: &str, port: u16) -> Identity {
        Identity::new(name, Ipv4Addr::LOCALHOST, port)
    }

    fn src(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn register(driver: &mut ServerDriver, name: &str, port: u16) -> Vec<ServerAction> {
        driver.handle_frame(Frame::new(Payload::Register, ident(name, port)), src(port))
    }

    fn request(driver: &mut ServerDriver, name: &str, port: u16, payload: Payload) -> Vec<ServerAction> {
        driver.handle_frame(Frame::new(payload, ident(name, port)), src(port))
    }

    fn reply_payload(action: &ServerAction) -> &Payload {
        match action {
            ServerAction::Reply { frame, .. } => &frame.payload,
            other => panic!("expected reply, got {other:?}"),
        }
    }

    #[test]
    fn register_acks_and_broadcasts() {
        let mut driver = driver();

        let actions = register(&mut driver, "alice", 6000);

        assert_eq!(actions.len(), 2);
        match reply_payload(&actions[0]) {
            Payload::RegisterAck(ack) => assert!(ack.ok),
            other => panic!("unexpected payload {other:?}"),
        }
        assert!(matches!(actions[1], ServerAction::Broadcast));
    }

    #[test]
    fn duplicate_register_acks_without_broadcast() {
        let mut driver = driver();
        register(&mut driver, "alice", 6000);

        // Same tuple again: the retransmit case.
        let actions = register(&mut driver, "alice", 6000);

        assert_eq!(actions.len(), 1);
        match reply_payload(&actions[0]) {
            Payload::RegisterAck(ack) => assert!(ack.ok),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn register_taken_name_is_rejected() {
        let mut driver = driver();
        register(&mut driver, "alice", 6000);

        let actions = register(&mut driver, "alice", 7000);

        assert_eq!(actions.len(), 1);
        match reply_payload(&actions[0]) {
            Payload::RegisterAck(ack) => {
                assert!(!ack.ok);
                assert_eq!(ack.reason.as_deref(), Some("exists"));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn dereg_marks_offline_and_broadcasts() {
        let mut driver = driver();
        register(&mut driver, "alice", 6000);

        let actions = request(
            &mut driver,
            "alice",
            6000,
            Payload::Dereg(directory::Dereg { name: "alice".into() }),
        );

        assert_eq!(actions.len(), 2);
        assert!(matches!(reply_payload(&actions[0]), Payload::DeregAck));
        assert!(matches!(actions[1], ServerAction::Broadcast));
        assert_eq!(driver.directory().snapshot()[0].status, Status::Offline);
    }

    #[test]
    fn duplicate_dereg_acks_without_broadcast() {
        let mut driver = driver();
        register(&mut driver, "alice", 6000);
        request(
            &mut driver,
            "alice",
            6000,
            Payload::Dereg(directory::Dereg { name: "alice".into() }),
        );

        let actions = request(
            &mut driver,
            "alice",
            6000,
            Payload::Dereg(directory::Dereg { name: "alice".into() }),
        );

        assert_eq!(actions.len(), 1);
        assert!(matches!(reply_payload(&actions[0]), Payload::DeregAck));
    }

    #[test]
    fn unknown_sender_is_dropped() {
        let mut driver = driver();

        let actions = request(&mut driver, "ghost", 6000, Payload::ListGroups);

        assert!(actions.is_empty());
    }

    #[test]
    fn evicted_sender_cannot_rejoin_groups() {
        let mut driver = driver();
        register(&mut driver, "alice", 6000);
        request(
            &mut driver,
            "alice",
            6000,
            Payload::CreateGroup(group::CreateGroup { group: "rust".into() }),
        );
        driver.evict("alice");

        let actions = request(
            &mut driver,
            "alice",
            6000,
            Payload::JoinGroup(group::JoinGroup { group: "rust".into() }),
        );

        assert!(actions.is_empty());
        assert!(driver.directory().members("rust").unwrap().is_empty());
    }

    #[test]
    fn create_group_replies_with_outcome() {
        let mut driver = driver();
        register(&mut driver, "alice", 6000);

        let payload = Payload::CreateGroup(group::CreateGroup { group: "rust".into() });
        let actions = request(&mut driver, "alice", 6000, payload.clone());
        match reply_payload(&actions[0]) {
            Payload::CreateGroupReply(reply) => assert_eq!(reply.outcome, CreateOutcome::Created),
            other => panic!("unexpected payload {other:?}"),
        }

        let actions = request(&mut driver, "alice", 6000, payload);
        match reply_payload(&actions[0]) {
            Payload::CreateGroupReply(reply) => {
                assert_eq!(reply.outcome, CreateOutcome::AlreadyExists);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn list_groups_reports_insertion_order() {
        let mut driver = driver();
        register(&mut driver, "alice", 6000);
        request(
            &mut driver,
            "alice",
            6000,
            Payload::CreateGroup(group::CreateGroup { group: "zeta".into() }),
        );
        request(
            &mut driver,
            "alice",
            6000,
            Payload::CreateGroup(group::CreateGroup { group: "alpha".into() }),
        );

        let actions = request(&mut driver, "alice", 6000, Payload::ListGroups);
        match reply_payload(&actions[0]) {
            Payload::ListGroupsReply(reply) => {
                assert_eq!(reply.groups, vec!["zeta".to_string(), "alpha".to_string()]);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn join_group_twice_leaves_roster_unchanged() {
        let mut driver = driver();
        register(&mut driver, "alice", 6000);
        request(
            &mut driver,
            "alice",
            6000,
            Payload::CreateGroup(group::CreateGroup { group: "rust".into() }),
        );

        for _ in 0..2 {
            let actions = request(
                &mut driver,
                "alice",
                6000,
                Payload::JoinGroup(group::JoinGroup { group: "rust".into() }),
            );
            match reply_payload(&actions[0]) {
                Payload::JoinGroupReply(reply) => assert_eq!(reply.outcome, JoinOutcome::Entered),
                other => panic!("unexpected payload {other:?}"),
            }
        }

        assert_eq!(driver.directory().members("rust").unwrap(), vec!["alice".to_string()]);
    }

    #[test]
    fn join_missing_group_reports_no_such_group() {
        let mut driver = driver();
        register(&mut driver, "alice", 6000);

        let actions = request(
            &mut driver,
            "alice",
            6000,
            Payload::JoinGroup(group::JoinGroup { group: "rust".into() }),
        );

        match reply_payload(&actions[0]) {
            Payload::JoinGroupReply(reply) => assert_eq!(reply.outcome, JoinOutcome::NoSuchGroup),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn send_group_produces_fanout() {
        let mut driver = driver();
        register(&mut driver, "alice", 6000);
        register(&mut driver, "bob", 6001);
        request(
            &mut driver,
            "alice",
            6000,
            Payload::CreateGroup(group::CreateGroup { group: "rust".into() }),
        );
        request(
            &mut driver,
            "alice",
            6000,
            Payload::JoinGroup(group::JoinGroup { group: "rust".into() }),
        );
        request(
            &mut driver,
            "bob",
            6001,
            Payload::JoinGroup(group::JoinGroup { group: "rust".into() }),
        );

        let actions = request(
            &mut driver,
            "alice",
            6000,
            Payload::SendGroup(group::SendGroup { group: "rust".into(), text: "hey".into() }),
        );

        assert_eq!(actions.len(), 1);
        match &actions[0] {
            ServerAction::Fanout { group, from, text, reply_to } => {
                assert_eq!(group, "rust");
                assert_eq!(from, "alice");
                assert_eq!(text, "hey");
                assert_eq!(*reply_to, src(6000));
            }
            other => panic!("expected fanout, got {other:?}"),
        }
    }

    #[test]
    fn stray_client_bound_frames_are_dropped() {
        let mut driver = driver();
        register(&mut driver, "alice", 6000);

        let actions = request(&mut driver, "alice", 6000, Payload::TableAck);
        assert!(actions.is_empty());

        let actions = request(&mut driver, "alice", 6000, Payload::MsgAck);
        assert!(actions.is_empty());
    }
}
