//! Single-slot ACK rendezvous.
//!
//! Senders serialize their own exchanges, so one pending-ACK slot per
//! endpoint is enough; no request-ID scheme is needed. The listener thread
//! offers every inbound frame to the slot; a match wakes the sender waiting
//! in [`AckTicket::wait`].

use std::sync::{Arc, Mutex};

use chatapp_proto::{Frame, FrameKind};
use tokio::{sync::oneshot, time::Duration};

/// What a waiting sender accepts as its acknowledgement.
///
/// Matches on the frame kind, optionally constrained to a specific responder
/// name and, for group-scoped exchanges, a group name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckPredicate {
    kind: FrameKind,
    from: Option<String>,
    group: Option<String>,
}

impl AckPredicate {
    /// Accept any frame of `kind`.
    pub fn new(kind: FrameKind) -> Self {
        Self { kind, from: None, group: None }
    }

    /// Additionally require the responder's metadata name.
    #[must_use]
    pub fn from_name(mut self, name: impl Into<String>) -> Self {
        self.from = Some(name.into());
        self
    }

    /// Additionally require the group name carried by the frame payload.
    #[must_use]
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Whether `frame` satisfies this predicate.
    pub fn matches(&self, frame: &Frame) -> bool {
        frame.kind() == self.kind
            && self.from.as_deref().is_none_or(|name| frame.meta.name == name)
            && self
                .group
                .as_deref()
                .is_none_or(|group| frame.payload.group() == Some(group))
    }
}

/// The slot is occupied by another exchange.
#[derive(Debug, thiserror::Error)]
#[error("another exchange is already awaiting an acknowledgement")]
pub struct SlotBusy;

struct Waiter {
    predicate: AckPredicate,
    tx: oneshot::Sender<Frame>,
}

/// Single-slot rendezvous between the listener and the sending task.
///
/// # Invariants
///
/// - At most one waiter at a time; [`AckSlot::begin`] rejects a second
///   arm attempt with [`SlotBusy`].
/// - The slot is released on every exit path: delivery consumes the waiter,
///   and dropping the [`AckTicket`] clears whatever is left.
#[derive(Default)]
pub struct AckSlot {
    waiter: Mutex<Option<Waiter>>,
}

impl AckSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the slot for one exchange.
    ///
    /// # Errors
    ///
    /// Returns [`SlotBusy`] if another exchange is already waiting.
    pub fn begin(self: &Arc<Self>, predicate: AckPredicate) -> Result<AckTicket, SlotBusy> {
        let mut waiter = self.waiter.lock().expect("ack slot mutex poisoned");
        if waiter.is_some() {
            return Err(SlotBusy);
        }

        let (tx, rx) = oneshot::channel();
        *waiter = Some(Waiter { predicate, tx });

        Ok(AckTicket { slot: Arc::clone(self), rx })
    }

    /// Offer an inbound frame to the waiting sender, if any.
    ///
    /// Returns `true` when the frame was consumed as an acknowledgement;
    /// the caller then skips its normal handler for this frame.
    pub fn deliver(&self, frame: &Frame) -> bool {
        let mut slot = self.waiter.lock().expect("ack slot mutex poisoned");
        match slot.take() {
            Some(waiter) if waiter.predicate.matches(frame) => {
                // A closed receiver means the sender gave up between the
                // match and now; the frame is dropped either way.
                let _ = waiter.tx.send(frame.clone());
                true
            }
            other => {
                *slot = other;
                false
            }
        }
    }

    fn clear(&self) {
        *self.waiter.lock().expect("ack slot mutex poisoned") = None;
    }
}

/// Outcome of one bounded wait on the rendezvous.
#[derive(Debug)]
pub(crate) enum WaitOutcome {
    /// A matching frame arrived.
    Ack(Frame),
    /// The timeout elapsed; the sender may retransmit and wait again.
    Elapsed,
    /// The slot was torn down; no acknowledgement can arrive.
    Closed,
}

/// Live claim on the ACK slot, held for the duration of one exchange.
///
/// Dropping the ticket releases the slot.
pub struct AckTicket {
    slot: Arc<AckSlot>,
    rx: oneshot::Receiver<Frame>,
}

impl AckTicket {
    /// Wait up to `timeout` for the acknowledgement.
    ///
    /// May be called repeatedly on the same ticket (once per retransmission)
    /// until it returns [`WaitOutcome::Ack`] or [`WaitOutcome::Closed`].
    pub(crate) async fn wait(&mut self, timeout: Duration) -> WaitOutcome {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(frame)) => WaitOutcome::Ack(frame),
            Ok(Err(_)) => WaitOutcome::Closed,
            Err(_) => WaitOutcome::Elapsed,
        }
    }
}

impl Drop for AckTicket {
    fn drop(&mut self) {
        self.slot.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use chatapp_proto::{
        payloads::{chat, directory},
        Identity, Payload,
    };

    use super::*;

    fn frame(payload: Payload, name: &str) -> Frame {
        Frame::new(payload, Identity::new(name, Ipv4Addr::LOCALHOST, 6000))
    }

    #[test]
    fn predicate_matches_kind() {
        let pred = AckPredicate::new(FrameKind::MsgAck);

        assert!(pred.matches(&frame(Payload::MsgAck, "bob")));
        assert!(!pred.matches(&frame(Payload::DeregAck, "bob")));
    }

    #[test]
    fn predicate_constrains_responder_name() {
        let pred = AckPredicate::new(FrameKind::MsgAck).from_name("bob");

        assert!(pred.matches(&frame(Payload::MsgAck, "bob")));
        assert!(!pred.matches(&frame(Payload::MsgAck, "mallory")));
    }

    #[test]
    fn predicate_constrains_group() {
        let pred = AckPredicate::new(FrameKind::GroupMsgAck)
            .from_name("bob")
            .in_group("rust");

        let ack = |group: &str| {
            frame(
                Payload::GroupMsgAck(chat::GroupMsgAck { group: group.into() }),
                "bob",
            )
        };

        assert!(pred.matches(&ack("rust")));
        assert!(!pred.matches(&ack("golf")));
    }

    #[tokio::test]
    async fn second_begin_is_rejected() {
        let slot = Arc::new(AckSlot::new());

        let _ticket = slot.begin(AckPredicate::new(FrameKind::MsgAck)).unwrap();
        assert!(slot.begin(AckPredicate::new(FrameKind::MsgAck)).is_err());
    }

    #[tokio::test]
    async fn dropping_ticket_frees_slot() {
        let slot = Arc::new(AckSlot::new());

        let ticket = slot.begin(AckPredicate::new(FrameKind::MsgAck)).unwrap();
        drop(ticket);

        assert!(slot.begin(AckPredicate::new(FrameKind::MsgAck)).is_ok());
    }

    #[tokio::test]
    async fn deliver_wakes_matching_waiter() {
        let slot = Arc::new(AckSlot::new());
        let mut ticket = slot.begin(AckPredicate::new(FrameKind::MsgAck)).unwrap();

        // Non-matching frame is refused and the waiter stays armed.
        assert!(!slot.deliver(&frame(Payload::TableAck, "bob")));
        assert!(slot.deliver(&frame(Payload::MsgAck, "bob")));

        match ticket.wait(Duration::from_millis(10)).await {
            WaitOutcome::Ack(f) => assert_eq!(f.kind(), FrameKind::MsgAck),
            other => panic!("expected ack, got {other:?}"),
        }

        // Delivery consumed the waiter.
        assert!(!slot.deliver(&frame(Payload::MsgAck, "bob")));
    }

    #[tokio::test]
    async fn wait_times_out_without_delivery() {
        let slot = Arc::new(AckSlot::new());
        let mut ticket = slot
            .begin(AckPredicate::new(FrameKind::RegisterAck))
            .unwrap();

        match ticket.wait(Duration::from_millis(10)).await {
            WaitOutcome::Elapsed => {}
            other => panic!("expected timeout, got {other:?}"),
        }

        // The exchange can still complete after a retransmission.
        let ack = frame(
            Payload::RegisterAck(directory::RegisterAck::accepted()),
            "Server",
        );
        assert!(slot.deliver(&ack));
        match ticket.wait(Duration::from_millis(10)).await {
            WaitOutcome::Ack(_) => {}
            other => panic!("expected ack, got {other:?}"),
        }
    }
}
