//! Shared reliability layer for both chatapp roles.
//!
//! UDP gives no delivery guarantee, so every exchange that expects a
//! confirmation goes through one primitive: [`ReliableSender::send`], an
//! ACK-gated send with a bounded retry schedule. The listener side feeds
//! inbound ACK candidates into a single-slot rendezvous ([`AckSlot`]); the
//! sending task sleeps on the rendezvous with a fixed per-attempt timeout.
//!
//! Both roles also share the receive path: [`run_listener`] decodes
//! datagrams, surfaces ACK candidates to the waiting sender, and forwards
//! everything else to the role's handler.

mod ack;
mod listener;
mod reliable;
mod shutdown;

pub use ack::{AckPredicate, AckSlot, AckTicket, SlotBusy};
pub use listener::run_listener;
pub use reliable::{NetError, ReliableSender, RetryPolicy, SendOutcome};
pub use shutdown::{shutdown_channel, ShutdownHandle, ShutdownSignal};
