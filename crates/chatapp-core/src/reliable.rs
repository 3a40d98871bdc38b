//! ACK-gated send with a bounded retry schedule.
//!
//! This is the single reliability mechanism in the protocol. Every exchange
//! that expects a confirmation (server requests, direct peer messages, table
//! broadcasts, group fan-outs) goes through [`ReliableSender::send`].

use std::{net::SocketAddr, sync::Arc};

use chatapp_proto::{Frame, ProtocolError};
use tokio::{net::UdpSocket, time::Duration};

use crate::ack::{AckPredicate, AckSlot, SlotBusy, WaitOutcome};

/// Retry schedule for one reliable exchange.
///
/// The defaults bound the time to declare a peer unresponsive at
/// `attempts * ack_timeout` ≈ 2.5 s: short enough for interactive feedback,
/// long enough to absorb normal jitter. Tests shrink both knobs.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total transmissions of the datagram (first send included).
    pub attempts: u32,
    /// Bounded wait for the acknowledgement after each transmission.
    pub ack_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 5, ack_timeout: Duration::from_millis(500) }
    }
}

impl RetryPolicy {
    /// Create a policy with explicit knobs.
    pub const fn new(attempts: u32, ack_timeout: Duration) -> Self {
        Self { attempts, ack_timeout }
    }
}

/// Terminal result of a reliable send.
#[derive(Debug)]
pub enum SendOutcome {
    /// A frame matching the ACK predicate arrived; here it is.
    Delivered(Frame),
    /// Every attempt went unanswered. The destination is presumed dead.
    TimedOut,
}

/// Errors from the reliability layer.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// A reliable send was attempted while another is in flight.
    #[error(transparent)]
    Busy(#[from] SlotBusy),

    /// The outbound frame failed to encode.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The socket send failed.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reliable-send handle sharing the role's socket and ACK slot.
///
/// Cheap to clone; all clones contend for the same single slot, which is
/// what enforces the one-exchange-in-flight rule.
#[derive(Clone)]
pub struct ReliableSender {
    socket: Arc<UdpSocket>,
    slot: Arc<AckSlot>,
    policy: RetryPolicy,
}

impl ReliableSender {
    /// Create a sender over `socket`, rendezvousing on `slot`.
    pub fn new(socket: Arc<UdpSocket>, slot: Arc<AckSlot>, policy: RetryPolicy) -> Self {
        Self { socket, slot, policy }
    }

    /// Socket this sender transmits on.
    pub fn socket(&self) -> &Arc<UdpSocket> {
        &self.socket
    }

    /// Send `frame` to `dest` and wait for a frame matching `predicate`.
    ///
    /// Transmits, waits up to the policy timeout, and retransmits the
    /// identical datagram on expiry, up to the policy's attempt count.
    /// Receivers must therefore tolerate duplicate requests.
    ///
    /// # Errors
    ///
    /// - [`NetError::Busy`] if another exchange is already in flight
    /// - [`NetError::Protocol`] if the frame fails to encode
    /// - [`NetError::Io`] if a socket send fails
    pub async fn send(
        &self,
        dest: SocketAddr,
        frame: &Frame,
        predicate: AckPredicate,
    ) -> Result<SendOutcome, NetError> {
        let datagram = frame.to_bytes()?;
        let mut ticket = self.slot.begin(predicate)?;

        for attempt in 1..=self.policy.attempts.max(1) {
            self.socket.send_to(&datagram, dest).await?;

            match ticket.wait(self.policy.ack_timeout).await {
                WaitOutcome::Ack(ack) => {
                    tracing::debug!(kind = %frame.kind(), %dest, attempt, "delivered");
                    return Ok(SendOutcome::Delivered(ack));
                }
                WaitOutcome::Elapsed => {
                    tracing::debug!(kind = %frame.kind(), %dest, attempt, "no ACK yet");
                }
                WaitOutcome::Closed => break,
            }
        }

        tracing::debug!(kind = %frame.kind(), %dest, "gave up waiting for ACK");
        Ok(SendOutcome::TimedOut)
    }

    /// Fire-and-forget transmit, used for replies and ACKs (which are
    /// themselves the acknowledgement of some exchange and are never
    /// reliable-sent).
    ///
    /// # Errors
    ///
    /// - [`NetError::Protocol`] if the frame fails to encode
    /// - [`NetError::Io`] if the socket send fails
    pub async fn send_plain(&self, dest: SocketAddr, frame: &Frame) -> Result<(), NetError> {
        let datagram = frame.to_bytes()?;
        self.socket.send_to(&datagram, dest).await?;
        Ok(())
    }
}
