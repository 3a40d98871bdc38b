//! Shared datagram receive loop.
//!
//! Both roles run the same listener: blocking receive, decode, then route.
//! Frames that satisfy the currently-armed ACK predicate are surfaced to the
//! waiting sender through the [`AckSlot`]; everything else is forwarded to
//! the role's handler over the inbound channel. Malformed datagrams are
//! dropped and logged.

use std::{net::SocketAddr, sync::Arc};

use chatapp_proto::{Frame, MAX_DATAGRAM};
use tokio::{net::UdpSocket, sync::mpsc};

use crate::{ack::AckSlot, shutdown::ShutdownSignal};

/// Run the receive loop until shutdown (or until the handler goes away).
///
/// The loop holds no state of its own; it exits when the shutdown signal
/// fires or when the inbound channel's receiver is dropped.
pub async fn run_listener(
    socket: Arc<UdpSocket>,
    slot: Arc<AckSlot>,
    inbound: mpsc::Sender<(Frame, SocketAddr)>,
    mut shutdown: ShutdownSignal,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
        let (len, src) = tokio::select! {
            () = shutdown.recv() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "datagram receive failed");
                    continue;
                }
            },
        };

        let frame = match Frame::decode(&buf[..len]) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(%src, error = %e, "dropping malformed datagram");
                continue;
            }
        };

        if slot.deliver(&frame) {
            continue;
        }

        if inbound.send((frame, src)).await.is_err() {
            break;
        }
    }

    tracing::debug!("listener stopped");
}
