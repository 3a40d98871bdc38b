//! Frame type combining payload and sender metadata.
//!
//! A `Frame` is the unit of transport: one frame per datagram, encoded as a
//! single CBOR map. The payload's serde tag doubles as the frame `type`, so
//! the wire shape is `{type, payload?, meta}`.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{ProtocolError, Result},
    kind::FrameKind,
    payloads::Payload,
};

/// Largest datagram body this protocol will emit.
///
/// The practical IPv4 UDP payload ceiling. Frames are tiny in this protocol;
/// hitting this limit means a runaway message text, which encode rejects
/// rather than letting the OS truncate the datagram.
pub const MAX_DATAGRAM: usize = 65_507;

/// Logical identity a frame's sender established at startup.
///
/// Handlers trust `name` to key tables; there is no cryptographic identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique client name (`"Server"` for server-originated frames).
    pub name: String,
    /// Listen address of the sender.
    pub ip: Ipv4Addr,
    /// Listen port of the sender.
    pub port: u16,
}

impl Identity {
    /// Create an identity.
    pub fn new(name: impl Into<String>, ip: Ipv4Addr, port: u16) -> Self {
        Self { name: name.into(), ip, port }
    }

    /// Socket address this identity listens on.
    pub fn endpoint(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.ip, self.port))
    }
}

/// Complete protocol frame.
///
/// # Invariants
///
/// - Round-trip: `decode(encode(F)) = F`.
/// - Encoded size never exceeds [`MAX_DATAGRAM`] (enforced by
///   [`Frame::encode`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Typed payload; its tag is the frame `type` on the wire.
    #[serde(flatten)]
    pub payload: Payload,
    /// Sender identity.
    pub meta: Identity,
}

impl Frame {
    /// Create a frame from a payload and the sender's identity.
    pub fn new(payload: Payload, meta: Identity) -> Self {
        Self { payload, meta }
    }

    /// Kind tag of this frame's payload.
    pub fn kind(&self) -> FrameKind {
        self.payload.kind()
    }

    /// Encode into a buffer.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Encode` if CBOR serialization fails
    /// - `ProtocolError::DatagramTooLarge` if the encoding exceeds
    ///   [`MAX_DATAGRAM`]
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let bytes = self.to_bytes()?;
        dst.put_slice(&bytes);
        Ok(())
    }

    /// Encode into a fresh datagram body.
    ///
    /// # Errors
    ///
    /// Same as [`Frame::encode`].
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(128);
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| ProtocolError::Encode(e.to_string()))?;

        if buf.len() > MAX_DATAGRAM {
            return Err(ProtocolError::DatagramTooLarge { size: buf.len(), max: MAX_DATAGRAM });
        }

        Ok(buf)
    }

    /// Decode one frame from a received datagram.
    ///
    /// Trailing bytes after the CBOR value are rejected along with every
    /// other malformation; the caller drops the datagram either way.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Decode` if the bytes are not a valid frame
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payloads::{chat, directory, group};

    fn ident(name: &str) -> Identity {
        Identity::new(name, Ipv4Addr::new(127, 0, 0, 1), 5555)
    }

    #[test]
    fn round_trip_unit_payload() {
        let frame = Frame::new(Payload::Register, ident("alice"));

        let wire = frame.to_bytes().unwrap();
        let parsed = Frame::decode(&wire).unwrap();

        assert_eq!(frame, parsed);
        assert_eq!(parsed.kind(), FrameKind::Register);
    }

    #[test]
    fn round_trip_struct_payload() {
        let frame = Frame::new(
            Payload::Msg(chat::Msg { text: "hi there".into() }),
            ident("bob"),
        );

        let wire = frame.to_bytes().unwrap();
        let parsed = Frame::decode(&wire).unwrap();

        assert_eq!(frame, parsed);
        assert_eq!(parsed.kind(), FrameKind::Msg);
    }

    #[test]
    fn round_trip_table_snapshot() {
        let table = directory::Table {
            entries: vec![
                directory::TableEntry {
                    name: "alice".into(),
                    ip: Ipv4Addr::new(10, 0, 0, 1),
                    port: 6000,
                    status: directory::Status::Online,
                },
                directory::TableEntry {
                    name: "bob".into(),
                    ip: Ipv4Addr::new(10, 0, 0, 2),
                    port: 6001,
                    status: directory::Status::Offline,
                },
            ],
        };
        let frame = Frame::new(Payload::Table(table), ident("Server"));

        let wire = frame.to_bytes().unwrap();
        assert_eq!(frame, Frame::decode(&wire).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(Frame::decode(b"not cbor at all").is_err());
        assert!(Frame::decode(&[]).is_err());
    }

    #[test]
    fn rejects_oversized_text() {
        let frame = Frame::new(
            Payload::Msg(chat::Msg { text: "x".repeat(MAX_DATAGRAM) }),
            ident("alice"),
        );

        assert!(matches!(
            frame.to_bytes(),
            Err(ProtocolError::DatagramTooLarge { .. })
        ));
    }

    #[test]
    fn group_accessor_matches_payload() {
        let reply = Payload::JoinGroupReply(group::JoinGroupReply {
            group: "rust".into(),
            outcome: group::JoinOutcome::Entered,
        });
        assert_eq!(reply.group(), Some("rust"));
        assert_eq!(Payload::Register.group(), None);
    }
}
