//! Wire format for the chatapp UDP chat protocol.
//!
//! Every datagram carries exactly one [`Frame`]: a self-describing CBOR map
//! with a `type` tag, a type-specific `payload`, and `meta` carrying the
//! sender's startup identity. Frames are self-delimiting (one per datagram),
//! so there is no length prefix or stream framing.
//!
//! Payloads are CBOR for the same reasons the format is used elsewhere in
//! this workspace: self-describing (field names embedded), compact, and no
//! code generation. The `type` tag is the serde variant tag of [`Payload`],
//! so dispatch and encoding cannot disagree.
//!
//! # Invariants
//!
//! - Round-trip: `decode(encode(F)) = F` for every frame that encodes.
//! - Each payload variant maps to exactly one [`FrameKind`] (enforced by
//!   match exhaustiveness in [`Payload::kind`]).

mod errors;
mod frame;
mod kind;
pub mod payloads;

pub use errors::{ProtocolError, Result};
pub use frame::{Frame, Identity, MAX_DATAGRAM};
pub use kind::FrameKind;
pub use payloads::Payload;
