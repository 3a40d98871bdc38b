//! Directory server for the chatapp protocol.
//!
//! The server owns the authoritative membership state: the registration
//! table (who exists, where they listen, whether they are online) and the
//! group registry. Clients discover each other through table broadcasts and
//! exchange group messages through the server's fan-out.
//!
//! The crate splits three ways: [`Directory`] is pure state with its
//! invariants, [`ServerDriver`] turns inbound frames into actions without
//! touching the network, and [`Server`] executes those actions over UDP
//! with the shared reliability layer.

mod directory;
mod driver;
mod error;
mod runtime;

pub use directory::{Directory, RegisterOutcome};
pub use driver::{ServerAction, ServerDriver};
pub use error::ServerError;
pub use runtime::{Server, ServerConfig};
