//! Fuzz target for Frame::decode
//!
//! Feeds arbitrary byte sequences to the frame decoder. Malformed datagrams
//! arrive straight off the wire, so decoding must never panic, only return
//! an error the listener can drop.

#![no_main]

use chatapp_proto::Frame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = Frame::decode(data);
});
