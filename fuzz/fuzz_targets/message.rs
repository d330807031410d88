#![no_main]

use libfuzzer_sys::fuzz_target;
use ssp_core::message::Message;

fuzz_target!(|data: &[u8]| {
    // Parsing arbitrary input must never panic, and anything that parses
    // must encode back to the same bytes.
    if let Ok(message) = Message::parse(data) {
        if let Ok(encoded) = message.serialize() {
            assert_eq!(encoded, data);
        }
    }
});
