#![no_main]

use libfuzzer_sys::fuzz_target;
use tsbuf_types::TsPacket;

// Fuzz target: TsPacket::decode with arbitrary bytes.
//
// Catches bugs in:
// - Header bit extraction
// - Adaptation field length bounds
// - Trailer accounting for 192/204-byte packets
fuzz_target!(|data: &[u8]| {
    if let Ok(packet) = TsPacket::decode(data) {
        assert!(packet.payload.len() <= 184);
        assert_eq!(packet.trailer_len, data.len() - 188);
    }
});
