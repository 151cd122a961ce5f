#![no_main]

use std::io::Cursor;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tsbuf_buffer::{BufferConfig, StreamBuffer};
use tsbuf_types::TsPacketDecoder;

#[derive(Arbitrary, Debug)]
struct Input {
    packet_size: u8,
    chunk_packets: u8,
    workers: u8,
    data: Vec<u8>,
}

// Fuzz target: drain a StreamBuffer over arbitrary bytes.
//
// With an explicit packet size every chunk is dispatched whole, so the
// buffer must yield exactly ceil(len / packet_size) items and then None,
// with no fatal error along the way.
fuzz_target!(|input: Input| {
    let packet_size = 188 + usize::from(input.packet_size % 17);
    let config = BufferConfig::default()
        .with_packet_size(packet_size)
        .with_chunk_packets(1 + usize::from(input.chunk_packets % 8))
        .with_workers(1 + usize::from(input.workers % 4));

    let expected = input.data.len().div_ceil(packet_size);
    let buffer = StreamBuffer::new(Cursor::new(&input.data[..]), TsPacketDecoder, &config)
        .expect("explicit packet size needs no detection");

    let mut seen = 0;
    for outcome in buffer {
        if let Err(e) = &outcome {
            assert!(!e.is_fatal(), "in-memory read failed: {e}");
        }
        seen += 1;
    }
    assert_eq!(seen, expected);
});
