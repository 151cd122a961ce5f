#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use tsbuf_wire::sync::{MAX_PACKET_SIZE, MIN_PACKET_SIZE, SYNC_BYTE};
use tsbuf_wire::{Resync, Sequential, SyncDetector};

// Fuzz target: SyncDetector::detect on arbitrary stream heads.
//
// Runs the same bytes through a seekable and a forward-only source and
// checks that both agree, that any detected size has sync bytes at both
// ends, and that the forward-only source ends up on a packet boundary.
fuzz_target!(|data: &[u8]| {
    let detector = SyncDetector::new();

    let mut seekable = Cursor::new(data);
    let rewound = detector.detect(&mut seekable);

    let mut forward = Sequential(Cursor::new(data));
    let skipped = detector.detect(&mut forward);

    let Ok(found) = rewound else {
        return;
    };
    let size = found.packet_size;
    assert!((MIN_PACKET_SIZE..=MAX_PACKET_SIZE).contains(&size));
    assert_eq!(data[0], SYNC_BYTE);
    assert_eq!(data[size], SYNC_BYTE);
    assert_eq!(found.resync, Resync::Rewound);
    assert_eq!(seekable.position(), 0);

    if let Ok(forward_found) = skipped {
        assert_eq!(forward_found.packet_size, size);
        assert_eq!(forward.0.position(), 2 * size as u64);
    }
});
