//! Property tests: whatever the compressor emits, the decompressor replays

use h2_frame_codec::{HeaderCompressor, HeaderDecompressor, HeaderField};
use proptest::prelude::*;

fn header_field() -> impl Strategy<Value = HeaderField> {
    prop_oneof![
        // Names that hit the static table.
        (
            prop::sample::select(vec![":method", ":path", "accept", "cookie", "content-length"]),
            "[ -~]{0,24}"
        )
            .prop_map(|(n, v)| HeaderField::new(n, v)),
        ("[a-z][a-z0-9-]{0,15}", prop::collection::vec(any::<u8>(), 0..48))
            .prop_map(|(n, v)| HeaderField::new(n, v)),
    ]
}

fn header_blocks() -> impl Strategy<Value = Vec<Vec<HeaderField>>> {
    prop::collection::vec(prop::collection::vec(header_field(), 0..10), 1..6)
}

proptest! {
    #[test]
    fn blocks_roundtrip_with_tables_in_sync(
        blocks in header_blocks(),
        table_size in 0usize..512,
        headroom in 0usize..4096,
    ) {
        let mut encoder = HeaderCompressor::with_max_table_size(table_size).unwrap();
        let mut decoder = HeaderDecompressor::with_max_table_size(table_size + headroom).unwrap();

        for headers in &blocks {
            let mut block = Vec::new();
            encoder.encode(headers, &mut block);
            prop_assert_eq!(&decoder.decode(&block).unwrap(), headers);
            prop_assert_eq!(encoder.table(), decoder.table());
            prop_assert!(decoder.table().size() <= table_size);
        }
    }

    #[test]
    fn decoder_limit_does_not_resize_before_update(
        blocks in header_blocks(),
        limit in 0usize..4096,
    ) {
        // The encoder keeps the initial table and never announces a size.
        let mut encoder = HeaderCompressor::new();
        let mut decoder = HeaderDecompressor::with_max_table_size(limit).unwrap();

        for headers in &blocks {
            let mut block = Vec::new();
            encoder.encode(headers, &mut block);
            prop_assert_eq!(&decoder.decode(&block).unwrap(), headers);
            prop_assert_eq!(encoder.table(), decoder.table());
        }
    }

    #[test]
    fn arbitrary_input_never_panics(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut decoder = HeaderDecompressor::new();
        let _ = decoder.decode(&data);
    }
}
